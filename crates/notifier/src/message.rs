//! Push message payload in the gateway's JSON shape.

use std::collections::BTreeMap;

use serde::Serialize;

/// Collapse key shared by every match score update, so a device only shows
/// the latest one.
const SCORE_COLLAPSE_KEY: &str = "12345";

/// Score updates are worthless after 90 minutes.
const SCORE_TIME_TO_LIVE_SECS: u32 = 5400;

/// A push message. Serialises to the fields the gateway expects alongside
/// `registration_ids`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PushMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collapse_key: Option<String>,

    /// Seconds the gateway keeps the message while the device is offline.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_to_live: Option<u32>,

    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub delay_while_idle: bool,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub data: BTreeMap<String, String>,
}

impl PushMessage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn collapse_key(mut self, key: impl Into<String>) -> Self {
        self.collapse_key = Some(key.into());
        self
    }

    pub fn time_to_live(mut self, seconds: u32) -> Self {
        self.time_to_live = Some(seconds);
        self
    }

    pub fn delay_while_idle(mut self, delay: bool) -> Self {
        self.delay_while_idle = delay;
        self
    }

    pub fn data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Football score update, e.g. `match_score("Man Utd 1", "Arsenal 0")`.
    pub fn match_score(home: &str, away: &str) -> Self {
        Self::new()
            .delay_while_idle(true)
            .time_to_live(SCORE_TIME_TO_LIVE_SECS)
            .collapse_key(SCORE_COLLAPSE_KEY)
            .data("type", "football")
            .data("home team", home)
            .data("away team", away)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_score_payload() {
        let message = PushMessage::match_score("Man Utd 1", "Arsenal 0");
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "collapse_key": "12345",
                "time_to_live": 5400,
                "delay_while_idle": true,
                "data": {
                    "type": "football",
                    "home team": "Man Utd 1",
                    "away team": "Arsenal 0"
                }
            })
        );
    }

    #[test]
    fn test_empty_message_omits_optional_fields() {
        let json = serde_json::to_value(PushMessage::new()).unwrap();
        assert_eq!(json, serde_json::json!({}));
    }
}
