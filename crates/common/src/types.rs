use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered device that can receive push notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    /// Stable device identifier, never changes once created.
    pub id: String,
    /// Current push token. `None` after the device has been unregistered.
    pub token: Option<String>,
    /// Favourite team, if the user picked one.
    pub team_preference: Option<String>,
    pub registered_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Recipient {
    pub fn new(id: impl Into<String>, token: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            token: Some(token.into()),
            team_preference: None,
            registered_at: now,
            updated_at: now,
        }
    }

    /// Whether the recipient currently holds a push token.
    pub fn is_reachable(&self) -> bool {
        self.token.is_some()
    }
}

/// What the worker pool does when its task queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolSaturation {
    /// Wait until a slot frees up.
    Block,
    /// Fail the submission immediately.
    Reject,
}

impl std::fmt::Display for PoolSaturation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PoolSaturation::Block => write!(f, "block"),
            PoolSaturation::Reject => write!(f, "reject"),
        }
    }
}

impl std::str::FromStr for PoolSaturation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "block" => Ok(PoolSaturation::Block),
            "reject" => Ok(PoolSaturation::Reject),
            other => Err(format!(
                "unknown pool saturation policy '{}', expected 'block' or 'reject'",
                other
            )),
        }
    }
}
