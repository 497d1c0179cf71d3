//! Team preference filter used to pick broadcast recipients.

use matchday_common::types::Recipient;

/// Case-insensitive substring match against a recipient's favourite team.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamFilter {
    needles: Vec<String>,
}

impl TeamFilter {
    /// Build a filter matching any of the given team name fragments.
    /// Empty fragments are dropped.
    pub fn any_of<I, S>(teams: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            needles: teams
                .into_iter()
                .map(|t| t.as_ref().trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }

    pub fn teams(&self) -> &[String] {
        &self.needles
    }

    /// Whether a preference string matches. `None` never matches.
    pub fn matches(&self, preference: Option<&str>) -> bool {
        let Some(preference) = preference else {
            return false;
        };
        let preference = preference.to_lowercase();
        self.needles.iter().any(|needle| preference.contains(needle))
    }

    /// Whether a recipient should receive a broadcast: it must still hold a
    /// token and its favourite team must match.
    pub fn selects(&self, recipient: &Recipient) -> bool {
        recipient.is_reachable() && self.matches(recipient.team_preference.as_deref())
    }
}

impl Default for TeamFilter {
    fn default() -> Self {
        Self::any_of(["manchester united", "arsenal"])
    }
}
