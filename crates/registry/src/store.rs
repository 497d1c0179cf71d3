//! Registration store: volatile, in-memory registry of push recipients.
//!
//! Every recipient is keyed by its device id. Records are never removed: an
//! unregistered device keeps its entry with a cleared token so its identity
//! survives for the lifetime of the process.
//!
//! A single `RwLock` guards the whole collection, so each method behaves as one
//! critical section and `list_all` never observes a half-applied update.

use std::collections::HashMap;

use chrono::Utc;
use parking_lot::RwLock;

use matchday_common::types::Recipient;

#[derive(Debug, Default)]
struct Inner {
    /// Recipients in registration order.
    recipients: Vec<Recipient>,
    /// Device id → position in `recipients`.
    index: HashMap<String, usize>,
}

impl Inner {
    fn get_mut(&mut self, id: &str) -> Option<&mut Recipient> {
        let pos = *self.index.get(id)?;
        self.recipients.get_mut(pos)
    }

    /// Insert or overwrite the token for `id`. Returns true if a record was created.
    fn upsert_token(&mut self, id: &str, token: &str) -> bool {
        if let Some(recipient) = self.get_mut(id) {
            recipient.token = Some(token.to_string());
            recipient.updated_at = Utc::now();
            return false;
        }

        self.index.insert(id.to_string(), self.recipients.len());
        self.recipients.push(Recipient::new(id, token));
        true
    }
}

/// Thread-safe registry of push recipients.
#[derive(Debug, Default)]
pub struct RegistrationStore {
    inner: RwLock<Inner>,
}

impl RegistrationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a device, or replace the token of an already known one.
    ///
    /// Returns `true` when a new record was created.
    pub fn register(&self, id: &str, token: &str) -> bool {
        tracing::info!(device_id = %id, "Registering device");
        self.inner.write().upsert_token(id, token)
    }

    /// Clear the token of a device. Unknown ids are ignored.
    ///
    /// Returns `true` if the device was known.
    pub fn unregister(&self, id: &str) -> bool {
        tracing::info!(device_id = %id, "Unregistering device");
        let mut inner = self.inner.write();
        match inner.get_mut(id) {
            Some(recipient) => {
                recipient.token = None;
                recipient.updated_at = Utc::now();
                true
            }
            None => {
                tracing::debug!(device_id = %id, "Unregister ignored, unknown device");
                false
            }
        }
    }

    /// Replace a device token with the canonical one reported by the gateway.
    ///
    /// Returns `true` when a new record was created.
    pub fn update_token(&self, id: &str, new_token: &str) -> bool {
        tracing::info!(device_id = %id, "Updating device token");
        self.inner.write().upsert_token(id, new_token)
    }

    /// Clear the token of a device only while it still holds `expected`.
    ///
    /// Returns `true` if the token was cleared. A device that re-registered
    /// with a different token in the meantime is left alone.
    pub fn unregister_if_token(&self, id: &str, expected: &str) -> bool {
        let mut inner = self.inner.write();
        match inner.get_mut(id) {
            Some(recipient) if recipient.token.as_deref() == Some(expected) => {
                tracing::info!(device_id = %id, "Unregistering device");
                recipient.token = None;
                recipient.updated_at = Utc::now();
                true
            }
            _ => {
                tracing::debug!(device_id = %id, "Unregister skipped, token changed");
                false
            }
        }
    }

    /// Replace the token of a device with `new_token` only while it still
    /// holds `expected`. Unknown ids are ignored.
    pub fn update_token_if(&self, id: &str, expected: &str, new_token: &str) -> bool {
        let mut inner = self.inner.write();
        match inner.get_mut(id) {
            Some(recipient) if recipient.token.as_deref() == Some(expected) => {
                tracing::info!(device_id = %id, "Updating device token");
                recipient.token = Some(new_token.to_string());
                recipient.updated_at = Utc::now();
                true
            }
            _ => {
                tracing::debug!(device_id = %id, "Token update skipped, token changed");
                false
            }
        }
    }

    /// Set the favourite team of a device. Unknown ids are ignored.
    pub fn set_team_preference(&self, id: &str, team: &str) -> bool {
        tracing::info!(device_id = %id, team = %team, "Favouriting team");
        let mut inner = self.inner.write();
        match inner.get_mut(id) {
            Some(recipient) => {
                recipient.team_preference = Some(team.to_string());
                recipient.updated_at = Utc::now();
                true
            }
            None => {
                tracing::debug!(device_id = %id, "Favourite ignored, unknown device");
                false
            }
        }
    }

    /// Clear the favourite team of a device.
    ///
    /// The preference is cleared whatever its current value; `team` is only logged.
    pub fn clear_team_preference(&self, id: &str, team: &str) -> bool {
        tracing::info!(device_id = %id, team = %team, "Unfavouriting team");
        let mut inner = self.inner.write();
        match inner.get_mut(id) {
            Some(recipient) => {
                recipient.team_preference = None;
                recipient.updated_at = Utc::now();
                true
            }
            None => {
                tracing::debug!(device_id = %id, "Unfavourite ignored, unknown device");
                false
            }
        }
    }

    /// Snapshot of every recipient in registration order.
    ///
    /// The returned vector is an independent copy; later store mutations are not
    /// reflected in it.
    pub fn list_all(&self) -> Vec<Recipient> {
        self.inner.read().recipients.clone()
    }

    pub fn get(&self, id: &str) -> Option<Recipient> {
        let inner = self.inner.read();
        inner
            .index
            .get(id)
            .and_then(|&pos| inner.recipients.get(pos))
            .cloned()
    }

    /// Number of known devices, including unregistered ones.
    pub fn len(&self) -> usize {
        self.inner.read().recipients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of devices that currently hold a token.
    pub fn active_count(&self) -> usize {
        self.inner
            .read()
            .recipients
            .iter()
            .filter(|r| r.is_reachable())
            .count()
    }
}
