//! Result reconciliation: applies per-recipient delivery outcomes back to the
//! registration store.
//!
//! Runs once per batch on a pool worker. A failed gateway call, or a result
//! list that does not line up with the batch, aborts the whole batch without
//! touching the store. Otherwise each outcome is paired with the batch entry at
//! the same position:
//! - delivered with a canonical token → the device's token is migrated
//! - `NotRegistered` → the device is unregistered
//! - any other error → logged, no retry at this layer
//!
//! Migration and unregistration only apply while the device still holds the
//! token the batch was sent to. A device that registered a new token while the
//! batch was in flight keeps it.

use std::sync::Arc;

use matchday_registry::RegistrationStore;

use crate::dispatcher::Batch;
use crate::error::GatewayError;
use crate::gateway::{DeliveryOutcome, ErrorCode, MulticastResult};

/// Per-batch tally of what reconciliation did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileReport {
    pub delivered: usize,
    pub migrated: usize,
    pub unregistered: usize,
    pub failed: usize,
    /// Outcomes skipped because the device token changed after partitioning.
    pub stale: usize,
    /// The batch was skipped entirely.
    pub aborted: bool,
}

impl ReconcileReport {
    fn aborted() -> Self {
        Self {
            aborted: true,
            ..Self::default()
        }
    }
}

pub struct Reconciler {
    store: Arc<RegistrationStore>,
}

impl Reconciler {
    pub fn new(store: Arc<RegistrationStore>) -> Self {
        Self { store }
    }

    pub fn reconcile(
        &self,
        batch: &Batch,
        result: Result<MulticastResult, GatewayError>,
    ) -> ReconcileReport {
        let result = match result {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(
                    batch_id = %batch.id,
                    batch_size = batch.len(),
                    error = %e,
                    "Error posting messages, batch dropped"
                );
                return ReconcileReport::aborted();
            }
        };

        if result.results.len() != batch.len() {
            tracing::error!(
                batch_id = %batch.id,
                batch_size = batch.len(),
                results = result.results.len(),
                "Gateway results do not line up with batch, batch dropped"
            );
            return ReconcileReport::aborted();
        }

        let mut report = ReconcileReport::default();

        for (entry, outcome) in batch.entries.iter().zip(result.results) {
            match outcome {
                DeliveryOutcome::Delivered {
                    message_id,
                    canonical_token,
                } => {
                    report.delivered += 1;
                    tracing::debug!(
                        device_id = %entry.recipient_id,
                        message_id = %message_id,
                        "Message delivered"
                    );

                    if let Some(canonical) = canonical_token {
                        tracing::info!(
                            device_id = %entry.recipient_id,
                            "Gateway reported a canonical token, migrating"
                        );
                        if self
                            .store
                            .update_token_if(&entry.recipient_id, &entry.token, &canonical)
                        {
                            report.migrated += 1;
                        } else {
                            report.stale += 1;
                        }
                    }
                }
                DeliveryOutcome::Failed(ErrorCode::NotRegistered) => {
                    tracing::info!(
                        device_id = %entry.recipient_id,
                        "Device no longer registered with gateway, unregistering"
                    );
                    if self
                        .store
                        .unregister_if_token(&entry.recipient_id, &entry.token)
                    {
                        report.unregistered += 1;
                    } else {
                        report.stale += 1;
                    }
                }
                DeliveryOutcome::Failed(code) => {
                    tracing::error!(
                        device_id = %entry.recipient_id,
                        error = %code,
                        "Error sending message"
                    );
                    report.failed += 1;
                }
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::BatchEntry;

    fn setup(devices: &[(&str, &str)]) -> (Arc<RegistrationStore>, Batch) {
        let store = Arc::new(RegistrationStore::new());
        let entries = devices
            .iter()
            .map(|(id, token)| {
                store.register(id, token);
                BatchEntry {
                    recipient_id: id.to_string(),
                    token: token.to_string(),
                }
            })
            .collect();
        (store, Batch::new(entries))
    }

    fn delivered(canonical: Option<&str>) -> DeliveryOutcome {
        DeliveryOutcome::Delivered {
            message_id: "m".to_string(),
            canonical_token: canonical.map(str::to_string),
        }
    }

    fn multicast(results: Vec<DeliveryOutcome>) -> Result<MulticastResult, GatewayError> {
        Ok(MulticastResult {
            multicast_id: 1,
            retry_multicast_ids: vec![],
            results,
        })
    }

    fn token_of(store: &RegistrationStore, id: &str) -> Option<String> {
        store.get(id).and_then(|r| r.token)
    }

    #[test]
    fn test_plain_success_leaves_store_untouched() {
        let (store, batch) = setup(&[("d1", "t1")]);
        let before = store.list_all();

        let report = Reconciler::new(store.clone()).reconcile(&batch, multicast(vec![delivered(None)]));

        assert_eq!(report.delivered, 1);
        assert_eq!(report.migrated, 0);
        assert_eq!(store.list_all(), before);
    }

    #[test]
    fn test_canonical_token_migrates() {
        let (store, batch) = setup(&[("d1", "t1"), ("d2", "t2")]);

        let report = Reconciler::new(store.clone()).reconcile(
            &batch,
            multicast(vec![delivered(None), delivered(Some("t2-new"))]),
        );

        assert_eq!(report.migrated, 1);
        assert_eq!(token_of(&store, "d1").as_deref(), Some("t1"));
        assert_eq!(token_of(&store, "d2").as_deref(), Some("t2-new"));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_not_registered_unregisters_only_that_device() {
        let (store, batch) = setup(&[("d1", "t1"), ("d2", "t2"), ("d3", "t3")]);

        let report = Reconciler::new(store.clone()).reconcile(
            &batch,
            multicast(vec![
                delivered(None),
                DeliveryOutcome::Failed(ErrorCode::NotRegistered),
                delivered(None),
            ]),
        );

        assert_eq!(report.unregistered, 1);
        assert_eq!(token_of(&store, "d1").as_deref(), Some("t1"));
        assert_eq!(token_of(&store, "d2"), None);
        assert_eq!(token_of(&store, "d3").as_deref(), Some("t3"));
        assert!(store.get("d2").is_some());
    }

    #[test]
    fn test_other_errors_are_logged_only() {
        let (store, batch) = setup(&[("d1", "t1"), ("d2", "t2")]);
        let before = store.list_all();

        let report = Reconciler::new(store.clone()).reconcile(
            &batch,
            multicast(vec![
                DeliveryOutcome::Failed(ErrorCode::Unavailable),
                DeliveryOutcome::Failed(ErrorCode::InvalidRegistration),
            ]),
        );

        assert_eq!(report.failed, 2);
        assert_eq!(store.list_all(), before);
    }

    #[test]
    fn test_gateway_error_aborts_batch() {
        let (store, batch) = setup(&[("d1", "t1")]);
        let before = store.list_all();

        let report = Reconciler::new(store.clone()).reconcile(
            &batch,
            Err(GatewayError::Http {
                status: 503,
                body: "down".into(),
            }),
        );

        assert!(report.aborted);
        assert_eq!(store.list_all(), before);
    }

    #[test]
    fn test_not_registered_keeps_token_registered_mid_flight() {
        let (store, batch) = setup(&[("d1", "t1")]);
        store.register("d1", "t2");

        let report = Reconciler::new(store.clone()).reconcile(
            &batch,
            multicast(vec![DeliveryOutcome::Failed(ErrorCode::NotRegistered)]),
        );

        assert_eq!(report.unregistered, 0);
        assert_eq!(report.stale, 1);
        assert_eq!(token_of(&store, "d1").as_deref(), Some("t2"));
    }

    #[test]
    fn test_canonical_token_does_not_overwrite_newer_registration() {
        let (store, batch) = setup(&[("d1", "t1")]);
        store.register("d1", "t3");

        let report = Reconciler::new(store.clone())
            .reconcile(&batch, multicast(vec![delivered(Some("t1-canon"))]));

        assert_eq!(report.delivered, 1);
        assert_eq!(report.migrated, 0);
        assert_eq!(report.stale, 1);
        assert_eq!(token_of(&store, "d1").as_deref(), Some("t3"));
    }

    #[test]
    fn test_misaligned_results_abort_batch() {
        let (store, batch) = setup(&[("d1", "t1"), ("d2", "t2")]);

        let report = Reconciler::new(store.clone()).reconcile(
            &batch,
            multicast(vec![DeliveryOutcome::Failed(ErrorCode::NotRegistered)]),
        );

        assert!(report.aborted);
        assert_eq!(token_of(&store, "d1").as_deref(), Some("t1"));
    }
}
