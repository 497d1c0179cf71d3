//! Batch dispatcher: turns "notify every fan of team X" into a bounded set of
//! multicast calls.
//!
//! 1. Takes a snapshot of the registration store
//! 2. Keeps recipients that still hold a token and whose team matches the filter
//! 3. Cuts them into batches no larger than the multicast cap, in snapshot order
//! 4. Schedules each batch on the worker pool, where it is delivered and then
//!    reconciled against the store
//!
//! `broadcast` returns once every batch is scheduled, not when delivery ends.

use std::sync::Arc;

use uuid::Uuid;

use matchday_common::config::MAX_MULTICAST_SIZE;
use matchday_common::types::Recipient;
use matchday_registry::{RegistrationStore, TeamFilter};

use crate::error::DispatchError;
use crate::gateway::PushGateway;
use crate::message::PushMessage;
use crate::pool::WorkerPool;
use crate::reconciler::Reconciler;

/// Retries handed to the gateway client when none are configured.
pub const DEFAULT_SEND_RETRIES: u32 = 5;

/// One recipient inside a batch, with the token captured at partition time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchEntry {
    pub recipient_id: String,
    pub token: String,
}

/// Recipients delivered by a single multicast call.
#[derive(Debug, Clone)]
pub struct Batch {
    pub id: Uuid,
    pub entries: Vec<BatchEntry>,
}

impl Batch {
    pub fn new(entries: Vec<BatchEntry>) -> Self {
        Self {
            id: Uuid::new_v4(),
            entries,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Tokens in entry order; the gateway answers in this same order.
    pub fn tokens(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.token.clone()).collect()
    }
}

/// Lazily cuts a recipient snapshot into batches.
pub struct Batches<'a, I> {
    recipients: I,
    filter: &'a TeamFilter,
    batch_size: usize,
}

impl<'a, I> Iterator for Batches<'a, I>
where
    I: Iterator<Item = &'a Recipient>,
{
    type Item = Batch;

    fn next(&mut self) -> Option<Batch> {
        let mut entries = Vec::new();

        for recipient in self.recipients.by_ref() {
            if !self.filter.selects(recipient) {
                continue;
            }
            let Some(token) = recipient.token.clone() else {
                continue;
            };
            entries.push(BatchEntry {
                recipient_id: recipient.id.clone(),
                token,
            });
            if entries.len() == self.batch_size {
                break;
            }
        }

        if entries.is_empty() {
            None
        } else {
            Some(Batch::new(entries))
        }
    }
}

/// Split `recipients` into batches of at most `batch_size` selected recipients.
pub fn partition<'a>(
    recipients: &'a [Recipient],
    filter: &'a TeamFilter,
    batch_size: usize,
) -> Batches<'a, std::slice::Iter<'a, Recipient>> {
    Batches {
        recipients: recipients.iter(),
        filter,
        batch_size: batch_size.clamp(1, MAX_MULTICAST_SIZE),
    }
}

/// What a broadcast scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastSummary {
    /// Batches handed to the worker pool.
    pub batches: usize,
    /// Recipients in the snapshot.
    pub considered: usize,
    /// Recipients placed into a batch.
    pub matched: usize,
    /// Whether the store had any recipient at all.
    pub found: bool,
}

impl BroadcastSummary {
    fn nobody() -> Self {
        Self {
            batches: 0,
            considered: 0,
            matched: 0,
            found: false,
        }
    }
}

impl std::fmt::Display for BroadcastSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if !self.found {
            return write!(f, "Message ignored as there is no device registered!");
        }
        write!(
            f,
            "Asynchronously sending {} multicast messages to {} of {} devices",
            self.batches, self.matched, self.considered
        )
    }
}

pub struct BatchDispatcher {
    store: Arc<RegistrationStore>,
    gateway: Arc<dyn PushGateway>,
    pool: Arc<WorkerPool>,
    batch_size: usize,
    retries: u32,
}

impl BatchDispatcher {
    pub fn new(
        store: Arc<RegistrationStore>,
        gateway: Arc<dyn PushGateway>,
        pool: Arc<WorkerPool>,
    ) -> Self {
        Self {
            store,
            gateway,
            pool,
            batch_size: MAX_MULTICAST_SIZE,
            retries: DEFAULT_SEND_RETRIES,
        }
    }

    /// Set the batch cap. Clamped to `1..=MAX_MULTICAST_SIZE`.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.clamp(1, MAX_MULTICAST_SIZE);
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Schedule delivery of `message` to every matching recipient.
    ///
    /// If the pool refuses a batch, batches scheduled before it still run and
    /// the error is returned.
    pub async fn broadcast(
        &self,
        filter: &TeamFilter,
        message: PushMessage,
    ) -> Result<BroadcastSummary, DispatchError> {
        let snapshot = self.store.list_all();
        if snapshot.is_empty() {
            tracing::info!("Broadcast ignored, no device registered");
            return Ok(BroadcastSummary::nobody());
        }

        let message = Arc::new(message);
        let mut summary = BroadcastSummary {
            batches: 0,
            considered: snapshot.len(),
            matched: 0,
            found: true,
        };

        for batch in partition(&snapshot, filter, self.batch_size) {
            let batch_id = batch.id;
            let batch_size = batch.len();

            self.pool
                .submit(deliver(
                    self.gateway.clone(),
                    Reconciler::new(self.store.clone()),
                    batch,
                    message.clone(),
                    self.retries,
                ))
                .await?;

            summary.batches += 1;
            summary.matched += batch_size;
            tracing::debug!(batch_id = %batch_id, batch_size, "Batch scheduled");
        }

        tracing::info!(
            batches = summary.batches,
            matched = summary.matched,
            considered = summary.considered,
            teams = ?filter.teams(),
            "Broadcast scheduled"
        );

        Ok(summary)
    }
}

/// Deliver one batch and reconcile the outcome. Runs on a pool worker.
async fn deliver(
    gateway: Arc<dyn PushGateway>,
    reconciler: Reconciler,
    batch: Batch,
    message: Arc<PushMessage>,
    retries: u32,
) {
    let tokens = batch.tokens();
    let result = gateway.send_multicast(&message, &tokens, retries).await;
    let report = reconciler.reconcile(&batch, result);

    tracing::info!(
        batch_id = %batch.id,
        batch_size = batch.len(),
        delivered = report.delivered,
        migrated = report.migrated,
        unregistered = report.unregistered,
        failed = report.failed,
        stale = report.stale,
        aborted = report.aborted,
        "Batch reconciled"
    );
}
