//! Push delivery: gateway client, worker pool, batch dispatch and result
//! reconciliation.

pub mod dispatcher;
pub mod error;
pub mod gateway;
pub mod message;
pub mod pool;
pub mod reconciler;

pub use dispatcher::{Batch, BatchDispatcher, BatchEntry, BroadcastSummary};
pub use error::{DispatchError, GatewayError};
pub use gateway::{DeliveryOutcome, ErrorCode, MulticastResult, PushGateway};
pub use message::PushMessage;
pub use pool::WorkerPool;
pub use reconciler::{ReconcileReport, Reconciler};
