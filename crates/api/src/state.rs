//! Shared application state for the Axum API server.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;

use matchday_common::config::AppConfig;
use matchday_notifier::gateway::FcmSender;
use matchday_notifier::{BatchDispatcher, GatewayError, PushGateway, WorkerPool};
use matchday_registry::{RegistrationStore, TeamFilter};

/// Application state shared across all route handlers via Axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RegistrationStore>,
    pub dispatcher: Arc<BatchDispatcher>,
    pub pool: Arc<WorkerPool>,
    pub broadcast_filter: Arc<TeamFilter>,
    /// Status line of the most recent broadcast, shown on the home view.
    pub last_status: Arc<RwLock<Option<String>>>,
    pub config: AppConfig,
}

impl AppState {
    /// Wire the store, worker pool and dispatcher around `gateway`.
    ///
    /// Spawns the pool workers, so it must run inside a tokio runtime.
    pub fn new(config: AppConfig, gateway: Arc<dyn PushGateway>) -> Self {
        let store = Arc::new(RegistrationStore::new());
        let pool = Arc::new(WorkerPool::new(
            config.worker_pool_size,
            config.worker_queue_capacity,
            config.pool_saturation,
        ));
        let dispatcher = BatchDispatcher::new(store.clone(), gateway, pool.clone())
            .with_batch_size(config.multicast_size)
            .with_retries(config.send_retries);

        Self {
            store,
            dispatcher: Arc::new(dispatcher),
            pool,
            broadcast_filter: Arc::new(TeamFilter::any_of(&config.broadcast_teams)),
            last_status: Arc::new(RwLock::new(None)),
            config,
        }
    }

    /// State backed by the FCM HTTP client described by `config`.
    pub fn with_fcm(config: AppConfig) -> Result<Self, GatewayError> {
        let sender = FcmSender::new(
            config.gateway_endpoint.clone(),
            config.gateway_api_key.clone(),
            Duration::from_secs(config.gateway_timeout_secs),
        )?;
        Ok(Self::new(config, Arc::new(sender)))
    }
}
