use std::net::SocketAddr;

use serde::Deserialize;

use crate::types::PoolSaturation;

/// Hard ceiling on recipients per multicast request imposed by the push gateway.
pub const MAX_MULTICAST_SIZE: usize = 1000;

/// Global application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Address the HTTP server binds to
    pub bind_addr: SocketAddr,

    /// Push gateway server API key
    pub gateway_api_key: String,

    /// Push gateway HTTP endpoint
    pub gateway_endpoint: String,

    /// Per-request timeout for gateway calls in seconds (default: 30)
    pub gateway_timeout_secs: u64,

    /// Recipients per multicast batch (default: 1000, max: 1000)
    pub multicast_size: usize,

    /// Number of concurrent delivery workers (default: 5)
    pub worker_pool_size: usize,

    /// Pending batches the worker pool queues before saturating (default: 64)
    pub worker_queue_capacity: usize,

    /// Behaviour when the worker queue is full (default: block)
    pub pool_saturation: PoolSaturation,

    /// Retries handed to the gateway client per multicast (default: 5)
    pub send_retries: u32,

    /// Team name fragments that select broadcast recipients
    pub broadcast_teams: Vec<String>,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let multicast_size: usize = var_or("MULTICAST_SIZE", "1000")
            .parse()
            .map_err(|_| anyhow::anyhow!("MULTICAST_SIZE must be a valid usize"))?;
        if multicast_size == 0 || multicast_size > MAX_MULTICAST_SIZE {
            anyhow::bail!(
                "MULTICAST_SIZE must be between 1 and {}, got {}",
                MAX_MULTICAST_SIZE,
                multicast_size
            );
        }

        let worker_pool_size: usize = var_or("WORKER_POOL_SIZE", "5")
            .parse()
            .map_err(|_| anyhow::anyhow!("WORKER_POOL_SIZE must be a valid usize"))?;
        if worker_pool_size == 0 {
            anyhow::bail!("WORKER_POOL_SIZE must be at least 1");
        }

        let worker_queue_capacity: usize = var_or("WORKER_QUEUE_CAPACITY", "64")
            .parse()
            .map_err(|_| anyhow::anyhow!("WORKER_QUEUE_CAPACITY must be a valid usize"))?;
        if worker_queue_capacity == 0 {
            anyhow::bail!("WORKER_QUEUE_CAPACITY must be at least 1");
        }

        let broadcast_teams: Vec<String> = var_or("BROADCAST_TEAMS", "manchester united,arsenal")
            .split(',')
            .map(|team| team.trim().to_lowercase())
            .filter(|team| !team.is_empty())
            .collect();
        if broadcast_teams.is_empty() {
            anyhow::bail!("BROADCAST_TEAMS must name at least one team");
        }

        Ok(Self {
            bind_addr: var_or("BIND_ADDR", "0.0.0.0:8080")
                .parse()
                .map_err(|_| anyhow::anyhow!("BIND_ADDR must be a valid socket address"))?,
            gateway_api_key: lookup("FCM_API_KEY")
                .ok_or_else(|| anyhow::anyhow!("FCM_API_KEY environment variable is required"))?,
            gateway_endpoint: var_or("FCM_ENDPOINT", "https://fcm.googleapis.com/fcm/send"),
            gateway_timeout_secs: var_or("GATEWAY_TIMEOUT_SECS", "30")
                .parse()
                .map_err(|_| anyhow::anyhow!("GATEWAY_TIMEOUT_SECS must be a valid u64"))?,
            multicast_size,
            worker_pool_size,
            worker_queue_capacity,
            pool_saturation: var_or("POOL_SATURATION", "block")
                .parse()
                .map_err(|e: String| anyhow::anyhow!("POOL_SATURATION: {}", e))?,
            send_retries: var_or("SEND_RETRIES", "5")
                .parse()
                .map_err(|_| anyhow::anyhow!("SEND_RETRIES must be a valid u32"))?,
            broadcast_teams,
        })
    }
}
