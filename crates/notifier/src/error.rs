use thiserror::Error;

use matchday_common::error::AppError;

/// Failure of a whole push gateway call.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Gateway rejected the API key (HTTP {0})")]
    Unauthorized(u16),

    #[error("Gateway returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Malformed gateway response: {0}")]
    MalformedResponse(String),

    #[error("Too many recipients for one multicast: {count} (max {max})")]
    TooManyRecipients { count: usize, max: usize },

    #[error("Multicast requires at least one recipient")]
    NoRecipients,
}

impl GatewayError {
    /// Whether the call may succeed if attempted again.
    pub fn is_retryable(&self) -> bool {
        match self {
            GatewayError::Transport(_) => true,
            GatewayError::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Failure to schedule a batch on the worker pool.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("Worker pool queue is full")]
    PoolSaturated,

    #[error("Worker pool has been shut down")]
    PoolClosed,
}

impl From<DispatchError> for AppError {
    fn from(e: DispatchError) -> Self {
        AppError::Unavailable(e.to_string())
    }
}
