//! Push gateway abstraction and per-recipient delivery outcomes.

pub mod fcm;

use async_trait::async_trait;

use crate::error::GatewayError;
use crate::message::PushMessage;

pub use fcm::FcmSender;

/// Error names reported by the gateway for a single recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCode {
    MissingRegistration,
    InvalidRegistration,
    /// The app was uninstalled or the token revoked.
    NotRegistered,
    InvalidTtl,
    MismatchSenderId,
    MessageTooBig,
    InvalidDataKey,
    /// Gateway was busy; the client may retry this recipient.
    Unavailable,
    InternalServerError,
    DeviceMessageRateExceeded,
    TopicsMessageRateExceeded,
    Other(String),
}

impl ErrorCode {
    /// Errors the client retries on its own.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorCode::Unavailable)
    }

    pub fn as_str(&self) -> &str {
        match self {
            ErrorCode::MissingRegistration => "MissingRegistration",
            ErrorCode::InvalidRegistration => "InvalidRegistration",
            ErrorCode::NotRegistered => "NotRegistered",
            ErrorCode::InvalidTtl => "InvalidTtl",
            ErrorCode::MismatchSenderId => "MismatchSenderId",
            ErrorCode::MessageTooBig => "MessageTooBig",
            ErrorCode::InvalidDataKey => "InvalidDataKey",
            ErrorCode::Unavailable => "Unavailable",
            ErrorCode::InternalServerError => "InternalServerError",
            ErrorCode::DeviceMessageRateExceeded => "DeviceMessageRateExceeded",
            ErrorCode::TopicsMessageRateExceeded => "TopicsMessageRateExceeded",
            ErrorCode::Other(name) => name,
        }
    }
}

impl From<&str> for ErrorCode {
    fn from(name: &str) -> Self {
        match name {
            "MissingRegistration" => ErrorCode::MissingRegistration,
            "InvalidRegistration" => ErrorCode::InvalidRegistration,
            "NotRegistered" => ErrorCode::NotRegistered,
            "InvalidTtl" => ErrorCode::InvalidTtl,
            "MismatchSenderId" => ErrorCode::MismatchSenderId,
            "MessageTooBig" => ErrorCode::MessageTooBig,
            "InvalidDataKey" => ErrorCode::InvalidDataKey,
            "Unavailable" => ErrorCode::Unavailable,
            "InternalServerError" => ErrorCode::InternalServerError,
            "DeviceMessageRateExceeded" => ErrorCode::DeviceMessageRateExceeded,
            "TopicsMessageRateExceeded" => ErrorCode::TopicsMessageRateExceeded,
            other => ErrorCode::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of delivering to one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered {
        message_id: String,
        /// Set when the gateway knows the device under a newer token.
        canonical_token: Option<String>,
    },
    Failed(ErrorCode),
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered { .. })
    }
}

/// Outcome of one multicast call.
///
/// `results[i]` belongs to the i-th token passed to `send_multicast`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MulticastResult {
    pub multicast_id: u64,
    /// Ids of any retry requests made after the first one.
    pub retry_multicast_ids: Vec<u64>,
    pub results: Vec<DeliveryOutcome>,
}

impl MulticastResult {
    pub fn success(&self) -> usize {
        self.results.iter().filter(|r| r.is_delivered()).count()
    }

    pub fn failure(&self) -> usize {
        self.results.len() - self.success()
    }

    pub fn canonical_ids(&self) -> usize {
        self.results
            .iter()
            .filter(|r| {
                matches!(
                    r,
                    DeliveryOutcome::Delivered {
                        canonical_token: Some(_),
                        ..
                    }
                )
            })
            .count()
    }
}

/// Client of the push delivery service.
#[async_trait]
pub trait PushGateway: Send + Sync {
    /// Deliver `message` to every token. The client retries transient failures
    /// up to `retries` times before reporting.
    async fn send_multicast(
        &self,
        message: &PushMessage,
        tokens: &[String],
        retries: u32,
    ) -> Result<MulticastResult, GatewayError>;

    /// Deliver `message` to a single token.
    async fn send(
        &self,
        message: &PushMessage,
        token: &str,
        retries: u32,
    ) -> Result<DeliveryOutcome, GatewayError> {
        let result = self
            .send_multicast(message, &[token.to_string()], retries)
            .await?;
        result
            .results
            .into_iter()
            .next()
            .ok_or_else(|| GatewayError::MalformedResponse("empty result list".to_string()))
    }
}
