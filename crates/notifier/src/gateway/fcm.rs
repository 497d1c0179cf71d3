//! HTTP client for the legacy FCM (GCM) multicast endpoint.
//!
//! Each attempt posts the tokens that are still pending. A token answered with
//! `Unavailable` stays pending for the next attempt; transport errors and 5xx
//! responses repeat the attempt. Attempts are spaced with exponential backoff.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use matchday_common::config::MAX_MULTICAST_SIZE;

use super::{DeliveryOutcome, ErrorCode, MulticastResult, PushGateway};
use crate::error::GatewayError;
use crate::message::PushMessage;

/// First retry delay.
const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_secs(1);

/// Upper bound on the delay between two attempts.
const MAX_BACKOFF: Duration = Duration::from_secs(1024);

#[derive(Serialize)]
struct MulticastRequest<'a> {
    registration_ids: Vec<&'a str>,
    #[serde(flatten)]
    message: &'a PushMessage,
}

#[derive(Debug, Deserialize)]
struct MulticastResponse {
    multicast_id: u64,
    results: Vec<WireResult>,
}

#[derive(Debug, Deserialize)]
struct WireResult {
    message_id: Option<String>,
    registration_id: Option<String>,
    error: Option<String>,
}

impl WireResult {
    fn into_outcome(self) -> Result<DeliveryOutcome, GatewayError> {
        match (self.message_id, self.error) {
            (Some(message_id), _) => Ok(DeliveryOutcome::Delivered {
                message_id,
                canonical_token: self.registration_id,
            }),
            (None, Some(error)) => Ok(DeliveryOutcome::Failed(ErrorCode::from(error.as_str()))),
            (None, None) => Err(GatewayError::MalformedResponse(
                "result has neither message_id nor error".to_string(),
            )),
        }
    }
}

impl MulticastResponse {
    /// Per-token outcomes, checked against the number of tokens posted.
    fn into_outcomes(self, expected: usize) -> Result<(u64, Vec<DeliveryOutcome>), GatewayError> {
        if self.results.len() != expected {
            return Err(GatewayError::MalformedResponse(format!(
                "expected {} results, got {}",
                expected,
                self.results.len()
            )));
        }
        let outcomes = self
            .results
            .into_iter()
            .map(WireResult::into_outcome)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((self.multicast_id, outcomes))
    }
}

/// Push gateway client talking to the FCM legacy HTTP API.
pub struct FcmSender {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    initial_backoff: Duration,
}

impl FcmSender {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            initial_backoff: DEFAULT_INITIAL_BACKOFF,
        })
    }

    /// Override the first retry delay (it doubles on every further retry).
    pub fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    /// Single POST to the gateway.
    async fn post(
        &self,
        message: &PushMessage,
        tokens: Vec<&str>,
    ) -> Result<MulticastResponse, GatewayError> {
        let request = MulticastRequest {
            registration_ids: tokens,
            message,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::AUTHORIZATION, format!("key={}", self.api_key))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(GatewayError::Unauthorized(status.as_u16()));
        }
        let body = response.text().await?;
        if !status.is_success() {
            return Err(GatewayError::Http {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| GatewayError::MalformedResponse(e.to_string()))
    }
}

#[async_trait]
impl PushGateway for FcmSender {
    async fn send_multicast(
        &self,
        message: &PushMessage,
        tokens: &[String],
        retries: u32,
    ) -> Result<MulticastResult, GatewayError> {
        if tokens.is_empty() {
            return Err(GatewayError::NoRecipients);
        }
        if tokens.len() > MAX_MULTICAST_SIZE {
            return Err(GatewayError::TooManyRecipients {
                count: tokens.len(),
                max: MAX_MULTICAST_SIZE,
            });
        }

        let mut outcomes: Vec<Option<DeliveryOutcome>> = vec![None; tokens.len()];
        let mut pending: Vec<usize> = (0..tokens.len()).collect();
        let mut multicast_ids: Vec<u64> = Vec::new();
        let mut backoff = self.initial_backoff;
        let mut attempt = 0u32;

        loop {
            let attempt_tokens: Vec<&str> = pending.iter().map(|&i| tokens[i].as_str()).collect();

            let answered = self
                .post(message, attempt_tokens)
                .await
                .and_then(|response| response.into_outcomes(pending.len()));

            match answered {
                Ok((multicast_id, answers)) => {
                    multicast_ids.push(multicast_id);

                    let mut still_pending = Vec::new();
                    for (&pos, outcome) in pending.iter().zip(answers) {
                        if matches!(&outcome, DeliveryOutcome::Failed(code) if code.is_retryable()) {
                            still_pending.push(pos);
                        }
                        outcomes[pos] = Some(outcome);
                    }
                    pending = still_pending;
                }
                Err(e) if e.is_retryable() && attempt < retries => {
                    tracing::warn!(error = %e, attempt, "Multicast attempt failed, will retry");
                }
                // Keep what earlier attempts reported; the pending tokens stay `Unavailable`.
                Err(e) if !multicast_ids.is_empty() => {
                    tracing::warn!(error = %e, attempt, "Retry failed, keeping earlier outcomes");
                    break;
                }
                Err(e) => return Err(e),
            }

            if pending.is_empty() || attempt >= retries {
                break;
            }

            tracing::debug!(
                pending = pending.len(),
                backoff_ms = backoff.as_millis() as u64,
                "Retrying multicast"
            );
            tokio::time::sleep(backoff).await;
            backoff = (backoff * 2).min(MAX_BACKOFF);
            attempt += 1;
        }

        let results: Vec<DeliveryOutcome> = outcomes
            .into_iter()
            .map(|o| o.unwrap_or(DeliveryOutcome::Failed(ErrorCode::Unavailable)))
            .collect();
        let mut ids = multicast_ids.into_iter();
        let multicast_id = ids.next().unwrap_or_default();

        Ok(MulticastResult {
            multicast_id,
            retry_multicast_ids: ids.collect(),
            results,
        })
    }
}
