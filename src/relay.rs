//! Client for the external workflow-automation webhook.
//!
//! Messages are relayed as a normalized JSON payload; the platform answers
//! either `{"response": "..."}` or raw text, which is treated as the
//! response body. Timeouts, connect failures and 5xx answers are retried
//! with bounded exponential backoff; 4xx answers are not.

use crate::models::messages::Attachment;
use backoff::ExponentialBackoff;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_RETRY_ELAPSED: Duration = Duration::from_secs(20);

pub const SENDER_TYPE_USER: &str = "User";

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Automation webhook error: {status} - {body}")]
    Upstream { status: u16, body: String },
}

/// Normalized payload forwarded for each relayed user message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayPayload {
    pub user_name: String,
    pub sender_type: String,
    pub message: String,
    pub agent_name: String,
    pub conversation_id: Uuid,
    pub attachments: Vec<Attachment>,
    pub attachments_type: String,
    pub timestamp: String,
}

#[derive(Clone)]
pub struct AutomationClient {
    client: reqwest::Client,
    webhook_url: String,
}

impl AutomationClient {
    pub fn new(webhook_url: String) -> Result<Self, RelayError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(RelayError::Request)?;

        Ok(Self {
            client,
            webhook_url,
        })
    }

    /// Relays the payload, returning the assistant response text if the
    /// platform produced one. A 2xx with an empty or response-less body is
    /// not an error; it simply yields `None`.
    pub async fn relay(&self, payload: &RelayPayload) -> Result<Option<String>, RelayError> {
        let backoff = ExponentialBackoff {
            max_elapsed_time: Some(MAX_RETRY_ELAPSED),
            ..ExponentialBackoff::default()
        };

        let body = backoff::future::retry(backoff, || async {
            self.post_once(payload).await.map_err(|err| {
                if is_retryable(&err) {
                    warn!("Retrying automation webhook call: {err}");
                    backoff::Error::transient(err)
                } else {
                    backoff::Error::permanent(err)
                }
            })
        })
        .await?;

        debug!(bytes = body.len(), "Automation webhook answered");
        Ok(parse_relay_body(&body))
    }

    async fn post_once(&self, payload: &RelayPayload) -> Result<String, RelayError> {
        let response = self
            .client
            .post(&self.webhook_url)
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RelayError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.text().await?)
    }
}

impl std::fmt::Debug for AutomationClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutomationClient")
            .field("webhook_url", &self.webhook_url)
            .finish()
    }
}

fn is_retryable(err: &RelayError) -> bool {
    match err {
        RelayError::Request(e) => e.is_timeout() || e.is_connect(),
        RelayError::Upstream { status, .. } => *status >= 500,
    }
}

/// Extracts the assistant response from a 2xx body: a JSON object yields
/// its non-empty `response` field, anything unparsable is taken verbatim,
/// and an empty body means no response this round.
pub fn parse_relay_body(body: &str) -> Option<String> {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(value) => value
            .get("response")
            .and_then(|r| r.as_str())
            .filter(|r| !r.is_empty())
            .map(str::to_string),
        Err(_) => {
            if body.is_empty() {
                None
            } else {
                Some(body.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_body_yields_response_field() {
        assert_eq!(
            parse_relay_body(r#"{"response":"hello"}"#),
            Some("hello".to_string())
        );
    }

    #[test]
    fn json_without_response_yields_none() {
        assert_eq!(parse_relay_body(r#"{"status":"queued"}"#), None);
        assert_eq!(parse_relay_body(r#"{"response":""}"#), None);
        assert_eq!(parse_relay_body(r#"{"response":null}"#), None);
    }

    #[test]
    fn raw_text_is_taken_verbatim() {
        assert_eq!(
            parse_relay_body("Como posso ajudar?"),
            Some("Como posso ajudar?".to_string())
        );
    }

    #[test]
    fn empty_body_yields_none() {
        assert_eq!(parse_relay_body(""), None);
    }

    #[test]
    fn retryability_follows_status_class() {
        assert!(is_retryable(&RelayError::Upstream {
            status: 503,
            body: String::new()
        }));
        assert!(!is_retryable(&RelayError::Upstream {
            status: 422,
            body: String::new()
        }));
    }

    #[test]
    fn payload_serializes_wire_field_names() {
        let payload = RelayPayload {
            user_name: "Ana".to_string(),
            sender_type: SENDER_TYPE_USER.to_string(),
            message: "Olá".to_string(),
            agent_name: "Advogado".to_string(),
            conversation_id: Uuid::new_v4(),
            attachments: vec![],
            attachments_type: String::new(),
            timestamp: "2026-01-01T00:00:00Z".to_string(),
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["sender_type"], "User");
        assert_eq!(value["user_name"], "Ana");
        assert!(value["attachments"].as_array().unwrap().is_empty());
        assert_eq!(value["attachments_type"], "");
    }
}
