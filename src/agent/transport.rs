//! Retrying HTTP delivery.
//!
//! Posts a JSON body to the backend with a bounded number of attempts.
//! Only connection-level failures are retried; any response with a
//! non-success status ends delivery immediately.

use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::error::AgentError;

/// Default number of delivery attempts.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
/// Default pause between delivery attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Retry ceiling and fixed inter-attempt delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Values below 1 act as 1.
    pub max_attempts: u32,
    /// Pause between consecutive attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

/// Raw HTTP reply: status code and body text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    /// HTTP status code.
    pub status: u16,
    /// Response body.
    pub body: String,
}

impl HttpReply {
    /// Returns `true` for 2xx status codes.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// A single HTTP POST of a JSON body with bearer authentication.
///
/// Implementations report connection and IO failures as
/// [`AgentError::Transport`]; they never inspect the status code.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Performs one POST attempt.
    async fn post_json(
        &self,
        url: &str,
        api_key: &str,
        body: &serde_json::Value,
    ) -> Result<HttpReply, AgentError>;
}

/// [`HttpClient`] backed by a pooled `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    /// Creates a client with the given per-attempt timeout.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::HttpClient`] if the TLS backend fails to initialise.
    pub fn new(timeout: Duration) -> Result<Self, AgentError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AgentError::HttpClient {
                message: e.to_string(),
            })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn post_json(
        &self,
        url: &str,
        api_key: &str,
        body: &serde_json::Value,
    ) -> Result<HttpReply, AgentError> {
        let response = self
            .client
            .post(url)
            .bearer_auth(api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| AgentError::Transport {
                message: e.to_string(),
            })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| e.to_string());
        reply_from_parts(status, body)
    }
}

/// Assembles a reply from a received status and the outcome of reading the body.
///
/// A rejection stays a rejection even when its body cannot be read, so
/// [`deliver`] never retries it.
fn reply_from_parts(status: u16, body: Result<String, String>) -> Result<HttpReply, AgentError> {
    let reply = HttpReply {
        status,
        body: String::new(),
    };
    match body {
        Ok(body) => Ok(HttpReply { body, ..reply }),
        Err(e) if !reply.is_success() => Ok(HttpReply {
            body: format!("<unreadable body: {e}>"),
            ..reply
        }),
        Err(e) => Err(AgentError::Transport {
            message: format!("error reading response body: {e}"),
        }),
    }
}

/// Delivers `body` to `url`, retrying transport failures per `policy`.
///
/// Returns the first successful reply. A non-success status becomes
/// [`AgentError::Protocol`] without further attempts. Cancellation is
/// observed both while a request is in flight and while waiting between
/// attempts.
///
/// # Errors
///
/// Returns [`AgentError::Transport`] once every attempt has failed,
/// [`AgentError::Protocol`] on rejection, or [`AgentError::Cancelled`].
pub async fn deliver(
    client: &dyn HttpClient,
    url: &str,
    api_key: &str,
    body: &serde_json::Value,
    policy: RetryPolicy,
    cancel: &CancellationToken,
) -> Result<HttpReply, AgentError> {
    let max_attempts = policy.max_attempts.max(1);
    let mut last_failure = String::new();

    for attempt in 1..=max_attempts {
        let outcome = tokio::select! {
            () = cancel.cancelled() => return Err(AgentError::Cancelled),
            outcome = client.post_json(url, api_key, body) => outcome,
        };

        match outcome {
            Ok(reply) if reply.is_success() => return Ok(reply),
            Ok(reply) => {
                return Err(AgentError::Protocol {
                    status: reply.status,
                    body: reply.body,
                });
            }
            Err(e) if e.is_retryable() => {
                warn!(attempt, max_attempts, error = %e, "request failed, retrying");
                last_failure = match e {
                    AgentError::Transport { message } => message,
                    other => other.to_string(),
                };
            }
            Err(other) => return Err(other),
        }

        if attempt < max_attempts && !policy.delay.is_zero() {
            tokio::select! {
                () = cancel.cancelled() => return Err(AgentError::Cancelled),
                () = tokio::time::sleep(policy.delay) => {}
            }
        }
    }

    Err(AgentError::Transport {
        message: format!("error sending request after {max_attempts} attempts: {last_failure}"),
    })
}
