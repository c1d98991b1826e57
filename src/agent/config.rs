//! Agent configuration with builder pattern and environment variable support.
//!
//! Configuration is resolved in order: explicit values → environment variables → defaults.

use std::path::PathBuf;
use std::time::Duration;

use super::transport::{DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY, RetryPolicy};
use crate::error::AgentError;

/// Default OpenAI-compatible API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
/// Default model for every role.
const DEFAULT_MODEL: &str = "gpt-4o-mini";
/// Default maximum concurrent expert calls per review.
const DEFAULT_MAX_CONCURRENCY: usize = 16;
/// Default per-attempt request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Configuration for the agent system.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// LLM provider name (e.g., "openai").
    pub provider: String,
    /// API key for the provider.
    pub api_key: String,
    /// API base URL (for proxies or compatible APIs).
    pub base_url: String,
    /// Model used by worker, experts, and oracle.
    pub model: String,
    /// Optional cap on generated tokens per call.
    pub max_tokens: Option<u32>,
    /// Maximum expert calls in flight during one review.
    pub max_concurrency: usize,
    /// Per-attempt request timeout.
    pub timeout: Duration,
    /// Maximum delivery attempts per request.
    pub max_retries: u32,
    /// Pause between delivery attempts.
    pub retry_delay: Duration,
    /// Whether the backend accepts schema-constrained (`/responses`) requests.
    pub structured_output: bool,
    /// Directory containing prompt template files.
    ///
    /// When set, role templates are loaded from markdown files in this
    /// directory, falling back to compiled-in defaults for missing files.
    pub prompt_dir: Option<PathBuf>,
}

impl AgentConfig {
    /// Creates a new builder for `AgentConfig`.
    #[must_use]
    pub fn builder() -> AgentConfigBuilder {
        AgentConfigBuilder::default()
    }

    /// Creates configuration from environment variables with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ApiKeyMissing`] if no API key is found.
    pub fn from_env() -> Result<Self, AgentError> {
        Self::builder().from_env().build()
    }

    /// Retry policy derived from `max_retries` and `retry_delay`.
    #[must_use]
    pub const fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_retries,
            delay: self.retry_delay,
        }
    }
}

/// Builder for [`AgentConfig`].
#[derive(Debug, Clone, Default)]
pub struct AgentConfigBuilder {
    provider: Option<String>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    max_tokens: Option<u32>,
    max_concurrency: Option<usize>,
    timeout: Option<Duration>,
    max_retries: Option<u32>,
    retry_delay: Option<Duration>,
    structured_output: Option<bool>,
    prompt_dir: Option<PathBuf>,
}

impl AgentConfigBuilder {
    /// Populates unset fields from environment variables.
    #[must_use]
    pub fn from_env(mut self) -> Self {
        if self.provider.is_none() {
            self.provider = std::env::var("FEEDBACK_PROVIDER").ok();
        }
        if self.api_key.is_none() {
            self.api_key = std::env::var("OPENAI_API_KEY")
                .or_else(|_| std::env::var("FEEDBACK_API_KEY"))
                .ok();
        }
        if self.base_url.is_none() {
            self.base_url = std::env::var("OPENAI_BASE_URL")
                .or_else(|_| std::env::var("FEEDBACK_BASE_URL"))
                .ok();
        }
        if self.model.is_none() {
            self.model = std::env::var("FEEDBACK_MODEL").ok();
        }
        if self.max_concurrency.is_none() {
            self.max_concurrency = std::env::var("FEEDBACK_MAX_CONCURRENCY")
                .ok()
                .and_then(|v| v.parse().ok());
        }
        if self.prompt_dir.is_none() {
            self.prompt_dir = std::env::var("FEEDBACK_PROMPT_DIR").ok().map(PathBuf::from);
        }
        self
    }

    /// Sets the LLM provider name.
    #[must_use]
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Sets the API key.
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the base URL override.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the model.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the per-call output token cap.
    #[must_use]
    pub const fn max_tokens(mut self, n: u32) -> Self {
        self.max_tokens = Some(n);
        self
    }

    /// Sets the maximum concurrency.
    #[must_use]
    pub const fn max_concurrency(mut self, n: usize) -> Self {
        self.max_concurrency = Some(n);
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Sets the max delivery attempts.
    #[must_use]
    pub const fn max_retries(mut self, n: u32) -> Self {
        self.max_retries = Some(n);
        self
    }

    /// Sets the pause between delivery attempts.
    #[must_use]
    pub const fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = Some(delay);
        self
    }

    /// Enables or disables the structured-output capability.
    #[must_use]
    pub const fn structured_output(mut self, enabled: bool) -> Self {
        self.structured_output = Some(enabled);
        self
    }

    /// Sets the prompt template directory.
    #[must_use]
    pub fn prompt_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.prompt_dir = Some(dir.into());
        self
    }

    /// Builds the [`AgentConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ApiKeyMissing`] if no API key was set.
    pub fn build(self) -> Result<AgentConfig, AgentError> {
        let api_key = self.api_key.ok_or(AgentError::ApiKeyMissing)?;

        let base_url = self
            .base_url
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(AgentConfig {
            provider: self.provider.unwrap_or_else(|| "openai".to_string()),
            api_key,
            base_url,
            model: self.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            max_tokens: self.max_tokens,
            max_concurrency: self.max_concurrency.unwrap_or(DEFAULT_MAX_CONCURRENCY).max(1),
            timeout: self
                .timeout
                .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            max_retries: self.max_retries.unwrap_or(DEFAULT_MAX_ATTEMPTS),
            retry_delay: self.retry_delay.unwrap_or(DEFAULT_RETRY_DELAY),
            structured_output: self.structured_output.unwrap_or(true),
            prompt_dir: self.prompt_dir,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let config = AgentConfig::builder()
            .api_key("test-key")
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(config.provider, "openai");
        assert_eq!(config.api_key, "test-key");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.max_concurrency, DEFAULT_MAX_CONCURRENCY);
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.retry_policy(), RetryPolicy::default());
        assert!(config.structured_output);
        assert!(config.max_tokens.is_none());
    }

    #[test]
    fn test_builder_missing_api_key() {
        let result = AgentConfig::builder().build();
        assert!(matches!(result, Err(AgentError::ApiKeyMissing)));
    }

    #[test]
    fn test_builder_custom_values() {
        let config = AgentConfig::builder()
            .api_key("key")
            .provider("custom")
            .model("gpt-4.1")
            .base_url("http://localhost:8080/v1/")
            .max_concurrency(4)
            .max_tokens(512)
            .max_retries(5)
            .retry_delay(Duration::from_millis(250))
            .structured_output(false)
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(config.provider, "custom");
        assert_eq!(config.model, "gpt-4.1");
        assert_eq!(config.base_url, "http://localhost:8080/v1");
        assert_eq!(config.max_concurrency, 4);
        assert_eq!(config.max_tokens, Some(512));
        assert_eq!(config.retry_policy().max_attempts, 5);
        assert_eq!(config.retry_policy().delay, Duration::from_millis(250));
        assert!(!config.structured_output);
    }

    #[test]
    fn test_blank_base_url_falls_back_to_default() {
        let config = AgentConfig::builder()
            .api_key("key")
            .base_url("  ")
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_zero_concurrency_is_clamped() {
        let config = AgentConfig::builder()
            .api_key("key")
            .max_concurrency(0)
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(config.max_concurrency, 1);
    }
}
