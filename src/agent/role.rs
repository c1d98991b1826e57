//! Named conversational roles.
//!
//! An [`Agent`] pairs a fixed identity (name and system instructions) with
//! the provider that answers for it. Worker, experts, and oracle are all
//! plain agents; what differs between them is the prompt they receive.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::message::{ChatRequest, ChatResponse, OutputSchema, system_message, user_message};
use super::provider::LlmProvider;
use crate::error::AgentError;

/// A role-bound agent.
///
/// Built once per block and reused across iterations. Every call sends
/// exactly two messages: the system instructions and the user text.
#[derive(Clone)]
pub struct Agent {
    name: String,
    system_prompt: String,
    provider: Arc<dyn LlmProvider>,
    max_tokens: Option<u32>,
}

impl Agent {
    /// Creates an agent bound to `provider`.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        system_prompt: impl Into<String>,
        provider: Arc<dyn LlmProvider>,
    ) -> Self {
        Self {
            name: name.into(),
            system_prompt: system_prompt.into(),
            provider,
            max_tokens: None,
        }
    }

    /// Caps generated tokens for every call made by this agent.
    #[must_use]
    pub const fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Agent name used in logs, errors, and artifact file names.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// System instructions sent with every call.
    #[must_use]
    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn request(&self, message: &str) -> ChatRequest {
        ChatRequest {
            messages: vec![system_message(&self.system_prompt), user_message(message)],
            max_tokens: self.max_tokens,
        }
    }

    fn wrap(&self, source: AgentError) -> AgentError {
        AgentError::Agent {
            name: self.name.clone(),
            source: Box::new(source),
        }
    }

    /// Sends `message` and returns the free-text reply.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Agent`] wrapping the provider failure.
    pub async fn chat(
        &self,
        message: &str,
        cancel: &CancellationToken,
    ) -> Result<ChatResponse, AgentError> {
        let request = self.request(message);
        let response = self
            .provider
            .chat(&request, cancel)
            .await
            .map_err(|e| self.wrap(e))?;

        debug!(
            agent = %self.name,
            total_tokens = response.usage.total_tokens,
            elapsed_ms = response.elapsed.as_millis(),
            "agent replied"
        );
        Ok(response)
    }

    /// Sends `message` and returns a reply constrained to `format`.
    ///
    /// The capability check happens before anything is sent.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Agent`] wrapping [`AgentError::Capability`] when
    /// the provider cannot produce structured output, or the provider failure.
    pub async fn structured_chat(
        &self,
        message: &str,
        format: &OutputSchema,
        cancel: &CancellationToken,
    ) -> Result<ChatResponse, AgentError> {
        let Some(structured) = self.provider.structured() else {
            return Err(self.wrap(AgentError::Capability {
                provider: self.provider.name().to_string(),
            }));
        };

        let request = self.request(message);
        let response = structured
            .respond(&request, format, cancel)
            .await
            .map_err(|e| self.wrap(e))?;

        debug!(
            agent = %self.name,
            schema = %format.name,
            total_tokens = response.usage.total_tokens,
            elapsed_ms = response.elapsed.as_millis(),
            "agent replied with structured output"
        );
        Ok(response)
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("name", &self.name)
            .field("provider", &self.provider.name())
            .field("max_tokens", &self.max_tokens)
            .finish_non_exhaustive()
    }
}
