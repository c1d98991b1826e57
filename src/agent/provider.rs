//! Pluggable LLM provider traits.
//!
//! Implementations translate provider-agnostic [`ChatRequest`]/[`ChatResponse`]
//! into a concrete wire format. Structured output is a separate, narrower
//! capability: only backends that can honour a JSON schema implement
//! [`StructuredLlmProvider`], and they expose it through
//! [`LlmProvider::structured`].

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::message::{ChatRequest, ChatResponse, OutputSchema};
use crate::error::AgentError;

/// Trait for LLM provider backends.
///
/// Implementations handle the transport layer (HTTP, retries, cancellation)
/// for a specific provider while presenting a uniform interface to agents.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name (e.g., `"openai"`).
    fn name(&self) -> &'static str;

    /// Executes a free-text chat completion request.
    ///
    /// Must return [`AgentError::Cancelled`] promptly once `cancel` fires.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] on transport, protocol, or parse failures.
    async fn chat(
        &self,
        request: &ChatRequest,
        cancel: &CancellationToken,
    ) -> Result<ChatResponse, AgentError>;

    /// Returns the structured-output capability, if this backend has it.
    fn structured(&self) -> Option<&dyn StructuredLlmProvider> {
        None
    }
}

/// Backends able to constrain their output to a JSON schema.
#[async_trait]
pub trait StructuredLlmProvider: Send + Sync {
    /// Executes a request whose output must conform to `format`.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] on transport, protocol, or parse failures.
    async fn respond(
        &self,
        request: &ChatRequest,
        format: &OutputSchema,
        cancel: &CancellationToken,
    ) -> Result<ChatResponse, AgentError>;
}
