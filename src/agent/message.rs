//! Provider-agnostic message types for LLM communication.
//!
//! These types decouple agent logic from the wire format of any
//! particular backend.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Role of a chat message participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions.
    System,
    /// User input.
    User,
}

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender.
    pub role: Role,
    /// Message content.
    pub content: String,
}

/// A chat request (provider-agnostic).
///
/// The model identifier is owned by the provider, not the request.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// Ordered conversation messages.
    pub messages: Vec<ChatMessage>,
    /// Maximum tokens to generate.
    pub max_tokens: Option<u32>,
}

/// A named JSON schema constraining structured output.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSchema {
    /// Schema name sent to the backend.
    pub name: String,
    /// JSON schema document.
    pub schema: serde_json::Value,
}

impl OutputSchema {
    /// Creates a named schema.
    #[must_use]
    pub fn new(name: impl Into<String>, schema: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            schema,
        }
    }
}

/// Token usage statistics from a completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens consumed by the prompt.
    pub input_tokens: u32,
    /// Tokens generated in the completion.
    pub output_tokens: u32,
    /// Total tokens used.
    pub total_tokens: u32,
}

impl TokenUsage {
    /// Adds another usage record to this one, saturating on overflow.
    pub const fn accumulate(&mut self, other: Self) {
        self.input_tokens = self.input_tokens.saturating_add(other.input_tokens);
        self.output_tokens = self.output_tokens.saturating_add(other.output_tokens);
        self.total_tokens = self.total_tokens.saturating_add(other.total_tokens);
    }
}

/// A chat response (provider-agnostic).
#[derive(Debug, Clone)]
pub struct ChatResponse {
    /// Generated text content.
    pub content: String,
    /// Token usage statistics.
    pub usage: TokenUsage,
    /// Wall-clock time from the first delivery attempt to the parsed response.
    pub elapsed: Duration,
}

/// Creates a system message.
#[must_use]
pub fn system_message(content: &str) -> ChatMessage {
    ChatMessage {
        role: Role::System,
        content: content.to_string(),
    }
}

/// Creates a user message.
#[must_use]
pub fn user_message(content: &str) -> ChatMessage {
    ChatMessage {
        role: Role::User,
        content: content.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_message() {
        let msg = system_message("You are helpful.");
        assert_eq!(msg.role, Role::System);
        assert_eq!(msg.content, "You are helpful.");
    }

    #[test]
    fn test_user_message() {
        let msg = user_message("Hello");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "Hello");
    }

    #[test]
    fn test_role_serialization() {
        let json = serde_json::to_string(&Role::System).unwrap_or_default();
        assert_eq!(json, "\"system\"");

        let json = serde_json::to_string(&Role::User).unwrap_or_default();
        assert_eq!(json, "\"user\"");
    }

    #[test]
    fn test_chat_message_serialization() {
        let json = serde_json::to_string(&user_message("test")).unwrap_or_default();
        assert_eq!(json, r#"{"role":"user","content":"test"}"#);
    }

    #[test]
    fn test_usage_accumulate_saturates() {
        let mut total = TokenUsage {
            input_tokens: 10,
            output_tokens: 5,
            total_tokens: u32::MAX - 1,
        };
        total.accumulate(TokenUsage {
            input_tokens: 1,
            output_tokens: 2,
            total_tokens: 3,
        });
        assert_eq!(total.input_tokens, 11);
        assert_eq!(total.output_tokens, 7);
        assert_eq!(total.total_tokens, u32::MAX);
    }
}
