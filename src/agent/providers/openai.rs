//! `OpenAI` provider implementation over raw HTTP.
//!
//! Supports any `OpenAI`-compatible API (`OpenAI`, Azure, local proxies)
//! via the base URL in [`AgentConfig`]. Free-text calls go to
//! `/chat/completions`; schema-constrained calls go to `/responses`.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::agent::config::AgentConfig;
use crate::agent::message::{ChatMessage, ChatRequest, ChatResponse, OutputSchema, TokenUsage};
use crate::agent::provider::{LlmProvider, StructuredLlmProvider};
use crate::agent::transport::{HttpClient, ReqwestClient, RetryPolicy, deliver};
use crate::error::AgentError;

/// `OpenAI`-compatible LLM provider.
pub struct OpenAiProvider {
    http: Arc<dyn HttpClient>,
    api_key: String,
    base_url: String,
    model: String,
    retry: RetryPolicy,
    structured_output: bool,
}

/// Body of a `/chat/completions` request.
#[derive(Debug, Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

/// Body of a `/responses` request.
#[derive(Debug, Serialize)]
struct ResponsesBody<'a> {
    model: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    input: &'a [ChatMessage],
    text: TextOptions<'a>,
}

#[derive(Debug, Serialize)]
struct TextOptions<'a> {
    format: JsonSchemaFormat<'a>,
}

#[derive(Debug, Serialize)]
struct JsonSchemaFormat<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    name: &'a str,
    schema: &'a serde_json::Value,
    strict: bool,
}

#[derive(Debug, Deserialize)]
struct CompletionEnvelope {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
    #[serde(default)]
    usage: Option<CompletionUsage>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompletionUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ResponsesEnvelope {
    #[serde(default)]
    output: Vec<ResponsesItem>,
    #[serde(default)]
    usage: Option<ResponsesUsage>,
}

#[derive(Debug, Deserialize)]
struct ResponsesItem {
    #[serde(default)]
    content: Vec<ResponsesContent>,
}

#[derive(Debug, Deserialize)]
struct ResponsesContent {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponsesUsage {
    input_tokens: u32,
    output_tokens: u32,
    total_tokens: u32,
}

impl OpenAiProvider {
    /// Creates a new provider from agent configuration.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::HttpClient`] if the HTTP client cannot be built.
    pub fn new(config: &AgentConfig) -> Result<Self, AgentError> {
        let http = ReqwestClient::new(config.timeout)?;
        Ok(Self::with_client(config, Arc::new(http)))
    }

    /// Creates a provider that delivers through the given HTTP client.
    #[must_use]
    pub fn with_client(config: &AgentConfig, http: Arc<dyn HttpClient>) -> Self {
        Self {
            http,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            retry: config.retry_policy(),
            structured_output: config.structured_output,
        }
    }

    /// Builds the JSON body for a free-text completion.
    fn completion_body(&self, request: &ChatRequest) -> Result<serde_json::Value, AgentError> {
        let body = CompletionBody {
            model: &self.model,
            messages: &request.messages,
            max_tokens: request.max_tokens,
        };
        serde_json::to_value(&body).map_err(|e| AgentError::Orchestration {
            message: format!("error marshaling request: {e}"),
        })
    }

    /// Builds the JSON body for a schema-constrained response.
    fn responses_body(
        &self,
        request: &ChatRequest,
        format: &OutputSchema,
    ) -> Result<serde_json::Value, AgentError> {
        let body = ResponsesBody {
            model: &self.model,
            max_output_tokens: request.max_tokens,
            input: &request.messages,
            text: TextOptions {
                format: JsonSchemaFormat {
                    kind: "json_schema",
                    name: &format.name,
                    schema: &format.schema,
                    strict: true,
                },
            },
        };
        serde_json::to_value(&body).map_err(|e| AgentError::Orchestration {
            message: format!("error marshaling request: {e}"),
        })
    }

    /// Extracts text and usage from a `/chat/completions` payload.
    fn parse_completion(payload: &str) -> Result<(String, TokenUsage), AgentError> {
        let envelope: CompletionEnvelope =
            serde_json::from_str(payload).map_err(|e| AgentError::ResponseParse {
                message: e.to_string(),
                content: payload.to_string(),
            })?;

        let content = envelope
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AgentError::ResponseParse {
                message: "no choices in response".to_string(),
                content: payload.to_string(),
            })?
            .message
            .content
            .unwrap_or_default();

        let usage = envelope
            .usage
            .map_or_else(TokenUsage::default, |u| TokenUsage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            });

        Ok((content, usage))
    }

    /// Extracts text and usage from a `/responses` payload.
    ///
    /// Output items without text (e.g. reasoning items) are skipped.
    fn parse_responses(payload: &str) -> Result<(String, TokenUsage), AgentError> {
        let envelope: ResponsesEnvelope =
            serde_json::from_str(payload).map_err(|e| AgentError::ResponseParse {
                message: e.to_string(),
                content: payload.to_string(),
            })?;

        let content = envelope
            .output
            .into_iter()
            .flat_map(|item| item.content)
            .find_map(|part| part.text)
            .ok_or_else(|| AgentError::ResponseParse {
                message: "no text output in response".to_string(),
                content: payload.to_string(),
            })?;

        let usage = envelope
            .usage
            .map_or_else(TokenUsage::default, |u| TokenUsage {
                input_tokens: u.input_tokens,
                output_tokens: u.output_tokens,
                total_tokens: u.total_tokens,
            });

        Ok((content, usage))
    }

    /// Delivers `body` to `path`, parses the reply, and stamps elapsed time.
    async fn exchange(
        &self,
        path: &str,
        body: &serde_json::Value,
        parse: fn(&str) -> Result<(String, TokenUsage), AgentError>,
        cancel: &CancellationToken,
    ) -> Result<ChatResponse, AgentError> {
        let url = format!("{}{path}", self.base_url);
        let start = Instant::now();

        let reply = deliver(&*self.http, &url, &self.api_key, body, self.retry, cancel).await?;
        let (content, usage) = parse(&reply.body)?;
        let elapsed = start.elapsed();

        debug!(
            provider = "openai",
            model = %self.model,
            path,
            input_tokens = usage.input_tokens,
            output_tokens = usage.output_tokens,
            elapsed_ms = elapsed.as_millis(),
            "completion received"
        );

        Ok(ChatResponse {
            content,
            usage,
            elapsed,
        })
    }
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("retry", &self.retry)
            .field("structured_output", &self.structured_output)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn chat(
        &self,
        request: &ChatRequest,
        cancel: &CancellationToken,
    ) -> Result<ChatResponse, AgentError> {
        let body = self.completion_body(request)?;
        self.exchange("/chat/completions", &body, Self::parse_completion, cancel)
            .await
    }

    fn structured(&self) -> Option<&dyn StructuredLlmProvider> {
        if self.structured_output {
            Some(self)
        } else {
            None
        }
    }
}

#[async_trait]
impl StructuredLlmProvider for OpenAiProvider {
    async fn respond(
        &self,
        request: &ChatRequest,
        format: &OutputSchema,
        cancel: &CancellationToken,
    ) -> Result<ChatResponse, AgentError> {
        let body = self.responses_body(request, format)?;
        self.exchange("/responses", &body, Self::parse_responses, cancel)
            .await
    }
}
