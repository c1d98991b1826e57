//! Scripted provider shared by unit tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::message::{ChatRequest, ChatResponse, OutputSchema, TokenUsage};
use super::provider::{LlmProvider, StructuredLlmProvider};
use crate::error::AgentError;

type Reply = dyn Fn(usize, &ChatRequest) -> Result<String, AgentError> + Send + Sync;

/// Answers every call through a closure of `(call_index, request)`.
pub struct MockProvider {
    reply: Box<Reply>,
    delay: Duration,
    structured: bool,
    calls: AtomicUsize,
    requests: Mutex<Vec<ChatRequest>>,
    schemas: Mutex<Vec<String>>,
}

impl MockProvider {
    pub fn new(
        reply: impl Fn(usize, &ChatRequest) -> Result<String, AgentError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            reply: Box::new(reply),
            delay: Duration::ZERO,
            structured: false,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            schemas: Mutex::new(Vec::new()),
        }
    }

    /// Always answers `text`.
    pub fn fixed(text: &str) -> Self {
        let text = text.to_string();
        Self::new(move |_, _| Ok(text.clone()))
    }

    /// Always fails with a protocol rejection.
    pub fn failing(status: u16) -> Self {
        Self::new(move |_, _| {
            Err(AgentError::Protocol {
                status,
                body: "rejected".to_string(),
            })
        })
    }

    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub const fn with_structured(mut self) -> Self {
        self.structured = true;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// User message of every request, in call order.
    pub fn user_messages(&self) -> Vec<String> {
        self.requests
            .lock()
            .map(|r| {
                r.iter()
                    .filter_map(|req| req.messages.last().map(|m| m.content.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn schema_names(&self) -> Vec<String> {
        self.schemas.lock().map(|s| s.clone()).unwrap_or_default()
    }

    async fn answer(
        &self,
        request: &ChatRequest,
        cancel: &CancellationToken,
    ) -> Result<ChatResponse, AgentError> {
        let index = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        if !self.delay.is_zero() {
            tokio::select! {
                () = cancel.cancelled() => return Err(AgentError::Cancelled),
                () = tokio::time::sleep(self.delay) => {}
            }
        }
        let content = (self.reply)(index, request)?;
        Ok(ChatResponse {
            content,
            usage: TokenUsage {
                input_tokens: 1,
                output_tokens: 1,
                total_tokens: 2,
            },
            elapsed: self.delay,
        })
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn chat(
        &self,
        request: &ChatRequest,
        cancel: &CancellationToken,
    ) -> Result<ChatResponse, AgentError> {
        self.answer(request, cancel).await
    }

    fn structured(&self) -> Option<&dyn StructuredLlmProvider> {
        if self.structured { Some(self) } else { None }
    }
}

#[async_trait]
impl StructuredLlmProvider for MockProvider {
    async fn respond(
        &self,
        request: &ChatRequest,
        format: &OutputSchema,
        cancel: &CancellationToken,
    ) -> Result<ChatResponse, AgentError> {
        if let Ok(mut schemas) = self.schemas.lock() {
            schemas.push(format.name.clone());
        }
        self.answer(request, cancel).await
    }
}
