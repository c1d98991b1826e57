//! Iterative refinement over a remote text-generation service.
//!
//! A worker drafts a solution, a team of experts critiques it in parallel,
//! and an oracle condenses the critiques into a decision to stop or refine.
//! Backends are reached through a pluggable provider abstraction backed by
//! OpenAI-compatible APIs.
//!
//! # Architecture
//!
//! ```text
//! RefinementLoop
//!   ├── Agent (worker)        → draft / refine
//!   ├── ExpertsTeam           → N concurrent Agent calls, index-ordered
//!   ├── Agent (oracle)        → summary or "OK"
//!   └── LlmProvider           → transport::deliver (retry, cancellation)
//! ```

pub mod client;
pub mod config;
pub mod experts;
pub mod message;
pub mod prompt;
pub mod provider;
pub mod providers;
pub mod refinement;
pub mod role;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

// Re-export key types
pub use client::create_provider;
pub use config::AgentConfig;
pub use experts::{ExpertAnswer, ExpertsTeam};
pub use message::{ChatMessage, ChatRequest, ChatResponse, OutputSchema, Role, TokenUsage};
pub use prompt::{FILES_SCHEMA_NAME, PromptSet, files_schema};
pub use provider::{LlmProvider, StructuredLlmProvider};
pub use refinement::{
    IterationPrompts, ORACLE_SENTINEL, PartialAnswer, RefinementLoop, RunOptions, RunResult,
};
pub use role::Agent;
pub use transport::{HttpClient, HttpReply, RetryPolicy};
