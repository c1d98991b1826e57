//! feedback-loop: iterative refinement of LLM answers by a team of roles.
//!
//! A *worker* drafts a solution, a pool of *experts* critiques it in
//! parallel, and an *oracle* condenses the critiques into a decision to stop
//! or refine. Workflows chain several such blocks, each feeding its final
//! answer to the next.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use feedback_loop::agent::{Agent, AgentConfig, ExpertsTeam, RefinementLoop, RunOptions};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn demo() -> feedback_loop::Result<()> {
//! let config = AgentConfig::from_env()?;
//! let provider = Arc::from(feedback_loop::agent::create_provider(&config)?);
//!
//! let worker = Agent::new("writer", "You write release notes.", Arc::clone(&provider));
//! let experts = ExpertsTeam::new(vec![
//!     Agent::new("editor", "You check tone.", Arc::clone(&provider)),
//!     Agent::new("engineer", "You check accuracy.", Arc::clone(&provider)),
//! ]);
//! let oracle = Agent::new("lead", "You decide.", provider);
//!
//! let result = RefinementLoop::new(worker, experts, oracle)
//!     .run(&RunOptions::new("Summarize v2.0", 3), &CancellationToken::new())
//!     .await?;
//! println!("{}", result.final_answer);
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod cli;
pub mod error;
pub mod workflow;

pub use error::{AgentError, CommandError, ConfigError, Error, OutputError, Result};
