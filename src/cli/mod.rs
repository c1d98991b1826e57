//! CLI layer for feedback-loop.
//!
//! Provides the command-line interface using clap, with commands for
//! running, validating, and scaffolding workflows.

pub mod commands;
pub mod output;
pub mod parser;

pub use commands::execute;
pub use output::OutputFormat;
pub use parser::{Cli, Commands};
