//! Output formatting for CLI commands.

use std::fmt::Write;
use std::path::Path;

use serde::Serialize;

use crate::error::{CommandError, Result};
use crate::workflow::{AppSetup, BlockOutcome};

/// Output format for CLI commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// Pretty-printed JSON.
    Json,
}

impl OutputFormat {
    /// Parses a format name; unknown names fall back to text.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Text,
        }
    }

    /// Serializes `value` as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::OutputFormat`] if serialization fails.
    pub fn to_json<T: Serialize + ?Sized>(self, value: &T) -> Result<String> {
        serde_json::to_string_pretty(value)
            .map_err(|e| CommandError::OutputFormat(format!("JSON serialization failed: {e}")).into())
    }
}

/// Formats the outcome of a workflow run.
///
/// # Errors
///
/// Returns [`CommandError::OutputFormat`] if JSON serialization fails.
pub fn format_outcomes(outcomes: &[BlockOutcome], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => format.to_json(outcomes),
        OutputFormat::Text => {
            let mut output = String::new();
            for (idx, outcome) in outcomes.iter().enumerate() {
                let stop = if outcome.stopped_by_oracle {
                    "accepted by oracle"
                } else {
                    "iteration cap reached"
                };
                let _ = writeln!(
                    output,
                    "[{idx:03}] {}: {} iteration(s), {stop}, {} tokens, {:.1}s",
                    outcome.name,
                    outcome.iterations,
                    outcome.usage.total_tokens,
                    outcome.elapsed.as_secs_f64()
                );
                let _ = writeln!(
                    output,
                    "      conversation: {}",
                    outcome.conversation_dir.display()
                );
                for file in &outcome.files {
                    let _ = writeln!(output, "      file: {}", file.display());
                }
            }
            if let Some(last) = outcomes.last() {
                let _ = write!(output, "\nFinal answer:\n{}\n", last.final_answer);
            }
            Ok(output)
        }
    }
}

/// Formats a validated workflow summary.
///
/// # Errors
///
/// Returns [`CommandError::OutputFormat`] if JSON serialization fails.
pub fn format_setup_summary(path: &Path, setup: &AppSetup, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => {
            let blocks: Vec<serde_json::Value> = setup
                .blocks
                .iter()
                .map(|b| {
                    serde_json::json!({
                        "name": b.name,
                        "iterations": b.iterations,
                        "files_output": b.files_output,
                        "worker": b.worker.name,
                        "experts": b.experts.iter().map(|e| e.name.as_str()).collect::<Vec<_>>(),
                        "oracle": b.oracle.name,
                    })
                })
                .collect();
            format.to_json(&serde_json::json!({
                "config": path.to_string_lossy(),
                "valid": true,
                "blocks": blocks,
            }))
        }
        OutputFormat::Text => {
            let mut output = format!(
                "{} is valid: {} block(s)\n",
                path.display(),
                setup.blocks.len()
            );
            for (idx, b) in setup.blocks.iter().enumerate() {
                let experts: Vec<&str> = b.experts.iter().map(|e| e.name.as_str()).collect();
                let _ = writeln!(
                    output,
                    "  [{idx:03}] {} (max {} iteration(s){}) worker={} experts=[{}] oracle={}",
                    b.name,
                    b.iterations,
                    if b.files_output { ", files" } else { "" },
                    b.worker.name,
                    experts.join(", "),
                    b.oracle.name
                );
            }
            Ok(output)
        }
    }
}
