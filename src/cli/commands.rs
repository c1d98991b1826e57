//! CLI command implementations.
//!
//! Contains the business logic for each CLI command.

use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::agent::{AgentConfig, PromptSet};
use crate::cli::output::{OutputFormat, format_outcomes, format_setup_summary};
use crate::cli::parser::{Cli, Commands};
use crate::error::{CommandError, Result};
use crate::workflow::{AppSetup, OutputLayout, WorkflowRunner};

/// Parameters for the run command.
#[derive(Debug, Clone)]
pub struct RunParams<'a> {
    /// Workflow file.
    pub config: &'a Path,
    /// Output root.
    pub output_dir: &'a Path,
    /// Model override.
    pub model: Option<&'a str>,
    /// Base URL override.
    pub base_url: Option<&'a str>,
    /// Prompt template directory.
    pub prompt_dir: Option<&'a Path>,
    /// Expert concurrency cap.
    pub max_concurrency: Option<usize>,
    /// Per-call token cap.
    pub max_tokens: Option<u32>,
}

/// Executes the CLI command.
///
/// # Arguments
///
/// * `cli` - Parsed CLI arguments.
///
/// # Returns
///
/// Result with output string on success.
///
/// # Errors
///
/// Returns an error if the command fails to execute.
pub fn execute(cli: &Cli) -> Result<String> {
    let format = OutputFormat::parse(&cli.format);

    match &cli.command {
        Commands::Run {
            config,
            output_dir,
            model,
            base_url,
            prompt_dir,
            max_concurrency,
            max_tokens,
        } => {
            let params = RunParams {
                config,
                output_dir,
                model: model.as_deref(),
                base_url: base_url.as_deref(),
                prompt_dir: prompt_dir.as_deref(),
                max_concurrency: *max_concurrency,
                max_tokens: *max_tokens,
            };
            cmd_run(&params, format)
        }
        Commands::Validate { config } => cmd_validate(config, format),
        Commands::InitPrompts { dir } => cmd_init_prompts(dir.as_deref(), format),
    }
}

/// Builds agent configuration from the environment plus CLI overrides.
fn agent_config(params: &RunParams<'_>) -> Result<AgentConfig> {
    let mut builder = AgentConfig::builder().from_env();
    if let Some(model) = params.model {
        builder = builder.model(model);
    }
    if let Some(url) = params.base_url {
        builder = builder.base_url(url);
    }
    if let Some(dir) = params.prompt_dir {
        builder = builder.prompt_dir(dir);
    }
    if let Some(n) = params.max_concurrency {
        builder = builder.max_concurrency(n);
    }
    if let Some(n) = params.max_tokens {
        builder = builder.max_tokens(n);
    }

    builder
        .build()
        .map_err(|e| CommandError::ExecutionFailed(format!("Agent configuration error: {e}")).into())
}

fn cmd_run(params: &RunParams<'_>, format: OutputFormat) -> Result<String> {
    let setup = AppSetup::load(params.config)?;
    let config = agent_config(params)?;
    let runner = WorkflowRunner::from_config(&config, OutputLayout::new(params.output_dir))?;

    // Create tokio runtime as sync/async bridge
    let rt = tokio::runtime::Runtime::new().map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to create async runtime: {e}"))
    })?;

    let outcomes = rt.block_on(async {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        let interrupt = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received, cancelling workflow");
                trigger.cancel();
            }
        });

        let result = runner.run(&setup, &cancel).await;
        interrupt.abort();
        result
    })?;

    format_outcomes(&outcomes, format)
}

fn cmd_validate(config: &Path, format: OutputFormat) -> Result<String> {
    let setup = AppSetup::load(config)?;
    format_setup_summary(config, &setup, format)
}

fn cmd_init_prompts(dir: Option<&Path>, format: OutputFormat) -> Result<String> {
    let target_dir = dir
        .map(PathBuf::from)
        .or_else(PromptSet::default_dir)
        .ok_or_else(|| {
            CommandError::ExecutionFailed(
                "Could not determine home directory for default prompt path".to_string(),
            )
        })?;

    let written = PromptSet::write_defaults(&target_dir).map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to write prompt templates: {e}"))
    })?;

    match format {
        OutputFormat::Text => {
            if written.is_empty() {
                return Ok(format!(
                    "All prompt templates already exist in: {}\n",
                    target_dir.display()
                ));
            }
            let mut output = format!(
                "Wrote {} prompt template(s) to: {}\n",
                written.len(),
                target_dir.display()
            );
            for path in &written {
                output.push_str("  ");
                output.push_str(
                    path.file_name()
                        .and_then(|n| n.to_str())
                        .unwrap_or("unknown"),
                );
                output.push('\n');
            }
            output.push_str("\nEdit these files to customize the role templates.\n");
            Ok(output)
        }
        OutputFormat::Json => format.to_json(&serde_json::json!({
            "directory": target_dir.to_string_lossy(),
            "written": written
                .iter()
                .map(|p| p.to_string_lossy().into_owned())
                .collect::<Vec<_>>(),
            "count": written.len()
        })),
    }
}
