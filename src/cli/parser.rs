//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// feedback-loop: iterative worker → experts → oracle refinement.
///
/// Runs multi-block workflows in which a worker drafts a solution, a team of
/// experts reviews it in parallel, and an oracle decides whether to refine.
#[derive(Parser, Debug)]
#[command(name = "feedback-loop")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose (debug) logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, default_value = "text", global = true)]
    pub format: String,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run every block of a workflow file.
    ///
    /// Requires an OpenAI-compatible API key.
    #[command(after_help = r#"Examples:
  feedback-loop run --config setup.yaml --output-dir ./out
  feedback-loop run --config setup.yaml --model gpt-4o --max-concurrency 4
  OPENAI_API_KEY=sk-... OUTPUT_DIRECTORY=./out feedback-loop run -c setup.yaml
  feedback-loop --format json run -c setup.yaml | jq '.[].final_answer'
"#)]
    Run {
        /// Path to the workflow YAML file.
        #[arg(short, long)]
        config: PathBuf,

        /// Root directory for conversations and answers.
        #[arg(short, long, env = "OUTPUT_DIRECTORY", default_value = ".")]
        output_dir: PathBuf,

        /// Model used by every role.
        #[arg(long)]
        model: Option<String>,

        /// API base URL (for proxies or compatible APIs).
        #[arg(long)]
        base_url: Option<String>,

        /// Directory containing prompt template files.
        #[arg(long)]
        prompt_dir: Option<PathBuf>,

        /// Maximum concurrent expert calls per review.
        #[arg(long)]
        max_concurrency: Option<usize>,

        /// Maximum tokens generated per call.
        #[arg(long)]
        max_tokens: Option<u32>,
    },

    /// Load and validate a workflow file without calling any backend.
    #[command(after_help = r#"Examples:
  feedback-loop validate --config setup.yaml
  feedback-loop --format json validate -c setup.yaml
"#)]
    Validate {
        /// Path to the workflow YAML file.
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Write the default role templates for customization.
    ///
    /// Existing files are not overwritten.
    #[command(after_help = r#"Examples:
  feedback-loop init-prompts                     # ~/.config/feedback-loop/prompts
  feedback-loop init-prompts --dir ./prompts
"#)]
    InitPrompts {
        /// Target directory (defaults to ~/.config/feedback-loop/prompts).
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_flags() {
        let cli = Cli::try_parse_from([
            "feedback-loop",
            "--format",
            "json",
            "run",
            "--config",
            "setup.yaml",
            "--output-dir",
            "out",
            "--max-concurrency",
            "4",
            "--max-tokens",
            "256",
            "-v",
        ])
        .unwrap_or_else(|e| unreachable!("{e}"));

        assert!(cli.verbose);
        assert_eq!(cli.format, "json");
        let Commands::Run {
            config,
            output_dir,
            max_concurrency,
            max_tokens,
            model,
            ..
        } = cli.command
        else {
            unreachable!("expected run")
        };
        assert_eq!(config, PathBuf::from("setup.yaml"));
        assert_eq!(output_dir, PathBuf::from("out"));
        assert_eq!(max_concurrency, Some(4));
        assert_eq!(max_tokens, Some(256));
        assert!(model.is_none());
    }

    #[test]
    fn test_run_requires_config() {
        assert!(Cli::try_parse_from(["feedback-loop", "run"]).is_err());
    }

    #[test]
    fn test_parse_init_prompts() {
        let cli = Cli::try_parse_from(["feedback-loop", "init-prompts", "--dir", "p"])
            .unwrap_or_else(|e| unreachable!("{e}"));
        assert!(matches!(
            cli.command,
            Commands::InitPrompts { dir: Some(ref d) } if d == &PathBuf::from("p")
        ));
    }
}
