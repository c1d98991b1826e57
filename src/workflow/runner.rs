//! Sequential execution of workflow blocks.
//!
//! Each block runs one [`RefinementLoop`]; the final answer of a block is
//! handed to the next block as auxiliary data. After every block the
//! conversation is saved, and blocks with file output have their final
//! answer materialized as files.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::config::{AppSetup, BlockConfig};
use super::output::{ConversationRoles, OutputLayout, save_conversation, save_files_from_json};
use crate::agent::{
    Agent, AgentConfig, ExpertsTeam, LlmProvider, PromptSet, RefinementLoop, RunOptions,
    TokenUsage, create_provider,
};
use crate::error::{Error, Result};

/// Summary of one completed block.
#[derive(Debug, Clone, Serialize)]
pub struct BlockOutcome {
    /// Block name.
    pub name: String,
    /// Iterations actually run.
    pub iterations: usize,
    /// Whether the oracle ended the block early.
    pub stopped_by_oracle: bool,
    /// Final worker solution.
    pub final_answer: String,
    /// Where prompts and replies were written.
    pub conversation_dir: PathBuf,
    /// Files materialized from the final answer.
    pub files: Vec<PathBuf>,
    /// Tokens consumed by the block.
    pub usage: TokenUsage,
    /// Wall-clock duration of the block's loop.
    pub elapsed: Duration,
}

/// Runs a workflow against one shared provider.
pub struct WorkflowRunner {
    provider: Arc<dyn LlmProvider>,
    layout: OutputLayout,
    prompts: PromptSet,
    max_concurrency: Option<usize>,
    max_tokens: Option<u32>,
}

impl WorkflowRunner {
    /// Creates a runner with default templates and no limits.
    #[must_use]
    pub fn new(provider: Arc<dyn LlmProvider>, layout: OutputLayout) -> Self {
        Self {
            provider,
            layout,
            prompts: PromptSet::defaults(),
            max_concurrency: None,
            max_tokens: None,
        }
    }

    /// Creates a runner from agent configuration.
    ///
    /// Builds the provider and loads role templates from
    /// [`AgentConfig::prompt_dir`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Agent`] if the provider cannot be created.
    pub fn from_config(config: &AgentConfig, layout: OutputLayout) -> Result<Self> {
        let provider: Arc<dyn LlmProvider> = Arc::from(create_provider(config)?);
        Ok(Self::new(provider, layout)
            .with_prompts(PromptSet::load(config.prompt_dir.as_deref()))
            .with_max_concurrency(config.max_concurrency)
            .with_max_tokens(config.max_tokens))
    }

    /// Replaces the role templates.
    #[must_use]
    pub fn with_prompts(mut self, prompts: PromptSet) -> Self {
        self.prompts = prompts;
        self
    }

    /// Bounds concurrent expert calls within one review.
    #[must_use]
    pub const fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = Some(max_concurrency);
        self
    }

    /// Caps generated tokens per call.
    #[must_use]
    pub const fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Runs every block in order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Block`] naming the first block that fails.
    pub async fn run(
        &self,
        setup: &AppSetup,
        cancel: &CancellationToken,
    ) -> Result<Vec<BlockOutcome>> {
        let mut outcomes = Vec::with_capacity(setup.blocks.len());
        let mut previous: Option<String> = None;

        for (idx, block) in setup.blocks.iter().enumerate() {
            info!(block = %block.name, index = idx, "running block");
            let outcome = self
                .run_block(idx, block, previous.as_deref(), cancel)
                .await
                .map_err(|e| Error::Block {
                    block: block.name.clone(),
                    source: Box::new(e),
                })?;
            info!(
                block = %outcome.name,
                iterations = outcome.iterations,
                stopped_by_oracle = outcome.stopped_by_oracle,
                files = outcome.files.len(),
                "block finished"
            );
            previous = Some(outcome.final_answer.clone());
            outcomes.push(outcome);
        }

        Ok(outcomes)
    }

    fn agent(&self, name: &str, system: &str) -> Agent {
        Agent::new(name, system, Arc::clone(&self.provider)).with_max_tokens(self.max_tokens)
    }

    fn build_loop(&self, block: &BlockConfig) -> RefinementLoop {
        let worker = self.agent(&block.worker.name, &block.worker.system);
        let experts = block
            .experts
            .iter()
            .map(|e| self.agent(&e.name, &e.system))
            .collect();
        let mut team = ExpertsTeam::new(experts);
        if let Some(n) = self.max_concurrency {
            team = team.with_max_concurrency(n);
        }
        let oracle = self.agent(&block.oracle.name, &block.oracle.system);

        RefinementLoop::new(worker, team, oracle).with_prompts(self.prompts.clone())
    }

    async fn run_block(
        &self,
        idx: usize,
        block: &BlockConfig,
        additional: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<BlockOutcome> {
        let refinement = self.build_loop(block);
        let options = RunOptions::new(&block.worker.prompt, block.iterations)
            .with_additional(additional)
            .with_files_output(block.files_output);
        let result = refinement.run(&options, cancel).await?;

        info!(block = %block.name, "saving answers");
        let conversation_dir = self.layout.conversation_dir(idx, &block.name);
        save_conversation(
            &conversation_dir,
            ConversationRoles {
                worker: &block.worker.name,
                oracle: &block.oracle.name,
            },
            &result,
        )?;

        let files = if block.files_output {
            let dir = self.layout.answers_dir(idx, &block.name);
            save_files_from_json(&dir, &result.final_answer)?
        } else {
            Vec::new()
        };

        Ok(BlockOutcome {
            name: block.name.clone(),
            iterations: result.iterations(),
            stopped_by_oracle: result.stopped_by_oracle(),
            final_answer: result.final_answer,
            conversation_dir,
            files,
            usage: result.usage,
            elapsed: result.elapsed,
        })
    }
}

impl std::fmt::Debug for WorkflowRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowRunner")
            .field("provider", &self.provider.name())
            .field("layout", &self.layout)
            .field("max_concurrency", &self.max_concurrency)
            .field("max_tokens", &self.max_tokens)
            .finish_non_exhaustive()
    }
}
