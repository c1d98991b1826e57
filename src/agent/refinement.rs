//! The worker → experts → oracle refinement loop.
//!
//! Each iteration drafts (or refines) a solution with the worker, has every
//! expert review it concurrently, and asks the oracle to condense the
//! reviews. The loop ends when the oracle replies with the bare
//! [`ORACLE_SENTINEL`] or when the iteration cap is reached.
//!
//! ```text
//! i = 0                      i > 0
//! initial template ─┐   ┌─ refine template (prev solution + prev summary)
//!                   ▼   ▼
//!              Worker.chat / Worker.structured_chat
//!                      │ solution
//!                      ▼
//!              ExpertsTeam.review  ──► <REVIEW k> block (failures dropped)
//!                      │
//!                      ▼
//!              Oracle.chat ──► summary == "OK" ? stop : next iteration
//! ```

use std::time::{Duration, Instant};

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::experts::{ExpertAnswer, ExpertsTeam};
use super::message::{OutputSchema, TokenUsage};
use super::prompt::{
    FILES_SCHEMA_NAME, PromptSet, build_expert_prompt, build_initial_worker_prompt,
    build_oracle_prompt, build_refine_worker_prompt, build_reviews_block, files_schema,
};
use super::role::Agent;
use crate::error::AgentError;

/// Oracle reply that ends the loop. Compared exactly, without trimming.
pub const ORACLE_SENTINEL: &str = "OK";

/// Prompts sent during one iteration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IterationPrompts {
    /// Message sent to the worker.
    pub worker: String,
    /// Message sent to every expert.
    pub experts: String,
    /// Message sent to the oracle.
    pub oracle: String,
}

/// Replies collected during one iteration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PartialAnswer {
    /// The worker's solution.
    pub worker_solution: String,
    /// Successful expert replies, in expert order.
    pub expert_answers: Vec<String>,
    /// Name of the expert behind each entry of `expert_answers`.
    pub expert_names: Vec<String>,
    /// The oracle's summary.
    pub oracle_summary: String,
}

/// Complete audit trail of one loop run.
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    /// Prompts per iteration, parallel to `answers`.
    pub prompts: Vec<IterationPrompts>,
    /// Replies per iteration.
    pub answers: Vec<PartialAnswer>,
    /// Worker solution of the last iteration.
    pub final_answer: String,
    /// Tokens consumed by every call in the run.
    pub usage: TokenUsage,
    /// Wall-clock duration of the run.
    pub elapsed: Duration,
}

impl RunResult {
    /// Number of completed iterations.
    #[must_use]
    pub fn iterations(&self) -> usize {
        self.answers.len()
    }

    /// Returns `true` if the oracle ended the run with the sentinel.
    #[must_use]
    pub fn stopped_by_oracle(&self) -> bool {
        self.answers
            .last()
            .is_some_and(|a| a.oracle_summary == ORACLE_SENTINEL)
    }
}

/// Inputs of one loop run.
#[derive(Debug, Clone, Copy)]
pub struct RunOptions<'a> {
    /// Task description given to every role.
    pub task: &'a str,
    /// Auxiliary data (e.g. a previous block's answer) shown to every role.
    pub additional: Option<&'a str>,
    /// Iteration cap; must be at least 1.
    pub max_iterations: usize,
    /// Ask the worker for a file list constrained by [`files_schema`].
    pub files_output: bool,
}

impl<'a> RunOptions<'a> {
    /// Options for a free-text run without auxiliary data.
    #[must_use]
    pub const fn new(task: &'a str, max_iterations: usize) -> Self {
        Self {
            task,
            additional: None,
            max_iterations,
            files_output: false,
        }
    }

    /// Attaches auxiliary data.
    #[must_use]
    pub const fn with_additional(mut self, additional: Option<&'a str>) -> Self {
        self.additional = additional;
        self
    }

    /// Requests structured file-list output from the worker.
    #[must_use]
    pub const fn with_files_output(mut self, files_output: bool) -> Self {
        self.files_output = files_output;
        self
    }
}

/// Drives worker, experts, and oracle through bounded iterations.
#[derive(Debug, Clone)]
pub struct RefinementLoop {
    worker: Agent,
    experts: ExpertsTeam,
    oracle: Agent,
    prompts: PromptSet,
}

fn step_error(role: &'static str, iteration: usize, source: AgentError) -> AgentError {
    AgentError::Step {
        role,
        iteration,
        source: Box::new(source),
    }
}

impl RefinementLoop {
    /// Creates a loop using the compiled-in role templates.
    #[must_use]
    pub fn new(worker: Agent, experts: ExpertsTeam, oracle: Agent) -> Self {
        Self {
            worker,
            experts,
            oracle,
            prompts: PromptSet::defaults(),
        }
    }

    /// Replaces the role templates.
    #[must_use]
    pub fn with_prompts(mut self, prompts: PromptSet) -> Self {
        self.prompts = prompts;
        self
    }

    /// Runs the loop to completion.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Step`] if the worker or oracle fails,
    /// [`AgentError::Cancelled`] if `cancel` fires, or
    /// [`AgentError::Orchestration`] for a zero iteration cap. Expert
    /// failures never fail the run.
    pub async fn run(
        &self,
        options: &RunOptions<'_>,
        cancel: &CancellationToken,
    ) -> Result<RunResult, AgentError> {
        if options.max_iterations == 0 {
            return Err(AgentError::Orchestration {
                message: "iteration cap must be at least 1".to_string(),
            });
        }

        let start = Instant::now();
        let schema = options
            .files_output
            .then(|| OutputSchema::new(FILES_SCHEMA_NAME, files_schema()));
        let mut usage = TokenUsage::default();
        let mut prompts: Vec<IterationPrompts> = Vec::new();
        let mut answers: Vec<PartialAnswer> = Vec::new();

        for iteration in 0..options.max_iterations {
            if cancel.is_cancelled() {
                return Err(AgentError::Cancelled);
            }
            debug!(iteration, worker = %self.worker.name(), "refinement iteration");

            // Draft
            let worker_prompt = match answers.last() {
                None => build_initial_worker_prompt(
                    &self.prompts.initial_worker,
                    options.task,
                    options.additional,
                ),
                Some(previous) => build_refine_worker_prompt(
                    &self.prompts.refine_worker,
                    options.task,
                    &previous.worker_solution,
                    &previous.oracle_summary,
                    options.additional,
                ),
            };
            let drafted = match &schema {
                Some(format) => {
                    self.worker
                        .structured_chat(&worker_prompt, format, cancel)
                        .await
                }
                None => self.worker.chat(&worker_prompt, cancel).await,
            }
            .map_err(|e| step_error("worker", iteration, e))?;
            usage.accumulate(drafted.usage);
            let solution = drafted.content;

            // Review
            let experts_prompt = build_expert_prompt(
                &self.prompts.expert,
                options.task,
                &solution,
                options.additional,
            );
            let reviews = self.experts.review(&experts_prompt, cancel).await;
            if cancel.is_cancelled() {
                return Err(AgentError::Cancelled);
            }

            let mut accepted: Vec<(usize, ExpertAnswer)> = Vec::with_capacity(reviews.len());
            for (idx, review) in reviews.into_iter().enumerate() {
                usage.accumulate(review.usage);
                if let Some(err) = &review.error {
                    error!(iteration, expert = %review.expert, error = %err, "error chatting with expert");
                    continue;
                }
                accepted.push((idx, review));
            }
            let reviews_block =
                build_reviews_block(accepted.iter().map(|(idx, r)| (*idx, r.answer.as_str())));

            // Summarize
            let oracle_prompt = build_oracle_prompt(
                &self.prompts.oracle,
                &solution,
                &reviews_block,
                options.additional,
            );
            let summarized = self
                .oracle
                .chat(&oracle_prompt, cancel)
                .await
                .map_err(|e| step_error("oracle", iteration, e))?;
            usage.accumulate(summarized.usage);

            // Decide
            let (expert_names, expert_answers): (Vec<String>, Vec<String>) = accepted
                .into_iter()
                .map(|(_, review)| (review.expert, review.answer))
                .unzip();
            prompts.push(IterationPrompts {
                worker: worker_prompt,
                experts: experts_prompt,
                oracle: oracle_prompt,
            });
            answers.push(PartialAnswer {
                worker_solution: solution,
                expert_answers,
                expert_names,
                oracle_summary: summarized.content,
            });

            if answers
                .last()
                .is_some_and(|a| a.oracle_summary == ORACLE_SENTINEL)
            {
                info!(iteration, "oracle accepted the solution");
                break;
            }
        }

        let final_answer = answers
            .last()
            .map(|a| a.worker_solution.clone())
            .ok_or_else(|| AgentError::Orchestration {
                message: "loop finished without any iteration".to_string(),
            })?;

        let result = RunResult {
            prompts,
            answers,
            final_answer,
            usage,
            elapsed: start.elapsed(),
        };
        debug!(
            iterations = result.iterations(),
            stopped_by_oracle = result.stopped_by_oracle(),
            total_tokens = result.usage.total_tokens,
            "refinement loop finished"
        );
        Ok(result)
    }
}
