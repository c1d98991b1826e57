//! Concurrent fan-out of one prompt to a team of expert agents.
//!
//! Every expert runs as its own task. Results come back in expert order
//! regardless of completion order, and a failing expert only ever fills
//! its own slot.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::message::TokenUsage;
use super::role::Agent;
use crate::error::AgentError;

/// One expert's outcome for a review round.
#[derive(Debug)]
pub struct ExpertAnswer {
    /// Name of the expert that produced this slot.
    pub expert: String,
    /// Reply text; empty when `error` is set.
    pub answer: String,
    /// Failure of this expert's call, if any.
    pub error: Option<AgentError>,
    /// Tokens consumed by this expert's call.
    pub usage: TokenUsage,
}

impl ExpertAnswer {
    fn failed(expert: String, error: AgentError) -> Self {
        Self {
            expert,
            answer: String::new(),
            error: Some(error),
            usage: TokenUsage::default(),
        }
    }

    /// Returns `true` if the expert answered.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// A fixed, ordered team of expert reviewers.
#[derive(Debug, Clone)]
pub struct ExpertsTeam {
    experts: Vec<Arc<Agent>>,
    max_concurrency: Option<usize>,
}

impl ExpertsTeam {
    /// Creates a team; review order follows `experts`.
    #[must_use]
    pub fn new(experts: Vec<Agent>) -> Self {
        Self {
            experts: experts.into_iter().map(Arc::new).collect(),
            max_concurrency: None,
        }
    }

    /// Bounds how many expert calls are in flight at once.
    #[must_use]
    pub const fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = Some(max_concurrency);
        self
    }

    /// Number of experts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.experts.len()
    }

    /// Returns `true` if the team has no experts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.experts.is_empty()
    }

    /// Sends `prompt` to every expert concurrently and waits for all of them.
    ///
    /// The result has exactly one entry per expert, at the expert's index.
    /// Cancelling `cancel` makes pending experts fail with
    /// [`AgentError::Cancelled`] in their own slots.
    pub async fn review(&self, prompt: &str, cancel: &CancellationToken) -> Vec<ExpertAnswer> {
        let permits = self
            .max_concurrency
            .unwrap_or(self.experts.len())
            .clamp(1, Semaphore::MAX_PERMITS);
        let semaphore = Arc::new(Semaphore::new(permits));
        let prompt: Arc<str> = Arc::from(prompt);

        let mut handles = Vec::with_capacity(self.experts.len());
        for (idx, expert) in self.experts.iter().enumerate() {
            let sem = Arc::clone(&semaphore);
            let agent = Arc::clone(expert);
            let msg = Arc::clone(&prompt);
            let token = cancel.clone();

            let handle = tokio::spawn(async move {
                let outcome = tokio::select! {
                    () = token.cancelled() => Err(AgentError::Cancelled),
                    permit = sem.acquire() => match permit {
                        Ok(_permit) => agent.chat(&msg, &token).await,
                        Err(e) => Err(AgentError::Orchestration {
                            message: format!("Semaphore acquire failed: {e}"),
                        }),
                    },
                };
                (idx, outcome)
            });
            handles.push(handle);
        }

        let mut slots: Vec<Option<ExpertAnswer>> = self.experts.iter().map(|_| None).collect();
        for (idx, handle) in handles.into_iter().enumerate() {
            let (slot, answer) = match handle.await {
                Ok((tagged, Ok(response))) => (
                    tagged,
                    ExpertAnswer {
                        expert: self.experts[tagged].name().to_string(),
                        answer: response.content,
                        error: None,
                        usage: response.usage,
                    },
                ),
                Ok((tagged, Err(e))) => (
                    tagged,
                    ExpertAnswer::failed(self.experts[tagged].name().to_string(), e),
                ),
                Err(e) => (
                    idx,
                    ExpertAnswer::failed(
                        self.experts[idx].name().to_string(),
                        AgentError::Orchestration {
                            message: format!("Task join failed: {e}"),
                        },
                    ),
                ),
            };
            slots[slot] = Some(answer);
        }

        let answers: Vec<ExpertAnswer> = slots
            .into_iter()
            .zip(&self.experts)
            .map(|(slot, expert)| {
                slot.unwrap_or_else(|| {
                    ExpertAnswer::failed(
                        expert.name().to_string(),
                        AgentError::Orchestration {
                            message: "expert produced no result".to_string(),
                        },
                    )
                })
            })
            .collect();

        debug!(
            experts = answers.len(),
            failed = answers.iter().filter(|a| !a.is_ok()).count(),
            "review round complete"
        );
        answers
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::agent::testing::MockProvider;
    use std::time::Duration;

    fn expert(name: &str, provider: MockProvider) -> Agent {
        Agent::new(name, format!("You are {name}."), Arc::new(provider))
    }

    #[tokio::test(start_paused = true)]
    async fn test_results_follow_expert_order_not_completion_order() {
        let team = ExpertsTeam::new(vec![
            expert("slow", MockProvider::fixed("a").with_delay(Duration::from_millis(300))),
            expert("mid", MockProvider::fixed("b").with_delay(Duration::from_millis(200))),
            expert("fast", MockProvider::fixed("c").with_delay(Duration::from_millis(100))),
        ]);

        let answers = team.review("review this", &CancellationToken::new()).await;

        let texts: Vec<&str> = answers.iter().map(|a| a.answer.as_str()).collect();
        assert_eq!(texts, vec!["a", "b", "c"]);
        let names: Vec<&str> = answers.iter().map(|a| a.expert.as_str()).collect();
        assert_eq!(names, vec!["slow", "mid", "fast"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_experts_run_concurrently() {
        let team = ExpertsTeam::new(
            (0..4)
                .map(|i| {
                    expert(
                        &format!("e{i}"),
                        MockProvider::fixed("ok").with_delay(Duration::from_secs(1)),
                    )
                })
                .collect(),
        );

        let start = tokio::time::Instant::now();
        let answers = team.review("p", &CancellationToken::new()).await;
        assert_eq!(answers.len(), 4);
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_cap_serializes_calls() {
        let team = ExpertsTeam::new(
            (0..3)
                .map(|i| {
                    expert(
                        &format!("e{i}"),
                        MockProvider::fixed("ok").with_delay(Duration::from_secs(1)),
                    )
                })
                .collect(),
        )
        .with_max_concurrency(1);

        let start = tokio::time::Instant::now();
        let answers = team.review("p", &CancellationToken::new()).await;
        assert!(answers.iter().all(ExpertAnswer::is_ok));
        assert!(start.elapsed() >= Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_failure_is_isolated_to_its_slot() {
        let team = ExpertsTeam::new(vec![
            expert("one", MockProvider::fixed("first")),
            expert("two", MockProvider::failing(500)),
            expert("three", MockProvider::fixed("third")),
        ]);

        let answers = team.review("p", &CancellationToken::new()).await;

        assert_eq!(answers.len(), 3);
        assert!(answers[0].is_ok());
        assert_eq!(answers[0].answer, "first");
        assert!(answers[1].answer.is_empty());
        let err = answers[1]
            .error
            .as_ref()
            .unwrap_or_else(|| panic!("expected failure in slot 1"));
        assert!(matches!(err.root(), AgentError::Protocol { status: 500, .. }));
        assert_eq!(answers[2].answer, "third");
    }

    #[tokio::test]
    async fn test_empty_team_returns_no_answers() {
        let team = ExpertsTeam::new(Vec::new());
        assert!(team.is_empty());
        let answers = team.review("p", &CancellationToken::new()).await;
        assert!(answers.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_fills_every_pending_slot() {
        let team = ExpertsTeam::new(vec![
            expert("a", MockProvider::fixed("x").with_delay(Duration::from_secs(60))),
            expert("b", MockProvider::fixed("y").with_delay(Duration::from_secs(60))),
        ]);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });

        let start = tokio::time::Instant::now();
        let answers = team.review("p", &cancel).await;

        assert!(start.elapsed() < Duration::from_secs(60));
        assert_eq!(answers.len(), 2);
        for answer in &answers {
            let err = answer
                .error
                .as_ref()
                .unwrap_or_else(|| panic!("expected cancellation"));
            assert!(matches!(err.root(), AgentError::Cancelled));
        }
    }
}
