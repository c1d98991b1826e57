//! Error types for feedback-loop.
//!
//! Each layer has its own error enum; [`Error`] is the top-level type
//! returned by CLI commands and the workflow runner.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias using the top-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error for all feedback-loop operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Agent, transport, or refinement loop failure.
    #[error("agent error: {0}")]
    Agent(#[from] AgentError),

    /// Workflow configuration failure.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Artifact writing failure.
    #[error("output error: {0}")]
    Output(#[from] OutputError),

    /// CLI command failure.
    #[error("command error: {0}")]
    Command(#[from] CommandError),

    /// A workflow block failed.
    #[error("error running block {block}: {source}")]
    Block {
        /// Name of the failing block.
        block: String,
        /// Underlying failure.
        #[source]
        source: Box<Self>,
    },
}

/// Errors raised by agents, providers, and the refinement loop.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Connection or IO failure while talking to the backend. Retried.
    #[error("transport failure: {message}")]
    Transport {
        /// Description of the failure.
        message: String,
    },

    /// The backend answered with a non-success status code. Never retried.
    #[error("non-success status code: {status}; body: {body}")]
    Protocol {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// A success payload did not have the expected shape.
    #[error("failed to parse response: {message}")]
    ResponseParse {
        /// Description of the parse failure.
        message: String,
        /// Raw payload that failed to parse.
        content: String,
    },

    /// Structured output was requested from a backend that cannot produce it.
    #[error("selected backend does not support structured responses (provider: {provider})")]
    Capability {
        /// Provider name.
        provider: String,
    },

    /// The call was cancelled before it completed.
    #[error("operation cancelled")]
    Cancelled,

    /// Failure of a named agent's call.
    #[error("agent {name}: {source}")]
    Agent {
        /// Agent name.
        name: String,
        /// Underlying failure.
        #[source]
        source: Box<Self>,
    },

    /// Fatal failure of a worker or oracle step in the refinement loop.
    #[error("error chatting with {role} (iteration {iteration}): {source}")]
    Step {
        /// Role of the failing step (`worker` or `oracle`).
        role: &'static str,
        /// Zero-based iteration index.
        iteration: usize,
        /// Underlying failure.
        #[source]
        source: Box<Self>,
    },

    /// No API key configured.
    #[error("API key missing: set OPENAI_API_KEY or FEEDBACK_API_KEY")]
    ApiKeyMissing,

    /// Unknown provider name.
    #[error("unsupported provider: {name}")]
    UnsupportedProvider {
        /// Requested provider name.
        name: String,
    },

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {message}")]
    HttpClient {
        /// Description of the failure.
        message: String,
    },

    /// Invalid loop input or internal coordination failure.
    #[error("orchestration error: {message}")]
    Orchestration {
        /// Description of the failure.
        message: String,
    },
}

impl AgentError {
    /// Returns `true` if the failure is worth another delivery attempt.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    /// Returns the innermost error, skipping agent and step wrappers.
    #[must_use]
    pub fn root(&self) -> &Self {
        match self {
            Self::Agent { source, .. } | Self::Step { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Errors raised while loading a workflow file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("error reading file {path}: {source}")]
    Read {
        /// Path of the workflow file.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid YAML for a workflow.
    #[error("failed unmarshaling yaml: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// The workflow parsed but violates a constraint.
    #[error("invalid workflow: {message}")]
    Invalid {
        /// Description of the violation.
        message: String,
    },
}

/// Errors raised while writing run artifacts.
#[derive(Debug, Error)]
pub enum OutputError {
    /// Filesystem failure.
    #[error("io error at {path}: {source}")]
    Io {
        /// Path being written.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The final answer is not a valid file list.
    #[error("final answer is not a valid file list: {0}")]
    Json(#[from] serde_json::Error),

    /// A file name would escape the answer directory.
    #[error("refusing to write outside the answer directory: {path}")]
    UnsafePath {
        /// Offending file name.
        path: String,
    },
}

/// Errors raised by CLI commands.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The command could not run to completion.
    #[error("{0}")]
    ExecutionFailed(String),

    /// Command output could not be rendered.
    #[error("output formatting failed: {0}")]
    OutputFormat(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_transport_is_retryable() {
        assert!(
            AgentError::Transport {
                message: "reset".to_string()
            }
            .is_retryable()
        );
        assert!(
            !AgentError::Protocol {
                status: 500,
                body: String::new()
            }
            .is_retryable()
        );
        assert!(!AgentError::Cancelled.is_retryable());
    }

    #[test]
    fn test_root_unwraps_nested_context() {
        let err = AgentError::Step {
            role: "worker",
            iteration: 2,
            source: Box::new(AgentError::Agent {
                name: "architect".to_string(),
                source: Box::new(AgentError::Protocol {
                    status: 429,
                    body: "slow down".to_string(),
                }),
            }),
        };
        assert!(matches!(err.root(), AgentError::Protocol { status: 429, .. }));
        let rendered = err.to_string();
        assert!(rendered.contains("worker"));
        assert!(rendered.contains("architect"));
        assert!(rendered.contains("429"));
    }
}
