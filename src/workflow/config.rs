//! YAML workflow definition.
//!
//! A workflow is an ordered list of blocks; each block names its worker,
//! experts, and oracle and sets its own iteration cap.
//!
//! ```yaml
//! blocks:
//!   - name: Design
//!     iterations: 3
//!     filesOutput: false
//!     worker: { name: architect, system: "...", prompt: "task text" }
//!     experts:
//!       - { name: security, system: "..." }
//!     oracle: { name: judge, system: "..." }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// A whole workflow file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSetup {
    /// Blocks, executed in order.
    pub blocks: Vec<BlockConfig>,
}

/// One refinement block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockConfig {
    /// Block name; also names the output directories.
    pub name: String,
    /// Iteration cap for this block.
    pub iterations: usize,
    /// Materialize the final answer as files.
    #[serde(default)]
    pub files_output: bool,
    /// The drafting role and the task.
    pub worker: WorkerConfig,
    /// Reviewers, in review order.
    #[serde(default)]
    pub experts: Vec<RoleConfig>,
    /// The summarizing role.
    pub oracle: RoleConfig,
}

/// The worker role plus the block's task text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Role name.
    pub name: String,
    /// System instructions.
    #[serde(default)]
    pub system: String,
    /// Task description handed to every role.
    pub prompt: String,
}

/// An expert or oracle role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleConfig {
    /// Role name.
    pub name: String,
    /// System instructions.
    #[serde(default)]
    pub system: String,
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        message: message.into(),
    }
}

/// Describes why `name` cannot label an output directory or file, if it cannot.
fn name_problem(name: &str) -> Option<&'static str> {
    if name.trim().is_empty() {
        Some("an empty name")
    } else if name.contains(['/', '\\']) || name.contains("..") {
        Some("a name containing a path separator or '..'")
    } else {
        None
    }
}

impl AppSetup {
    /// Reads, parses, and validates a workflow file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`], [`ConfigError::Parse`], or
    /// [`ConfigError::Invalid`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&data)
    }

    /// Parses and validates workflow YAML.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] or [`ConfigError::Invalid`].
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let setup: Self = serde_yaml::from_str(yaml)?;
        setup.validate()?;
        Ok(setup)
    }

    /// Checks structural constraints that YAML typing cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first violation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.blocks.is_empty() {
            return Err(invalid("workflow has no blocks"));
        }

        for (idx, block) in self.blocks.iter().enumerate() {
            if let Some(problem) = name_problem(&block.name) {
                return Err(invalid(format!("block {idx} has {problem}")));
            }
            let name = &block.name;
            if block.iterations == 0 {
                return Err(invalid(format!("block {name}: iterations must be at least 1")));
            }
            if let Some(problem) = name_problem(&block.worker.name) {
                return Err(invalid(format!("block {name}: worker has {problem}")));
            }
            if block.worker.prompt.trim().is_empty() {
                return Err(invalid(format!("block {name}: worker prompt is empty")));
            }
            if let Some(problem) = name_problem(&block.oracle.name) {
                return Err(invalid(format!("block {name}: oracle has {problem}")));
            }
            for (pos, expert) in block.experts.iter().enumerate() {
                if let Some(problem) = name_problem(&expert.name) {
                    return Err(invalid(format!("block {name}: expert {pos} has {problem}")));
                }
            }
        }

        Ok(())
    }
}
