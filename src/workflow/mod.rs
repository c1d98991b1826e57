//! Multi-block workflows: YAML definition, sequential runner, and artifacts.

pub mod config;
pub mod output;
pub mod runner;

pub use config::{AppSetup, BlockConfig, RoleConfig, WorkerConfig};
pub use output::{OutputLayout, save_conversation, save_files_from_json, to_kebab_case};
pub use runner::{BlockOutcome, WorkflowRunner};
