//! Role templates and prompt builders for the refinement loop.
//!
//! Templates are the fixed instructions that open each role's user message.
//! Builders combine a template with the task, the current solution, the
//! expert reviews, and optional auxiliary data from an earlier block.

use std::fmt::Write;
use std::path::{Path, PathBuf};

/// Template for the worker's first draft.
pub const INITIAL_WORKER_PROMPT: &str = "You will be given a TASK. \
Your job is to provide a solution to the TASK. \
Ensure that your solution is as accurate and complete as possible.";

/// Template for the worker's refinement of a previous draft.
pub const REFINE_WORKER_PROMPT: &str = "You will be given a TASK, a SOLUTION and a SUMMARY of feedback from experts. \
Your job is to refine the SOLUTION based on the feedback provided. \
Ensure that the final solution is accurate, complete, and incorporates all the improvements suggested by the experts.";

/// Template for every expert reviewer.
pub const EXPERT_PROMPT: &str = "You will be given a TASK and a SOLUTION. \
Your job is to review the SOLUTION and provide feedback on its accuracy, \
completeness, and any improvements that can be made. \
Remember that you are an expert with all the needed knowledge and experience.";

/// Template for the oracle. Instructs it to reply with the bare stop sentinel.
pub const ORACLE_PROMPT: &str = "You will be given a SOLUTION and its REVIEWS. \
Your job is to summarize the key points from the reviews, \
highlighting strengths, weaknesses, and suggestions for improvement. \
Provide a concise and clear summary. Do not overthink, if you see that \
those reviews are enough, then simply answer OK, without any other characters. \
Review will start with <REVIEW number>.";

/// Name of the file-list output schema. Bump the suffix when the shape changes.
pub const FILES_SCHEMA_NAME: &str = "file_list_v1";

/// Default prompt directory relative to the home directory.
const DEFAULT_PROMPT_DIR: &str = ".config/feedback-loop/prompts";

/// Filename for the initial worker template.
const INITIAL_WORKER_FILENAME: &str = "initial-worker.md";
/// Filename for the refining worker template.
const REFINE_WORKER_FILENAME: &str = "refine-worker.md";
/// Filename for the expert template.
const EXPERT_FILENAME: &str = "expert.md";
/// Filename for the oracle template.
const ORACLE_FILENAME: &str = "oracle.md";

/// JSON schema for a list of generated files.
///
/// Matches `{"files": [{"fileName": ..., "fileContent": ...}]}`.
#[must_use]
pub fn files_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "files": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "fileName": { "type": "string" },
                        "fileContent": { "type": "string" }
                    },
                    "required": ["fileName", "fileContent"],
                    "additionalProperties": false
                }
            }
        },
        "required": ["files"],
        "additionalProperties": false
    })
}

/// The four role templates used by one refinement loop.
///
/// Loaded from external template files when available, falling back to
/// compiled-in defaults. Use [`PromptSet::load`] to resolve the prompt
/// directory from CLI flags, environment variables, or the default path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptSet {
    /// Template for the first worker draft.
    pub initial_worker: String,
    /// Template for later worker refinements.
    pub refine_worker: String,
    /// Template for expert reviews.
    pub expert: String,
    /// Template for the oracle summary.
    pub oracle: String,
}

impl Default for PromptSet {
    fn default() -> Self {
        Self::defaults()
    }
}

impl PromptSet {
    /// Loads templates from the given directory, falling back to compiled-in defaults.
    ///
    /// Resolution order for `prompt_dir`:
    /// 1. Explicit `prompt_dir` argument (from `--prompt-dir`)
    /// 2. `FEEDBACK_PROMPT_DIR` environment variable
    /// 3. `~/.config/feedback-loop/prompts/`
    ///
    /// Each file is loaded independently; a missing file uses its default.
    #[must_use]
    pub fn load(prompt_dir: Option<&Path>) -> Self {
        let resolved_dir = prompt_dir
            .map(PathBuf::from)
            .or_else(|| std::env::var("FEEDBACK_PROMPT_DIR").ok().map(PathBuf::from))
            .or_else(Self::default_dir);

        let load_file = |filename: &str, default: &str| -> String {
            resolved_dir
                .as_ref()
                .map(|dir| dir.join(filename))
                .and_then(|path| std::fs::read_to_string(&path).ok())
                .map(|text| text.trim_end().to_string())
                .filter(|text| !text.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        Self {
            initial_worker: load_file(INITIAL_WORKER_FILENAME, INITIAL_WORKER_PROMPT),
            refine_worker: load_file(REFINE_WORKER_FILENAME, REFINE_WORKER_PROMPT),
            expert: load_file(EXPERT_FILENAME, EXPERT_PROMPT),
            oracle: load_file(ORACLE_FILENAME, ORACLE_PROMPT),
        }
    }

    /// Returns compiled-in defaults without checking the filesystem.
    #[must_use]
    pub fn defaults() -> Self {
        Self {
            initial_worker: INITIAL_WORKER_PROMPT.to_string(),
            refine_worker: REFINE_WORKER_PROMPT.to_string(),
            expert: EXPERT_PROMPT.to_string(),
            oracle: ORACLE_PROMPT.to_string(),
        }
    }

    /// Writes the compiled-in default templates to the given directory.
    ///
    /// Creates the directory if it does not exist. Existing files are
    /// **not** overwritten.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if directory creation or file writing fails.
    pub fn write_defaults(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
        std::fs::create_dir_all(dir)?;

        let templates = [
            (INITIAL_WORKER_FILENAME, INITIAL_WORKER_PROMPT),
            (REFINE_WORKER_FILENAME, REFINE_WORKER_PROMPT),
            (EXPERT_FILENAME, EXPERT_PROMPT),
            (ORACLE_FILENAME, ORACLE_PROMPT),
        ];

        let mut written = Vec::new();
        for (filename, content) in &templates {
            let path = dir.join(filename);
            if !path.exists() {
                std::fs::write(&path, content)?;
                written.push(path);
            }
        }

        Ok(written)
    }

    /// Returns the default prompt directory under the user's home.
    ///
    /// Returns `None` if the home directory cannot be determined.
    #[must_use]
    pub fn default_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(DEFAULT_PROMPT_DIR))
    }
}

fn push_additional(prompt: &mut String, additional: Option<&str>) {
    if let Some(data) = additional.filter(|d| !d.trim().is_empty()) {
        let _ = write!(prompt, "\nADDITIONAL DATA: {data}");
    }
}

/// Builds the worker's first-draft message.
#[must_use]
pub fn build_initial_worker_prompt(template: &str, task: &str, additional: Option<&str>) -> String {
    let mut prompt = format!("{template}\nTASK: {task}\n");
    push_additional(&mut prompt, additional);
    prompt
}

/// Builds the worker's refinement message from the previous round.
#[must_use]
pub fn build_refine_worker_prompt(
    template: &str,
    task: &str,
    previous_solution: &str,
    summary: &str,
    additional: Option<&str>,
) -> String {
    let mut prompt =
        format!("{template}\nTASK: {task}\nSOLUTION: {previous_solution}\nSUMMARY: {summary}");
    push_additional(&mut prompt, additional);
    prompt
}

/// Builds the message sent to every expert.
#[must_use]
pub fn build_expert_prompt(
    template: &str,
    task: &str,
    solution: &str,
    additional: Option<&str>,
) -> String {
    let mut prompt = format!("{template}\nTASK: {task}\nSOLUTION: {solution}");
    push_additional(&mut prompt, additional);
    prompt
}

/// Builds the oracle's message from the solution and the reviews block.
#[must_use]
pub fn build_oracle_prompt(
    template: &str,
    solution: &str,
    reviews: &str,
    additional: Option<&str>,
) -> String {
    let mut prompt = format!("{template}\nSOLUTION: {solution}\nREVIEWS: {reviews}");
    push_additional(&mut prompt, additional);
    prompt
}

/// Concatenates reviews as `<REVIEW k> {answer}\n` entries.
///
/// `k` is the reviewer's position in the team, so omitted reviewers leave
/// gaps in the numbering.
#[must_use]
pub fn build_reviews_block<'a>(reviews: impl IntoIterator<Item = (usize, &'a str)>) -> String {
    reviews
        .into_iter()
        .fold(String::new(), |mut block, (idx, answer)| {
            let _ = writeln!(block, "<REVIEW {idx}> {answer}");
            block
        })
}
