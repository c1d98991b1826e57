//! Run artifacts on disk.
//!
//! Layout under the output root:
//!
//! ```text
//! {root}/conversations/{NNN-block-name}/{III-role-prompt|response}.txt
//! {root}/answers/{NNN-block-name}/...files from the final answer...
//! ```

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::agent::RunResult;
use crate::error::OutputError;

/// Replaces spaces with `-` and lowercases everything else.
#[must_use]
pub fn to_kebab_case(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if c == ' ' {
            out.push('-');
        } else {
            out.extend(c.to_lowercase());
        }
    }
    out
}

/// Builds `dir/kebab("{iteration:03} {name} {suffix}.txt")`.
#[must_use]
pub fn txt_filename(dir: &Path, iteration: usize, name: &str, suffix: &str) -> PathBuf {
    dir.join(to_kebab_case(&format!("{iteration:03} {name} {suffix}.txt")))
}

/// Directories for one workflow run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    /// Creates a layout rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Output root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn block_dir(block_index: usize, block_name: &str) -> String {
        to_kebab_case(&format!("{block_index:03} {block_name}"))
    }

    /// Conversation directory of a block.
    #[must_use]
    pub fn conversation_dir(&self, block_index: usize, block_name: &str) -> PathBuf {
        self.root
            .join("conversations")
            .join(Self::block_dir(block_index, block_name))
    }

    /// Answer directory of a block with file output.
    #[must_use]
    pub fn answers_dir(&self, block_index: usize, block_name: &str) -> PathBuf {
        self.root
            .join("answers")
            .join(Self::block_dir(block_index, block_name))
    }
}

/// Role names used to label conversation files.
#[derive(Debug, Clone, Copy)]
pub struct ConversationRoles<'a> {
    /// Worker name.
    pub worker: &'a str,
    /// Oracle name.
    pub oracle: &'a str,
}

fn write_logged(path: &Path, content: &str) -> bool {
    match std::fs::write(path, content) {
        Ok(()) => true,
        Err(e) => {
            error!(path = %path.display(), error = %e, "error writing to file");
            false
        }
    }
}

/// Writes every prompt and reply of a run into `dir`.
///
/// Individual write failures are logged and skipped. Expert replies are
/// named after the expert that produced them. Returns the number of files
/// written.
///
/// # Errors
///
/// Returns [`OutputError::Io`] if `dir` cannot be created.
pub fn save_conversation(
    dir: &Path,
    roles: ConversationRoles<'_>,
    result: &RunResult,
) -> Result<usize, OutputError> {
    std::fs::create_dir_all(dir).map_err(|source| OutputError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let worker_label = format!("1-{}", roles.worker);
    let oracle_label = format!("3-{}", roles.oracle);
    let mut written = 0;

    for (idx, prompts) in result.prompts.iter().enumerate() {
        let files = [
            (worker_label.as_str(), prompts.worker.as_str()),
            ("2-experts", prompts.experts.as_str()),
            (oracle_label.as_str(), prompts.oracle.as_str()),
        ];
        for (label, content) in files {
            if write_logged(&txt_filename(dir, idx, label, "prompt"), content) {
                written += 1;
            }
        }
    }

    for (idx, answer) in result.answers.iter().enumerate() {
        if write_logged(
            &txt_filename(dir, idx, &worker_label, "response"),
            &answer.worker_solution,
        ) {
            written += 1;
        }

        for (name, reply) in answer.expert_names.iter().zip(&answer.expert_answers) {
            let path = txt_filename(dir, idx, &format!("2-{name}"), "response");
            if write_logged(&path, reply) {
                written += 1;
            }
        }

        if write_logged(
            &txt_filename(dir, idx, &oracle_label, "response"),
            &answer.oracle_summary,
        ) {
            written += 1;
        }
    }

    debug!(dir = %dir.display(), files = written, "conversation saved");
    Ok(written)
}

/// One generated file in a structured answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedFile {
    /// Relative path of the file.
    pub file_name: String,
    /// File content.
    pub file_content: String,
}

/// Structured answer: a list of files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileList {
    /// Files to write.
    pub files: Vec<GeneratedFile>,
}

/// Rejects names that are empty, absolute, or climb out of the target dir.
fn checked_relative(name: &str) -> Result<&Path, OutputError> {
    let path = Path::new(name);
    let unsafe_component = path.components().any(|c| {
        matches!(
            c,
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    });
    if name.trim().is_empty() || unsafe_component {
        return Err(OutputError::UnsafePath {
            path: name.to_string(),
        });
    }
    Ok(path)
}

/// Parses a file list from `json` and writes each file under `dir`.
///
/// Every name is checked before anything is written, so a single unsafe
/// entry writes nothing. Parent directories are created as needed.
///
/// # Errors
///
/// Returns [`OutputError::Json`] for malformed input,
/// [`OutputError::UnsafePath`] for escaping names, or [`OutputError::Io`].
pub fn save_files_from_json(dir: &Path, json: &str) -> Result<Vec<PathBuf>, OutputError> {
    let list: FileList = serde_json::from_str(json)?;

    let targets = list
        .files
        .iter()
        .map(|f| checked_relative(&f.file_name).map(|rel| (dir.join(rel), &f.file_content)))
        .collect::<Result<Vec<_>, _>>()?;

    let mut written = Vec::with_capacity(targets.len());
    for (path, content) in targets {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| OutputError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(&path, content).map_err(|source| OutputError::Io {
            path: path.clone(),
            source,
        })?;
        written.push(path);
    }

    debug!(dir = %dir.display(), files = written.len(), "answer files saved");
    Ok(written)
}
