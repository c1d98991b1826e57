//! Integration tests for the `feedback-loop` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const SETUP: &str = r"
blocks:
  - name: Plan
    iterations: 3
    worker: { name: planner, system: You plan., prompt: Plan a garden. }
    experts:
      - { name: botanist, system: You know plants. }
    oracle: { name: judge, system: You decide. }
";

fn bin() -> Command {
    let mut cmd = Command::cargo_bin("feedback-loop").unwrap_or_else(|e| unreachable!("{e}"));
    cmd.env_remove("RUST_LOG")
        .env_remove("FEEDBACK_PROVIDER")
        .env_remove("FEEDBACK_MODEL")
        .env_remove("FEEDBACK_BASE_URL")
        .env_remove("OPENAI_BASE_URL");
    cmd
}

fn write_setup(dir: &TempDir, yaml: &str) -> String {
    let path = dir.path().join("setup.yaml");
    std::fs::write(&path, yaml).unwrap_or_else(|e| unreachable!("{e}"));
    path.to_string_lossy().into_owned()
}

#[test]
fn test_validate_ok() {
    let dir = TempDir::new().unwrap_or_else(|e| unreachable!("{e}"));
    let setup = write_setup(&dir, SETUP);

    bin()
        .args(["validate", "--config", &setup])
        .assert()
        .success()
        .stdout(predicate::str::contains("is valid: 1 block(s)"))
        .stdout(predicate::str::contains("experts=[botanist]"));
}

#[test]
fn test_validate_json() {
    let dir = TempDir::new().unwrap_or_else(|e| unreachable!("{e}"));
    let setup = write_setup(&dir, SETUP);

    bin()
        .args(["--format", "json", "validate", "--config", &setup])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"valid\": true"));
}

#[test]
fn test_validate_rejects_zero_iterations() {
    let dir = TempDir::new().unwrap_or_else(|e| unreachable!("{e}"));
    let setup = write_setup(&dir, &SETUP.replace("iterations: 3", "iterations: 0"));

    bin()
        .args(["validate", "--config", &setup])
        .assert()
        .failure()
        .stderr(predicate::str::contains("iterations must be at least 1"));
}

#[test]
fn test_validate_missing_file() {
    bin()
        .args(["validate", "--config", "/nonexistent/setup.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error reading file"));
}

#[test]
fn test_init_prompts_writes_templates_once() {
    let dir = TempDir::new().unwrap_or_else(|e| unreachable!("{e}"));
    let target = dir.path().join("prompts");
    let target_str = target.to_string_lossy().into_owned();

    bin()
        .args(["init-prompts", "--dir", &target_str])
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote 4 prompt template(s)"));
    assert!(target.join("initial-worker.md").exists());

    bin()
        .args(["init-prompts", "--dir", &target_str])
        .assert()
        .success()
        .stdout(predicate::str::contains("already exist"));
}

#[test]
fn test_run_without_api_key_fails() {
    let dir = TempDir::new().unwrap_or_else(|e| unreachable!("{e}"));
    let setup = write_setup(&dir, SETUP);

    bin()
        .env_remove("OPENAI_API_KEY")
        .env_remove("FEEDBACK_API_KEY")
        .current_dir(dir.path())
        .args(["run", "--config", &setup])
        .assert()
        .failure()
        .stderr(predicate::str::contains("API key missing"));
}

#[test]
fn test_run_against_mock_backend() {
    let mut server = mockito::Server::new();
    let completions = server
        .mock("POST", "/v1/chat/completions")
        .match_header("authorization", "Bearer sk-test")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"choices":[{"message":{"content":"OK"}}],
                "usage":{"prompt_tokens":3,"completion_tokens":1,"total_tokens":4}}"#,
        )
        .expect(3)
        .create();

    let dir = TempDir::new().unwrap_or_else(|e| unreachable!("{e}"));
    let setup = write_setup(&dir, SETUP);
    let out = dir.path().join("out");
    let out_str = out.to_string_lossy().into_owned();
    let base_url = format!("{}/v1", server.url());

    bin()
        .env("OPENAI_API_KEY", "sk-test")
        .env("FEEDBACK_PROMPT_DIR", dir.path().join("no-prompts"))
        .args([
            "run",
            "--config",
            &setup,
            "--output-dir",
            &out_str,
            "--base-url",
            &base_url,
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "[000] Plan: 1 iteration(s), accepted by oracle, 12 tokens",
        ));

    completions.assert();
    let conversation = out.join("conversations").join("000-plan");
    assert!(conversation.join("000-1-planner-prompt.txt").exists());
    assert!(conversation.join("000-2-botanist-response.txt").exists());
    assert!(conversation.join("000-3-judge-response.txt").exists());
}

#[test]
fn test_run_reports_backend_rejection() {
    let mut server = mockito::Server::new();
    let rejected = server
        .mock("POST", "/chat/completions")
        .with_status(401)
        .with_body("invalid api key")
        .expect(1)
        .create();

    let dir = TempDir::new().unwrap_or_else(|e| unreachable!("{e}"));
    let setup = write_setup(&dir, SETUP);
    let out_str = dir.path().join("out").to_string_lossy().into_owned();

    bin()
        .env("OPENAI_API_KEY", "sk-bad")
        .args([
            "run",
            "--config",
            &setup,
            "--output-dir",
            &out_str,
            "--base-url",
            &server.url(),
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error running block Plan"))
        .stderr(predicate::str::contains("non-success status code: 401"));

    rejected.assert();
}
