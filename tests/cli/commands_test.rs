//! Subcommand tests for the `txn-insights` binary.

use std::io::Write;
use std::process::{Command, Stdio};

use pretty_assertions::assert_eq;
use tempfile::NamedTempFile;

const BASE_CONFIG: &str = r#"
[warehouse]
project_id = "fsi-demo"
dataset_id = "equifax_txns"
"#;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp config");
    file.write_all(content.as_bytes())
        .expect("Failed to write temp config");
    file
}

fn command(config: &NamedTempFile, args: &[&str]) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_txn-insights"));
    cmd.arg("--config")
        .arg(config.path())
        .arg("--mock")
        .args(args)
        .env("RUST_LOG", "warn")
        .env_remove("GOOGLE_CLOUD_PROJECT");
    cmd
}

/// Runs the binary with the given stdin and returns (exit code, stdout, stderr).
fn run_with_input(config: &NamedTempFile, args: &[&str], input: &str) -> (i32, String, String) {
    let mut child = command(config, args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to execute command");

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(input.as_bytes())
            .expect("Failed to write stdin");
    }

    let output = child.wait_with_output().expect("Failed to wait for command");
    let exit_code = output.status.code().unwrap_or(-1);
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    (exit_code, stdout, stderr)
}

fn run(config: &NamedTempFile, args: &[&str]) -> (i32, String, String) {
    run_with_input(config, args, "")
}

#[test]
fn test_classify_permitted_update() {
    let config = write_config(BASE_CONFIG);
    let (code, stdout, _) = run(&config, &["classify", "  Update txns SET is_recurring=TRUE WHERE id=5"]);

    assert_eq!(code, 0);
    assert_eq!(stdout, "kind: update\nwrite tool: permitted\n");
}

#[test]
fn test_classify_insert_rejected_by_default_policy() {
    let config = write_config(BASE_CONFIG);
    let (code, stdout, _) = run(&config, &["classify", "INSERT INTO rules VALUES (1)"]);

    assert_eq!(code, 0);
    assert!(stdout.contains("kind: insert"));
    assert!(stdout.contains("rejected (policy allows UPDATE or DELETE)"));
}

#[test]
fn test_classify_uses_configured_policy() {
    let config = write_config(&format!(
        "{BASE_CONFIG}\n[write_guard]\npermitted = [\"insert\", \"update\", \"delete\"]\n"
    ));
    let (code, stdout, _) = run(&config, &["classify", "INSERT INTO rules VALUES (1)"]);

    assert_eq!(code, 0);
    assert!(stdout.contains("write tool: permitted"));
}

#[test]
fn test_tools_lists_both_tools() {
    let config = write_config(BASE_CONFIG);
    let (code, stdout, _) = run(&config, &["tools"]);

    assert_eq!(code, 0);
    let tools: serde_json::Value = serde_json::from_str(&stdout).expect("tools output is JSON");
    let names: Vec<&str> = tools
        .as_array()
        .expect("tools output is an array")
        .iter()
        .filter_map(|t| t["name"].as_str())
        .collect();
    assert_eq!(names, vec!["execute_sql", "execute_confirmed_update"]);
}

#[test]
fn test_manifest_names_tables() {
    let config = write_config(BASE_CONFIG);
    let (code, stdout, _) = run(&config, &["manifest"]);

    assert_eq!(code, 0);
    let manifest: serde_json::Value = serde_json::from_str(&stdout).expect("manifest is JSON");
    assert_eq!(manifest["tables"]["transactions"], "fsi-demo.equifax_txns.transactions");
    assert_eq!(manifest["write_policy"], serde_json::json!(["update", "delete"]));
}

#[test]
fn test_project_flag_overrides_config() {
    let config = write_config(BASE_CONFIG);
    let (code, stdout, _) = run(&config, &["manifest", "--project", "other-proj"]);

    assert_eq!(code, 0);
    let manifest: serde_json::Value = serde_json::from_str(&stdout).expect("manifest is JSON");
    assert_eq!(
        manifest["tables"]["categorization_rules"],
        "other-proj.equifax_txns.categorization_rules"
    );
}

#[test]
fn test_query_with_mock() {
    let config = write_config(BASE_CONFIG);
    let (code, stdout, _) = run(&config, &["query", "SELECT 1"]);

    assert_eq!(code, 0);
    assert!(stdout.contains("Mock result for: SELECT 1"), "got: {stdout}");
}

#[test]
fn test_invoke_with_args() {
    let config = write_config(BASE_CONFIG);
    let (code, stdout, _) = run(
        &config,
        &[
            "invoke",
            "execute_confirmed_update",
            "--args",
            r#"{"sql_query": "INSERT INTO rules VALUES (1)"}"#,
        ],
    );

    assert_eq!(code, 0);
    assert!(stdout.starts_with("Error: This tool can only execute UPDATE or DELETE statements"));
}

#[test]
fn test_write_with_yes_skips_prompt() {
    let config = write_config(BASE_CONFIG);
    let (code, stdout, _) = run(&config, &["write", "DELETE FROM rules WHERE id = 4", "--yes"]);

    assert_eq!(code, 0);
    assert_eq!(stdout, "Operation successful, 0 row(s) affected.\n");
}

#[test]
fn test_write_requires_confirm() {
    let config = write_config(BASE_CONFIG);
    let (code, stdout, stderr) =
        run_with_input(&config, &["write", "DELETE FROM rules WHERE id = 4"], "yes\n");

    assert_eq!(code, 0);
    assert!(stdout.starts_with("Aborted"), "got: {stdout}");
    assert!(stderr.contains("Type CONFIRM to execute"));
}

#[test]
fn test_write_from_stdin_requires_yes() {
    let config = write_config(BASE_CONFIG);
    let (code, stdout, stderr) = run(&config, &["write", "-"]);

    assert_eq!(code, 1);
    assert!(stdout.is_empty(), "got: {stdout}");
    assert!(stderr.contains("Configuration error"), "got: {stderr}");
    assert!(stderr.contains("--yes"), "got: {stderr}");
}

#[test]
fn test_write_from_stdin_with_yes() {
    let config = write_config(BASE_CONFIG);
    let (code, stdout, _) =
        run_with_input(&config, &["write", "-", "--yes"], "DELETE FROM rules WHERE id = 4\n");

    assert_eq!(code, 0);
    assert_eq!(stdout, "Operation successful, 0 row(s) affected.\n");
}

#[test]
fn test_write_after_confirm() {
    let config = write_config(BASE_CONFIG);
    let (code, stdout, _) =
        run_with_input(&config, &["write", "DELETE FROM rules WHERE id = 4"], "CONFIRM\n");

    assert_eq!(code, 0);
    assert_eq!(stdout, "Operation successful, 0 row(s) affected.\n");
}

#[test]
fn test_serve_over_stdio() {
    let config = write_config(BASE_CONFIG);
    let input = concat!(
        r#"{"id": "a", "name": "execute_sql", "arguments": {"sql_query": "SELECT 1"}}"#,
        "\n",
        r#"{"id": "b", "name": "nope", "arguments": {}}"#,
        "\n",
    );
    let (code, stdout, _) = run_with_input(&config, &["serve"], input);

    assert_eq!(code, 0);
    let results: Vec<serde_json::Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).expect("each line is JSON"))
        .collect();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["tool_call_id"], "a");
    assert_eq!(results[1]["tool_call_id"], "b");
    assert!(results[1]["content"]
        .as_str()
        .unwrap_or_default()
        .starts_with("Error: Unknown tool 'nope'"));
}

#[test]
fn test_invalid_policy_exits_nonzero() {
    let config = write_config(&format!("{BASE_CONFIG}\n[write_guard]\npermitted = [\"select\"]\n"));
    let (code, stdout, stderr) = run(&config, &["tools"]);

    assert_eq!(code, 1);
    assert!(stdout.is_empty());
    assert!(stderr.contains("permitted may only contain"), "got: {stderr}");
}
