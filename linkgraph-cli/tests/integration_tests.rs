//! Integration tests for linkgraph CLI
//!
//! Tests end-to-end command behavior using the CLI binary.
//! Uses tempfile for isolated working directories; nothing here needs a
//! running search store.

use std::fs;
use std::process::{Command, Output};
use tempfile::TempDir;

// ============================================================================
// Test Utilities
// ============================================================================

/// Get the path to the linkgraph binary (built by cargo)
fn linkgraph_binary() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_linkgraph"));
    cmd.env_remove("RUST_LOG")
        .env_remove("LINKGRAPH_URL")
        .env_remove("LINKGRAPH_USERNAME")
        .env_remove("LINKGRAPH_PASSWORD");
    cmd
}

/// Run linkgraph with the given args in the specified directory
fn run_linkgraph(dir: &std::path::Path, args: &[&str]) -> Output {
    linkgraph_binary()
        .current_dir(dir)
        .args(args)
        .output()
        .expect("Failed to execute linkgraph command")
}

/// Get stdout as string
fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

/// Get stderr as string
fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

fn write_config(dir: &std::path::Path, content: &str) {
    fs::write(dir.join(".linkgraphrc.toml"), content).expect("Failed to write config");
}

// ============================================================================
// Help and usage
// ============================================================================

#[test]
fn test_help_lists_commands() {
    let dir = TempDir::new().unwrap();
    let output = run_linkgraph(dir.path(), &["--help"]);

    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("export"));
    assert!(out.contains("pairs"));
    assert!(out.contains("plan"));
}

#[test]
fn test_no_command_prints_help() {
    let dir = TempDir::new().unwrap();
    let output = run_linkgraph(dir.path(), &[]);

    assert!(output.status.success());
    assert!(stdout(&output).contains("Usage"));
}

#[test]
fn test_export_help_shows_flags() {
    let dir = TempDir::new().unwrap();
    let output = run_linkgraph(dir.path(), &["export", "--help"]);

    assert!(output.status.success());
    let out = stdout(&output);
    for flag in [
        "--years",
        "--monthly",
        "--continue-on-error",
        "--url",
        "--source-index",
        "--alias",
        "--page-size",
        "--flush-bytes",
        "--flush-interval",
        "--digest",
    ] {
        assert!(out.contains(flag), "missing {} in export help", flag);
    }
}

// ============================================================================
// plan
// ============================================================================

#[test]
fn test_plan_default_years() {
    let dir = TempDir::new().unwrap();
    let output = run_linkgraph(dir.path(), &["--format", "json", "plan"]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    let labels: Vec<&str> = json["partitions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["partition"].as_str().unwrap())
        .collect();
    assert_eq!(
        labels,
        vec!["2016", "2017", "2018", "2020", "2021", "2022", "2023"]
    );
    assert_eq!(json["index"], "ipfs_files");
}

#[test]
fn test_plan_monthly_december_rolls_over() {
    let dir = TempDir::new().unwrap();
    let output = run_linkgraph(
        dir.path(),
        &["--format", "json", "plan", "--years", "2021", "--monthly"],
    );

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    let partitions = json["partitions"].as_array().unwrap();
    assert_eq!(partitions.len(), 12);

    let december = &partitions[11];
    assert_eq!(december["partition"], "2021-12");
    let range = &december["body"]["query"]["bool"]["filter"][0]["range"]["first-seen"];
    assert_eq!(range["gte"], "2021-12");
    assert_eq!(range["lt"], "2022-01");
    assert_eq!(range["format"], "yyyy-MM");
}

#[test]
fn test_plan_table_output() {
    let dir = TempDir::new().unwrap();
    let output = run_linkgraph(dir.path(), &["plan", "--years", "2020,2022"]);

    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("2 partitions"));
    assert!(out.contains("[2020, 2021)"));
    assert!(out.contains("[2022, 2023)"));
}

#[test]
fn test_plan_rejects_bad_years() {
    let dir = TempDir::new().unwrap();
    let output = run_linkgraph(dir.path(), &["plan", "--years", "2018-2016"]);

    assert!(!output.status.success());
    assert!(stderr(&output).contains("reversed"));
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn test_config_file_in_working_directory() {
    let dir = TempDir::new().unwrap();
    write_config(
        dir.path(),
        r#"
[source]
index = "files_v2"
page_size = 250

[run]
years = [2019]

[output]
format = "json"
"#,
    );

    let output = run_linkgraph(dir.path(), &["plan"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(json["index"], "files_v2");
    assert_eq!(json["partitions"][0]["partition"], "2019");
    assert_eq!(json["partitions"][0]["body"]["size"], 250);
}

#[test]
fn test_broken_implicit_config_falls_back_to_defaults() {
    let dir = TempDir::new().unwrap();
    write_config(dir.path(), "[source\nindex = ");

    let output = run_linkgraph(dir.path(), &["--format", "json", "plan", "--years", "2021"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stderr(&output).contains("Failed to parse"));

    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(json["index"], "ipfs_files");
}

#[test]
fn test_explicit_config_errors_are_fatal() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("custom.toml");
    fs::write(&path, "[source\nindex = ").unwrap();

    let output = run_linkgraph(
        dir.path(),
        &["--config", path.to_str().unwrap(), "plan"],
    );
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Failed to parse config file"));

    let output = run_linkgraph(dir.path(), &["--config", "missing.toml", "plan"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Failed to read config file"));
}

// ============================================================================
// export / pairs without a store
// ============================================================================

#[test]
fn test_export_unreachable_store_fails() {
    let dir = TempDir::new().unwrap();
    let output = run_linkgraph(
        dir.path(),
        &["export", "--years", "2021", "--url", "http://127.0.0.1:1"],
    );

    assert!(!output.status.success());
    assert!(stderr(&output).contains("Export aborted"));
}

#[test]
fn test_pairs_unreachable_store_fails() {
    let dir = TempDir::new().unwrap();
    let output = run_linkgraph(dir.path(), &["pairs", "--url", "http://127.0.0.1:1"]);

    assert!(!output.status.success());
    assert!(stderr(&output).contains("Failed to scan ipfs_links"));
}
