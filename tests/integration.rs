use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde_json::json;
use tempfile::TempDir;

use forms_lts::db;
use forms_lts::sqlite_store::SqliteSourceStore;
use forms_lts_core::models::Record;

fn lts_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("lts");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let config_content = format!(
        r#"[source]
path = "{root}/data/forms.sqlite"

[archive]
path = "{root}/data/lts.sqlite"

[copy]
batch_size = 2
max_batches = 10
"#,
        root = root.display()
    );

    let config_path = config_dir.join("lts.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_lts(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = lts_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run lts binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

/// Write submissions straight into the primary database, as the forms
/// system would.
fn seed(config_path: &Path, records: &[Record]) {
    let config = forms_lts::config::load_config(config_path).unwrap();
    let rt = tokio::runtime::Runtime::new().unwrap();
    rt.block_on(async {
        let store = SqliteSourceStore::new(db::connect_source(&config).await.unwrap());
        for record in records {
            store.save(record).await.unwrap();
        }
        store.pool().close().await;
    });
}

fn submissions() -> Vec<Record> {
    (1..=3)
        .map(|id| {
            Record::new(id, "contact", 1_700_000_000 + id)
                .with_element("name", "webform_name", json!("Foo Bar"))
                .with_element("details", "textarea", json!("Reach me on foo@example.net"))
        })
        .collect()
}

#[test]
fn test_init_creates_databases() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_lts(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
    assert!(tmp.path().join("data/forms.sqlite").exists());
    assert!(tmp.path().join("data/lts.sqlite").exists());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_lts(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_lts(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_copy_reports_next_offset() {
    let (_tmp, config_path) = setup_test_env();
    run_lts(&config_path, &["init"]);
    seed(&config_path, &submissions());

    let (stdout, stderr, success) = run_lts(&config_path, &["copy"]);
    assert!(success, "copy failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("inserted: 2"));
    assert!(stdout.contains("next offset: 2"));

    let (stdout, _, success) = run_lts(&config_path, &["copy", "--offset", "2"]);
    assert!(success);
    assert!(stdout.contains("inserted: 1"));
    assert!(stdout.contains("finished"));
}

#[test]
fn test_run_drains_backlog() {
    let (_tmp, config_path) = setup_test_env();
    run_lts(&config_path, &["init"]);
    seed(&config_path, &submissions());

    let (stdout, stderr, success) = run_lts(&config_path, &["run"]);
    assert!(success, "run failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("Archived 3 records (3 new, 0 updated), 0 failed."));

    let (stdout, _, _) = run_lts(&config_path, &["run"]);
    assert!(stdout.contains("Archived 0 records"));
}

#[test]
fn test_get_shows_redacted_copy() {
    let (_tmp, config_path) = setup_test_env();
    run_lts(&config_path, &["init"]);
    seed(&config_path, &submissions());
    run_lts(&config_path, &["run"]);

    let (stdout, stderr, success) = run_lts(&config_path, &["get", "1"]);
    assert!(success, "get failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("name [webform_name]: null"));
    assert!(stdout.contains("Reach me on REDACTED_EMAIL"));
    assert!(!stdout.contains("foo@example.net"));

    let (stdout, _, success) = run_lts(&config_path, &["get", "1", "--source"]);
    assert!(success);
    assert!(stdout.contains("foo@example.net"));
}

#[test]
fn test_get_json() {
    let (_tmp, config_path) = setup_test_env();
    run_lts(&config_path, &["init"]);
    seed(&config_path, &submissions());
    run_lts(&config_path, &["run"]);

    let (stdout, _, success) = run_lts(&config_path, &["get", "2", "--json"]);
    assert!(success);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["id"], 2);
    assert_eq!(parsed["form_id"], "contact");
}

#[test]
fn test_notes_lists_redacted_elements() {
    let (_tmp, config_path) = setup_test_env();
    run_lts(&config_path, &["init"]);
    seed(&config_path, &submissions());
    run_lts(&config_path, &["run"]);

    let (stdout, _, success) = run_lts(&config_path, &["notes", "3"]);
    assert!(success);
    assert!(stdout.contains("Redacted elements: name."));
    assert!(stdout.contains("Partly redacted elements: details."));
}

#[test]
fn test_get_unarchived_fails() {
    let (_tmp, config_path) = setup_test_env();
    run_lts(&config_path, &["init"]);

    let (_, stderr, success) = run_lts(&config_path, &["get", "42"]);
    assert!(!success);
    assert!(stderr.contains("not archived"));
}

#[test]
fn test_list_and_status() {
    let (_tmp, config_path) = setup_test_env();
    run_lts(&config_path, &["init"]);
    seed(&config_path, &submissions());

    let (stdout, _, success) = run_lts(&config_path, &["status"]);
    assert!(success);
    assert!(stdout.contains("Pending:        3"));

    run_lts(&config_path, &["run"]);

    let (stdout, _, success) = run_lts(&config_path, &["status"]);
    assert!(success);
    assert!(stdout.contains("Archived:       3"));
    assert!(stdout.contains("Last copied id: 3"));
    assert!(stdout.contains("Pending:        0"));

    let (stdout, _, success) = run_lts(&config_path, &["list", "--limit", "2"]);
    assert!(success);
    assert!(stdout.contains("Showing 1-2 of 3"));
}

#[test]
fn test_dry_run_writes_nothing() {
    let (_tmp, config_path) = setup_test_env();
    run_lts(&config_path, &["init"]);
    seed(&config_path, &submissions());

    let (stdout, _, success) = run_lts(&config_path, &["copy", "--dry-run"]);
    assert!(success);
    assert!(stdout.contains("records found: 2"));
    assert!(stdout.contains("redacts [name, details]"));

    let (stdout, _, _) = run_lts(&config_path, &["list"]);
    assert!(stdout.contains("No archived submissions."));
}

#[test]
fn test_copy_without_archive_fails() {
    let (tmp, config_path) = setup_test_env();
    run_lts(&config_path, &["init"]);
    fs::remove_file(tmp.path().join("data/lts.sqlite")).unwrap();

    let (_, stderr, success) = run_lts(&config_path, &["copy"]);
    assert!(!success);
    assert!(stderr.contains("must exist"));
}

#[test]
fn test_missing_config_fails() {
    let tmp = TempDir::new().unwrap();
    let (_, stderr, success) = run_lts(&tmp.path().join("nope.toml"), &["status"]);
    assert!(!success);
    assert!(stderr.contains("Failed to read config file"));
}

#[test]
fn test_copy_negative_limit_copies_backlog() {
    let (_tmp, config_path) = setup_test_env();
    run_lts(&config_path, &["init"]);
    seed(&config_path, &submissions());

    let (stdout, stderr, success) = run_lts(&config_path, &["copy", "--limit", "-1"]);
    assert!(success, "copy failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("inserted: 3"));
    assert!(stdout.contains("finished"));
    assert!(!stdout.contains("next offset"));
}

#[test]
fn test_copy_zero_limit_rejected() {
    let (_tmp, config_path) = setup_test_env();
    run_lts(&config_path, &["init"]);

    let (_, stderr, success) = run_lts(&config_path, &["copy", "--limit", "0"]);
    assert!(!success);
    assert!(stderr.contains("must not be 0"));
}

#[test]
fn test_completions() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_lts(&config_path, &["completions", "bash"]);
    assert!(success, "completions failed: stderr={}", stderr);
    assert!(!stdout.trim().is_empty());
    assert!(stdout.contains("lts"));
}
