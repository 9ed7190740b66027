use std::path::Path;

use assert_cmd::Command;
use predicates::str::contains;
use serde_json::{Value, json};

const LEGACY_VARIABLES: [&str; 10] = [
    "BULLETIN_PROFILE",
    "PORT",
    "USE_LOCAL_FILES",
    "LOCAL_DATA_PATH",
    "AZURE_STORAGE_CONNECTION_STRING",
    "BLOB_CONTAINER_NAME",
    "CACHE_TTL",
    "EVENTS_FILE",
    "NEWS_FILE",
    "FAQ_FILE",
];

fn bulletin(root: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("bulletin"));
    for variable in LEGACY_VARIABLES {
        cmd.env_remove(variable);
    }
    cmd.env("RUST_LOG", "info")
        .arg("--store-use-local")
        .arg("true")
        .arg("--store-local-root")
        .arg(root);
    cmd
}

fn stdout_json(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout is a single JSON document")
}

#[test]
fn fetch_prints_collection_as_json() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(
        dir.path().join("events.json"),
        r#"{"items":[{"id":1,"title":"Launch"}]}"#,
    )
    .expect("write events");

    let assert = bulletin(dir.path())
        .args(["fetch", "events", "--pretty"])
        .assert()
        .success();

    let output = assert.get_output();
    assert_eq!(
        stdout_json(output),
        json!({"items": [{"id": 1, "title": "Launch"}]})
    );
    assert!(String::from_utf8_lossy(&output.stdout).contains("\n  \"items\""));
}

#[test]
fn fetch_reports_missing_collection_in_document() {
    let dir = tempfile::tempdir().expect("tempdir");

    let assert = bulletin(dir.path())
        .args(["fetch", "faq"])
        .assert()
        .success()
        .stderr(contains("Content resource missing"));

    assert_eq!(
        stdout_json(assert.get_output()),
        json!({"items": [], "error": "File not found: faq.json"})
    );
}

#[test]
fn fetch_honours_filename_override() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(
        dir.path().join("faq.yaml"),
        "items:\n  - question: Parking?\n    answer: Free\n",
    )
    .expect("write faq");

    let assert = bulletin(dir.path())
        .args(["fetch", "faq", "--faq-file", "faq.yaml"])
        .assert()
        .success();

    assert_eq!(
        stdout_json(assert.get_output()),
        json!({"items": [{"question": "Parking?", "answer": "Free"}]})
    );
}

#[test]
fn unknown_collection_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");

    bulletin(dir.path())
        .args(["fetch", "calendar"])
        .assert()
        .failure()
        .stdout("");
}

#[test]
fn invalid_settings_fail_before_fetching() {
    let dir = tempfile::tempdir().expect("tempdir");

    bulletin(dir.path())
        .args(["fetch", "events", "--cache-ttl-seconds", "0"])
        .assert()
        .failure()
        .stdout("")
        .stderr(contains("cache.ttl_seconds"));
}
