//! CLI integration test against a live Postgres instance.
//!
//! Requires `DATABASE_URL` to point at a Postgres database with the
//! `vector` and `pg_trgm` extensions installable (superuser or
//! extension-whitelisted role). Skipped by default; run with
//! `cargo test -- --ignored` once a database is available.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;

fn codesearch_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop();
    path.pop();
    path.push("codesearch");
    path
}

fn setup_test_env(db_url: &str) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let files_dir = root.join("repo");
    fs::create_dir_all(files_dir.join("scripts")).unwrap();
    fs::write(
        files_dir.join("scripts/wipe.sh"),
        "#!/bin/sh\n# wipes the disk clean\nrm -rf /\n",
    )
    .unwrap();
    fs::write(
        files_dir.join("main.go"),
        "package main\n\nfunc main() {}\n",
    )
    .unwrap();

    let config_content = format!(
        r#"
        [db]
        url = "{db_url}"

        [model]
        provider = "stub"
        dims = 8
        "#
    );
    let config_path = root.join("codesearch.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_codesearch(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = codesearch_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path)
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("failed to run codesearch binary at {binary:?}: {e}"));

    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.success(),
    )
}

#[test]
#[ignore]
fn init_index_and_search_round_trip() {
    let db_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for this test");
    let (tmp, config_path) = setup_test_env(&db_url);

    let (_, stderr, ok) = run_codesearch(&config_path, &["init"]);
    assert!(ok, "init failed: {stderr}");

    let repo_path = tmp.path().join("repo");
    let (stdout, stderr, ok) = run_codesearch(
        &config_path,
        &[
            "index",
            repo_path.to_str().unwrap(),
            "--repository",
            "test-repo",
            "--ref",
            "main",
        ],
    );
    assert!(ok, "index failed: {stderr}");
    assert!(stdout.contains("files seen: 2"));

    let (stdout, stderr, ok) = run_codesearch(&config_path, &["search", "script that deletes disk"]);
    assert!(ok, "search failed: {stderr}");
    assert!(stdout.contains("wipe.sh"));
}
