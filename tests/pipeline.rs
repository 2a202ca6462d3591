//! End-to-end pipeline run against a fixture repository, credential-less.
//!
//! With no API key every model call is answered by the deterministic mock,
//! so the whole pipeline is exercised offline.

use repolens::config::Config;
use repolens::findings::FindingSource;
use repolens::pipeline::{self, RunOptions};
use std::fs;
use std::path::Path;

fn clear_credentials() {
    std::env::remove_var("OPENROUTER_API_KEY");
    std::env::remove_var("OPENAI_API_KEY");
}

fn offline_config() -> Config {
    Config {
        inter_batch_delay_ms: 0,
        ..Config::default()
    }
}

fn write_fixture_repo(root: &Path) {
    fs::create_dir_all(root.join("src")).unwrap();
    fs::create_dir_all(root.join("tests")).unwrap();
    fs::write(
        root.join("src/main.rs"),
        "fn main() {\n    println!(\"hello\");\n}\n",
    )
    .unwrap();
    fs::write(
        root.join("src/lib.rs"),
        "pub fn add(a: i32, b: i32) -> i32 {\n    a + b\n}\n",
    )
    .unwrap();
    fs::write(
        root.join("tests/add.rs"),
        "#[test]\nfn adds() {\n    assert_eq!(2 + 2, 4);\n}\n",
    )
    .unwrap();
    fs::write(root.join("README.md"), "# fixture\n").unwrap();
}

#[tokio::test]
async fn full_run_offline_produces_ordered_findings() {
    clear_credentials();
    let dir = tempfile::tempdir().unwrap();
    write_fixture_repo(dir.path());

    let options = RunOptions {
        repo_path: dir.path().to_path_buf(),
        max_files: None,
        repo_only: false,
        create_issues: false,
    };
    let report = pipeline::run(offline_config(), &options).await.unwrap();

    assert_eq!(report.files_total, 4);
    assert_eq!(report.files_analyzed, 4);
    assert!(!report.findings.is_empty());

    // Every model call fell back to the mock: one per file plus one for the
    // repository pass.
    assert_eq!(report.mock_responses, 5);

    // Findings are ordered most urgent first.
    let ranks: Vec<u8> = report.findings.iter().map(|f| f.priority.rank()).collect();
    let mut sorted = ranks.clone();
    sorted.sort();
    assert_eq!(ranks, sorted);

    // Both file-level and repository-level findings are present.
    assert!(report
        .findings
        .iter()
        .any(|f| matches!(f.source, FindingSource::File { .. })));
    assert!(report
        .findings
        .iter()
        .any(|f| matches!(f.source, FindingSource::Repository { .. })));

    let rendered = report.render();
    assert!(rendered.contains("Analyzed 4 of 4 files"));
    assert!(rendered.contains("Mock responses: 5"));
}

#[tokio::test]
async fn repo_only_run_skips_file_findings() {
    clear_credentials();
    let dir = tempfile::tempdir().unwrap();
    write_fixture_repo(dir.path());

    let options = RunOptions {
        repo_path: dir.path().to_path_buf(),
        max_files: None,
        repo_only: true,
        create_issues: false,
    };
    let report = pipeline::run(offline_config(), &options).await.unwrap();

    assert_eq!(report.mock_responses, 1);
    assert!(report
        .findings
        .iter()
        .all(|f| matches!(f.source, FindingSource::Repository { .. })));
}

#[tokio::test]
async fn max_files_caps_the_scan() {
    clear_credentials();
    let dir = tempfile::tempdir().unwrap();
    write_fixture_repo(dir.path());

    let options = RunOptions {
        repo_path: dir.path().to_path_buf(),
        max_files: Some(2),
        repo_only: false,
        create_issues: false,
    };
    let report = pipeline::run(offline_config(), &options).await.unwrap();

    assert_eq!(report.files_total, 2);
    // Two file calls plus the repository call
    assert_eq!(report.mock_responses, 3);
}
