//! Pipeline orchestration: scan, analyze, prompt, invoke, interpret, report.
//!
//! Stage failures degrade instead of aborting: an unreadable file becomes a
//! failed unit, a dead model becomes a mock response, an unparseable answer
//! becomes a failed result. The only hard error before reporting is a
//! repository with nothing to analyze.

use crate::ai::{AnalysisMode, ModelInvoker, Provenance};
use crate::analysis::{self, FileAnalysis, RepoScanner};
use crate::config::Config;
use crate::context::{self, RepositoryOverview};
use crate::findings::{prioritize, UnitResult};
use crate::github::{issue_from_finding, IssueEmitter};
use crate::interpret::{interpret, Origin};
use crate::prompt::{compose, TemplateKind};
use crate::report::RunReport;
use anyhow::{bail, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};

/// What a run should cover.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub repo_path: PathBuf,
    /// Cap on files sent to the model; None analyzes everything found.
    pub max_files: Option<usize>,
    /// Skip per-file analysis and run only the repository-level pass.
    pub repo_only: bool,
    /// Open a tracker issue per finding after reporting.
    pub create_issues: bool,
}

/// Run the full analysis pipeline and return the report.
pub async fn run(config: Config, options: &RunOptions) -> Result<RunReport> {
    let started_at = Utc::now();
    let repo_name = repository_name(&options.repo_path);

    eprintln!("Scanning {}...", options.repo_path.display());
    let mut files = RepoScanner::new().scan(&options.repo_path)?;
    if files.is_empty() {
        bail!(
            "No analyzable files found in {}",
            options.repo_path.display()
        );
    }
    if let Some(max) = options.max_files {
        files.truncate(max);
    }
    eprintln!("  Found {} analyzable files", files.len());

    let units: Vec<FileAnalysis> = files
        .iter()
        .map(|f| analysis::analyze_file(&options.repo_path, f))
        .collect();

    // One bad file degrades; all of them failing is a broken input.
    if !units.iter().any(|u| u.success) {
        bail!(
            "None of the {} files in {} could be read",
            units.len(),
            options.repo_path.display()
        );
    }

    let invoker = ModelInvoker::new(config)?;
    let template_dir = invoker.config().template_dir.clone();
    let mut provenances: Vec<Provenance> = Vec::new();

    // Per-file pass: prompts for readable units, in scan order.
    let mut file_results: Vec<UnitResult> = Vec::new();
    if !options.repo_only {
        let analyzable: Vec<&FileAnalysis> = units.iter().filter(|u| u.success).collect();
        eprintln!("Analyzing {} files...", analyzable.len());

        let prompts: Vec<String> = analyzable
            .iter()
            .map(|unit| {
                let ctx = context::file_context(unit, invoker.config().max_content_length);
                compose(TemplateKind::File, template_dir.as_deref(), &ctx).text
            })
            .collect();

        let responses = invoker.invoke_file_batch(&prompts).await;
        for (unit, response) in analyzable.iter().zip(responses.iter()) {
            provenances.push(response.provenance.clone());
            let origin = Origin::File {
                path: unit.path.clone(),
            };
            file_results.push(interpret(response, &origin));
        }
    }

    // Repository-level pass over the aggregate view.
    eprintln!("Analyzing repository structure...");
    let overview = RepositoryOverview::aggregate(&units);
    let repo_ctx = context::repository_context(&repo_name, &overview);
    let repo_prompt = compose(TemplateKind::Repository, template_dir.as_deref(), &repo_ctx);
    let repo_response = invoker
        .invoke(&repo_prompt.text, AnalysisMode::Repository)
        .await;
    provenances.push(repo_response.provenance.clone());
    let repo_result = interpret(&repo_response, &Origin::Repository);

    let findings = prioritize(&file_results, Some(&repo_result));

    let report = RunReport {
        repository: repo_name,
        started_at,
        finished_at: Utc::now(),
        files_total: overview.total_files,
        files_analyzed: overview.analyzed_files,
        mock_responses: RunReport::count_mock(&provenances),
        findings,
    };

    if options.create_issues {
        emit_issues(&options.repo_path, &report).await?;
    }

    Ok(report)
}

/// Create one issue per finding, sequentially, most urgent first.
async fn emit_issues(repo_path: &Path, report: &RunReport) -> Result<()> {
    if report.findings.is_empty() {
        eprintln!("No findings to file as issues");
        return Ok(());
    }

    let emitter = IssueEmitter::for_repository(repo_path)?;
    eprintln!("Creating {} issues...", report.findings.len());

    for finding in &report.findings {
        let issue = issue_from_finding(finding);
        match emitter.create_issue(&issue).await {
            Ok(created) => {
                eprintln!("  Created issue #{}: {}", created.number, created.url);
            }
            Err(e) => {
                eprintln!("  Warning: Could not create issue '{}': {}", issue.title, e);
            }
        }
    }
    Ok(())
}

fn repository_name(path: &Path) -> String {
    path.canonicalize()
        .ok()
        .as_deref()
        .unwrap_or(path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "repository".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_name_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let named = dir.path().join("my-project");
        std::fs::create_dir(&named).unwrap();
        assert_eq!(repository_name(&named), "my-project");
    }

    #[tokio::test]
    async fn test_run_bails_on_empty_repository() {
        let dir = tempfile::tempdir().unwrap();
        let options = RunOptions {
            repo_path: dir.path().to_path_buf(),
            max_files: None,
            repo_only: false,
            create_issues: false,
        };
        let err = run(Config::default(), &options).await.unwrap_err();
        assert!(err.to_string().contains("No analyzable files"));
    }

    #[tokio::test]
    async fn test_run_bails_when_no_file_is_readable() {
        let dir = tempfile::tempdir().unwrap();
        // Invalid UTF-8, so read_to_string fails on the only file found
        std::fs::write(dir.path().join("data.rs"), [0xFFu8, 0xFE, 0x00, 0x9F]).unwrap();

        let options = RunOptions {
            repo_path: dir.path().to_path_buf(),
            max_files: None,
            repo_only: false,
            create_issues: false,
        };
        let err = run(Config::default(), &options).await.unwrap_err();
        assert!(err.to_string().contains("could be read"));
    }
}
