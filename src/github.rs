//! Native GitHub API integration: turning findings into issues.
//!
//! Token comes from the GITHUB_TOKEN environment variable; owner/repo are
//! derived from the repository's git remote. Issues are created one per
//! finding, sequentially, in the order the prioritizer produced.

use crate::findings::{Finding, FindingSource};
use anyhow::{Context, Result};
use git2::Repository;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

const API_TIMEOUT_SECS: u64 = 60;
const USER_AGENT: &str = "repolens";

/// Maximum length for error body content in error messages.
const MAX_ERROR_BODY_LEN: usize = 200;

/// Get the GitHub token from the environment, or None.
pub fn get_token() -> Option<String> {
    match std::env::var("GITHUB_TOKEN") {
        Ok(token) if !token.is_empty() => Some(token),
        _ => None,
    }
}

/// Sanitize an API error body to prevent credential leakage.
fn sanitize_error_body(body: &str) -> String {
    const SECRET_PATTERNS: &[&str] = &[
        "token",
        "secret",
        "password",
        "credential",
        "bearer",
        "ghp_",
        "gho_",
        "github_pat_",
    ];

    let truncated = if body.chars().count() > MAX_ERROR_BODY_LEN {
        let head: String = body.chars().take(MAX_ERROR_BODY_LEN).collect();
        format!("{}... (truncated)", head)
    } else {
        body.to_string()
    };

    let lower = truncated.to_lowercase();
    for pattern in SECRET_PATTERNS {
        if lower.contains(pattern) {
            return "(error details redacted - may contain sensitive data)".to_string();
        }
    }

    truncated
}

/// Extract owner and repo from a git remote URL.
///
/// Supports:
/// - git@github.com:owner/repo.git
/// - https://github.com/owner/repo.git
/// - https://github.com/owner/repo
pub fn parse_remote_url(url: &str) -> Option<(String, String)> {
    if let Some(rest) = url.strip_prefix("git@github.com:") {
        let path = rest.trim_end_matches(".git");
        let parts: Vec<&str> = path.splitn(2, '/').collect();
        if parts.len() == 2 {
            return Some((parts[0].to_string(), parts[1].to_string()));
        }
    }

    if url.contains("github.com") {
        if let Ok(parsed) = url::Url::parse(url) {
            let path = parsed
                .path()
                .trim_start_matches('/')
                .trim_end_matches(".git");
            let parts: Vec<&str> = path.splitn(2, '/').collect();
            if parts.len() == 2 {
                return Some((parts[0].to_string(), parts[1].to_string()));
            }
        }

        // Fallback for URLs without a scheme
        let path = url
            .split("github.com")
            .nth(1)?
            .trim_start_matches(['/', ':'])
            .trim_end_matches(".git");
        let parts: Vec<&str> = path.splitn(2, '/').collect();
        if parts.len() == 2 {
            return Some((parts[0].to_string(), parts[1].to_string()));
        }
    }

    None
}

/// Get the owner and repo from the repository's remotes.
pub fn get_remote_info(repo_path: &Path) -> Result<(String, String)> {
    let repo = Repository::open(repo_path).context("Failed to open repository")?;

    for remote_name in ["origin", "upstream", "github"] {
        if let Ok(remote) = repo.find_remote(remote_name) {
            if let Some(url) = remote.url() {
                if let Some((owner, repo_name)) = parse_remote_url(url) {
                    return Ok((owner, repo_name));
                }
            }
        }
    }

    if let Ok(remotes) = repo.remotes() {
        for name in remotes.iter().flatten() {
            if let Ok(remote) = repo.find_remote(name) {
                if let Some(url) = remote.url() {
                    if let Some((owner, repo_name)) = parse_remote_url(url) {
                        return Ok((owner, repo_name));
                    }
                }
            }
        }
    }

    Err(anyhow::anyhow!(
        "No GitHub remote found. Make sure you have a remote pointing to github.com"
    ))
}

/// Issue payload for the tracker.
#[derive(Debug, Clone, Serialize)]
pub struct NewIssue {
    pub title: String,
    pub body: String,
    pub labels: Vec<String>,
}

/// A created issue, as reported by the API.
#[derive(Debug, Clone)]
pub struct CreatedIssue {
    pub number: u64,
    pub url: String,
}

#[derive(Deserialize)]
struct CreateIssueResponse {
    number: u64,
    html_url: String,
}

/// Render one finding as an issue payload.
pub fn issue_from_finding(finding: &Finding) -> NewIssue {
    let mut body = String::new();
    body.push_str("## Description\n\n");
    body.push_str(&finding.description);
    body.push_str("\n\n");

    match &finding.source {
        FindingSource::File { path, location } => {
            body.push_str("## Location\n\n");
            body.push_str(&format!("`{}`", path));
            if let Some(loc) = location {
                body.push_str(&format!(" ({})", loc));
            }
            body.push_str("\n\n");
        }
        FindingSource::Repository { area } => {
            body.push_str("## Area\n\n");
            body.push_str(area);
            body.push_str("\n\n");
        }
    }

    if !finding.suggestion.is_empty() {
        body.push_str("## Suggested fix\n\n");
        body.push_str(&finding.suggestion);
        body.push_str("\n\n");
    }

    body.push_str("---\n*Opened by repolens*\n");

    NewIssue {
        title: finding.title.clone(),
        body,
        labels: vec![
            finding.priority.label().to_string(),
            format!("{}-analysis", finding.source.kind_label()),
        ],
    }
}

/// Creates issues against one repository.
pub struct IssueEmitter {
    client: reqwest::Client,
    owner: String,
    repo: String,
    token: String,
}

impl IssueEmitter {
    pub fn new(owner: String, repo: String, token: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(API_TIMEOUT_SECS))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            client,
            owner,
            repo,
            token,
        })
    }

    /// Build an emitter for the repository at `path`, using its git remote
    /// and the GITHUB_TOKEN environment variable.
    pub fn for_repository(path: &Path) -> Result<Self> {
        let token = get_token()
            .ok_or_else(|| anyhow::anyhow!("GITHUB_TOKEN not set; cannot create issues"))?;
        let (owner, repo) = get_remote_info(path)?;
        Self::new(owner, repo, token)
    }

    /// Create one issue. Callers emit findings sequentially so issue order
    /// matches priority order.
    pub async fn create_issue(&self, issue: &NewIssue) -> Result<CreatedIssue> {
        let url = format!(
            "https://api.github.com/repos/{}/{}/issues",
            self.owner, self.repo
        );

        let response = self
            .client
            .post(&url)
            .header("Accept", "application/vnd.github+json")
            .header("Authorization", format!("Bearer {}", self.token))
            .header("User-Agent", USER_AGENT)
            .header("X-GitHub-Api-Version", "2022-11-28")
            .json(issue)
            .send()
            .await
            .context("Failed to reach GitHub")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!(
                "GitHub returned error {}: {}",
                status,
                sanitize_error_body(&body)
            ));
        }

        let created: CreateIssueResponse = response
            .json()
            .await
            .context("Failed to parse issue creation response")?;

        Ok(CreatedIssue {
            number: created.number,
            url: created.html_url,
        })
    }
}
