//! Finding model, priority normalization, and aggregation.
//!
//! Everything downstream of the interpreter works in these types: a finding
//! always has a priority and always knows whether it came from a single file
//! or from the repository-level pass.

use serde::{Deserialize, Serialize};

/// Finding severity. Ordering is by urgency: Critical sorts first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
}

impl Priority {
    /// Sort key: lower rank means more urgent.
    pub fn rank(&self) -> u8 {
        match self {
            Priority::Critical => 0,
            Priority::High => 1,
            Priority::Medium => 2,
            Priority::Low => 3,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Priority::Critical => "critical",
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

/// Map a free-form priority string to a `Priority`. Total: any input maps
/// to something, defaulting to Medium. Substring matching runs from most to
/// least urgent so "critically low" still reads as critical.
pub fn normalize_priority(raw: &str) -> Priority {
    let lower = raw.trim().to_lowercase();
    if lower.contains("critical") {
        Priority::Critical
    } else if lower.contains("high") {
        Priority::High
    } else if lower.contains("medium") {
        Priority::Medium
    } else if lower.contains("low") {
        Priority::Low
    } else {
        Priority::Medium
    }
}

/// Where a finding came from. A finding is about exactly one file or about
/// the repository as a whole, never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FindingSource {
    File {
        path: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        location: Option<String>,
    },
    Repository {
        area: String,
    },
}

impl FindingSource {
    /// Short label for the source kind, used in issue labels and summaries.
    pub fn kind_label(&self) -> &'static str {
        match self {
            FindingSource::File { .. } => "file",
            FindingSource::Repository { .. } => "repository",
        }
    }
}

/// One actionable observation from an analysis pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub title: String,
    pub description: String,
    pub suggestion: String,
    pub priority: Priority,
    pub source: FindingSource,
}

/// Outcome of interpreting one model response: either findings, or a
/// failure with the raw response text retained for inspection.
#[derive(Debug, Clone)]
pub struct UnitResult {
    pub success: bool,
    pub findings: Vec<Finding>,
    pub error: Option<String>,
    pub raw_response: String,
}

impl UnitResult {
    pub fn ok(findings: Vec<Finding>) -> Self {
        Self {
            success: true,
            findings,
            error: None,
            raw_response: String::new(),
        }
    }

    pub fn failed(error: String, raw_response: String) -> Self {
        Self {
            success: false,
            findings: Vec::new(),
            error: Some(error),
            raw_response,
        }
    }
}

/// Merge per-file results and the repository-level result into one list
/// ordered by priority.
///
/// Failed results contribute nothing. The sort is stable, so findings that
/// share a priority keep their arrival order: file findings in scan order,
/// then repository findings.
pub fn prioritize(
    file_results: &[UnitResult],
    repository_result: Option<&UnitResult>,
) -> Vec<Finding> {
    let mut findings: Vec<Finding> = Vec::new();

    for result in file_results {
        if result.success {
            findings.extend(result.findings.iter().cloned());
        }
    }
    if let Some(result) = repository_result {
        if result.success {
            findings.extend(result.findings.iter().cloned());
        }
    }

    findings.sort_by_key(|f| f.priority.rank());
    findings
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(title: &str, priority: Priority) -> Finding {
        Finding {
            title: title.to_string(),
            description: String::new(),
            suggestion: String::new(),
            priority,
            source: FindingSource::File {
                path: "src/lib.rs".to_string(),
                location: None,
            },
        }
    }

    #[test]
    fn test_normalize_priority_known_values() {
        assert_eq!(normalize_priority("critical"), Priority::Critical);
        assert_eq!(normalize_priority("  HIGH "), Priority::High);
        assert_eq!(normalize_priority("Medium"), Priority::Medium);
        assert_eq!(normalize_priority("low priority"), Priority::Low);
    }

    #[test]
    fn test_normalize_priority_is_total() {
        assert_eq!(normalize_priority(""), Priority::Medium);
        assert_eq!(normalize_priority("urgent!!"), Priority::Medium);
        assert_eq!(normalize_priority("¯\\_(ツ)_/¯"), Priority::Medium);
    }

    #[test]
    fn test_normalize_priority_precedence() {
        // Most urgent substring wins when several match.
        assert_eq!(normalize_priority("critically low"), Priority::Critical);
        assert_eq!(normalize_priority("high-to-medium"), Priority::High);
    }

    #[test]
    fn test_rank_ordering() {
        assert!(Priority::Critical.rank() < Priority::High.rank());
        assert!(Priority::High.rank() < Priority::Medium.rank());
        assert!(Priority::Medium.rank() < Priority::Low.rank());
    }

    #[test]
    fn test_prioritize_orders_and_is_stable() {
        let file_results = vec![UnitResult::ok(vec![
            finding("a", Priority::Low),
            finding("b", Priority::Critical),
            finding("c", Priority::Low),
        ])];
        let repo_result = UnitResult::ok(vec![finding("d", Priority::Low)]);

        let ordered = prioritize(&file_results, Some(&repo_result));
        let titles: Vec<&str> = ordered.iter().map(|f| f.title.as_str()).collect();
        assert_eq!(titles, vec!["b", "a", "c", "d"]);

        // Prioritizing an already-ordered list changes nothing.
        let again = prioritize(&[UnitResult::ok(ordered.clone())], None);
        assert_eq!(again, ordered);
    }

    #[test]
    fn test_prioritize_skips_failed_results() {
        let results = vec![
            UnitResult::ok(vec![finding("kept", Priority::Medium)]),
            UnitResult::failed("bad response".to_string(), "garbage".to_string()),
        ];
        let ordered = prioritize(&results, None);
        assert_eq!(ordered.len(), 1);
        assert_eq!(ordered[0].title, "kept");
    }

    #[test]
    fn test_source_serde_tagging() {
        let src = FindingSource::Repository {
            area: "testing".to_string(),
        };
        let json = serde_json::to_string(&src).unwrap();
        assert!(json.contains(r#""kind":"repository""#));

        let back: FindingSource = serde_json::from_str(&json).unwrap();
        assert_eq!(back, src);
    }
}
