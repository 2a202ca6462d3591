//! Run report: what the pipeline did and what it found.

use crate::ai::Provenance;
use crate::findings::{Finding, FindingSource, Priority};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Summary of one pipeline run, serializable for downstream tooling.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub repository: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub files_total: usize,
    pub files_analyzed: usize,
    /// Model calls answered by the deterministic mock instead of the live
    /// provider.
    pub mock_responses: usize,
    pub findings: Vec<Finding>,
}

impl RunReport {
    /// Count mock substitutions across a run's responses.
    pub fn count_mock(provenances: &[Provenance]) -> usize {
        provenances
            .iter()
            .filter(|p| matches!(p, Provenance::MockFallback { .. }))
            .count()
    }

    fn count_by_priority(&self, priority: Priority) -> usize {
        self.findings
            .iter()
            .filter(|f| f.priority == priority)
            .count()
    }

    /// Render the human-readable report.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("Repository: {}\n", self.repository));
        out.push_str(&format!(
            "Analyzed {} of {} files\n",
            self.files_analyzed, self.files_total
        ));
        if self.mock_responses > 0 {
            out.push_str(&format!(
                "Mock responses: {} (no live model output for these)\n",
                self.mock_responses
            ));
        }
        out.push_str(&format!(
            "Findings: {} ({} critical, {} high, {} medium, {} low)\n",
            self.findings.len(),
            self.count_by_priority(Priority::Critical),
            self.count_by_priority(Priority::High),
            self.count_by_priority(Priority::Medium),
            self.count_by_priority(Priority::Low),
        ));

        if !self.findings.is_empty() {
            out.push('\n');
        }
        for (i, finding) in self.findings.iter().enumerate() {
            out.push_str(&format!(
                "{}. [{}] {}\n",
                i + 1,
                finding.priority.label().to_uppercase(),
                finding.title
            ));
            match &finding.source {
                FindingSource::File { path, location } => {
                    out.push_str(&format!("   File: {}", path));
                    if let Some(loc) = location {
                        out.push_str(&format!(" ({})", loc));
                    }
                    out.push('\n');
                }
                FindingSource::Repository { area } => {
                    out.push_str(&format!("   Area: {}\n", area));
                }
            }
            if !finding.description.is_empty() {
                out.push_str(&format!("   {}\n", finding.description));
            }
            if !finding.suggestion.is_empty() {
                out.push_str(&format!("   Fix: {}\n", finding.suggestion));
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report_with(findings: Vec<Finding>) -> RunReport {
        let now = Utc::now();
        RunReport {
            repository: "demo".to_string(),
            started_at: now,
            finished_at: now,
            files_total: 4,
            files_analyzed: 3,
            mock_responses: 0,
            findings,
        }
    }

    #[test]
    fn test_render_counts_line() {
        let report = report_with(vec![Finding {
            title: "Something".to_string(),
            description: "Details.".to_string(),
            suggestion: String::new(),
            priority: Priority::High,
            source: FindingSource::Repository {
                area: "testing".to_string(),
            },
        }]);

        let rendered = report.render();
        assert!(rendered.contains("Analyzed 3 of 4 files"));
        assert!(rendered.contains("Findings: 1 (0 critical, 1 high, 0 medium, 0 low)"));
        assert!(rendered.contains("[HIGH] Something"));
        assert!(rendered.contains("Area: testing"));
    }

    #[test]
    fn test_mock_line_only_when_present() {
        let report = report_with(Vec::new());
        assert!(!report.render().contains("Mock responses"));

        let mut with_mock = report_with(Vec::new());
        with_mock.mock_responses = 2;
        assert!(with_mock.render().contains("Mock responses: 2"));
    }

    #[test]
    fn test_count_mock() {
        let provenances = vec![
            Provenance::Live,
            Provenance::MockFallback {
                reason: "no key".to_string(),
            },
            Provenance::Live,
        ];
        assert_eq!(RunReport::count_mock(&provenances), 1);
    }
}
