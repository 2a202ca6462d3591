//! Per-file metric computation: size, comment density, branching, duplication.

use std::collections::HashMap;

/// Metrics for a single file. Optional fields are absent when the input
/// gave us nothing to measure.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileMetrics {
    pub line_count: usize,
    /// Fraction of lines that are comments, 0.0-1.0.
    pub comment_ratio: Option<f64>,
    /// Decision-point count, an approximation of cyclomatic complexity.
    pub cyclomatic_complexity: Option<f64>,
    /// Fraction of non-trivial lines that occur more than once, 0.0-1.0.
    pub duplication_score: Option<f64>,
}

const DECISION_KEYWORDS: &[&str] = &[
    "if ", "if(", "for ", "for(", "while ", "while(", "match ", "switch ", "switch(", "case ",
    "elif ", "catch ", "catch(", "&&", "||", "?.",
];

/// Minimum trimmed length for a line to count toward duplication.
const DUPLICATION_MIN_LINE_LEN: usize = 10;

/// Compute metrics for one file's content.
pub fn compute(content: &str) -> FileMetrics {
    let lines: Vec<&str> = content.lines().collect();
    let line_count = lines.len();

    if line_count == 0 {
        return FileMetrics {
            line_count: 0,
            ..Default::default()
        };
    }

    let comment_lines = lines
        .iter()
        .filter(|line| {
            let trimmed = line.trim_start();
            trimmed.starts_with("//")
                || trimmed.starts_with('#')
                || trimmed.starts_with("/*")
                || trimmed.starts_with('*')
                || trimmed.starts_with("--")
        })
        .count();
    let comment_ratio = comment_lines as f64 / line_count as f64;

    // 1 + decision points, the classic lower-bound approximation
    let decisions: usize = lines
        .iter()
        .map(|line| {
            DECISION_KEYWORDS
                .iter()
                .map(|kw| line.matches(kw).count())
                .sum::<usize>()
        })
        .sum();
    let cyclomatic_complexity = 1.0 + decisions as f64;

    let duplication_score = duplication(&lines);

    FileMetrics {
        line_count,
        comment_ratio: Some(comment_ratio),
        cyclomatic_complexity: Some(cyclomatic_complexity),
        duplication_score,
    }
}

fn duplication(lines: &[&str]) -> Option<f64> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut considered = 0usize;

    for line in lines {
        let trimmed = line.trim();
        if trimmed.len() <= DUPLICATION_MIN_LINE_LEN {
            continue;
        }
        considered += 1;
        *counts.entry(trimmed).or_insert(0) += 1;
    }

    if considered == 0 {
        return None;
    }

    let duplicated: usize = counts.values().filter(|&&c| c > 1).map(|&c| c).sum();
    Some(duplicated as f64 / considered as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_empty_content() {
        let m = compute("");
        assert_eq!(m.line_count, 0);
        assert!(m.comment_ratio.is_none());
        assert!(m.cyclomatic_complexity.is_none());
    }

    #[test]
    fn test_comment_ratio() {
        let m = compute("// a comment\nlet x = 1;\n");
        assert_eq!(m.line_count, 2);
        assert!((m.comment_ratio.unwrap() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_complexity_counts_decisions() {
        let m = compute("if x { }\nwhile y { }\nlet z = 3;\n");
        assert_eq!(m.cyclomatic_complexity, Some(3.0));
    }

    #[test]
    fn test_duplication_flags_repeats() {
        let source = "let long_enough_line = 1;\nlet long_enough_line = 1;\nunique_statement_here();\n";
        let m = compute(source);
        let score = m.duplication_score.unwrap();
        assert!(score > 0.6 && score < 0.7, "score was {}", score);
    }
}
