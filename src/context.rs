//! Context builder: turns raw analysis output into bounded, prompt-ready text.
//!
//! Never fails. Missing or malformed input degrades to sentinel strings
//! ("unknown", "N/A", empty summaries) so a bad unit can't stall the run.

use crate::analysis::{FileAnalysis, FileMetrics, FileStructure};
use std::collections::BTreeMap;
use std::collections::HashMap;

/// Appended to content cut at the configured maximum.
pub const TRUNCATION_MARKER: &str = "\n... [truncated]";

/// Placeholder values for one prompt, keyed by template placeholder name.
#[derive(Debug, Clone, Default)]
pub struct PromptContext {
    values: BTreeMap<String, String>,
}

impl PromptContext {
    pub fn insert(&mut self, key: &str, value: impl Into<String>) {
        self.values.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|s| s.as_str())
    }

    pub fn values(&self) -> &BTreeMap<String, String> {
        &self.values
    }
}

/// Truncate content to `max_chars` characters, appending the marker when a
/// cut happened. Output length is at most max_chars + marker length.
pub fn truncate_content(content: &str, max_chars: usize) -> String {
    if content.chars().count() <= max_chars {
        return content.to_string();
    }
    let head: String = content.chars().take(max_chars).collect();
    format!("{}{}", head, TRUNCATION_MARKER)
}

/// Render the structural sketch of one file.
///
/// One line per non-empty kind: `"<Kind> (<count>): <names>"`. An entirely
/// empty structure yields the sentinel line.
pub fn structure_summary(structure: &FileStructure) -> String {
    if structure.is_empty() {
        return "No structure information available".to_string();
    }

    let mut lines = Vec::new();
    for (kind, names) in [
        ("Classes", &structure.classes),
        ("Functions", &structure.functions),
        ("Methods", &structure.methods),
    ] {
        if !names.is_empty() {
            lines.push(format!("{} ({}): {}", kind, names.len(), names.join(", ")));
        }
    }
    lines.join("\n")
}

/// Render one file's metrics, with "N/A" for anything unreported.
pub fn metrics_summary(metrics: Option<&FileMetrics>) -> String {
    let line_count = metrics.map(|m| m.line_count).unwrap_or(0);
    let comment = metrics
        .and_then(|m| m.comment_ratio)
        .map(|r| format!("{:.2}%", r * 100.0))
        .unwrap_or_else(|| "N/A".to_string());
    let complexity = metrics
        .and_then(|m| m.cyclomatic_complexity)
        .map(|c| format!("{}", c))
        .unwrap_or_else(|| "N/A".to_string());
    let duplication = metrics
        .and_then(|m| m.duplication_score)
        .map(|d| format!("{:.2}%", d * 100.0))
        .unwrap_or_else(|| "N/A".to_string());

    format!(
        "Lines: {}\nComment ratio: {}\nCyclomatic complexity: {}\nDuplication: {}",
        line_count, comment, complexity, duplication
    )
}

/// Build the prompt context for a single file.
pub fn file_context(unit: &FileAnalysis, max_content_length: usize) -> PromptContext {
    let mut ctx = PromptContext::default();
    ctx.insert("file_path", unit.path.clone());
    ctx.insert("language", unit.language.clone());
    ctx.insert("structure_summary", structure_summary(&unit.structure));
    ctx.insert("metrics_summary", metrics_summary(unit.metrics.as_ref()));
    let content = unit.content.as_deref().unwrap_or("");
    ctx.insert("content", truncate_content(content, max_content_length));
    ctx
}

/// File role buckets used in the repository overview. Each file lands in
/// exactly one, checked in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileCategory {
    Test,
    Config,
    Documentation,
    Source,
}

/// Classify a file by path heuristics: test indicators first, then config,
/// then documentation, everything else is source.
pub fn classify_file(path: &str) -> FileCategory {
    let lower = path.to_lowercase();
    let file_name = lower.rsplit('/').next().unwrap_or(&lower).to_string();
    let ext = file_name.rsplit('.').next().unwrap_or("").to_string();

    if lower.contains("test") || lower.contains("spec.") || lower.contains("__tests__") {
        return FileCategory::Test;
    }

    let config_exts = ["yaml", "yml", "toml", "ini", "cfg", "conf", "env"];
    if config_exts.contains(&ext.as_str())
        || file_name.contains("config")
        || file_name == "dockerfile"
        || file_name == "makefile"
    {
        return FileCategory::Config;
    }

    let doc_exts = ["md", "markdown", "rst", "txt", "adoc"];
    if doc_exts.contains(&ext.as_str()) || lower.starts_with("docs/") || lower.contains("/docs/") {
        return FileCategory::Documentation;
    }

    FileCategory::Source
}

/// Per-category file counts for a repository.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileCategories {
    pub test_files: usize,
    pub config_files: usize,
    pub documentation_files: usize,
    pub source_files: usize,
}

/// Aggregated view of a whole repository, built from per-file analyses.
#[derive(Debug, Clone, Default)]
pub struct RepositoryOverview {
    pub total_files: usize,
    pub analyzed_files: usize,
    pub total_classes: usize,
    pub total_functions: usize,
    pub total_methods: usize,
    /// Language -> file count, sorted descending by count.
    pub languages: Vec<(String, usize)>,
    pub avg_complexity: Option<f64>,
    pub avg_duplication: Option<f64>,
    pub categories: FileCategories,
}

impl RepositoryOverview {
    /// Aggregate across all units. Structural sums and languages only count
    /// successfully analyzed files; averages divide by the number of units
    /// that actually report the metric, not the total unit count.
    pub fn aggregate(units: &[FileAnalysis]) -> Self {
        let mut overview = RepositoryOverview {
            total_files: units.len(),
            ..Default::default()
        };

        let mut language_counts: HashMap<String, usize> = HashMap::new();
        let mut complexity_sum = 0.0;
        let mut complexity_n = 0usize;
        let mut duplication_sum = 0.0;
        let mut duplication_n = 0usize;

        for unit in units {
            match classify_file(&unit.path) {
                FileCategory::Test => overview.categories.test_files += 1,
                FileCategory::Config => overview.categories.config_files += 1,
                FileCategory::Documentation => overview.categories.documentation_files += 1,
                FileCategory::Source => overview.categories.source_files += 1,
            }

            if !unit.success {
                continue;
            }
            overview.analyzed_files += 1;
            overview.total_classes += unit.structure.classes.len();
            overview.total_functions += unit.structure.functions.len();
            overview.total_methods += unit.structure.methods.len();
            *language_counts.entry(unit.language.clone()).or_insert(0) += 1;

            if let Some(metrics) = &unit.metrics {
                if let Some(c) = metrics.cyclomatic_complexity {
                    complexity_sum += c;
                    complexity_n += 1;
                }
                if let Some(d) = metrics.duplication_score {
                    duplication_sum += d;
                    duplication_n += 1;
                }
            }
        }

        let mut languages: Vec<(String, usize)> = language_counts.into_iter().collect();
        languages.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        overview.languages = languages;

        if complexity_n > 0 {
            overview.avg_complexity = Some(complexity_sum / complexity_n as f64);
        }
        if duplication_n > 0 {
            overview.avg_duplication = Some(duplication_sum / duplication_n as f64);
        }

        overview
    }

    fn languages_list(&self) -> String {
        if self.languages.is_empty() {
            return "unknown".to_string();
        }
        self.languages
            .iter()
            .map(|(lang, count)| format!("{}: {} files", lang, count))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn structure_totals(&self) -> String {
        format!(
            "Classes: {}\nFunctions: {}\nMethods: {}",
            self.total_classes, self.total_functions, self.total_methods
        )
    }

    fn metrics_averages(&self) -> String {
        let complexity = self
            .avg_complexity
            .map(|c| format!("{:.1}", c))
            .unwrap_or_else(|| "N/A".to_string());
        let duplication = self
            .avg_duplication
            .map(|d| format!("{:.2}%", d * 100.0))
            .unwrap_or_else(|| "N/A".to_string());
        format!(
            "Average complexity: {}\nAverage duplication: {}",
            complexity, duplication
        )
    }

    fn categories_list(&self) -> String {
        format!(
            "Source files: {}\nTest files: {}\nConfig files: {}\nDocumentation files: {}",
            self.categories.source_files,
            self.categories.test_files,
            self.categories.config_files,
            self.categories.documentation_files
        )
    }
}

/// Build the prompt context for a whole-repository analysis.
pub fn repository_context(repo_name: &str, overview: &RepositoryOverview) -> PromptContext {
    let mut ctx = PromptContext::default();
    ctx.insert("repository_name", repo_name);
    ctx.insert("file_count", overview.total_files.to_string());
    ctx.insert("analyzed_count", overview.analyzed_files.to_string());
    ctx.insert("languages_list", overview.languages_list());
    ctx.insert("structure_summary", overview.structure_totals());
    ctx.insert("metrics_summary", overview.metrics_averages());
    ctx.insert("file_categories", overview.categories_list());
    ctx
}
