//! Static analysis provider: file walking, structure extraction, metrics.
//!
//! This is the upstream side of the pipeline. It is deliberately cheap and
//! regex-based; the point is to give the model a structural sketch of each
//! file, not to be a real parser.

pub mod metrics;
pub mod scanner;
pub mod structure;

pub use metrics::FileMetrics;
pub use scanner::RepoScanner;
pub use structure::FileStructure;

use std::fs;
use std::path::Path;

/// Everything the pipeline knows about one file before prompting.
#[derive(Debug, Clone)]
pub struct FileAnalysis {
    /// Repo-relative path.
    pub path: String,
    pub language: String,
    /// Raw source text; absent when the file could not be read.
    pub content: Option<String>,
    pub structure: FileStructure,
    pub metrics: Option<FileMetrics>,
    pub success: bool,
    pub error: Option<String>,
}

/// Analyze a single file. Never returns an error: an unreadable file
/// produces a `success:false` unit so one bad file cannot abort the batch.
pub fn analyze_file(root: &Path, relative: &Path) -> FileAnalysis {
    let path = relative.to_string_lossy().to_string();
    let language = detect_language(&path).to_string();

    let content = match fs::read_to_string(root.join(relative)) {
        Ok(c) => c,
        Err(e) => {
            return FileAnalysis {
                path,
                language,
                content: None,
                structure: FileStructure::default(),
                metrics: None,
                success: false,
                error: Some(format!("Failed to read file: {}", e)),
            };
        }
    };

    let structure = structure::extract(&content, &language);
    let metrics = Some(metrics::compute(&content));

    FileAnalysis {
        path,
        language,
        content: Some(content),
        structure,
        metrics,
        success: true,
        error: None,
    }
}

/// Detect programming language from file extension.
pub fn detect_language(path: &str) -> &'static str {
    let ext = path.rsplit('.').next().unwrap_or("");
    match ext {
        "rs" => "Rust",
        "js" | "jsx" => "JavaScript",
        "ts" | "tsx" => "TypeScript",
        "py" => "Python",
        "go" => "Go",
        "java" => "Java",
        "rb" => "Ruby",
        "php" => "PHP",
        "c" | "h" => "C",
        "cpp" | "hpp" | "cc" => "C++",
        "cs" => "C#",
        "swift" => "Swift",
        "kt" => "Kotlin",
        "scala" => "Scala",
        "sh" | "bash" => "Shell",
        "sql" => "SQL",
        "html" => "HTML",
        "css" | "scss" | "sass" => "CSS",
        "json" => "JSON",
        "yaml" | "yml" => "YAML",
        "toml" => "TOML",
        "md" => "Markdown",
        "vue" => "Vue",
        "svelte" => "Svelte",
        _ => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_language() {
        assert_eq!(detect_language("src/main.rs"), "Rust");
        assert_eq!(detect_language("app/index.ts"), "TypeScript");
        assert_eq!(detect_language("README"), "unknown");
    }

    #[test]
    fn test_analyze_file_unreadable_is_soft_failure() {
        let dir = tempfile::tempdir().unwrap();
        let result = analyze_file(dir.path(), Path::new("does_not_exist.rs"));
        assert!(!result.success);
        assert!(result.error.is_some());
        assert!(result.content.is_none());
    }

    #[test]
    fn test_analyze_file_reads_structure_and_metrics() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("lib.rs"), "pub fn foo() {}\n").unwrap();

        let result = analyze_file(dir.path(), Path::new("lib.rs"));
        assert!(result.success);
        assert_eq!(result.language, "Rust");
        assert_eq!(result.structure.functions, vec!["foo"]);
        assert_eq!(result.metrics.as_ref().unwrap().line_count, 1);
    }
}
