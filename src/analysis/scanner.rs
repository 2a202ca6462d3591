use anyhow::Result;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Walks a repository and yields the source files worth analyzing.
pub struct RepoScanner {
    ignore_dirs: Vec<String>,
}

impl RepoScanner {
    pub fn new() -> Self {
        let ignore_dirs = vec![
            ".git".to_string(),
            "node_modules".to_string(),
            "target".to_string(),
            "vendor".to_string(),
            "dist".to_string(),
            "build".to_string(),
            ".next".to_string(),
            "__pycache__".to_string(),
            ".venv".to_string(),
            "venv".to_string(),
        ];
        Self { ignore_dirs }
    }

    /// Scan a directory tree for analyzable files, returning repo-relative
    /// paths in a stable (sorted) order.
    pub fn scan(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        // The root is never filtered: its own name (hidden or not) says
        // nothing about its contents.
        for entry in WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !self.should_ignore(e))
        {
            let entry = match entry {
                Ok(e) => e,
                Err(_) => continue,
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            if !self.is_analyzable_file(path) {
                continue;
            }

            let relative = path.strip_prefix(root).unwrap_or(path).to_path_buf();
            files.push(relative);
        }

        // Deterministic ordering regardless of filesystem iteration order
        files.sort();
        Ok(files)
    }

    fn should_ignore(&self, entry: &walkdir::DirEntry) -> bool {
        entry
            .file_name()
            .to_str()
            .map(|name| {
                self.ignore_dirs.contains(&name.to_string())
                    || (name.starts_with('.') && name != "." && name != "..")
            })
            .unwrap_or(false)
    }

    fn is_analyzable_file(&self, path: &Path) -> bool {
        let text_extensions = [
            "rs", "js", "ts", "tsx", "jsx", "py", "rb", "go", "java", "kt", "scala", "c", "cpp",
            "h", "hpp", "cs", "swift", "php", "sh", "bash", "sql", "html", "css", "scss", "vue",
            "svelte", "json", "yaml", "yml", "toml", "xml", "ini", "cfg", "md", "markdown", "txt",
            "rst",
        ];

        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            return text_extensions.contains(&ext.to_lowercase().as_str());
        }

        // Common extensionless files are still worth the model's attention
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            let name_lower = name.to_lowercase();
            return matches!(
                name_lower.as_str(),
                "makefile" | "dockerfile" | "gemfile" | "rakefile" | "procfile"
            );
        }

        false
    }
}

impl Default for RepoScanner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_scan_skips_ignored_dirs_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::create_dir_all(dir.path().join("node_modules/pkg")).unwrap();
        fs::write(dir.path().join("src/main.rs"), "fn main() {}\n").unwrap();
        fs::write(dir.path().join("README.md"), "# hi\n").unwrap();
        fs::write(dir.path().join("node_modules/pkg/index.js"), "x\n").unwrap();
        fs::write(dir.path().join("image.png"), [0u8, 1, 2]).unwrap();

        let files = RepoScanner::new().scan(dir.path()).unwrap();
        assert_eq!(
            files,
            vec![PathBuf::from("README.md"), PathBuf::from("src/main.rs")]
        );
    }

    #[test]
    fn test_scan_root_with_hidden_name_is_not_filtered() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join(".hidden-checkout");
        fs::create_dir(&root).unwrap();
        fs::write(root.join("main.rs"), "fn main() {}\n").unwrap();
        fs::create_dir(root.join(".git")).unwrap();
        fs::write(root.join(".git/config"), "[core]\n").unwrap();

        let files = RepoScanner::new().scan(&root).unwrap();
        // The hidden root scans fine; hidden directories inside it still don't
        assert_eq!(files, vec![PathBuf::from("main.rs")]);
    }
}
