//! Regex-based structure extraction.
//!
//! Picks out named classes, functions, and methods across the common
//! languages. A definition found at indentation depth is counted as a
//! method; top-level definitions are functions. Rough, but all the prompt
//! needs is names and counts.

use regex::Regex;
use std::sync::OnceLock;

/// Named declarations found in one file. Any of the lists may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileStructure {
    pub classes: Vec<String>,
    pub functions: Vec<String>,
    pub methods: Vec<String>,
}

impl FileStructure {
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty() && self.functions.is_empty() && self.methods.is_empty()
    }
}

fn class_patterns() -> &'static Vec<Regex> {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        vec![
            // Python/JS/TS/Java/C#/Ruby/PHP class declarations
            Regex::new(r"^\s*(?:export\s+)?(?:abstract\s+)?(?:public\s+|private\s+|internal\s+)?class\s+([A-Za-z_]\w*)").unwrap(),
            // Rust nominal types
            Regex::new(r"^\s*(?:pub(?:\([^)]*\))?\s+)?(?:struct|enum|trait)\s+([A-Za-z_]\w*)").unwrap(),
            // TS/Java interfaces
            Regex::new(r"^\s*(?:export\s+)?interface\s+([A-Za-z_]\w*)").unwrap(),
        ]
    })
}

fn function_patterns() -> &'static Vec<Regex> {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        vec![
            // Rust: fn name(
            Regex::new(r"^(\s*)(?:pub(?:\([^)]*\))?\s+)?(?:async\s+)?(?:unsafe\s+)?fn\s+([A-Za-z_]\w*)").unwrap(),
            // JavaScript/TypeScript: function name(
            Regex::new(r"^(\s*)(?:export\s+)?(?:async\s+)?function\s+([A-Za-z_]\w*)").unwrap(),
            // JS/TS: const name = (...) => / const name = async (
            Regex::new(r"^(\s*)(?:export\s+)?(?:const|let|var)\s+([A-Za-z_]\w*)\s*=\s*(?:async\s+)?\(").unwrap(),
            // Python: def name(
            Regex::new(r"^(\s*)(?:async\s+)?def\s+([A-Za-z_]\w*)").unwrap(),
            // Go: func name( or func (recv) name(
            Regex::new(r"^(\s*)func\s+(?:\([^)]*\)\s+)?([A-Za-z_]\w*)").unwrap(),
            // Ruby: def name
            Regex::new(r"^(\s*)def\s+([A-Za-z_]\w*)").unwrap(),
            // PHP: function name(
            Regex::new(r"^(\s*)(?:public\s+|private\s+|protected\s+)?(?:static\s+)?function\s+([A-Za-z_]\w*)").unwrap(),
        ]
    })
}

/// Extract the structural sketch of one file.
///
/// `language` is advisory; all patterns run regardless so mixed or
/// misdetected files still produce something useful.
pub fn extract(content: &str, language: &str) -> FileStructure {
    let mut structure = FileStructure::default();

    // Go methods carry a receiver; everything else falls back to the
    // indentation heuristic below.
    let go_method = language == "Go";

    for line in content.lines() {
        let mut matched_class = false;
        for pattern in class_patterns() {
            if let Some(caps) = pattern.captures(line) {
                if let Some(name) = caps.get(1) {
                    push_unique(&mut structure.classes, name.as_str());
                    matched_class = true;
                    break;
                }
            }
        }
        if matched_class {
            continue;
        }

        for pattern in function_patterns() {
            if let Some(caps) = pattern.captures(line) {
                let indent = caps.get(1).map(|m| m.as_str().len()).unwrap_or(0);
                if let Some(name) = caps.get(2) {
                    let is_method = if go_method {
                        line.trim_start().starts_with("func (")
                    } else {
                        indent > 0
                    };
                    if is_method {
                        push_unique(&mut structure.methods, name.as_str());
                    } else {
                        push_unique(&mut structure.functions, name.as_str());
                    }
                }
                break;
            }
        }
    }

    structure
}

fn push_unique(list: &mut Vec<String>, name: &str) {
    if !list.iter().any(|n| n == name) {
        list.push(name.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_rust_structure() {
        let source = "pub struct Config {}\n\npub fn load() {}\n\nimpl Config {\n    fn save(&self) {}\n}\n";
        let structure = extract(source, "Rust");
        assert_eq!(structure.classes, vec!["Config"]);
        assert_eq!(structure.functions, vec!["load"]);
        assert_eq!(structure.methods, vec!["save"]);
    }

    #[test]
    fn test_extract_python_methods_by_indent() {
        let source = "class Store:\n    def get(self):\n        pass\n\ndef helper():\n    pass\n";
        let structure = extract(source, "Python");
        assert_eq!(structure.classes, vec!["Store"]);
        assert_eq!(structure.methods, vec!["get"]);
        assert_eq!(structure.functions, vec!["helper"]);
    }

    #[test]
    fn test_extract_empty_for_plain_text() {
        let structure = extract("just some prose\nwith no code\n", "Markdown");
        assert!(structure.is_empty());
    }

    #[test]
    fn test_extract_dedupes_names() {
        let source = "fn run() {}\nfn run() {}\n";
        let structure = extract(source, "Rust");
        assert_eq!(structure.functions, vec!["run"]);
    }
}
