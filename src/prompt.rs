//! Prompt composer: renders a context into the final model instruction.
//!
//! Two templates, selected by the caller's intent. A user-supplied template
//! file is preferred; any read failure falls back to the built-in default
//! with a logged warning, never an error back to the caller.

use crate::context::PromptContext;
use std::fs;
use std::path::{Path, PathBuf};

/// Which analysis the prompt is for. Chosen by the caller, never inferred
/// from content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    File,
    Repository,
}

impl TemplateKind {
    /// File name looked up inside the user template directory.
    pub fn file_name(&self) -> &'static str {
        match self {
            TemplateKind::File => "file_analysis.md",
            TemplateKind::Repository => "repository_analysis.md",
        }
    }
}

/// Which template actually got used, so tests and operators can tell the
/// fallback path from the primary one without scraping logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSource {
    Builtin,
    Custom(PathBuf),
}

/// A template plus the provenance of where it came from.
#[derive(Debug, Clone)]
pub struct ResolvedTemplate {
    pub text: String,
    pub source: TemplateSource,
}

/// A fully rendered prompt.
#[derive(Debug, Clone)]
pub struct ComposedPrompt {
    pub text: String,
    pub template_source: TemplateSource,
}

const FILE_TEMPLATE: &str = r#"You are analyzing a single source file for actionable issues.

File: {{file_path}}
Language: {{language}}

Structure:
{{structure_summary}}

Metrics:
{{metrics_summary}}

Content:
```
{{content}}
```

Identify findings in these categories: bugs, code smells, performance issues, security issues, improvements.

Respond with ONLY a JSON object, no markdown fences, no commentary, of exactly this shape:
{"findings": [{"title": "...", "description": "...", "location": "...", "suggestion": "...", "priority": "critical|high|medium|low"}]}
"#;

const REPOSITORY_TEMPLATE: &str = r#"You are analyzing a whole repository for architectural and structural issues.

Repository: {{repository_name}}
Files: {{file_count}} ({{analyzed_count}} analyzed)

Languages:
{{languages_list}}

Structure totals:
{{structure_summary}}

Metrics:
{{metrics_summary}}

File breakdown:
{{file_categories}}

Identify findings in these categories: architecture issues, technical debt, structural improvements, feature suggestions, documentation needs.

Respond with ONLY a JSON object, no markdown fences, no commentary, of exactly this shape:
{"findings": [{"title": "...", "description": "...", "area": "...", "suggestion": "...", "priority": "critical|high|medium|low"}]}
"#;

fn builtin_template(kind: TemplateKind) -> &'static str {
    match kind {
        TemplateKind::File => FILE_TEMPLATE,
        TemplateKind::Repository => REPOSITORY_TEMPLATE,
    }
}

/// Resolve the template for `kind`: the user file under `template_dir` when
/// readable, otherwise the built-in default. Never fails.
pub fn resolve_template(kind: TemplateKind, template_dir: Option<&Path>) -> ResolvedTemplate {
    if let Some(dir) = template_dir {
        let path = dir.join(kind.file_name());
        match fs::read_to_string(&path) {
            Ok(text) => {
                return ResolvedTemplate {
                    text,
                    source: TemplateSource::Custom(path),
                };
            }
            Err(e) => {
                eprintln!(
                    "  Warning: Could not read template {} ({}); using built-in default",
                    path.display(),
                    e
                );
            }
        }
    }
    ResolvedTemplate {
        text: builtin_template(kind).to_string(),
        source: TemplateSource::Builtin,
    }
}

/// Substitute every `{{key}}` placeholder that has a value in the context.
/// Unknown placeholders are left as-is.
pub fn render(template: &str, ctx: &PromptContext) -> String {
    let mut rendered = template.to_string();
    for (key, value) in ctx.values() {
        let placeholder = format!("{{{{{}}}}}", key);
        if rendered.contains(&placeholder) {
            rendered = rendered.replace(&placeholder, value);
        }
    }
    rendered
}

/// Resolve and render in one step.
pub fn compose(kind: TemplateKind, template_dir: Option<&Path>, ctx: &PromptContext) -> ComposedPrompt {
    let template = resolve_template(kind, template_dir);
    ComposedPrompt {
        text: render(&template.text, ctx),
        template_source: template.source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx_with(pairs: &[(&str, &str)]) -> PromptContext {
        let mut ctx = PromptContext::default();
        for (k, v) in pairs {
            ctx.insert(k, *v);
        }
        ctx
    }

    #[test]
    fn test_render_substitutes_placeholders() {
        let ctx = ctx_with(&[("file_path", "src/lib.rs"), ("language", "Rust")]);
        let out = render("path={{file_path}} lang={{language}} keep={{other}}", &ctx);
        assert_eq!(out, "path=src/lib.rs lang=Rust keep={{other}}");
    }

    #[test]
    fn test_builtin_templates_demand_json_shape() {
        for kind in [TemplateKind::File, TemplateKind::Repository] {
            let resolved = resolve_template(kind, None);
            assert_eq!(resolved.source, TemplateSource::Builtin);
            assert!(resolved.text.contains(r#"{"findings":"#));
            assert!(resolved.text.contains("critical|high|medium|low"));
        }
    }

    #[test]
    fn test_missing_custom_template_falls_back_silently() {
        let dir = tempfile::tempdir().unwrap();
        let resolved = resolve_template(TemplateKind::File, Some(dir.path()));
        assert_eq!(resolved.source, TemplateSource::Builtin);
    }

    #[test]
    fn test_custom_template_is_preferred() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("file_analysis.md");
        std::fs::write(&path, "Custom: {{file_path}}").unwrap();

        let ctx = ctx_with(&[("file_path", "a.rs")]);
        let composed = compose(TemplateKind::File, Some(dir.path()), &ctx);
        assert_eq!(composed.text, "Custom: a.rs");
        assert_eq!(composed.template_source, TemplateSource::Custom(path));
    }

    #[test]
    fn test_compose_file_prompt_contains_context() {
        let ctx = ctx_with(&[
            ("file_path", "src/main.rs"),
            ("language", "Rust"),
            ("structure_summary", "Functions (1): foo"),
            ("metrics_summary", "Lines: 120"),
            ("content", "fn foo() {}"),
        ]);
        let composed = compose(TemplateKind::File, None, &ctx);
        assert!(composed.text.contains("src/main.rs"));
        assert!(composed.text.contains("Rust"));
        assert!(composed.text.contains("Functions (1): foo"));
    }
}
