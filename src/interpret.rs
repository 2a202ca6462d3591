//! Response interpreter: model text -> canonical findings.
//!
//! Primary path parses the response as the requested JSON envelope, with
//! repair for the usual LLM damage (markdown fences, trailing commas, smart
//! quotes). When JSON parsing fails outright, a heuristic line scanner
//! recovers what structure it can. When both produce nothing, the raw text
//! is kept on the failed result for diagnostics.

use crate::ai::ModelResponse;
use crate::findings::{normalize_priority, Finding, FindingSource, Priority, UnitResult};
use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;

/// Where the findings in a response belong. Determines the source tag on
/// every finding produced from that response.
#[derive(Debug, Clone)]
pub enum Origin {
    File { path: String },
    Repository,
}

#[derive(Deserialize)]
struct FindingsEnvelope {
    #[serde(default)]
    findings: Vec<RawFinding>,
}

#[derive(Deserialize)]
struct RawFinding {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    area: Option<String>,
    #[serde(default)]
    suggestion: String,
    #[serde(default)]
    priority: Option<String>,
}

/// Interpret one model response into findings.
pub fn interpret(response: &ModelResponse, origin: &Origin) -> UnitResult {
    let text = match (&response.response_text, response.success) {
        (Some(text), true) => text,
        _ => {
            let error = response
                .error
                .clone()
                .unwrap_or_else(|| "Model invocation failed".to_string());
            return UnitResult::failed(error, response.response_text.clone().unwrap_or_default());
        }
    };

    match parse_envelope(text) {
        Ok(envelope) => {
            let findings: Vec<Finding> = envelope
                .findings
                .into_iter()
                .filter(|raw| !raw.title.trim().is_empty())
                .map(|raw| to_finding(raw, origin))
                .collect();
            UnitResult::ok(findings)
        }
        Err(parse_error) => {
            let recovered = extract_findings_from_text(text, origin);
            if recovered.is_empty() {
                UnitResult::failed(
                    format!("Response was not valid findings JSON: {}", parse_error),
                    text.clone(),
                )
            } else {
                UnitResult::ok(recovered)
            }
        }
    }
}

fn to_finding(raw: RawFinding, origin: &Origin) -> Finding {
    let source = match origin {
        Origin::File { path } => FindingSource::File {
            path: path.clone(),
            location: raw.location.filter(|l| !l.trim().is_empty()),
        },
        Origin::Repository => FindingSource::Repository {
            area: raw
                .area
                .filter(|a| !a.trim().is_empty())
                .unwrap_or_else(|| "general".to_string()),
        },
    };

    Finding {
        title: raw.title.trim().to_string(),
        description: raw.description.trim().to_string(),
        suggestion: raw.suggestion.trim().to_string(),
        priority: normalize_priority(raw.priority.as_deref().unwrap_or("")),
        source,
    }
}

fn parse_envelope(text: &str) -> anyhow::Result<FindingsEnvelope> {
    let clean = strip_markdown_fences(text);
    let fragment = extract_json_fragment(clean, '{', '}')
        .ok_or_else(|| anyhow::anyhow!("no JSON object found"))?;

    match serde_json::from_str(fragment) {
        Ok(envelope) => Ok(envelope),
        Err(e) => {
            let fixed = fix_json_issues(fragment);
            serde_json::from_str(&fixed).map_err(|_| anyhow::anyhow!("{}", e))
        }
    }
}

/// Strip markdown code fences from a response.
fn strip_markdown_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let clean = if trimmed.starts_with("```json") {
        trimmed.strip_prefix("```json").unwrap_or(trimmed)
    } else if trimmed.starts_with("```") {
        trimmed.strip_prefix("```").unwrap_or(trimmed)
    } else {
        trimmed
    };
    let clean = clean.strip_suffix("```").unwrap_or(clean);
    clean.trim()
}

/// Extract a JSON fragment between matching delimiters.
fn extract_json_fragment(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    if start <= end {
        Some(&text[start..=end])
    } else {
        None
    }
}

/// Fix common JSON issues from LLM responses.
fn fix_json_issues(json: &str) -> String {
    let mut fixed = json.to_string();

    // Trailing commas before ] or }
    fixed = fixed.replace(",]", "]");
    fixed = fixed.replace(",}", "}");

    // Smart quotes to regular quotes
    fixed = fixed.replace('\u{201C}', "\"");
    fixed = fixed.replace('\u{201D}', "\"");
    fixed = fixed.replace('\u{2018}', "'");
    fixed = fixed.replace('\u{2019}', "'");

    // Stray control characters
    fixed
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect()
}

fn numbered_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*(?:\d+[.)]|[-*])\s+([A-Z].*)$").unwrap())
}

fn heading_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^#+\s+(.+)$").unwrap())
}

fn title_colon_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([A-Z][A-Za-z0-9 '_\-]{2,79}):\s*(.*)$").unwrap())
}

struct Draft {
    title: String,
    description: Vec<String>,
    location: Option<String>,
    suggestion: String,
    priority: Priority,
}

impl Draft {
    fn new(title: String, first_description: Option<String>) -> Self {
        Self {
            title,
            description: first_description.into_iter().collect(),
            location: None,
            suggestion: String::new(),
            priority: Priority::Medium,
        }
    }

    fn finish(self, origin: &Origin) -> Finding {
        let source = match origin {
            Origin::File { path } => FindingSource::File {
                path: path.clone(),
                location: self.location,
            },
            Origin::Repository => FindingSource::Repository {
                area: self.location.unwrap_or_else(|| "general".to_string()),
            },
        };
        Finding {
            title: self.title,
            description: self.description.join(" "),
            suggestion: self.suggestion,
            priority: self.priority,
            source,
        }
    }
}

/// Recover findings from a response that ignored the JSON instruction.
///
/// Pure text scan: a numbered-list item, heading, or capitalized
/// phrase-with-colon starts a new finding; later lines are classified by
/// keyword (priority, location/line/area, suggestion) and anything else
/// joins the description.
pub fn extract_findings_from_text(text: &str, origin: &Origin) -> Vec<Finding> {
    let mut findings = Vec::new();
    let mut current: Option<Draft> = None;

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        // Field lines attach to the current finding and never open one;
        // a stray field before any boundary is dropped, not titled.
        if let Some(value) = field_value(trimmed) {
            let lower = trimmed.to_lowercase();
            if lower.starts_with("priority") {
                if let Some(draft) = current.as_mut() {
                    draft.priority = normalize_priority(&value);
                }
                continue;
            }
            if lower.starts_with("location") || lower.starts_with("line") || lower.starts_with("area")
            {
                if let Some(draft) = current.as_mut() {
                    draft.location = Some(value);
                }
                continue;
            }
            if lower.starts_with("suggestion") || lower.starts_with("fix") {
                if let Some(draft) = current.as_mut() {
                    draft.suggestion = value;
                }
                continue;
            }
        }

        if let Some(caps) = numbered_pattern().captures(trimmed) {
            if let Some(done) = current.take() {
                findings.push(done.finish(origin));
            }
            current = Some(Draft::new(caps[1].trim().to_string(), None));
            continue;
        }
        if let Some(caps) = heading_pattern().captures(trimmed) {
            if let Some(done) = current.take() {
                findings.push(done.finish(origin));
            }
            current = Some(Draft::new(caps[1].trim().to_string(), None));
            continue;
        }
        if let Some(caps) = title_colon_pattern().captures(trimmed) {
            if let Some(done) = current.take() {
                findings.push(done.finish(origin));
            }
            let rest = caps[2].trim().to_string();
            let first = if rest.is_empty() { None } else { Some(rest) };
            current = Some(Draft::new(caps[1].trim().to_string(), first));
            continue;
        }

        if let Some(draft) = current.as_mut() {
            draft.description.push(trimmed.to_string());
        }
    }

    if let Some(done) = current.take() {
        findings.push(done.finish(origin));
    }

    findings
}

/// Value after the first colon of a `Key: value` line, if any.
fn field_value(line: &str) -> Option<String> {
    line.split_once(':').map(|(_, v)| v.trim().to_string())
}
