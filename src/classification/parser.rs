//! Reduction of free-form model output to a [`ClassificationResult`].
//!
//! Model replies arrive in one of two shapes, neither guaranteed:
//!
//! - a JSON object with `title`, `reportType` and `description`, possibly
//!   wrapped in a Markdown code fence
//! - labeled lines (`TITLE: ...`, `TYPE: ...`, `DESCRIPTION: ...`) whose
//!   values may continue over following lines
//!
//! [`parse_reply`] tries the JSON shape first and falls back to label
//! extraction. It never fails: missing fields are filled with generic text so
//! the caller always gets a usable record.

use crate::classification::models::{
    format_report_date, ClassificationResult, PartialClassification, ReportType,
    MISSING_DESCRIPTION,
};
use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

lazy_static! {
    /// A field label followed by a separator, anywhere on a line
    static ref LABEL: Regex = Regex::new(
        r#"(?i)\b((?:report|incident)[\s_-]?type|type|title|description)["'*`_\s]*[:=]"#
    )
    .expect("label pattern is valid");
}

/// Length caps applied to the final record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputLimits {
    pub max_title_len: usize,
    pub max_description_len: usize,
}

impl Default for OutputLimits {
    fn default() -> Self {
        Self {
            max_title_len: 100,
            max_description_len: 500,
        }
    }
}

/// Which reply shape produced the record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplySource {
    /// Complete JSON object
    Json,
    /// At least one labeled line
    LabeledText,
    /// Nothing recognisable; every field is generic
    Unstructured,
}

impl ReplySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReplySource::Json => "parsed_json",
            ReplySource::LabeledText => "parsed_text",
            ReplySource::Unstructured => "unstructured",
        }
    }
}

/// Record recovered from a reply, with the shape it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedReply {
    pub result: ClassificationResult,
    pub source: ReplySource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    ReportType,
    Description,
}

impl Field {
    fn from_label(label: &str) -> Self {
        let label = label.to_ascii_lowercase();
        if label == "title" {
            Field::Title
        } else if label == "description" {
            Field::Description
        } else {
            Field::ReportType
        }
    }
}

/// Parse a model reply into a normalized record.
///
/// `today` stamps the generic title used when no title could be extracted.
pub fn parse_reply(content: &str, limits: &OutputLimits, today: NaiveDate) -> ParsedReply {
    let content = content.trim();
    let cleaned = strip_code_fences(content);

    if let Some(partial) = parse_json_object(cleaned) {
        if partial.is_complete() {
            return ParsedReply {
                result: finalize(partial, limits),
                source: ReplySource::Json,
            };
        }
    }

    let mut partial = extract_labeled_fields(content);
    let source = if partial == PartialClassification::default() {
        ReplySource::Unstructured
    } else {
        ReplySource::LabeledText
    };

    if partial.title.as_deref().map_or(true, str::is_empty) {
        partial.title = Some(format!("Incident Report - {}", format_report_date(today)));
    }
    if partial.description.as_deref().map_or(true, str::is_empty) {
        partial.description = Some(MISSING_DESCRIPTION.to_string());
    }

    ParsedReply {
        result: finalize(partial, limits),
        source,
    }
}

/// Remove a Markdown code fence (```` ```json ```` or ```` ``` ````) around `content`
pub fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    let rest = match rest.get(..4) {
        Some(tag) if tag.eq_ignore_ascii_case("json") => &rest[4..],
        _ => rest,
    };

    let rest = rest.trim_start();
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Strict JSON parse; `None` unless the content is a JSON object
pub fn parse_json_object(content: &str) -> Option<PartialClassification> {
    let value: Value = serde_json::from_str(content).ok()?;
    let object = value.as_object()?;

    Some(PartialClassification {
        title: object.get("title").and_then(scalar_to_string),
        report_type: object
            .get("reportType")
            .or_else(|| object.get("report_type"))
            .and_then(scalar_to_string),
        description: object.get("description").and_then(scalar_to_string),
    })
}

/// Line-oriented label extraction.
///
/// A label may appear anywhere on a line as long as a separator follows it.
/// An unquoted value runs to the end of the line and continues over the
/// following unlabeled lines. A quoted value ends at its closing quote, after
/// which the rest of the line is scanned for further labels. The first
/// non-empty value of each field wins.
pub fn extract_labeled_fields(content: &str) -> PartialClassification {
    let mut segments = Segments::default();
    let mut current: Option<Field> = None;

    for line in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if is_decoration_only(line) {
            continue;
        }

        let mut rest = line;
        let mut labeled = false;
        while let Some(caps) = LABEL.captures(rest) {
            labeled = true;
            let field = Field::from_label(&caps[1]);
            let value_start = caps.get(0).map_or(rest.len(), |m| m.end());
            let (value, remainder) = split_value(&rest[value_start..]);

            let target = segments.get_mut(field);
            if target.is_empty() {
                let value = clean_segment(value);
                if !value.is_empty() {
                    target.push(value);
                }
                // A closed quote completes the value
                current = if remainder.is_some() { None } else { Some(field) };
            } else {
                // Repeated label after a value was captured; ignore it and its continuation
                current = None;
            }

            match remainder {
                Some(remainder) => rest = remainder,
                None => break,
            }
        }
        if labeled {
            continue;
        }

        let Some(field) = current else {
            continue;
        };
        let value = clean_segment(line);
        if !value.is_empty() {
            segments.get_mut(field).push(value);
        }
    }

    PartialClassification {
        title: join_segments(segments.title),
        report_type: join_segments(segments.report_type),
        description: join_segments(segments.description),
    }
}

#[derive(Default)]
struct Segments {
    title: Vec<String>,
    report_type: Vec<String>,
    description: Vec<String>,
}

impl Segments {
    fn get_mut(&mut self, field: Field) -> &mut Vec<String> {
        match field {
            Field::Title => &mut self.title,
            Field::ReportType => &mut self.report_type,
            Field::Description => &mut self.description,
        }
    }
}

/// Split the text after a separator into the value and, for a closed quoted
/// value, the remainder of the line.
///
/// A quote only closes the value when it is followed by the end of the line
/// or a `,` `;` `}` `]`, so apostrophes inside single-quoted text survive.
fn split_value(after: &str) -> (&str, Option<&str>) {
    let trimmed = after.trim_start();
    let mut chars = trimmed.char_indices();

    let Some((_, quote @ ('"' | '\''))) = chars.next() else {
        return (trimmed, None);
    };

    let mut escaped = false;
    for (idx, c) in chars {
        if escaped {
            escaped = false;
            continue;
        }
        if c == '\\' {
            escaped = true;
        } else if c == quote {
            let remainder = &trimmed[idx + 1..];
            let next = remainder.trim_start();
            if next.is_empty() || next.starts_with(|c| matches!(c, ',' | ';' | '}' | ']')) {
                return (&trimmed[1..idx], Some(remainder));
            }
        }
    }

    (trimmed, None)
}

/// Apply report type normalization and length caps
pub fn finalize(partial: PartialClassification, limits: &OutputLimits) -> ClassificationResult {
    let normalized = ReportType::normalize(partial.report_type.as_deref());
    let warning = normalized
        .coerced_from
        .map(|raw| format!("Unrecognized report type '{}' was mapped to Other", raw));

    ClassificationResult {
        title: truncate_chars(&partial.title.unwrap_or_default(), limits.max_title_len),
        report_type: normalized.report_type,
        description: truncate_chars(
            &partial.description.unwrap_or_default(),
            limits.max_description_len,
        ),
        warning,
        error: None,
    }
}

/// Truncate to at most `max` characters without splitting a code point
pub fn truncate_chars(value: &str, max: usize) -> String {
    match value.char_indices().nth(max) {
        Some((idx, _)) => value[..idx].to_string(),
        None => value.to_string(),
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn is_decoration_only(line: &str) -> bool {
    line.starts_with("```")
        || line
            .chars()
            .all(|c| matches!(c, '{' | '}' | '[' | ']' | ',' | '`' | '*' | '-' | '#'))
}

fn clean_segment(segment: &str) -> String {
    let trimmed = segment.trim();
    let trimmed = trimmed.strip_suffix(',').unwrap_or(trimmed).trim();
    let trimmed = trimmed.strip_suffix('}').unwrap_or(trimmed).trim();
    trimmed
        .trim_matches(|c: char| matches!(c, '"' | '\'' | '*' | '`') || c.is_whitespace())
        .to_string()
}

fn join_segments(segments: Vec<String>) -> Option<String> {
    if segments.is_empty() {
        None
    } else {
        Some(segments.join(" "))
    }
}
