//! Best-effort recovery of structured reports from raw model text.
//!
//! Local models wrap JSON in prose, markdown fences or ad-hoc tags, and
//! sometimes emit a bare object instead of the requested `{"reports": [...]}`.
//! [`salvage`] tries a fixed sequence of extraction strategies and coerces the
//! first successful parse into a list of report values.
//!
//! | Strategy | Input it handles |
//! |----------|------------------|
//! | [`Strategy::Direct`] | the whole text is JSON |
//! | [`Strategy::Fenced`] | a ```` ```json ... ``` ```` block |
//! | [`Strategy::JsonTag`] | `<json> ... </json>` |
//! | [`Strategy::BalancedSpan`] | first balanced `{...}` / `[...]` in prose |

use serde_json::Value;
use terraguard_core::CandidateRecord;
use thiserror::Error;
use tracing::debug;

const PREVIEW_CHARS: usize = 200;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SalvageError {
    #[error("no parseable JSON in model output: {preview}")]
    MalformedModelOutput { preview: String },
}

/// Which extraction step produced the parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Direct,
    Fenced,
    JsonTag,
    BalancedSpan,
}

/// Shape of a successfully parsed value.
#[derive(Debug, Clone, PartialEq)]
pub enum Parsed {
    /// A top-level array, taken as the report list.
    Array(Vec<Value>),
    /// An object carrying a `reports` array.
    ObjectWithReports(Vec<Value>),
    /// Any other object, taken as a single report.
    SingleObject(Value),
    /// Scalars, null, or an object whose `reports` is not an array.
    Unrecognized,
}

impl Parsed {
    pub fn classify(value: Value) -> Self {
        match value {
            Value::Array(items) => Self::Array(items),
            Value::Object(mut obj) => match obj.remove("reports") {
                Some(Value::Array(items)) => Self::ObjectWithReports(items),
                Some(other) => {
                    // `reports` present but not a list: not a report object either.
                    debug!(kind = json_kind(&other), "ignoring non-array reports field");
                    Self::Unrecognized
                }
                None => Self::SingleObject(Value::Object(obj)),
            },
            _ => Self::Unrecognized,
        }
    }

    /// Coerce into the report list. Unrecognised shapes give an empty list.
    pub fn into_reports(self) -> Vec<Value> {
        match self {
            Self::Array(items) | Self::ObjectWithReports(items) => items,
            Self::SingleObject(value) => vec![value],
            Self::Unrecognized => Vec::new(),
        }
    }
}

/// Parse the first strategy that yields valid JSON.
pub fn salvage_parsed(raw: &str) -> Result<(Parsed, Strategy), SalvageError> {
    let attempts: [(Strategy, Option<&str>); 4] = [
        (Strategy::Direct, Some(raw.trim())),
        (Strategy::Fenced, fenced_body(raw)),
        (Strategy::JsonTag, tagged_body(raw)),
        (Strategy::BalancedSpan, first_balanced_span(raw)),
    ];

    for (strategy, candidate) in attempts {
        let Some(text) = candidate else { continue };
        if let Ok(value) = serde_json::from_str::<Value>(text) {
            debug!(?strategy, "salvaged model output");
            return Ok((Parsed::classify(value), strategy));
        }
    }

    Err(SalvageError::MalformedModelOutput {
        preview: raw.chars().take(PREVIEW_CHARS).collect(),
    })
}

/// Recover the list of report values from raw model text.
pub fn salvage(raw: &str) -> Result<Vec<Value>, SalvageError> {
    salvage_parsed(raw).map(|(parsed, _)| parsed.into_reports())
}

/// Recover candidate records, skipping report entries that are not objects.
pub fn salvage_candidates(raw: &str) -> Result<Vec<CandidateRecord>, SalvageError> {
    Ok(salvage(raw)?
        .iter()
        .filter_map(CandidateRecord::from_report)
        .collect())
}

/// Body of the first ```` ``` ```` fence, minus an optional `json` tag.
///
/// An unterminated fence runs to the end of the text.
fn fenced_body(raw: &str) -> Option<&str> {
    let start = raw.find("```")? + 3;
    let rest = &raw[start..];
    let rest = rest
        .strip_prefix("json")
        .or_else(|| rest.strip_prefix("JSON"))
        .unwrap_or(rest);
    let end = rest.find("```").unwrap_or(rest.len());
    Some(rest[..end].trim())
}

fn tagged_body(raw: &str) -> Option<&str> {
    let start = raw.find("<json>")? + "<json>".len();
    let len = raw[start..].find("</json>")?;
    Some(raw[start..start + len].trim())
}

/// First top-level balanced `{...}` or `[...]` span.
///
/// Brackets inside string literals are ignored; backslash escapes inside
/// strings are honoured. Returns `None` if the span never closes.
fn first_balanced_span(raw: &str) -> Option<&str> {
    let bytes = raw.as_bytes();
    let start = bytes.iter().position(|&b| b == b'{' || b == b'[')?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' | b'[' => depth += 1,
            b'}' | b']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&raw[start..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
