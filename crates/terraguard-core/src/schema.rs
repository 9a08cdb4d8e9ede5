//! JSON shape the extraction prompt asks the model to produce.

use serde_json::{Value, json};

use crate::needs::NEED_VOCABULARY;
use crate::record::Severity;

/// Schema for the `{ "reports": [...] }` object requested from the model.
///
/// Embedded verbatim in the extraction prompt. The salvager does not validate
/// against it; it only documents the target shape for the model.
pub fn report_schema() -> Value {
    let severities: Vec<&str> = Severity::ALL.iter().map(Severity::as_str).collect();
    json!({
        "type": "object",
        "required": ["reports"],
        "properties": {
            "reports": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "location_text": { "type": ["string", "null"] },
                        "time_iso": {
                            "type": ["string", "null"],
                            "description": "ISO 8601 timestamp"
                        },
                        "severity": { "enum": severities },
                        "needs": {
                            "type": "array",
                            "items": { "type": "string" },
                            "description": format!("prefer: {}", NEED_VOCABULARY.join(", ")),
                        },
                        "dedupe_key": { "type": ["string", "null"] },
                        "notes": { "type": ["string", "null"] }
                    }
                }
            }
        }
    })
}
