//! Extraction prompt sent on every generation attempt.

use terraguard_core::schema::report_schema;

const INSTRUCTIONS: &str = "\
You are an emergency dispatch assistant that extracts structured incident reports \
from free-text narratives.

Respond ONLY with a JSON object matching the schema below. No markdown fences, \
no explanation, just raw JSON.

Rules:
- One entry in \"reports\" per distinct incident.
- Use null for anything the narrative does not state. Do not guess locations or times.
- time_iso must be an ISO 8601 timestamp if a time is stated.
- severity is one of low, moderate, high, critical.
- needs is a short list of resource needs (e.g. medical, rescue, evacuation, fire, water).
- dedupe_key is a short stable slug naming the incident, reused if the same incident is mentioned twice.";

/// Build the full prompt for one narrative.
pub fn build_extraction_prompt(text: &str) -> String {
    let schema = serde_json::to_string_pretty(&report_schema()).unwrap_or_default();
    format!(
        "{INSTRUCTIONS}\n\
         \n\
         Schema:\n\
         {schema}\n\
         \n\
         Narrative:\n\
         {text}",
        text = text.trim(),
    )
}
