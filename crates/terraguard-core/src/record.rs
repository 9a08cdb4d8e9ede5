//! Incident record types shared by the extraction pipeline and the API.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Incident severity as reported by the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Moderate,
    High,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 4] = [Self::Low, Self::Moderate, Self::High, Self::Critical];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Moderate => "moderate",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    /// Case-insensitive parse. Unknown levels yield `None`.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(s))
    }
}

/// One generation attempt's structured guess about an incident.
///
/// Built leniently from whatever object the salvager recovered; see
/// [`CandidateRecord::from_report`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub location_text: Option<String>,
    /// Raw time text, possibly ISO 8601.
    #[serde(rename = "time_iso")]
    pub time_text: Option<String>,
    pub severity: Option<Severity>,
    /// Free-text need phrases, not yet normalised.
    pub needs: Vec<String>,
    pub dedupe_key: Option<String>,
    pub notes: Option<String>,
}

impl CandidateRecord {
    /// Read a record-like JSON object produced by the model.
    ///
    /// Returns `None` for anything that is not an object. Field aliases
    /// (`location`, `time_text`, `time`) are accepted, blank strings become
    /// `None`, unknown severities are dropped, and `needs` may be either an
    /// array of strings or one comma-separated string.
    pub fn from_report(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let text = |keys: &[&str]| {
            keys.iter()
                .filter_map(|k| obj.get(*k))
                .find_map(non_blank_string)
        };

        let needs = match obj.get("needs") {
            Some(Value::Array(items)) => items.iter().filter_map(non_blank_string).collect(),
            Some(Value::String(s)) => s
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        };

        Some(Self {
            location_text: text(&["location_text", "location"]),
            time_text: text(&["time_iso", "time_text", "time"]),
            severity: text(&["severity"]).and_then(|s| Severity::parse(&s)),
            needs,
            dedupe_key: text(&["dedupe_key"]),
            notes: text(&["notes"]),
        })
    }
}

fn non_blank_string(value: &Value) -> Option<String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Per-field consensus confidence, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldConfidence {
    pub location_text: f64,
    #[serde(rename = "time_iso")]
    pub time: f64,
    pub severity: f64,
    pub needs: f64,
}

impl FieldConfidence {
    /// Arithmetic mean of the finite entries (0 when none are finite).
    pub fn mean(&self) -> f64 {
        let finite: Vec<f64> = [self.location_text, self.time, self.severity, self.needs]
            .into_iter()
            .filter(|c| c.is_finite())
            .collect();
        if finite.is_empty() {
            return 0.0;
        }
        finite.iter().sum::<f64>() / finite.len() as f64
    }
}

/// Consensus record for one incident bucket.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MergedRecord {
    pub location_text: Option<String>,
    #[serde(rename = "time_iso")]
    pub time_text: Option<String>,
    pub severity: Option<Severity>,
    /// Canonical need tokens, unique.
    pub needs: Vec<String>,
    pub notes: Option<String>,
    pub dedupe_key: Option<String>,
    pub confidence_overall: f64,
    #[serde(rename = "confields")]
    pub confidence_per_field: FieldConfidence,
    /// Urgency in `[0, 100]`, filled in by the risk scorer.
    #[serde(default)]
    pub risk_score: u8,
    #[serde(default)]
    pub suggested_facilities: Vec<Facility>,
}

/// Facility category in the directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FacilityType {
    Hospital,
    Shelter,
    Fire,
    Police,
    PublicWorks,
    Utility,
}

impl FacilityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hospital => "hospital",
            Self::Shelter => "shelter",
            Self::Fire => "fire",
            Self::Police => "police",
            Self::PublicWorks => "public-works",
            Self::Utility => "utility",
        }
    }
}

/// Static directory entry. Read-only once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Facility {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: FacilityType,
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    /// Capability tags, matched case-insensitively.
    #[serde(default)]
    pub capabilities: Vec<String>,
}

impl Facility {
    pub fn has_capability(&self, tag: &str) -> bool {
        self.capabilities
            .iter()
            .any(|c| c.trim().eq_ignore_ascii_case(tag))
    }
}
