//! Deterministic urgency score for a merged incident.
//!
//! `score = (severity weight + top two need weights) × recency multiplier`,
//! rounded and clamped to `[0, 100]`. Missing or unparseable inputs degrade
//! the score; they never fail it.

use chrono::{DateTime, Utc};
use terraguard_core::{MergedRecord, Severity, parse_timestamp};

/// Need weights. Tokens not listed weigh 0.
const NEED_WEIGHTS: &[(&str, f64)] = &[
    ("medical", 25.0),
    ("rescue", 20.0),
    ("fire", 20.0),
    ("evacuation", 15.0),
    ("utility", 12.0),
    ("public-works", 12.0),
    ("security", 10.0),
    ("water", 8.0),
    ("food", 8.0),
];

/// Only the heaviest needs contribute.
const COUNTED_NEEDS: usize = 2;

/// Applied when the incident time is absent or unparseable.
const UNKNOWN_TIME_MULTIPLIER: f64 = 0.9;

pub fn severity_weight(severity: Option<Severity>) -> f64 {
    match severity {
        Some(Severity::Low) => 10.0,
        Some(Severity::Moderate) => 35.0,
        Some(Severity::High) => 60.0,
        Some(Severity::Critical) => 80.0,
        None => 0.0,
    }
}

pub fn need_weight(need: &str) -> f64 {
    NEED_WEIGHTS
        .iter()
        .find(|(token, _)| *token == need)
        .map(|(_, w)| *w)
        .unwrap_or(0.0)
}

/// Decay by incident age. Future timestamps count as fresh.
pub fn recency_multiplier(time_text: Option<&str>, now: DateTime<Utc>) -> f64 {
    let Some(ts) = time_text.and_then(parse_timestamp) else {
        return UNKNOWN_TIME_MULTIPLIER;
    };
    let age_hours = (now - ts).num_seconds() as f64 / 3600.0;
    if age_hours > 12.0 {
        0.7
    } else if age_hours > 6.0 {
        0.8
    } else if age_hours > 2.0 {
        0.9
    } else {
        1.0
    }
}

/// Risk score against an explicit clock.
pub fn risk_score_at(
    severity: Option<Severity>,
    needs: &[String],
    time_text: Option<&str>,
    now: DateTime<Utc>,
) -> u8 {
    let mut weights: Vec<f64> = needs.iter().map(|n| need_weight(n)).collect();
    weights.sort_by(|a, b| b.total_cmp(a));
    let need_total: f64 = weights.iter().take(COUNTED_NEEDS).sum();

    let raw = (severity_weight(severity) + need_total) * recency_multiplier(time_text, now);
    raw.round().clamp(0.0, 100.0) as u8
}

/// Risk score against the wall clock.
pub fn risk_score(severity: Option<Severity>, needs: &[String], time_text: Option<&str>) -> u8 {
    risk_score_at(severity, needs, time_text, Utc::now())
}

/// Score a merged record from its own fields.
pub fn score_record(record: &MergedRecord, now: DateTime<Utc>) -> u8 {
    risk_score_at(
        record.severity,
        &record.needs,
        record.time_text.as_deref(),
        now,
    )
}
