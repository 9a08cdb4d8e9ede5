//! Bucketing and field-level majority voting across generation attempts.
//!
//! Candidates that describe the same incident share a bucket key. Each bucket
//! is merged into one [`MergedRecord`] by plurality vote per field, with
//! confidence measured against `k`, the number of generation attempts that
//! returned any text at all.
//!
//! All tallies are kept in first-seen order and ranked with an explicit
//! (count desc, first-seen asc) sort, so a fixed candidate order and `k`
//! always produce identical output.

use std::collections::{BTreeSet, HashMap};

use terraguard_core::{
    CandidateRecord, FieldConfidence, MergedRecord, minute_bucket, normalize_needs,
};
use tracing::debug;

/// Prefix for buckets keyed by the model's explicit `dedupe_key`.
const EXPLICIT_PREFIX: &str = "id:";
/// Prefix for buckets keyed by derived incident fields.
const DERIVED_PREFIX: &str = "auto:";

/// Voting knobs.
#[derive(Debug, Clone)]
pub struct VoteConfig {
    /// How many of the most frequent need tokens to keep when no token
    /// reaches the majority threshold.
    pub fallback_top_needs: usize,
}

impl Default for VoteConfig {
    fn default() -> Self {
        Self {
            fallback_top_needs: 3,
        }
    }
}

/// Bucket key for a candidate.
///
/// An explicit `dedupe_key` wins (lower-cased, trimmed). Otherwise the key is
/// `auto:<location>|<minute>|<severity>|<needs>`.
pub fn bucket_key(candidate: &CandidateRecord) -> String {
    if let Some(hint) = candidate.dedupe_key.as_deref() {
        let hint = hint.trim().to_lowercase();
        if !hint.is_empty() {
            return format!("{EXPLICIT_PREFIX}{hint}");
        }
    }

    let location = candidate
        .location_text
        .as_deref()
        .map(normalize_location)
        .unwrap_or_default();
    let minute = candidate
        .time_text
        .as_deref()
        .map(minute_bucket)
        .unwrap_or_default();
    let severity = candidate.severity.map(|s| s.as_str()).unwrap_or_default();
    let needs = need_key(&candidate.needs);

    format!("{DERIVED_PREFIX}{location}|{minute}|{severity}|{needs}")
}

/// Sorted, de-duplicated, lower-cased need phrases joined with `,`.
///
/// Phrases are not mapped onto canonical tokens here, so differently worded
/// needs land in different buckets.
fn need_key(needs: &[String]) -> String {
    let set: BTreeSet<String> = needs
        .iter()
        .map(|n| n.trim().to_lowercase())
        .filter(|n| !n.is_empty())
        .collect();
    set.into_iter().collect::<Vec<_>>().join(",")
}

/// Lower-case, trim and collapse internal whitespace.
fn normalize_location(s: &str) -> String {
    s.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Group candidates by bucket key, buckets in first-seen order.
pub fn bucket_candidates(candidates: &[CandidateRecord]) -> Vec<(String, Vec<&CandidateRecord>)> {
    let mut buckets: Vec<(String, Vec<&CandidateRecord>)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for candidate in candidates {
        let key = bucket_key(candidate);
        match index.get(&key) {
            Some(&i) => buckets[i].1.push(candidate),
            None => {
                index.insert(key.clone(), buckets.len());
                buckets.push((key, vec![candidate]));
            }
        }
    }
    buckets
}

/// Merge all candidates into one record per bucket.
///
/// `attempts_with_output` is `k`: generation attempts that returned any text,
/// whether or not it salvaged. With `k == 0` nothing can be voted on.
pub fn vote(
    candidates: &[CandidateRecord],
    attempts_with_output: usize,
    config: &VoteConfig,
) -> Vec<MergedRecord> {
    if attempts_with_output == 0 || candidates.is_empty() {
        return Vec::new();
    }

    bucket_candidates(candidates)
        .into_iter()
        .map(|(key, members)| {
            debug!(bucket = %key, members = members.len(), "merging bucket");
            merge_bucket(&members, attempts_with_output, config)
        })
        .collect()
}

/// Merge one bucket's candidates.
pub fn merge_bucket(
    members: &[&CandidateRecord],
    k: usize,
    config: &VoteConfig,
) -> MergedRecord {
    let k = k.max(1);

    let (location_text, location_conf) =
        plurality(members.iter().map(|c| c.location_text.clone()), k);
    let (time_text, time_conf) = plurality(members.iter().map(|c| c.time_text.clone()), k);
    let (severity, severity_conf) = plurality(members.iter().map(|c| c.severity), k);
    let (notes, _) = plurality(members.iter().map(|c| c.notes.clone()), k);
    let (dedupe_key, _) = plurality(members.iter().map(|c| c.dedupe_key.clone()), k);
    let (needs, needs_conf) = vote_needs(members, k, config.fallback_top_needs);

    let confidence_per_field = FieldConfidence {
        location_text: round3(location_conf),
        time: round3(time_conf),
        severity: round3(severity_conf),
        needs: round3(needs_conf),
    };

    MergedRecord {
        location_text,
        time_text,
        severity,
        needs,
        notes,
        dedupe_key,
        confidence_overall: round3(confidence_per_field.mean()),
        confidence_per_field,
        risk_score: 0,
        suggested_facilities: Vec::new(),
    }
}

/// Plurality winner over the non-null values, with confidence `count / k`.
fn plurality<T, I>(values: I, k: usize) -> (Option<T>, f64)
where
    T: PartialEq,
    I: IntoIterator<Item = Option<T>>,
{
    let mut tally = Tally::new();
    for value in values.into_iter().flatten() {
        tally.add(value);
    }
    match tally.into_ranked().into_iter().next() {
        Some((value, count)) => (Some(value), ratio(count, k)),
        None => (None, 0.0),
    }
}

/// Majority vote over normalised need tokens.
///
/// A token counts at most once per candidate. Tokens seen in at least
/// `ceil(k / 2)` candidates are kept; if none qualify, the `fallback` most
/// frequent tokens are kept instead.
fn vote_needs(members: &[&CandidateRecord], k: usize, fallback: usize) -> (Vec<String>, f64) {
    let mut tally = Tally::new();
    for candidate in members {
        for token in normalize_needs(&candidate.needs) {
            tally.add(token);
        }
    }

    let threshold = k.div_ceil(2);
    let ranked = tally.into_ranked();
    let majority: Vec<(String, usize)> = ranked
        .iter()
        .filter(|(_, count)| *count >= threshold)
        .cloned()
        .collect();
    let included = if majority.is_empty() {
        ranked.into_iter().take(fallback).collect()
    } else {
        majority
    };

    if included.is_empty() {
        return (Vec::new(), 0.0);
    }

    let support: usize = included.iter().map(|(_, count)| count).sum();
    let confidence = support as f64 / (k * included.len().max(1)) as f64;
    let tokens = included.into_iter().map(|(token, _)| token).collect();
    (tokens, confidence.min(1.0))
}

/// Frequency table that remembers first-seen order.
struct Tally<T> {
    entries: Vec<(T, usize)>,
}

impl<T: PartialEq> Tally<T> {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    fn add(&mut self, value: T) {
        match self.entries.iter_mut().find(|(v, _)| *v == value) {
            Some((_, count)) => *count += 1,
            None => self.entries.push((value, 1)),
        }
    }

    /// Entries sorted by count desc, then first-seen asc.
    fn into_ranked(self) -> Vec<(T, usize)> {
        let mut indexed: Vec<(usize, (T, usize))> = self.entries.into_iter().enumerate().collect();
        indexed.sort_by(|(ia, (_, ca)), (ib, (_, cb))| cb.cmp(ca).then(ia.cmp(ib)));
        indexed.into_iter().map(|(_, entry)| entry).collect()
    }
}

fn ratio(count: usize, k: usize) -> f64 {
    (count as f64 / k as f64).min(1.0)
}

fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use terraguard_core::Severity;

    fn cand(
        key: Option<&str>,
        location: Option<&str>,
        severity: Option<Severity>,
        needs: &[&str],
    ) -> CandidateRecord {
        CandidateRecord {
            location_text: location.map(String::from),
            time_text: None,
            severity,
            needs: needs.iter().map(|s| s.to_string()).collect(),
            dedupe_key: key.map(String::from),
            notes: None,
        }
    }

    #[test]
    fn explicit_key_is_normalised_and_prefixed() {
        let c = cand(Some("  Pine-Collapse "), Some("Pine St"), None, &[]);
        assert_eq!(bucket_key(&c), "id:pine-collapse");
    }

    #[test]
    fn blank_explicit_key_falls_back_to_derived() {
        let c = cand(Some("   "), Some("Pine St"), Some(Severity::High), &["medic"]);
        assert_eq!(bucket_key(&c), "auto:pine st||high|medic");
    }

    #[test]
    fn derived_key_components() {
        let mut c = cand(
            None,
            Some("  Pine   ST "),
            Some(Severity::Critical),
            &["trapped", " Ambulance", "ambulance", ""],
        );
        c.time_text = Some("2025-03-01T10:15:42Z".into());
        assert_eq!(
            bucket_key(&c),
            "auto:pine st|2025-03-01T10:15|critical|ambulance,trapped"
        );

        c.time_text = Some("earlier today".into());
        assert_eq!(bucket_key(&c), "auto:pine st||critical|ambulance,trapped");
    }

    #[test]
    fn differently_worded_needs_are_separate_buckets() {
        let cs = vec![
            cand(None, Some("Pine St"), None, &["Injured people"]),
            cand(None, Some("Pine St"), None, &["medical"]),
        ];
        assert_eq!(bucket_key(&cs[0]), "auto:pine st|||injured people");
        assert_eq!(bucket_key(&cs[1]), "auto:pine st|||medical");
        assert_eq!(vote(&cs, 2, &VoteConfig::default()).len(), 2);
    }

    #[test]
    fn same_minute_same_bucket() {
        let mut a = cand(None, Some("Dock 4"), Some(Severity::Low), &["food"]);
        let mut b = a.clone();
        a.time_text = Some("2025-03-01T10:15:01Z".into());
        b.time_text = Some("2025-03-01T10:15:59Z".into());
        assert_eq!(bucket_key(&a), bucket_key(&b));
    }

    #[test]
    fn buckets_keep_first_seen_order() {
        let cs = vec![
            cand(Some("b"), None, None, &[]),
            cand(Some("a"), None, None, &[]),
            cand(Some("B"), None, None, &[]),
        ];
        let buckets = bucket_candidates(&cs);
        let keys: Vec<&str> = buckets.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["id:b", "id:a"]);
        assert_eq!(buckets[0].1.len(), 2);
    }

    #[test]
    fn severity_plurality_with_confidence() {
        let cs = vec![
            cand(Some("x"), None, Some(Severity::High), &[]),
            cand(Some("x"), None, Some(Severity::High), &[]),
            cand(Some("x"), None, Some(Severity::Moderate), &[]),
        ];
        let merged = vote(&cs, 3, &VoteConfig::default());
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].severity, Some(Severity::High));
        assert_eq!(merged[0].confidence_per_field.severity, 0.667);
    }

    #[test]
    fn ties_break_by_first_seen() {
        let cs = vec![
            cand(Some("x"), Some("Elm St"), None, &[]),
            cand(Some("x"), Some("Oak St"), None, &[]),
        ];
        let merged = vote(&cs, 2, &VoteConfig::default());
        assert_eq!(merged[0].location_text.as_deref(), Some("Elm St"));
        assert_eq!(merged[0].confidence_per_field.location_text, 0.5);

        let reversed: Vec<CandidateRecord> = cs.into_iter().rev().collect();
        let merged = vote(&reversed, 2, &VoteConfig::default());
        assert_eq!(merged[0].location_text.as_deref(), Some("Oak St"));
    }

    #[test]
    fn nulls_do_not_vote() {
        let cs = vec![
            cand(Some("x"), None, None, &[]),
            cand(Some("x"), None, None, &[]),
            cand(Some("x"), Some("Elm St"), None, &[]),
        ];
        let merged = vote(&cs, 3, &VoteConfig::default());
        assert_eq!(merged[0].location_text.as_deref(), Some("Elm St"));
        assert_eq!(merged[0].confidence_per_field.location_text, 0.333);
        assert_eq!(merged[0].severity, None);
        assert_eq!(merged[0].confidence_per_field.severity, 0.0);
    }

    #[test]
    fn majority_needs_are_included() {
        let cs = vec![
            cand(Some("x"), None, None, &["medical", "water"]),
            cand(Some("x"), None, None, &["ambulance"]),
            cand(Some("x"), None, None, &["food"]),
        ];
        // k = 3, threshold 2: only medical qualifies.
        let merged = vote(&cs, 3, &VoteConfig::default());
        assert_eq!(merged[0].needs, vec!["medical"]);
        // 2 / (3 * 1)
        assert_eq!(merged[0].confidence_per_field.needs, 0.667);
    }

    #[test]
    fn need_counted_once_per_candidate() {
        let cs = vec![
            cand(Some("x"), None, None, &["medic", "injured", "ambulance"]),
            cand(Some("x"), None, None, &["food"]),
            cand(Some("x"), None, None, &["water"]),
        ];
        // medical appears in only one candidate, so no token has a majority.
        let merged = vote(&cs, 3, &VoteConfig::default());
        assert_eq!(merged[0].needs, vec!["medical", "food", "water"]);
    }

    #[test]
    fn even_attempt_counts_use_half_as_threshold() {
        let cs = vec![
            cand(Some("x"), None, None, &["medical", "food"]),
            cand(Some("x"), None, None, &["medical"]),
            cand(Some("x"), None, None, &["water"]),
            cand(Some("x"), None, None, &["fire"]),
        ];
        // k = 4, threshold 2: medical (2) is in, the singletons are out.
        let merged = vote(&cs, 4, &VoteConfig::default());
        assert_eq!(merged[0].needs, vec!["medical"]);
        assert_eq!(merged[0].confidence_per_field.needs, 0.5);

        let cs = vec![
            cand(Some("y"), None, None, &["water"]),
            cand(Some("y"), None, None, &["food"]),
        ];
        // k = 2, threshold 1: every token seen once qualifies.
        let merged = vote(&cs, 2, &VoteConfig { fallback_top_needs: 0 });
        assert_eq!(merged[0].needs, vec!["water", "food"]);
        // 2 / (2 * 2)
        assert_eq!(merged[0].confidence_per_field.needs, 0.5);
    }

    #[test]
    fn fallback_top_needs_is_configurable() {
        let cs = vec![
            cand(Some("x"), None, None, &["food", "water"]),
            cand(Some("x"), None, None, &["fire"]),
            cand(Some("x"), None, None, &["security"]),
        ];
        let merged = vote(&cs, 5, &VoteConfig::default());
        assert_eq!(merged[0].needs, vec!["food", "water", "fire"]);
        // 3 / (5 * 3)
        assert_eq!(merged[0].confidence_per_field.needs, 0.2);

        let merged = vote(&cs, 5, &VoteConfig { fallback_top_needs: 1 });
        assert_eq!(merged[0].needs, vec!["food"]);
    }

    #[test]
    fn needs_ranked_by_count() {
        let cs = vec![
            cand(Some("x"), None, None, &["food"]),
            cand(Some("x"), None, None, &["water", "food"]),
            cand(Some("x"), None, None, &["water", "food"]),
        ];
        let merged = vote(&cs, 3, &VoteConfig::default());
        assert_eq!(merged[0].needs, vec!["food", "water"]);
        // (3 + 2) / (3 * 2)
        assert_eq!(merged[0].confidence_per_field.needs, 0.833);
    }

    #[test]
    fn confidence_uses_attempt_count_not_bucket_size() {
        let cs = vec![cand(Some("x"), Some("Elm St"), Some(Severity::Low), &["food"])];
        let merged = vote(&cs, 3, &VoteConfig::default());
        assert_eq!(merged[0].confidence_per_field.location_text, 0.333);
        // threshold 2 unmet, fallback keeps food: 1 / 3
        assert_eq!(merged[0].needs, vec!["food"]);
        assert_eq!(merged[0].confidence_per_field.needs, 0.333);
    }

    #[test]
    fn confidence_capped_when_one_attempt_repeats_itself() {
        let cs = vec![
            cand(Some("x"), Some("Elm St"), None, &["food"]),
            cand(Some("x"), Some("Elm St"), None, &["food"]),
        ];
        let merged = vote(&cs, 1, &VoteConfig::default());
        assert_eq!(merged[0].confidence_per_field.location_text, 1.0);
        assert_eq!(merged[0].confidence_per_field.needs, 1.0);
    }

    #[test]
    fn overall_is_mean_of_fields() {
        let cs = vec![
            cand(Some("x"), Some("Elm St"), Some(Severity::High), &["fire"]),
            cand(Some("x"), Some("Elm St"), Some(Severity::High), &["fire"]),
        ];
        let merged = vote(&cs, 2, &VoteConfig::default());
        // location 1, time 0, severity 1, needs 1
        assert_eq!(merged[0].confidence_overall, 0.75);
    }

    #[test]
    fn all_null_candidates_stay_in_bounds() {
        let cs = vec![CandidateRecord::default(), CandidateRecord::default()];
        let merged = vote(&cs, 6, &VoteConfig::default());
        assert_eq!(merged.len(), 1);
        let m = &merged[0];
        assert!(m.needs.is_empty());
        assert_eq!(m.confidence_overall, 0.0);
        for c in [
            m.confidence_per_field.location_text,
            m.confidence_per_field.time,
            m.confidence_per_field.severity,
            m.confidence_per_field.needs,
        ] {
            assert!((0.0..=1.0).contains(&c));
        }
    }

    #[test]
    fn zero_attempts_or_no_candidates_is_empty() {
        let cs = vec![cand(Some("x"), None, None, &[])];
        assert!(vote(&cs, 0, &VoteConfig::default()).is_empty());
        assert!(vote(&[], 3, &VoteConfig::default()).is_empty());
    }

    #[test]
    fn separate_incidents_get_separate_records() {
        let cs = vec![
            cand(None, Some("Elm St"), Some(Severity::High), &["fire"]),
            cand(None, Some("Dock 4"), Some(Severity::Low), &["food"]),
            cand(None, Some("elm  st"), Some(Severity::High), &[" Fire "]),
        ];
        let merged = vote(&cs, 2, &VoteConfig::default());
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].location_text.as_deref(), Some("Elm St"));
        assert_eq!(merged[0].needs, vec!["fire"]);
        assert_eq!(merged[1].location_text.as_deref(), Some("Dock 4"));
    }

    #[test]
    fn vote_is_deterministic() {
        let cs = vec![
            cand(Some("x"), Some("A"), Some(Severity::Low), &["food", "water"]),
            cand(Some("x"), Some("B"), Some(Severity::High), &["water", "food"]),
            cand(Some("y"), Some("C"), None, &["fire"]),
        ];
        let first = serde_json::to_string(&vote(&cs, 3, &VoteConfig::default())).unwrap();
        for _ in 0..10 {
            let again = serde_json::to_string(&vote(&cs, 3, &VoteConfig::default())).unwrap();
            assert_eq!(first, again);
        }
    }
}
