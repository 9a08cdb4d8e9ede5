//! Need normalisation for free-text resource requests.
//!
//! Maps phrases like "injured hikers" or "trapped in basement" onto a small
//! canonical vocabulary so that different wordings from different model
//! samples vote for the same token.
//!
//! # Rules
//!
//! Each phrase is lower-cased and trimmed, then tested against [`NEED_RULES`]
//! in order. The first rule with a keyword contained in the phrase wins.
//! Phrases matching no rule pass through unchanged (lower-cased, trimmed).
//! Blank phrases are dropped.
//!
//! Every canonical token matches its own rule before any earlier one, so
//! normalising an already-normalised list is a no-op.

/// Canonical need tokens, in rule order.
pub const NEED_VOCABULARY: &[&str] = &[
    "medical",
    "rescue",
    "evacuation",
    "fire",
    "utility",
    "public-works",
    "security",
    "water",
    "food",
];

/// Ordered keyword rules: `(canonical token, substrings that select it)`.
pub const NEED_RULES: &[(&str, &[&str])] = &[
    (
        "medical",
        &[
            "medic", "injur", "first aid", "ambulance", "hospital", "wound", "bleed", "cpr",
            "trauma",
        ],
    ),
    (
        "rescue",
        &["rescue", "trapped", "stranded", "search", "extricat", "missing person"],
    ),
    ("evacuation", &["evac", "shelter", "relocat"]),
    ("fire", &["fire", "smoke", "burn", "blaze", "flame"]),
    (
        "utility",
        &["utilit", "power", "electric", "outage", "gas leak", "gas line"],
    ),
    (
        "public-works",
        &["public-works", "public works", "road", "debris", "bridge", "sinkhole", "culvert"],
    ),
    (
        "security",
        &["security", "police", "loot", "crowd", "traffic control", "law enforcement"],
    ),
    ("water", &["water", "potable", "hydrat", "thirst"]),
    ("food", &["food", "meal", "hunger", "ration", "feeding"]),
];

/// Normalise a single phrase. Returns `None` for blank input.
pub fn normalize_need(phrase: &str) -> Option<String> {
    let lowered = phrase.trim().to_lowercase();
    if lowered.is_empty() {
        return None;
    }

    let token = NEED_RULES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lowered.contains(k)))
        .map(|(token, _)| (*token).to_string())
        .unwrap_or(lowered);
    Some(token)
}

/// Normalise a list of phrases into unique canonical tokens, first-seen order.
pub fn normalize_needs<I, S>(phrases: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for phrase in phrases {
        if let Some(token) = normalize_need(phrase.as_ref())
            && !out.contains(&token)
        {
            out.push(token);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_rules_map_to_vocabulary() {
        assert_eq!(normalize_need("Injured hikers").as_deref(), Some("medical"));
        assert_eq!(normalize_need("needs first aid").as_deref(), Some("medical"));
        assert_eq!(normalize_need("people trapped in car").as_deref(), Some("rescue"));
        assert_eq!(normalize_need("Evacuate block").as_deref(), Some("evacuation"));
        assert_eq!(normalize_need("smoke in stairwell").as_deref(), Some("fire"));
        assert_eq!(normalize_need("power outage").as_deref(), Some("utility"));
        assert_eq!(normalize_need("debris on road").as_deref(), Some("public-works"));
        assert_eq!(normalize_need("looting reported").as_deref(), Some("security"));
        assert_eq!(normalize_need("bottled water").as_deref(), Some("water"));
        assert_eq!(normalize_need("hot meals").as_deref(), Some("food"));
    }

    #[test]
    fn first_matching_rule_wins() {
        // "water rescue" hits the rescue rule before the water rule.
        assert_eq!(normalize_need("swift water rescue").as_deref(), Some("rescue"));
        assert_eq!(normalize_need("burn injuries").as_deref(), Some("medical"));
    }

    #[test]
    fn unmatched_passes_through_lowercased() {
        assert_eq!(normalize_need("  Blankets ").as_deref(), Some("blankets"));
    }

    #[test]
    fn blank_is_dropped() {
        assert_eq!(normalize_need("   "), None);
        assert!(normalize_needs(["", " "]).is_empty());
    }

    #[test]
    fn duplicates_collapse_in_first_seen_order() {
        let out = normalize_needs(["ambulance", "Blankets", "medic", "trapped", "blankets"]);
        assert_eq!(out, vec!["medical", "blankets", "rescue"]);
    }

    #[test]
    fn vocabulary_maps_to_itself() {
        for token in NEED_VOCABULARY {
            assert_eq!(normalize_need(token).as_deref(), Some(*token));
        }
    }

    #[test]
    fn idempotent_on_normalised_lists() {
        let inputs: &[&[&str]] = &[
            &["ambulance", "bottled water", "Generators"],
            &["SEARCH and rescue", "road closed", "cots", "evac"],
            &[],
            &["fire", "fire", "Smoke"],
        ];
        for input in inputs {
            let once = normalize_needs(input.iter());
            let twice = normalize_needs(once.iter());
            assert_eq!(once, twice, "not idempotent for {input:?}");
        }
    }
}
