//! Vertical card display for merged incident records.
//!
//! Fields are grouped into sections; a section with no populated field is
//! skipped entirely.

use terraguard_core::{Facility, MergedRecord};

const MAX_LIST_ITEMS: usize = 10;

// ── Public API ──

/// Print one merged incident as a grouped card.
pub fn print_incident_card(record: &MergedRecord) {
    let heading = record.location_text.as_deref().unwrap_or("(unknown location)");
    println!("=== {} ===", heading);
    if let Some(notes) = &record.notes {
        println!("{}", notes);
    }
    println!();

    print_section(
        "Incident",
        &[
            ("location_text", record.location_text.clone()),
            ("time_iso", record.time_text.clone()),
            ("severity", record.severity.map(|s| s.as_str().to_string())),
            ("needs", join_list(&record.needs)),
            ("dedupe_key", record.dedupe_key.clone()),
        ],
    );

    let conf = &record.confidence_per_field;
    print_section(
        "Confidence",
        &[
            ("overall", Some(format!("{:.3}", record.confidence_overall))),
            ("location_text", Some(format!("{:.3}", conf.location_text))),
            ("time_iso", Some(format!("{:.3}", conf.time))),
            ("severity", Some(format!("{:.3}", conf.severity))),
            ("needs", Some(format!("{:.3}", conf.needs))),
        ],
    );

    print_section(
        "Triage",
        &[("risk_score", Some(format!("{} / 100", record.risk_score)))],
    );

    print_facilities(&record.suggested_facilities);
}

/// Print an offline risk score and its facility suggestions.
pub fn print_score(score: u8, needs: &[String], suggested: &[Facility]) {
    print_section(
        "Triage",
        &[
            ("needs", join_list(needs)),
            ("risk_score", Some(format!("{} / 100", score))),
        ],
    );
    print_facilities(suggested);
}

// ── Section rendering ──

fn print_section(header: &str, rows: &[(&str, Option<String>)]) {
    if rows.iter().all(|(_, value)| value.is_none()) {
        return;
    }

    println!("{header}");
    for (label, value) in rows {
        if let Some(value) = value {
            println!("  {:<26} {}", label, value);
        }
    }
    println!();
}

fn print_facilities(facilities: &[Facility]) {
    if facilities.is_empty() {
        return;
    }

    println!("Facilities");
    for (i, f) in facilities.iter().enumerate() {
        println!("  {:<26} {}", format!("[{}] {}", i + 1, f.kind.as_str()), f.name);
        if let Some(address) = &f.address {
            println!("  {:<26} {}", "", address);
        }
        if let Some(phone) = &f.phone {
            println!("  {:<26} {}", "", phone);
        }
    }
    println!();
}

fn join_list(items: &[String]) -> Option<String> {
    if items.is_empty() {
        return None;
    }
    let shown: Vec<&str> = items.iter().take(MAX_LIST_ITEMS).map(String::as_str).collect();
    let more = items.len().saturating_sub(MAX_LIST_ITEMS);
    if more > 0 {
        Some(format!("{} (+{} more)", shown.join(", "), more))
    } else {
        Some(shown.join(", "))
    }
}
