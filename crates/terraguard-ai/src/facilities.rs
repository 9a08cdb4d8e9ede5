//! Facility suggestion for an incident's normalised needs.
//!
//! Each need names the facility types and capability tags that can serve it.
//! A facility scores its type bonus when its type is wanted by any need, plus
//! a fixed amount per wanted capability it offers. Zero scores are dropped.

use terraguard_core::{Facility, FacilityType};

pub const DEFAULT_LIMIT: usize = 3;

const POINTS_PER_CAPABILITY: u32 = 8;

fn type_weight(kind: FacilityType) -> u32 {
    match kind {
        FacilityType::Hospital => 30,
        FacilityType::Fire => 25,
        FacilityType::Shelter => 18,
        FacilityType::PublicWorks => 15,
        FacilityType::Utility => 15,
        FacilityType::Police => 12,
    }
}

fn preferred_types(need: &str) -> &'static [FacilityType] {
    use FacilityType::*;
    match need {
        "medical" => &[Hospital],
        "rescue" => &[Fire],
        "fire" => &[Fire],
        "evacuation" => &[Shelter],
        "utility" => &[Utility],
        "public-works" => &[PublicWorks],
        "security" => &[Police],
        "water" => &[Shelter, PublicWorks],
        "food" => &[Shelter],
        _ => &[],
    }
}

fn preferred_capabilities(need: &str) -> &'static [&'static str] {
    match need {
        "medical" => &["er", "trauma", "ems", "medical"],
        "rescue" => &["rescue", "ems", "swiftwater"],
        "fire" => &["fire", "hazmat"],
        "evacuation" => &["shelter", "beds", "evacuation"],
        "utility" => &["power", "gas", "electric"],
        "public-works" => &["debris", "roads", "heavy-equipment"],
        "security" => &["security", "traffic-control"],
        "water" => &["water", "potable-water"],
        "food" => &["food", "meals"],
        _ => &[],
    }
}

/// Union of the facility types and capability tags wanted by `needs`.
///
/// Both lists keep first-seen order and contain no duplicates.
pub fn desired_for(needs: &[String]) -> (Vec<FacilityType>, Vec<&'static str>) {
    let mut types = Vec::new();
    let mut caps = Vec::new();
    for need in needs {
        for kind in preferred_types(need) {
            if !types.contains(kind) {
                types.push(*kind);
            }
        }
        for cap in preferred_capabilities(need) {
            if !caps.contains(cap) {
                caps.push(*cap);
            }
        }
    }
    (types, caps)
}

pub fn facility_score(facility: &Facility, types: &[FacilityType], caps: &[&str]) -> u32 {
    let type_bonus = if types.contains(&facility.kind) {
        type_weight(facility.kind)
    } else {
        0
    };
    let matched = caps.iter().filter(|c| facility.has_capability(c)).count() as u32;
    type_bonus + matched * POINTS_PER_CAPABILITY
}

/// All facilities with a positive score, best first (ties by name).
pub fn rank_facilities<'a>(
    needs: &[String],
    facilities: &'a [Facility],
) -> Vec<(u32, &'a Facility)> {
    let (types, caps) = desired_for(needs);
    let mut ranked: Vec<(u32, &Facility)> = facilities
        .iter()
        .map(|f| (facility_score(f, &types, &caps), f))
        .filter(|(score, _)| *score > 0)
        .collect();
    ranked.sort_by(|(sa, fa), (sb, fb)| sb.cmp(sa).then_with(|| fa.name.cmp(&fb.name)));
    ranked
}

/// Top `limit` facilities for the given needs.
pub fn suggest_facilities(
    needs: &[String],
    facilities: &[Facility],
    limit: usize,
) -> Vec<Facility> {
    rank_facilities(needs, facilities)
        .into_iter()
        .take(limit)
        .map(|(_, f)| f.clone())
        .collect()
}
