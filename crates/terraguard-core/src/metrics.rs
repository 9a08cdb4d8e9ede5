//! Set-overlap metrics used when evaluating extraction quality.

use std::collections::BTreeSet;

/// Jaccard similarity of two need lists, treated as sets.
///
/// Two empty lists are a perfect match (1.0).
pub fn jaccard<S: AsRef<str>>(a: &[S], b: &[S]) -> f64 {
    let sa: BTreeSet<&str> = a.iter().map(|s| s.as_ref()).collect();
    let sb: BTreeSet<&str> = b.iter().map(|s| s.as_ref()).collect();
    if sa.is_empty() && sb.is_empty() {
        return 1.0;
    }
    let inter = sa.intersection(&sb).count();
    let union = sa.union(&sb).count();
    inter as f64 / union.max(1) as f64
}
