use crate::model::{Candidate, SimilarityCategory};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Groups categorized candidates by category, each group cheapest first.
/// Candidates without a category are ignored.
pub fn rank_by_price(candidates: Vec<Candidate>) -> BTreeMap<SimilarityCategory, Vec<Candidate>> {
    let mut ranked: BTreeMap<SimilarityCategory, Vec<Candidate>> = BTreeMap::new();
    for candidate in candidates {
        if let Some(category) = candidate.similarity_category {
            ranked.entry(category).or_default().push(candidate);
        }
    }
    for group in ranked.values_mut() {
        group.sort_by(compare_price);
    }
    ranked
}

/// Known prices ascending, unknown prices last. On an equal price owner-direct
/// listings come first, then the stronger match.
pub fn compare_price(a: &Candidate, b: &Candidate) -> Ordering {
    let by_price = match (a.nightly_price, b.nightly_price) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_price
        .then_with(|| b.source.is_owner_direct().cmp(&a.source.is_owner_direct()))
        .then_with(|| {
            let (sa, sb) = (a.similarity_score.unwrap_or(0.0), b.similarity_score.unwrap_or(0.0));
            sb.total_cmp(&sa)
        })
        .then_with(|| a.canonical_key().cmp(&b.canonical_key()))
}
