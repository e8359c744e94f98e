use crate::model::Candidate;
use crate::utils::{extract_unit_identifier, normalize_text, normalize_url};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use strsim::normalized_levenshtein;
use tracing::debug;

/// Collapses candidates that describe the same physical rental.
///
/// Duplicate groups are the transitive closure of `is_same_listing`, so the
/// merged set does not depend on input order. Returns the merged candidates
/// (in canonical order) and how many records were folded away.
pub fn deduplicate(mut candidates: Vec<Candidate>, threshold: f64) -> (Vec<Candidate>, usize) {
    candidates.sort_by(|a, b| a.canonical_key().cmp(&b.canonical_key()));

    let n = candidates.len();
    let mut parent: Vec<usize> = (0..n).collect();
    for i in 0..n {
        for j in (i + 1)..n {
            if is_same_listing(&candidates[i], &candidates[j], threshold) {
                union(&mut parent, i, j);
            }
        }
    }

    let mut groups: BTreeMap<usize, Vec<Candidate>> = BTreeMap::new();
    for (i, candidate) in candidates.into_iter().enumerate() {
        let root = find(&mut parent, i);
        groups.entry(root).or_default().push(candidate);
    }

    let merged_away = n - groups.len();
    let mut merged: Vec<Candidate> = groups.into_values().filter_map(merge_group).collect();
    merged.sort_by(|a, b| a.canonical_key().cmp(&b.canonical_key()));

    if merged_away > 0 {
        debug!("Deduplication: merged {} duplicate records", merged_away);
    }
    (merged, merged_away)
}

/// Same URL, same normalized title at a non-conflicting location, or a
/// pairwise similarity above `threshold`.
pub fn is_same_listing(a: &Candidate, b: &Candidate, threshold: f64) -> bool {
    if let (Some(ua), Some(ub)) = (&a.url, &b.url) {
        if normalize_url(ua) == normalize_url(ub) {
            return true;
        }
    }

    if let (Some(ta), Some(tb)) = (&a.title, &b.title) {
        let (ta, tb) = (normalize_text(ta), normalize_text(tb));
        if !ta.is_empty() && ta == tb && !locations_conflict(a, b) {
            return true;
        }
    }

    pairwise_similarity(a, b) > threshold
}

/// Title similarity (0-100) between two candidates. Zero when the listings are
/// distinguishable by unit number, location or bedroom count.
pub fn pairwise_similarity(a: &Candidate, b: &Candidate) -> f64 {
    let (Some(ta), Some(tb)) = (&a.title, &b.title) else {
        return 0.0;
    };

    if let (Some(ua), Some(ub)) = (extract_unit_identifier(ta), extract_unit_identifier(tb)) {
        if ua != ub {
            return 0.0;
        }
    }
    if locations_conflict(a, b) {
        return 0.0;
    }
    if let (Some(ba), Some(bb)) = (a.bedrooms, b.bedrooms) {
        if ba != bb {
            return 0.0;
        }
    }

    let (ta, tb) = (normalize_text(ta), normalize_text(tb));
    if ta.is_empty() || tb.is_empty() {
        return 0.0;
    }
    normalized_levenshtein(&ta, &tb) * 100.0
}

fn locations_conflict(a: &Candidate, b: &Candidate) -> bool {
    match (&a.location, &b.location) {
        (Some(la), Some(lb)) => normalize_text(la) != normalize_text(lb),
        _ => false,
    }
}

/// Best record first: known price, then more populated fields, then owner direct.
fn preference(a: &Candidate, b: &Candidate) -> Ordering {
    b.nightly_price
        .is_some()
        .cmp(&a.nightly_price.is_some())
        .then_with(|| b.populated_fields().cmp(&a.populated_fields()))
        .then_with(|| b.source.is_owner_direct().cmp(&a.source.is_owner_direct()))
        .then_with(|| a.canonical_key().cmp(&b.canonical_key()))
}

fn merge_group(mut group: Vec<Candidate>) -> Option<Candidate> {
    group.sort_by(preference);

    let lowest_price = group
        .iter()
        .filter_map(|c| c.nightly_price)
        .min_by(|x, y| x.total_cmp(y));
    let best_score = group
        .iter()
        .filter_map(|c| c.similarity_score)
        .max_by(|x, y| x.total_cmp(y));

    let mut members = group.into_iter();
    let mut base = members.next()?;
    for other in members {
        if base.url.is_none() && other.url.is_some() {
            base.url = other.url;
            base.is_affiliate = other.is_affiliate;
        }
        if base.title.is_none() {
            base.title = other.title;
            base.complex_name = other.complex_name;
        }
        if base.location.is_none() {
            base.location = other.location;
        }
        if base.bedrooms.is_none() {
            base.bedrooms = other.bedrooms;
        }
        if base.bathrooms.is_none() {
            base.bathrooms = other.bathrooms;
        }
    }
    base.nightly_price = lowest_price;
    base.similarity_score = best_score;
    Some(base)
}

fn find(parent: &mut [usize], mut i: usize) -> usize {
    while parent[i] != i {
        parent[i] = parent[parent[i]];
        i = parent[i];
    }
    i
}

fn union(parent: &mut [usize], a: usize, b: usize) {
    let (ra, rb) = (find(parent, a), find(parent, b));
    if ra != rb {
        // Lower index becomes the root so group keys follow canonical order.
        let (root, child) = if ra < rb { (ra, rb) } else { (rb, ra) };
        parent[child] = root;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Source;
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::SeedableRng;

    fn candidate(url: &str, source: Source, price: Option<f64>) -> Candidate {
        Candidate {
            url: Some(url.to_string()),
            source,
            title: None,
            location: None,
            nightly_price: price,
            bedrooms: None,
            bathrooms: None,
            similarity_score: Some(95.0),
            similarity_category: None,
            is_affiliate: false,
            complex_name: None,
        }
    }

    fn titled(title: &str, location: &str, source: Source, price: Option<f64>) -> Candidate {
        Candidate {
            url: None,
            title: Some(title.to_string()),
            location: Some(location.to_string()),
            ..candidate("", source, price)
        }
    }

    #[test]
    fn test_identical_url_keeps_lowest_price() {
        let input = vec![
            candidate("https://www.vrbo.com/1", Source::Vrbo, Some(260.0)),
            candidate("https://www.vrbo.com/1", Source::Vrbo, Some(250.0)),
        ];
        let (out, merged) = deduplicate(input, 95.0);
        assert_eq!(out.len(), 1);
        assert_eq!(merged, 1);
        assert_eq!(out[0].nightly_price, Some(250.0));
    }

    #[test]
    fn test_known_price_wins_over_unknown() {
        let mut rich = candidate("https://www.booking.com/x", Source::BookingCom, None);
        rich.title = Some("King's Crown D203".into());
        rich.bedrooms = Some(2);
        rich.bathrooms = Some(2.0);
        let mut priced = titled("King's Crown D203", "Park City, Utah", Source::OwnerDirect, Some(310.0));
        priced.url = Some("https://abodeparkcity.com/d203".into());

        let (out, _) = deduplicate(vec![rich, priced], 95.0);
        assert_eq!(out.len(), 1);
        let merged = &out[0];
        assert_eq!(merged.nightly_price, Some(310.0));
        assert_eq!(merged.source, Source::OwnerDirect);
        // Missing metadata filled from the other record.
        assert_eq!(merged.bedrooms, Some(2));
        assert_eq!(merged.bathrooms, Some(2.0));
    }

    #[test]
    fn test_borrowed_url_keeps_its_affiliate_flag() {
        let priced = titled("Sunset Villa", "Maui", Source::BookingCom, Some(200.0));
        let mut linked = titled("Sunset Villa", "Maui", Source::BookingCom, None);
        linked.url = Some("https://www.booking.com/hotel/us/sunset.html?aid=9".into());
        linked.is_affiliate = true;

        let (out, _) = deduplicate(vec![priced, linked], 95.0);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].nightly_price, Some(200.0));
        assert_eq!(out[0].url.as_deref(), Some("https://www.booking.com/hotel/us/sunset.html?aid=9"));
        assert!(out[0].is_affiliate);
    }

    #[test]
    fn test_owner_direct_wins_ties() {
        let a = titled("Sunset Villa", "Maui", Source::BookingCom, Some(200.0));
        let b = titled("Sunset Villa", "Maui", Source::OwnerDirect, Some(180.0));
        let (out, _) = deduplicate(vec![a, b], 95.0);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].source, Source::OwnerDirect);
        assert_eq!(out[0].nightly_price, Some(180.0));
    }

    #[test]
    fn test_same_title_different_city_is_kept() {
        let a = titled("Cozy Cabin", "Park City, Utah", Source::Vrbo, Some(200.0));
        let b = titled("Cozy Cabin", "Aspen, Colorado", Source::Vrbo, Some(210.0));
        let (out, merged) = deduplicate(vec![a, b], 95.0);
        assert_eq!(out.len(), 2);
        assert_eq!(merged, 0);
    }

    #[test]
    fn test_different_units_are_not_merged() {
        let a = titled("King's Crown Residences D203", "Park City", Source::Vrbo, Some(300.0));
        let b = titled("King's Crown Residences D204", "Park City", Source::Vrbo, Some(300.0));
        assert_eq!(pairwise_similarity(&a, &b), 0.0);
        let (out, _) = deduplicate(vec![a, b], 95.0);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_near_identical_titles_merge() {
        let a = titled("Luxury Mountain View Condo near Main Street", "Park City", Source::Vrbo, Some(300.0));
        let b = titled("Luxury Mountain View Condo near Main Stret", "Park City", Source::HotelsCom, Some(290.0));
        assert!(pairwise_similarity(&a, &b) > 95.0);
        let (out, _) = deduplicate(vec![a, b], 95.0);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].nightly_price, Some(290.0));
    }

    #[test]
    fn test_transitive_groups_merge() {
        let mut a = candidate("https://www.vrbo.com/7", Source::Vrbo, Some(330.0));
        a.title = Some("Silver Star 12".into());
        let b = titled("Silver Star 12", "Park City", Source::BookingCom, Some(320.0));
        let mut c = candidate("https://www.vrbo.com/7", Source::Vrbo, Some(340.0));
        c.title = Some("Different name".into());
        let (out, merged) = deduplicate(vec![a, b, c], 95.0);
        assert_eq!(out.len(), 1);
        assert_eq!(merged, 2);
        assert_eq!(out[0].nightly_price, Some(320.0));
    }

    #[test]
    fn test_order_independent() {
        let input = vec![
            candidate("https://www.vrbo.com/1", Source::Vrbo, Some(260.0)),
            candidate("https://www.vrbo.com/1", Source::Vrbo, Some(250.0)),
            titled("Sunset Villa", "Maui", Source::BookingCom, Some(200.0)),
            titled("Sunset Villa", "Maui", Source::OwnerDirect, None),
            candidate("https://www.booking.com/2", Source::BookingCom, None),
            titled("Cozy Cabin", "Aspen", Source::Vrbo, Some(199.0)),
        ];
        let (expected, _) = deduplicate(input.clone(), 95.0);

        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let mut shuffled = input.clone();
            shuffled.shuffle(&mut rng);
            let (out, _) = deduplicate(shuffled, 95.0);
            assert_eq!(out, expected);
        }
    }
}
