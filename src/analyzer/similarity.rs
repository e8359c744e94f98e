use crate::config::Thresholds;
use crate::model::{Candidate, ReferenceProperty, SimilarityCategory};
use crate::utils::normalize_text;
use tracing::debug;

/// Buckets a score. `None` means the candidate is noise and must not be shown.
pub fn categorize_score(score: f64, thresholds: &Thresholds) -> Option<SimilarityCategory> {
    if score >= thresholds.exact_match {
        Some(SimilarityCategory::ExactMatch)
    } else if score >= thresholds.same_complex {
        Some(SimilarityCategory::SameComplex)
    } else if score >= thresholds.nearby {
        Some(SimilarityCategory::Nearby)
    } else if score >= thresholds.city_wide {
        Some(SimilarityCategory::CityWide)
    } else {
        None
    }
}

/// Category of one candidate against the reference. A candidate in the same
/// complex as the reference is at least `SameComplex` once it clears the noise floor.
pub fn categorize(
    candidate: &Candidate,
    reference: &ReferenceProperty,
    thresholds: &Thresholds,
) -> Option<SimilarityCategory> {
    let category = categorize_score(candidate.similarity_score?, thresholds)?;
    if same_complex(candidate, reference) {
        Some(category.max(SimilarityCategory::SameComplex))
    } else {
        Some(category)
    }
}

/// Assigns `similarity_category` to every candidate and drops the noise.
pub fn categorize_all(
    candidates: Vec<Candidate>,
    reference: &ReferenceProperty,
    thresholds: &Thresholds,
) -> Vec<Candidate> {
    let total = candidates.len();
    let kept: Vec<Candidate> = candidates
        .into_iter()
        .filter_map(|mut candidate| {
            candidate.similarity_category = categorize(&candidate, reference, thresholds);
            candidate.similarity_category.map(|_| candidate)
        })
        .collect();

    debug!("Categorized {} candidates, dropped {} as noise", kept.len(), total - kept.len());
    kept
}

fn same_complex(candidate: &Candidate, reference: &ReferenceProperty) -> bool {
    match (&candidate.complex_name, &reference.complex_name) {
        (Some(a), Some(b)) => {
            let (a, b) = (normalize_text(a), normalize_text(b));
            !a.is_empty() && a == b
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Source;

    fn reference() -> ReferenceProperty {
        ReferenceProperty {
            title: Some("King's Crown D203".into()),
            url: None,
            location: Some("Park City, Utah".into()),
            bedrooms: Some(2),
            bathrooms: Some(2.0),
            nightly_price: Some(400.0),
            host_name: None,
            complex_name: Some("King's Crown".into()),
            check_in: None,
            check_out: None,
            nights: None,
        }
    }

    fn scored(score: Option<f64>, complex: Option<&str>) -> Candidate {
        Candidate {
            url: Some("https://www.vrbo.com/1".into()),
            source: Source::Vrbo,
            title: None,
            location: None,
            nightly_price: Some(380.0),
            bedrooms: None,
            bathrooms: None,
            similarity_score: score,
            similarity_category: None,
            is_affiliate: false,
            complex_name: complex.map(String::from),
        }
    }

    #[test]
    fn test_threshold_boundaries() {
        let t = Thresholds::default();
        assert_eq!(categorize_score(100.0, &t), Some(SimilarityCategory::ExactMatch));
        assert_eq!(categorize_score(90.0, &t), Some(SimilarityCategory::ExactMatch));
        assert_eq!(categorize_score(89.9, &t), Some(SimilarityCategory::SameComplex));
        assert_eq!(categorize_score(80.0, &t), Some(SimilarityCategory::SameComplex));
        assert_eq!(categorize_score(79.9, &t), Some(SimilarityCategory::Nearby));
        assert_eq!(categorize_score(70.0, &t), Some(SimilarityCategory::Nearby));
        assert_eq!(categorize_score(69.9, &t), Some(SimilarityCategory::CityWide));
        assert_eq!(categorize_score(50.0, &t), Some(SimilarityCategory::CityWide));
        assert_eq!(categorize_score(49.9, &t), None);
    }

    #[test]
    fn test_same_complex_promotion() {
        let t = Thresholds::default();
        let r = reference();
        let c = scored(Some(55.0), Some("Kings Crown"));
        assert_eq!(categorize(&c, &r, &t), Some(SimilarityCategory::SameComplex));

        // Promotion never lowers an exact match.
        let c = scored(Some(95.0), Some("King's Crown"));
        assert_eq!(categorize(&c, &r, &t), Some(SimilarityCategory::ExactMatch));
    }

    #[test]
    fn test_noise_is_not_promoted() {
        let c = scored(Some(40.0), Some("King's Crown"));
        assert_eq!(categorize(&c, &reference(), &Thresholds::default()), None);
    }

    #[test]
    fn test_missing_score_is_dropped() {
        let kept = categorize_all(
            vec![scored(None, None), scored(Some(72.0), None)],
            &reference(),
            &Thresholds::default(),
        );
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].similarity_category, Some(SimilarityCategory::Nearby));
    }
}
