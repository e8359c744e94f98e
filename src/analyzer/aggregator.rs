use crate::analyzer::dedup::deduplicate;
use crate::analyzer::ranking::rank_by_price;
use crate::analyzer::savings::{best_entry, calculate_savings, summarize};
use crate::analyzer::similarity::categorize_all;
use crate::config::Thresholds;
use crate::model::{
    AggregateError, Candidate, RankedEntry, RankedResult, RawRecord, ReferenceProperty,
    SearchStats, SimilarityCategory,
};
use crate::normalizer::{normalize_all, normalize_reference};
use tracing::info;

/// Turns a reference listing and raw candidate batches into a ranked comparison.
///
/// Pure and deterministic: no I/O, no clock, no randomness. The same inputs
/// in any batch order produce the same result.
#[derive(Debug, Clone, Default)]
pub struct ResultAggregator {
    thresholds: Thresholds,
}

impl ResultAggregator {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Same as [`aggregate`](Self::aggregate) but starting from the raw reference record.
    pub fn aggregate_raw(
        &self,
        reference: &RawRecord,
        batches: &[Vec<RawRecord>],
    ) -> Result<RankedResult, AggregateError> {
        let reference = normalize_reference(reference)?;
        Ok(self.aggregate(&reference, batches))
    }

    pub fn aggregate(&self, reference: &ReferenceProperty, batches: &[Vec<RawRecord>]) -> RankedResult {
        let (candidates, records_skipped) = normalize_all(batches);
        let (candidates, duplicates_merged) = deduplicate(candidates, self.thresholds.duplicate);
        let candidates = categorize_all(candidates, reference, &self.thresholds);
        let mut ranked = rank_by_price(candidates);

        let annotate = |group: Vec<Candidate>| -> Vec<RankedEntry> {
            group
                .into_iter()
                .map(|candidate| RankedEntry {
                    savings: calculate_savings(reference.nightly_price, candidate.nightly_price),
                    candidate,
                })
                .collect()
        };

        let exact_matches = annotate(
            ranked
                .remove(&SimilarityCategory::ExactMatch)
                .unwrap_or_default(),
        );
        let similar_properties: Vec<RankedEntry> = SimilarityCategory::DISPLAY_ORDER
            .iter()
            .filter(|category| **category != SimilarityCategory::ExactMatch)
            .flat_map(|category| annotate(ranked.remove(category).unwrap_or_default()))
            .collect();

        // Headline savings and best source come from the same group: exact
        // matches when there are any, similar properties otherwise.
        let headline = if exact_matches.is_empty() {
            &similar_properties
        } else {
            &exact_matches
        };
        let savings_summary = summarize(headline);
        let best_price_source = best_entry(headline)
            .or(headline.first())
            .map(|entry| entry.candidate.source);

        let stats = SearchStats {
            total_sources_searched: batches.len(),
            exact_matches_found: exact_matches.len(),
            similar_properties_found: similar_properties.len(),
            best_price_source,
            owner_direct_found: exact_matches
                .iter()
                .any(|entry| entry.candidate.source.is_owner_direct()),
            affiliate_opportunities: exact_matches
                .iter()
                .filter(|entry| entry.candidate.is_affiliate)
                .count(),
            duplicates_merged,
            records_skipped,
        };

        info!(
            "Aggregated {} exact matches and {} similar properties for {}",
            stats.exact_matches_found,
            stats.similar_properties_found,
            reference.display_name()
        );

        RankedResult {
            reference: reference.clone(),
            exact_matches,
            similar_properties,
            savings_summary,
            stats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NormalizationError, Savings, Source};
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::SeedableRng;
    use serde_json::{json, Value};

    fn reference(price: Value) -> Value {
        json!({
            "title": "King's Crown D203",
            "location": "Park City, Utah",
            "bedrooms": 2,
            "bathrooms": 2,
            "nightly_price": price,
            "host_name": "Abode"
        })
    }

    fn scenario_batches() -> Vec<Vec<Value>> {
        vec![
            vec![json!({
                "url": "https://abodeparkcity.com/kings-crown-d203",
                "source": "owner_direct",
                "nightly_price": 250,
                "similarity_score": 95
            })],
            vec![json!({
                "url": "https://www.booking.com/hotel/us/kings-crown.html",
                "source": "booking_com",
                "nightly_price": 250,
                "similarity_score": 95
            })],
            vec![json!({
                "url": "https://www.vrbo.com/4455",
                "source": "vrbo",
                "nightly_price": 280,
                "similarity_score": 72
            })],
        ]
    }

    #[test]
    fn test_price_comparison_scenario() {
        let result = ResultAggregator::default()
            .aggregate_raw(&reference(json!(300)), &scenario_batches())
            .unwrap();

        let exact: Vec<_> = result
            .exact_matches
            .iter()
            .map(|e| (e.candidate.source, e.candidate.nightly_price))
            .collect();
        assert_eq!(
            exact,
            vec![
                (Source::OwnerDirect, Some(250.0)),
                (Source::BookingCom, Some(250.0))
            ]
        );
        assert_eq!(result.similar_properties.len(), 1);
        assert_eq!(result.similar_properties[0].candidate.source, Source::Vrbo);
        assert_eq!(result.similar_properties[0].candidate.nightly_price, Some(280.0));
        assert_eq!(result.savings_summary.best_savings_amount, Some(50.0));
        assert_eq!(result.savings_summary.best_savings_percent, Some(17));
        assert_eq!(
            result.exact_matches[0].savings,
            Savings::Known { amount: 50.0, percent: 17 }
        );
        assert_eq!(result.stats.total_sources_searched, 3);
        assert_eq!(result.stats.best_price_source, Some(Source::OwnerDirect));
        assert!(result.stats.owner_direct_found);
    }

    #[test]
    fn test_cheaper_similar_property_does_not_drive_headline_savings() {
        let batches = vec![vec![
            json!({"url": "https://abodeparkcity.com/d203", "source": "owner", "nightly_price": 350, "similarity_score": 95}),
            json!({"url": "https://www.vrbo.com/777", "nightly_price": 150, "similarity_score": 55}),
        ]];
        let result = ResultAggregator::default()
            .aggregate_raw(&reference(json!(300)), &batches)
            .unwrap();

        assert_eq!(result.similar_properties[0].savings, Savings::Known { amount: 150.0, percent: 50 });
        assert_eq!(result.savings_summary.best_savings_amount, Some(-50.0));
        assert_eq!(result.savings_summary.best_savings_percent, Some(-17));
        assert_eq!(result.stats.best_price_source, Some(Source::OwnerDirect));
    }

    #[test]
    fn test_headline_falls_back_to_similar_properties() {
        let batches = vec![vec![
            json!({"url": "https://www.vrbo.com/1", "nightly_price": 260, "similarity_score": 75}),
            json!({"url": "https://www.booking.com/2", "nightly_price": 240, "similarity_score": 60}),
        ]];
        let result = ResultAggregator::default()
            .aggregate_raw(&reference(json!(300)), &batches)
            .unwrap();

        assert!(result.exact_matches.is_empty());
        assert_eq!(result.savings_summary.best_savings_amount, Some(60.0));
        assert_eq!(result.stats.best_price_source, Some(Source::BookingCom));
    }

    #[test]
    fn test_duplicate_urls_merge_to_lowest_price() {
        let batches = vec![
            vec![json!({"url": "https://www.vrbo.com/1", "nightly_price": 260, "similarity_score": 93})],
            vec![json!({"url": "https://www.vrbo.com/1", "nightly_price": 250, "similarity_score": 91})],
        ];
        let result = ResultAggregator::default()
            .aggregate_raw(&reference(json!(300)), &batches)
            .unwrap();
        assert_eq!(result.exact_matches.len(), 1);
        assert_eq!(result.exact_matches[0].candidate.nightly_price, Some(250.0));
        assert_eq!(result.stats.duplicates_merged, 1);
    }

    #[test]
    fn test_noise_and_malformed_records_are_excluded() {
        let batches = vec![vec![
            json!({"url": "https://www.vrbo.com/1", "nightly_price": 100, "similarity_score": 49.9}),
            json!({"nightly_price": 100}),
            json!("garbage"),
            json!({"url": "https://www.vrbo.com/2", "nightly_price": 310, "similarity_score": 60}),
        ]];
        let result = ResultAggregator::default()
            .aggregate_raw(&reference(json!(300)), &batches)
            .unwrap();
        assert!(result.exact_matches.is_empty());
        assert_eq!(result.similar_properties.len(), 1);
        assert_eq!(
            result.similar_properties[0].candidate.similarity_category,
            Some(SimilarityCategory::CityWide)
        );
        assert_eq!(
            result.similar_properties[0].savings,
            Savings::Known { amount: -10.0, percent: -3 }
        );
        assert_eq!(result.stats.records_skipped, 2);
        assert!(result.entries().all(|e| e.candidate.similarity_score.unwrap_or(0.0) >= 50.0));
    }

    #[test]
    fn test_unknown_reference_price_means_unknown_savings() {
        let result = ResultAggregator::default()
            .aggregate_raw(&reference(Value::Null), &scenario_batches())
            .unwrap();
        assert!(result.entries().all(|e| e.savings == Savings::Unknown));
        assert_eq!(result.savings_summary.best_savings_percent, None);
        assert_eq!(result.savings_summary.best_savings_amount, None);
    }

    #[test]
    fn test_unknown_prices_sort_last_within_category() {
        let batches = vec![vec![
            json!({"url": "https://www.vrbo.com/1", "similarity_score": 75}),
            json!({"url": "https://www.vrbo.com/2", "nightly_price": 410, "similarity_score": 71}),
            json!({"url": "https://www.vrbo.com/3", "nightly_price": 205, "similarity_score": 78}),
        ]];
        let result = ResultAggregator::default()
            .aggregate_raw(&reference(json!(300)), &batches)
            .unwrap();
        let prices: Vec<_> = result
            .similar_properties
            .iter()
            .map(|e| e.candidate.nightly_price)
            .collect();
        assert_eq!(prices, vec![Some(205.0), Some(410.0), None]);
    }

    #[test]
    fn test_similar_properties_grouped_by_category() {
        let batches = vec![vec![
            json!({"url": "https://www.vrbo.com/1", "nightly_price": 100, "similarity_score": 55}),
            json!({"url": "https://www.vrbo.com/2", "nightly_price": 300, "similarity_score": 85}),
            json!({"url": "https://www.vrbo.com/3", "nightly_price": 200, "similarity_score": 75}),
        ]];
        let result = ResultAggregator::default()
            .aggregate_raw(&reference(json!(300)), &batches)
            .unwrap();
        let categories: Vec<_> = result
            .similar_properties
            .iter()
            .filter_map(|e| e.candidate.similarity_category)
            .collect();
        assert_eq!(
            categories,
            vec![
                SimilarityCategory::SameComplex,
                SimilarityCategory::Nearby,
                SimilarityCategory::CityWide
            ]
        );
    }

    #[test]
    fn test_empty_candidate_set_is_not_an_error() {
        let result = ResultAggregator::default()
            .aggregate_raw(&reference(json!(300)), &[])
            .unwrap();
        assert!(result.is_empty());
        assert_eq!(result.stats.best_price_source, None);
    }

    #[test]
    fn test_unusable_reference_is_an_error() {
        let err = ResultAggregator::default()
            .aggregate_raw(&json!({"bedrooms": 2}), &scenario_batches())
            .unwrap_err();
        assert!(matches!(
            err,
            AggregateError::Reference(NormalizationError::MissingIdentity)
        ));
    }

    #[test]
    fn test_idempotent_and_permutation_invariant() {
        let mut batches = scenario_batches();
        batches.push(vec![
            json!({"url": "https://www.vrbo.com/4455", "nightly_price": 275, "similarity_score": 70}),
            json!({"title": "King's Crown B101", "location": "Park City, Utah", "platform": "Hotels.com", "price": 330, "similarity_score": 84}),
            json!({"title": "King's Crown B101", "location": "Park City, Utah", "url": "https://www.booking.com/b101?aid=9", "similarity_score": 82}),
            json!({"url": "https://www.hotels.com/ho1", "similarity_score": 91}),
        ]);
        let aggregator = ResultAggregator::default();
        let reference = normalize_reference(&reference(json!(300))).unwrap();
        let expected = aggregator.aggregate(&reference, &batches);
        assert_eq!(aggregator.aggregate(&reference, &batches), expected);

        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..20 {
            let mut shuffled: Vec<Vec<Value>> = batches.clone();
            shuffled.shuffle(&mut rng);
            for batch in shuffled.iter_mut() {
                batch.shuffle(&mut rng);
            }
            assert_eq!(aggregator.aggregate(&reference, &shuffled), expected);
        }
    }
}
