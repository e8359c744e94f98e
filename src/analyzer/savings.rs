use crate::model::{RankedEntry, Savings, SavingsSummary};

/// Savings of booking the candidate instead of the reference.
///
/// Unknown when either price is missing or the reference price is not positive.
/// A pricier candidate yields a negative amount and percentage.
pub fn calculate_savings(reference_price: Option<f64>, candidate_price: Option<f64>) -> Savings {
    match (reference_price, candidate_price) {
        (Some(reference), Some(candidate)) if reference > 0.0 => {
            let amount = reference - candidate;
            Savings::Known {
                amount: (amount * 100.0).round() / 100.0,
                percent: (amount / reference * 100.0).round() as i64,
            }
        }
        _ => Savings::Unknown,
    }
}

/// The entry with the largest known saving. The first entry wins ties.
pub fn best_entry<'a>(entries: impl IntoIterator<Item = &'a RankedEntry>) -> Option<&'a RankedEntry> {
    let mut best: Option<(f64, &RankedEntry)> = None;
    for entry in entries {
        if let Savings::Known { amount, .. } = entry.savings {
            if best.is_none_or(|(best_amount, _)| amount > best_amount) {
                best = Some((amount, entry));
            }
        }
    }
    best.map(|(_, entry)| entry)
}

pub fn summarize<'a>(entries: impl IntoIterator<Item = &'a RankedEntry>) -> SavingsSummary {
    match best_entry(entries).map(|entry| &entry.savings) {
        Some(Savings::Known { amount, percent }) => SavingsSummary {
            best_savings_amount: Some(*amount),
            best_savings_percent: Some(*percent),
        },
        _ => SavingsSummary {
            best_savings_amount: None,
            best_savings_percent: None,
        },
    }
}
