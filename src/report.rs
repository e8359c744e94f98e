use crate::model::{RankedEntry, RankedResult, Savings, SimilarityCategory};
use std::fmt::Write;

const RULE: &str = "================================================================================";

/// Plain-text comparison report for the terminal.
pub fn render_report(result: &RankedResult, similar_limit: usize) -> String {
    let mut out = String::new();
    let reference = &result.reference;
    let stats = &result.stats;

    let _ = writeln!(out, "{}", RULE);
    let _ = writeln!(out, "STAYSCOUT - YOUR COMPLETE PRICE COMPARISON");
    let _ = writeln!(out, "{}", RULE);
    let _ = writeln!(out, "Original listing: {}", reference.display_name());
    if let Some(location) = &reference.location {
        let _ = writeln!(out, "Location: {}", location);
    }
    if let (Some(check_in), Some(check_out)) = (reference.check_in, reference.check_out) {
        let _ = writeln!(out, "Stay: {} to {}", check_in, check_out);
    }
    match reference.nightly_price {
        Some(price) => {
            let _ = writeln!(out, "Reference price: ${:.2}/night", price);
        }
        None => {
            let _ = writeln!(out, "Reference price: unknown");
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Searched {} sources", stats.total_sources_searched);
    let _ = writeln!(out, "Found {} exact matches", stats.exact_matches_found);
    let _ = writeln!(out, "Found {} similar alternatives", stats.similar_properties_found);

    if result.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "No comparable listings found.");
        return out;
    }

    if let (Some(amount), Some(source)) = (result.savings_summary.best_savings_amount, stats.best_price_source) {
        if amount > 0.0 {
            let _ = writeln!(
                out,
                "\nBEST DEAL: save ${:.2}/night ({}%) on {}",
                amount,
                result.savings_summary.best_savings_percent.unwrap_or(0),
                source.label()
            );
        }
    }

    if !result.exact_matches.is_empty() {
        let _ = writeln!(out, "\n{}\nEXACT MATCHES - SAME PROPERTY\n{}", RULE, RULE);
        for (i, entry) in result.exact_matches.iter().enumerate() {
            write_entry(&mut out, i + 1, entry);
        }
    }

    if !result.similar_properties.is_empty() {
        let _ = writeln!(out, "\n{}\nSIMILAR PROPERTIES - GREAT ALTERNATIVES\n{}", RULE, RULE);
        for (i, entry) in result.similar_properties.iter().take(similar_limit).enumerate() {
            write_entry(&mut out, i + 1, entry);
        }
        let hidden = result.similar_properties.len().saturating_sub(similar_limit);
        if hidden > 0 {
            let _ = writeln!(out, "\n... and {} more", hidden);
        }
    }

    let _ = writeln!(out, "\n{}\nHOW WE MAKE MONEY (TRANSPARENCY)\n{}", RULE, RULE);
    let _ = writeln!(out, "- Owner direct sites: we earn nothing, you skip the platform fees");
    let _ = writeln!(out, "- Platform links marked [affiliate]: we earn a small commission");
    let _ = writeln!(out, "- Results are ranked by price, never by commission");
    out
}

fn write_entry(out: &mut String, index: usize, entry: &RankedEntry) {
    let candidate = &entry.candidate;
    let badge = if candidate.source.is_owner_direct() {
        "OWNER DIRECT".to_string()
    } else if candidate.is_affiliate {
        format!("{} [affiliate]", candidate.source.label().to_uppercase())
    } else {
        candidate.source.label().to_uppercase()
    };

    let _ = writeln!(out, "\n{}. {}", index, badge);
    let _ = writeln!(out, "   {}", candidate.display_name());
    if let Some(location) = &candidate.location {
        let _ = writeln!(out, "   {}", location);
    }
    if candidate.bedrooms.is_some() || candidate.bathrooms.is_some() {
        let beds = candidate.bedrooms.map_or("?".to_string(), |b| b.to_string());
        let baths = candidate.bathrooms.map_or("?".to_string(), |b| b.to_string());
        let _ = writeln!(out, "   {}BR / {}BA", beds, baths);
    }

    match candidate.nightly_price {
        Some(price) => {
            let _ = writeln!(out, "   ${:.2}/night", price);
        }
        None => {
            let _ = writeln!(out, "   Price unavailable, check site");
        }
    }
    match entry.savings {
        Savings::Known { amount, percent } if amount > 0.0 => {
            let _ = writeln!(out, "   SAVE ${:.2}/night ({}%) vs original", amount, percent);
        }
        Savings::Known { amount, .. } if amount < 0.0 => {
            let _ = writeln!(out, "   ${:.2}/night more than original", -amount);
        }
        Savings::Known { .. } => {
            let _ = writeln!(out, "   Same price as original");
        }
        Savings::Unknown => {}
    }

    if let Some(url) = &candidate.url {
        let _ = writeln!(out, "   {}", url);
    }
    if let (Some(category), Some(score)) = (candidate.similarity_category, candidate.similarity_score) {
        if category != SimilarityCategory::ExactMatch {
            let _ = writeln!(out, "   {} - {:.0}% match", category.label(), score);
        } else if score < 100.0 {
            let _ = writeln!(out, "   Match confidence: {:.0}%", score);
        }
    }
}
