use crate::model::{Candidate, NormalizationError, RawRecord, ReferenceProperty, Source};
use crate::utils::{
    detect_source, extract_complex_name, has_referral_param, normalize_text, parse_price,
};
use chrono::NaiveDate;
use serde_json::{Map, Value};
use tracing::{debug, warn};

type Object = Map<String, Value>;

const TITLE_KEYS: &[&str] = &["title", "name", "property_name", "site_name"];
const URL_KEYS: &[&str] = &["url", "property_url", "link", "affiliate_link"];
const PRICE_KEYS: &[&str] = &["nightly_price", "price_per_night", "price", "nightly_rate"];
const SCORE_KEYS: &[&str] = &["similarity_score", "confidence"];
const SOURCE_KEYS: &[&str] = &["source", "platform", "type"];

/// Normalizes every record of every batch, skipping (and logging) the unusable ones.
/// Returns the candidates together with the number of skipped records.
pub fn normalize_all(batches: &[Vec<RawRecord>]) -> (Vec<Candidate>, usize) {
    let mut candidates = Vec::new();
    let mut skipped = 0;

    for record in batches.iter().flatten() {
        match normalize_candidate(record) {
            Ok(candidate) => candidates.push(candidate),
            Err(e) => {
                warn!("Skipping candidate record: {}", e);
                skipped += 1;
            }
        }
    }

    debug!("Normalized {} candidates, skipped {}", candidates.len(), skipped);
    (candidates, skipped)
}

pub fn normalize_candidate(record: &RawRecord) -> Result<Candidate, NormalizationError> {
    let obj = as_object(record)?;

    let url = text_field(obj, URL_KEYS);
    let title = text_field(obj, TITLE_KEYS);
    if url.is_none() && title.is_none() {
        return Err(NormalizationError::MissingIdentity);
    }

    let source = text_field(obj, SOURCE_KEYS)
        .as_deref()
        .and_then(parse_source)
        .or_else(|| url.as_deref().and_then(detect_source))
        .unwrap_or(Source::OtherPlatform);

    // An owner site located for the listing is the listing unless it says otherwise.
    let similarity_score = number_field(obj, SCORE_KEYS)
        .or_else(|| nested_number(obj, "verification", "confidence"))
        .map(|s| s.clamp(0.0, 100.0))
        .or_else(|| source.is_owner_direct().then_some(100.0));

    let is_affiliate = bool_field(obj, &["is_affiliate", "has_affiliate"]).unwrap_or_else(|| {
        text_field(obj, &["affiliate_link"]).is_some()
            || url.as_deref().is_some_and(has_referral_param)
    });

    let complex_name = title.as_deref().and_then(extract_complex_name);

    Ok(Candidate {
        url,
        source,
        location: location_field(obj),
        nightly_price: number_field(obj, PRICE_KEYS)
            .or_else(|| nested_number(obj, "total_cost", "per_night_effective"))
            .filter(|p| *p > 0.0),
        bedrooms: count_field(obj, "bedrooms"),
        bathrooms: number_field(obj, &["bathrooms"]).filter(|b| *b >= 0.0),
        similarity_score,
        similarity_category: None,
        is_affiliate,
        complex_name,
        title,
    })
}

/// Normalizes the listing the user started from. Unlike candidates, a failure
/// here is fatal for the whole run.
pub fn normalize_reference(record: &RawRecord) -> Result<ReferenceProperty, NormalizationError> {
    let obj = as_object(record)?;

    let title = text_field(obj, &["title", "property_name", "name"]);
    let url = text_field(obj, &["url", "airbnb_url", "listing_url"]);
    if url.is_none() && title.is_none() {
        return Err(NormalizationError::MissingIdentity);
    }

    let check_in = date_field(obj, "check_in");
    let check_out = date_field(obj, "check_out");
    let nights = count_field(obj, "nights").or_else(|| match (check_in, check_out) {
        (Some(start), Some(end)) => u32::try_from((end - start).num_days()).ok().filter(|n| *n > 0),
        _ => None,
    });

    Ok(ReferenceProperty {
        complex_name: title.as_deref().and_then(extract_complex_name),
        title,
        url,
        location: location_field(obj),
        bedrooms: count_field(obj, "bedrooms"),
        bathrooms: number_field(obj, &["bathrooms"]).filter(|b| *b >= 0.0),
        nightly_price: number_field(obj, PRICE_KEYS).filter(|p| *p >= 0.0),
        host_name: text_field(obj, &["host_name", "host"]),
        check_in,
        check_out,
        nights,
    })
}

/// Maps the many spellings of a source label onto `Source`.
pub fn parse_source(label: &str) -> Option<Source> {
    let source = match normalize_text(label).as_str() {
        "owner" | "owner direct" | "owner site" => Source::OwnerDirect,
        "booking" | "booking com" => Source::BookingCom,
        "vrbo" => Source::Vrbo,
        "hotels" | "hotels com" => Source::HotelsCom,
        "other" | "other platform" | "airbnb" | "expedia" | "tripadvisor" => Source::OtherPlatform,
        _ => return None,
    };
    Some(source)
}

fn as_object(record: &RawRecord) -> Result<&Object, NormalizationError> {
    record.as_object().ok_or_else(|| {
        let preview: String = record.to_string().chars().take(60).collect();
        NormalizationError::NotAnObject(preview)
    })
}

fn text_field(obj: &Object, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match obj.get(*key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    })
}

fn number_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_price(s),
        _ => None,
    }
    .filter(|v| v.is_finite())
}

fn number_field(obj: &Object, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|key| obj.get(*key).and_then(number_value))
}

fn nested_number(obj: &Object, outer: &str, inner: &str) -> Option<f64> {
    obj.get(outer)?.as_object()?.get(inner).and_then(number_value)
}

fn count_field(obj: &Object, key: &str) -> Option<u32> {
    number_field(obj, &[key])
        .filter(|n| *n >= 0.0 && *n <= u32::MAX as f64)
        .map(|n| n.round() as u32)
}

fn bool_field(obj: &Object, keys: &[&str]) -> Option<bool> {
    keys.iter().find_map(|key| obj.get(*key)?.as_bool())
}

fn date_field(obj: &Object, key: &str) -> Option<NaiveDate> {
    let text = text_field(obj, &[key])?;
    NaiveDate::parse_from_str(&text, "%Y-%m-%d").ok()
}

fn location_field(obj: &Object) -> Option<String> {
    if let Some(location) = text_field(obj, &["location", "address"]) {
        return Some(location);
    }
    match (
        text_field(obj, &["city"]),
        text_field(obj, &["state_region", "region", "state"]),
    ) {
        (Some(city), Some(region)) => Some(format!("{}, {}", city, region)),
        (Some(city), None) => Some(city),
        (None, region) => region,
    }
}
