// Utility functions shared by the normalizer, the deduplicator and the cache
use crate::model::Source;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

/// Query parameters that booking platforms use to carry a referral id.
const REFERRAL_PARAMS: [&str; 5] = ["aid", "affiliateId", "partner", "pos", "affcid"];

static COMPLEX_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)^(.+?)\s+-\s+(?:Unit|Room|Apt)\b",
        r"(?i)^(.+?)\s+[A-Z]?\d+[A-Z]?$",
        r"(?i)^(.+?)\s+#\d+",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static UNIT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:\s|#|\bunit\s+|\bapt\s+|\broom\s+)([A-Z]?\d+[A-Z]?)$").unwrap()
});

static PRICE_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"-?(?:\d{1,3}(?:,\d{3})+(?:\.\d+)?|\d+(?:\.\d+)?)").unwrap());

/// Parses an RFC 3339 string into `DateTime<Utc>`, if possible.
pub fn parse_datetime(date_str: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(date_str)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Lowercases, drops apostrophes, turns other punctuation into spaces and collapses whitespace.
pub fn normalize_text(text: &str) -> String {
    let cleaned: String = text
        .chars()
        .filter(|c| *c != '\'' && *c != '’')
        .map(|c| if c.is_alphanumeric() { c.to_ascii_lowercase() } else { ' ' })
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Strips a trailing unit identifier from a listing title.
///
/// "King's Crown D203" → "King's Crown", "Deer Valley Resort - Unit 5B" → "Deer Valley Resort".
/// Standalone names yield `None`.
pub fn extract_complex_name(title: &str) -> Option<String> {
    let title = title.trim();
    COMPLEX_PATTERNS.iter().find_map(|pattern| {
        let name = pattern.captures(title)?.get(1)?.as_str().trim();
        (name.len() > 3).then(|| name.to_string())
    })
}

/// The unit identifier at the end of a title, lowercased ("D203" → "d203").
pub fn extract_unit_identifier(title: &str) -> Option<String> {
    UNIT_PATTERN
        .captures(title.trim())
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_lowercase())
}

/// Guesses the listing source from its host. Hosts that are not a known
/// platform are taken to be an owner's own booking site.
pub fn detect_source(url: &str) -> Option<Source> {
    let host = reqwest::Url::parse(url).ok()?.host_str()?.to_lowercase();
    let source = if host.ends_with("booking.com") {
        Source::BookingCom
    } else if host.ends_with("vrbo.com") {
        Source::Vrbo
    } else if host.ends_with("hotels.com") {
        Source::HotelsCom
    } else if ["airbnb.", "expedia.", "tripadvisor."]
        .iter()
        .any(|platform| host.contains(platform))
    {
        Source::OtherPlatform
    } else {
        Source::OwnerDirect
    };
    Some(source)
}

/// True when the URL carries one of the known referral parameters.
pub fn has_referral_param(url: &str) -> bool {
    reqwest::Url::parse(url)
        .map(|u| {
            u.query_pairs()
                .any(|(key, value)| !value.is_empty() && REFERRAL_PARAMS.contains(&&*key))
        })
        .unwrap_or(false)
}

/// Parses a human price such as "$1,250", "€ 300.50" or "199".
/// Only the first number counts: "$199 for 2 nights" is 199.
pub fn parse_price(text: &str) -> Option<f64> {
    let token = PRICE_TOKEN.find(text)?;
    token
        .as_str()
        .replace(',', "")
        .parse::<f64>()
        .ok()
        .filter(|p| p.is_finite())
}

/// URL form used for identity comparisons: trimmed, no fragment, no trailing slash.
pub fn normalize_url(url: &str) -> String {
    let url = url.trim();
    let url = url.split('#').next().unwrap_or(url);
    url.trim_end_matches('/').to_string()
}
