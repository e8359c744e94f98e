// Core structs: ReferenceProperty, Candidate, RankedResult, plus the error types
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A raw record as produced by an extractor or searcher. Keys vary by source.
pub type RawRecord = serde_json::Value;

/// Where a candidate listing was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    OwnerDirect,
    BookingCom,
    Vrbo,
    HotelsCom,
    OtherPlatform,
}

impl Source {
    pub fn label(&self) -> &'static str {
        match self {
            Source::OwnerDirect => "Owner Direct",
            Source::BookingCom => "Booking.com",
            Source::Vrbo => "VRBO",
            Source::HotelsCom => "Hotels.com",
            Source::OtherPlatform => "Other platform",
        }
    }

    pub fn is_owner_direct(&self) -> bool {
        matches!(self, Source::OwnerDirect)
    }
}

/// Match strength buckets. Declared weakest first so that `Ord` reads as "at least".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityCategory {
    CityWide,
    Nearby,
    SameComplex,
    ExactMatch,
}

impl SimilarityCategory {
    /// Strongest first.
    pub const DISPLAY_ORDER: [SimilarityCategory; 4] = [
        SimilarityCategory::ExactMatch,
        SimilarityCategory::SameComplex,
        SimilarityCategory::Nearby,
        SimilarityCategory::CityWide,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            SimilarityCategory::ExactMatch => "EXACT MATCH",
            SimilarityCategory::SameComplex => "SAME COMPLEX",
            SimilarityCategory::Nearby => "NEARBY",
            SimilarityCategory::CityWide => "SAME AREA",
        }
    }
}

/// The listing the user started from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceProperty {
    pub title: Option<String>,
    pub url: Option<String>,
    pub location: Option<String>,
    pub bedrooms: Option<u32>,
    pub bathrooms: Option<f64>,
    pub nightly_price: Option<f64>,
    pub host_name: Option<String>,
    pub complex_name: Option<String>,
    pub check_in: Option<NaiveDate>,
    pub check_out: Option<NaiveDate>,
    pub nights: Option<u32>,
}

impl ReferenceProperty {
    pub fn display_name(&self) -> &str {
        self.title
            .as_deref()
            .or(self.url.as_deref())
            .unwrap_or("Original listing")
    }
}

/// One listing found on a platform or an owner site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub url: Option<String>,
    pub source: Source,
    pub title: Option<String>,
    pub location: Option<String>,
    pub nightly_price: Option<f64>,
    pub bedrooms: Option<u32>,
    pub bathrooms: Option<f64>,
    pub similarity_score: Option<f64>,
    pub similarity_category: Option<SimilarityCategory>,
    pub is_affiliate: bool,
    pub complex_name: Option<String>,
}

/// Total ordering key used wherever two candidates need a deterministic order.
pub type CanonicalKey = (
    String,
    String,
    String,
    Source,
    Option<u64>,
    Option<u32>,
    Option<u64>,
    Option<u64>,
    bool,
);

impl Candidate {
    /// Number of optional descriptive fields that carry a value.
    pub fn populated_fields(&self) -> usize {
        [
            self.url.is_some(),
            self.title.is_some(),
            self.location.is_some(),
            self.nightly_price.is_some(),
            self.bedrooms.is_some(),
            self.bathrooms.is_some(),
            self.similarity_score.is_some(),
        ]
        .iter()
        .filter(|&&present| present)
        .count()
    }

    pub fn display_name(&self) -> &str {
        self.title
            .as_deref()
            .or(self.url.as_deref())
            .unwrap_or("Property listing")
    }

    pub fn canonical_key(&self) -> CanonicalKey {
        (
            self.url.clone().unwrap_or_default(),
            self.title
                .as_deref()
                .map(crate::utils::normalize_text)
                .unwrap_or_default(),
            self.location
                .as_deref()
                .map(crate::utils::normalize_text)
                .unwrap_or_default(),
            self.source,
            self.nightly_price.map(f64::to_bits),
            self.bedrooms,
            self.bathrooms.map(f64::to_bits),
            self.similarity_score.map(f64::to_bits),
            self.is_affiliate,
        )
    }
}

/// Savings of a candidate versus the reference nightly price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Savings {
    /// `amount` is negative when the candidate is pricier than the reference.
    Known { amount: f64, percent: i64 },
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedEntry {
    #[serde(flatten)]
    pub candidate: Candidate,
    pub savings: Savings,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SavingsSummary {
    pub best_savings_amount: Option<f64>,
    pub best_savings_percent: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchStats {
    pub total_sources_searched: usize,
    pub exact_matches_found: usize,
    pub similar_properties_found: usize,
    pub best_price_source: Option<Source>,
    pub owner_direct_found: bool,
    pub affiliate_opportunities: usize,
    pub duplicates_merged: usize,
    pub records_skipped: usize,
}

/// Final output of one aggregation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    pub reference: ReferenceProperty,
    pub exact_matches: Vec<RankedEntry>,
    pub similar_properties: Vec<RankedEntry>,
    pub savings_summary: SavingsSummary,
    pub stats: SearchStats,
}

impl RankedResult {
    /// No candidate survived filtering. A valid outcome, not a failure.
    pub fn is_empty(&self) -> bool {
        self.exact_matches.is_empty() && self.similar_properties.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &RankedEntry> {
        self.exact_matches.iter().chain(self.similar_properties.iter())
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum NormalizationError {
    #[error("record has neither url nor title")]
    MissingIdentity,
    #[error("record is not an object: {0}")]
    NotAnObject(String),
}

#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("unusable reference property: {0}")]
    Reference(#[from] NormalizationError),
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read source: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unexpected batch shape: {0}")]
    UnexpectedShape(String),
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    HttpError(String),
    #[error("request timed out")]
    Timeout,
    #[error("unexpected status {0}")]
    InvalidResponse(u16),
    #[error("invalid url: {0}")]
    InvalidUrl(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::HttpError(e.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum ParserError {
    #[error("HTML parse error: {0}")]
    HtmlParseError(String),
    #[error("missing field: {0}")]
    MissingField(String),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),
    #[error("payload error: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("corrupt timestamp: {0}")]
    InvalidTimestamp(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),
}
