// Listing-page price extraction
use crate::model::ParserError;
use crate::utils::parse_price;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};

/// Nightly prices outside this range are page noise (fees, ids, totals).
const MIN_NIGHTLY: f64 = 20.0;
const MAX_NIGHTLY: f64 = 20000.0;

static TEXT_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\$\s*(\d{1,3}(?:,\d{3})+(?:\.\d{2})?|\d+(?:\.\d{2})?)\s*(?:/\s*night|per\s+night|nightly)",
        r#"(?i)"(?:nightly_rate|nightlyPrice|rateNightly|listPrice|price)"\s*:\s*"?\$?(\d+(?:,\d{3})*(?:\.\d+)?)"?"#,
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

pub trait Parser {
    fn parse(&self, html: &str) -> Result<f64, ParserError>;
}

/// Pulls a nightly price out of a listing page. Structured markup wins over
/// free text.
pub struct PriceParser;

impl PriceParser {
    pub fn new() -> Self {
        Self
    }

    fn from_markup(document: &Html) -> Result<Option<f64>, ParserError> {
        let attribute_selectors = [("[data-price]", "data-price"), ("meta[itemprop='price']", "content")];
        for (css, attr) in attribute_selectors {
            let selector = Selector::parse(css).map_err(|e| ParserError::HtmlParseError(e.to_string()))?;
            let found = document
                .select(&selector)
                .filter_map(|el| el.value().attr(attr))
                .filter_map(parse_price)
                .find(|p| is_plausible(*p));
            if found.is_some() {
                return Ok(found);
            }
        }

        let selector = Selector::parse("[itemprop='price']")
            .map_err(|e| ParserError::HtmlParseError(e.to_string()))?;
        Ok(document
            .select(&selector)
            .map(|el| el.text().collect::<String>())
            .filter_map(|text| parse_price(&text))
            .find(|p| is_plausible(*p)))
    }

    fn from_text(html: &str) -> Option<f64> {
        TEXT_PATTERNS.iter().find_map(|pattern| {
            pattern
                .captures_iter(html)
                .filter_map(|c| c.get(1))
                .filter_map(|m| parse_price(m.as_str()))
                .find(|p| is_plausible(*p))
        })
    }
}

impl Default for PriceParser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser for PriceParser {
    fn parse(&self, html: &str) -> Result<f64, ParserError> {
        let document = Html::parse_document(html);
        if let Some(price) = Self::from_markup(&document)? {
            return Ok(price);
        }
        Self::from_text(html).ok_or_else(|| ParserError::MissingField("nightly price".into()))
    }
}

fn is_plausible(price: f64) -> bool {
    (MIN_NIGHTLY..=MAX_NIGHTLY).contains(&price)
}
