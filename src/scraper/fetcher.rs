use crate::model::{FetchError, ReferenceProperty, Source};
use crate::scraper::traits::Scraper;
use crate::utils::detect_source;
use reqwest::{Client, Url};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

/// HTTP page fetcher used to look up prices on listing pages.
pub struct PageFetcher {
    client: Client,
    timeout: Duration,
}

impl PageFetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;

        Ok(Self { client, timeout })
    }
}

#[async_trait::async_trait]
impl Scraper for PageFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        debug!("Fetching {}", url);
        let response = match timeout(self.timeout, self.client.get(url).send()).await {
            Ok(result) => result?,
            Err(_) => {
                warn!("Fetch timed out: {}", url);
                return Err(FetchError::Timeout);
            }
        };

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::InvalidResponse(status.as_u16()));
        }

        Ok(response.text().await?)
    }
}

/// Adds the reference stay dates to a listing URL, using each platform's
/// parameter names, so the page shows the price for those nights. URLs that
/// already carry dates are returned unchanged.
pub fn build_url(url: &str, reference: &ReferenceProperty) -> Result<String, FetchError> {
    let mut parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl(format!("{}: {}", url, e)))?;

    let (Some(check_in), Some(check_out)) = (reference.check_in, reference.check_out) else {
        return Ok(parsed.to_string());
    };

    let has_dates = parsed.query_pairs().any(|(key, _)| {
        let key = key.to_lowercase();
        key.contains("checkin") || key.contains("check_in") || key == "arrival"
    });
    if has_dates {
        return Ok(parsed.to_string());
    }

    let (in_key, out_key) = match detect_source(url) {
        Some(Source::Vrbo) => ("arrival", "departure"),
        Some(Source::HotelsCom) => ("checkIn", "checkOut"),
        _ => ("checkin", "checkout"),
    };
    parsed
        .query_pairs_mut()
        .append_pair(in_key, &check_in.format("%Y-%m-%d").to_string())
        .append_pair(out_key, &check_out.format("%Y-%m-%d").to_string());
    Ok(parsed.to_string())
}
