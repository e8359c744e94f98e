use crate::model::{RawRecord, ReferenceProperty, SourceError};
use crate::scraper::traits::CandidateSource;
use serde_json::Value;
use std::path::PathBuf;
use tracing::info;

/// A batch of raw records saved by an upstream searcher, read from disk.
///
/// Accepts either a JSON array of records or an object with a `results` array.
pub struct JsonFileSource {
    name: String,
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

#[async_trait::async_trait]
impl CandidateSource for JsonFileSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn search(&self, _reference: &ReferenceProperty) -> Result<Vec<RawRecord>, SourceError> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        let records = parse_batch(&content)?;
        info!("{}: loaded {} records from {}", self.name, records.len(), self.path.display());
        Ok(records)
    }
}

pub fn parse_batch(content: &str) -> Result<Vec<RawRecord>, SourceError> {
    match serde_json::from_str::<Value>(content)? {
        Value::Array(records) => Ok(records),
        Value::Object(mut obj) => match obj.remove("results") {
            Some(Value::Array(records)) => Ok(records),
            _ => Err(SourceError::UnexpectedShape(
                "object without a `results` array".into(),
            )),
        },
        other => Err(SourceError::UnexpectedShape(format!(
            "expected an array, got {}",
            other
        ))),
    }
}
