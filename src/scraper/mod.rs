pub mod enricher;
pub mod fetcher;
pub mod sources;
pub mod traits;

pub use enricher::PriceEnricher;
pub use fetcher::PageFetcher;
pub use sources::JsonFileSource;
pub use traits::{CandidateSource, Scraper};
