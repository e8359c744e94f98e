// Analyzer module: the aggregation pipeline, one submodule per stage.

pub mod aggregator;
pub mod dedup;
pub mod ranking;
pub mod savings;
pub mod similarity;

// Re-export the orchestrator for ease of use.
pub use aggregator::ResultAggregator;
