pub mod analyzer;
pub mod config;
pub mod model;
pub mod normalizer;
pub mod parser;
pub mod report;
pub mod scraper;
pub mod service;
pub mod storage;
pub mod utils;
