//! Scraping pipeline: polite page fetching plus DOM fact extraction.

pub mod extractor;
pub mod fetcher;
mod fields;

pub use extractor::{extract_fund, ExtractionError, ExtractionOutcome};
pub use fetcher::{FetchError, FetchedPage, Fetcher, PageFetcher};
