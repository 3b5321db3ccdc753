pub mod error;
pub mod extract;
pub mod fetch;
pub mod listing;
pub mod normalize;
pub mod pagination;

pub use error::{ExtractionError, FetchError, ScraperError};
pub use extract::{extract_page, extractor_for, ListingContext, ListingExtractor, PageExtraction};
pub use fetch::{FetchPolicy, PageFetcher, DEFAULT_USER_AGENTS};
pub use listing::{scrape_listing, ListingScrape};
pub use pagination::page_url;
