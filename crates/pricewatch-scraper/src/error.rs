use thiserror::Error;

/// Failure to obtain a page body.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error fetching {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected HTTP status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("invalid URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("giving up on {url} after {attempts} attempts: {last}")]
    Exhausted {
        url: String,
        attempts: u32,
        #[source]
        last: Box<FetchError>,
    },
}

impl FetchError {
    /// Returns `true` if another attempt could plausibly succeed.
    ///
    /// Transport failures, 403/408/429 and 5xx are retried; other 4xx
    /// responses (404, 410, ...) and malformed URLs are not.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        match self {
            FetchError::Http { .. } => true,
            FetchError::Status { status, .. } => {
                matches!(*status, 403 | 408 | 429) || (500..=599).contains(status)
            }
            FetchError::InvalidUrl { .. } | FetchError::Exhausted { .. } => false,
        }
    }
}

/// Why a single listing container was discarded.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("price text {0:?} is not a number")]
    InvalidPrice(String),

    #[error("cannot resolve product URL {0:?}")]
    InvalidUrl(String),
}

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    #[error(transparent)]
    Fetch(#[from] FetchError),
}
