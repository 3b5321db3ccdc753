use pricewatch_scraper::ScraperError;
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Why one (platform, category) pair failed. Carried into the pair report
/// as text; never propagated past the orchestrator.
#[derive(Debug, Error)]
pub enum PairError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] ScraperError),

    #[error("reconcile failed: {0}")]
    Reconcile(#[source] BoxError),
}

impl PairError {
    pub(crate) fn reconcile<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Reconcile(Box::new(source))
    }
}
