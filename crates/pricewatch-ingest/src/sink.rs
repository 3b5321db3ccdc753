//! Where scraped batches and run bookkeeping end up.

use std::future::Future;

use pricewatch_core::{PairReport, ReconcileOutcome, RunSummary, ScrapeResult};
use pricewatch_db::DbError;
use sqlx::PgPool;

/// Storage seam for the orchestrator.
///
/// `reconcile` is the only call whose failure affects a pair's status. The
/// ledger calls (`open_run`, `record_pair`, `close_run`) are best-effort: the
/// orchestrator reports their errors to the observer and moves on.
pub trait BatchSink: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Registers a new run and returns its ledger id.
    fn open_run(&self, dry_run: bool) -> impl Future<Output = Result<i64, Self::Error>> + Send;

    /// Merges one listing's results into the catalog.
    fn reconcile(
        &self,
        platform: &str,
        category: &str,
        results: &[ScrapeResult],
    ) -> impl Future<Output = Result<ReconcileOutcome, Self::Error>> + Send;

    fn record_pair(
        &self,
        run_id: i64,
        report: &PairReport,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Closes the run: failed when every pair failed, succeeded otherwise.
    fn close_run(
        &self,
        run_id: i64,
        summary: &RunSummary,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

/// Postgres-backed sink.
#[derive(Debug, Clone)]
pub struct PgSink {
    pool: PgPool,
    trigger_source: String,
}

impl PgSink {
    #[must_use]
    pub fn new(pool: PgPool, trigger_source: impl Into<String>) -> Self {
        Self {
            pool,
            trigger_source: trigger_source.into(),
        }
    }
}

impl BatchSink for PgSink {
    type Error = DbError;

    async fn open_run(&self, dry_run: bool) -> Result<i64, DbError> {
        let run =
            pricewatch_db::create_scrape_run(&self.pool, &self.trigger_source, dry_run).await?;
        pricewatch_db::start_scrape_run(&self.pool, run.id).await?;
        Ok(run.id)
    }

    async fn reconcile(
        &self,
        platform: &str,
        category: &str,
        results: &[ScrapeResult],
    ) -> Result<ReconcileOutcome, DbError> {
        pricewatch_db::reconcile_batch(&self.pool, platform, category, results).await
    }

    async fn record_pair(&self, run_id: i64, report: &PairReport) -> Result<(), DbError> {
        pricewatch_db::record_scrape_run_pair(&self.pool, run_id, report).await
    }

    async fn close_run(&self, run_id: i64, summary: &RunSummary) -> Result<(), DbError> {
        if summary.all_failed() {
            let message = format!("all {} listings failed", summary.pairs_failed);
            pricewatch_db::fail_scrape_run(&self.pool, run_id, summary, &message).await
        } else {
            pricewatch_db::complete_scrape_run(&self.pool, run_id, summary).await
        }
    }
}
