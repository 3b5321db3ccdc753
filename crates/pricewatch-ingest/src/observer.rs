//! Structured events emitted while a run progresses.

use pricewatch_core::{PairReport, PairStatus, RunSummary, ScrapePair};

/// Receives run progress events. Every method has a no-op default so
/// observers only implement what they care about.
pub trait RunObserver: Send + Sync {
    fn run_started(&self, _run_id: Option<i64>, _pairs: usize, _dry_run: bool) {}

    fn pair_started(&self, _pair: &ScrapePair) {}

    fn pair_finished(&self, _report: &PairReport) {}

    /// A ledger write failed. The run carries on without it.
    fn ledger_failed(&self, _stage: &'static str, _error: &(dyn std::error::Error + 'static)) {}

    fn run_finished(&self, _run_id: Option<i64>, _summary: &RunSummary) {}
}

/// Forwards run events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl RunObserver for TracingObserver {
    fn run_started(&self, run_id: Option<i64>, pairs: usize, dry_run: bool) {
        tracing::info!(?run_id, pairs, dry_run, "scrape run started");
    }

    fn pair_started(&self, pair: &ScrapePair) {
        tracing::info!(
            platform = %pair.platform,
            category = %pair.category,
            extractor = %pair.extractor,
            page_cap = pair.page_cap,
            "scraping listing"
        );
    }

    fn pair_finished(&self, report: &PairReport) {
        match report.status {
            PairStatus::Failed => tracing::error!(
                platform = %report.platform,
                category = %report.category,
                pages = report.pages_fetched,
                error = report.error.as_deref().unwrap_or("unknown error"),
                "listing failed"
            ),
            PairStatus::Succeeded | PairStatus::DryRun => tracing::info!(
                platform = %report.platform,
                category = %report.category,
                status = %report.status,
                pages = report.pages_fetched,
                seen = report.products_seen,
                created = report.outcome.created,
                updated = report.outcome.updated,
                unchanged = report.outcome.unchanged,
                skipped = report.skipped(),
                "listing done"
            ),
        }
    }

    fn ledger_failed(&self, stage: &'static str, error: &(dyn std::error::Error + 'static)) {
        tracing::warn!(stage, error = %error, "run ledger write failed");
    }

    fn run_finished(&self, run_id: Option<i64>, summary: &RunSummary) {
        if summary.pairs_failed > 0 {
            tracing::warn!(
                ?run_id,
                failed = summary.pairs_failed,
                attempted = summary.pairs_attempted,
                "some listings failed during the run"
            );
        }
        tracing::info!(
            ?run_id,
            created = summary.created,
            updated = summary.updated,
            unchanged = summary.unchanged,
            skipped = summary.skipped,
            seen = summary.products_seen,
            "scrape run finished"
        );
    }
}
