//! Drives one scrape run over every selected listing.

use pricewatch_core::{PairReport, PairStatus, ReconcileOutcome, RunSummary, ScrapePair};
use pricewatch_scraper::{scrape_listing, FetchPolicy, PageFetcher};

use crate::error::PairError;
use crate::observer::{RunObserver, TracingObserver};
use crate::sink::BatchSink;

/// Narrows a run to some listings, or turns it into a dry run.
#[derive(Debug, Clone, Default)]
pub struct RunFilter {
    /// Case-insensitive platform name.
    pub platform: Option<String>,
    /// Case-insensitive category name.
    pub category: Option<String>,
    /// Fetch and extract, but leave the catalog untouched.
    pub dry_run: bool,
}

impl RunFilter {
    fn matches(&self, pair: &ScrapePair) -> bool {
        self.platform
            .as_deref()
            .is_none_or(|want| pair.platform.eq_ignore_ascii_case(want))
            && self
                .category
                .as_deref()
                .is_none_or(|want| pair.category.eq_ignore_ascii_case(want))
    }
}

pub struct Orchestrator<S, O = TracingObserver> {
    pairs: Vec<ScrapePair>,
    fetcher: PageFetcher,
    policy: FetchPolicy,
    default_currency: String,
    sink: S,
    observer: O,
}

impl<S: BatchSink> Orchestrator<S> {
    /// Builds an orchestrator that reports through [`TracingObserver`].
    ///
    /// `pairs` are processed in the order given.
    #[must_use]
    pub fn new(
        pairs: Vec<ScrapePair>,
        fetcher: PageFetcher,
        policy: FetchPolicy,
        default_currency: impl Into<String>,
        sink: S,
    ) -> Self {
        Self {
            pairs,
            fetcher,
            policy,
            default_currency: default_currency.into(),
            sink,
            observer: TracingObserver,
        }
    }
}

impl<S: BatchSink, O: RunObserver> Orchestrator<S, O> {
    /// Replaces the observer.
    #[must_use]
    pub fn with_observer<P: RunObserver>(self, observer: P) -> Orchestrator<S, P> {
        Orchestrator {
            pairs: self.pairs,
            fetcher: self.fetcher,
            policy: self.policy,
            default_currency: self.default_currency,
            sink: self.sink,
            observer,
        }
    }

    #[must_use]
    pub fn pairs(&self) -> &[ScrapePair] {
        &self.pairs
    }

    #[must_use]
    pub fn sink(&self) -> &S {
        &self.sink
    }

    #[must_use]
    pub fn observer(&self) -> &O {
        &self.observer
    }

    /// Runs every listing matching `filter` once, strictly one after another.
    ///
    /// A listing that fails to fetch or reconcile is reported as failed and
    /// the run moves on. Nothing here returns an error: the outcome of each
    /// listing is in the returned summary. When no listing matches, no run is
    /// recorded and the summary is empty.
    pub async fn run_once(&self, filter: &RunFilter) -> RunSummary {
        let selected: Vec<&ScrapePair> = self.pairs.iter().filter(|p| filter.matches(p)).collect();
        let mut summary = RunSummary::default();

        if selected.is_empty() {
            tracing::warn!(
                platform = ?filter.platform,
                category = ?filter.category,
                "no listings match the run filter"
            );
            return summary;
        }

        let run_id = match self.sink.open_run(filter.dry_run).await {
            Ok(id) => Some(id),
            Err(e) => {
                self.observer.ledger_failed("open_run", &e);
                None
            }
        };
        self.observer.run_started(run_id, selected.len(), filter.dry_run);

        for pair in selected {
            self.observer.pair_started(pair);
            let report = self.run_pair(pair, filter.dry_run).await;
            self.observer.pair_finished(&report);

            if let Some(id) = run_id {
                if let Err(e) = self.sink.record_pair(id, &report).await {
                    self.observer.ledger_failed("record_pair", &e);
                }
            }
            summary.record(report);
        }

        if let Some(id) = run_id {
            if let Err(e) = self.sink.close_run(id, &summary).await {
                self.observer.ledger_failed("close_run", &e);
            }
        }
        self.observer.run_finished(run_id, &summary);

        summary
    }

    async fn run_pair(&self, pair: &ScrapePair, dry_run: bool) -> PairReport {
        let scrape =
            match scrape_listing(&self.fetcher, &self.policy, pair, &self.default_currency).await {
                Ok(scrape) => scrape,
                Err(e) => {
                    return PairReport::failed(
                        &pair.platform,
                        &pair.category,
                        0,
                        PairError::from(e).to_string(),
                    );
                }
            };

        let mut report = PairReport {
            platform: pair.platform.clone(),
            category: pair.category.clone(),
            status: PairStatus::DryRun,
            pages_fetched: scrape.pages_fetched,
            products_seen: u32::try_from(scrape.results.len()).unwrap_or(u32::MAX),
            discarded: scrape.discarded,
            outcome: ReconcileOutcome::default(),
            error: None,
        };

        if dry_run {
            return report;
        }

        match self
            .sink
            .reconcile(&pair.platform, &pair.category, &scrape.results)
            .await
        {
            Ok(outcome) => {
                report.status = PairStatus::Succeeded;
                report.outcome = outcome;
            }
            Err(e) => {
                report.status = PairStatus::Failed;
                report.error = Some(PairError::reconcile(e).to_string());
            }
        }

        report
    }
}
