use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Counts produced by reconciling one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileOutcome {
    /// Products seen for the first time.
    pub created: u32,
    /// Existing products whose price changed.
    pub updated: u32,
    /// Existing products re-observed at the same price.
    pub unchanged: u32,
    /// Results that could not be applied (unknown platform/category, bad price).
    pub skipped: u32,
}

impl ReconcileOutcome {
    pub fn merge(&mut self, other: &ReconcileOutcome) {
        self.created = self.created.saturating_add(other.created);
        self.updated = self.updated.saturating_add(other.updated);
        self.unchanged = self.unchanged.saturating_add(other.unchanged);
        self.skipped = self.skipped.saturating_add(other.skipped);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairStatus {
    Succeeded,
    Failed,
    /// Fetched and extracted, reconciliation skipped on request.
    DryRun,
}

impl PairStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PairStatus::Succeeded => "succeeded",
            PairStatus::Failed => "failed",
            PairStatus::DryRun => "dry_run",
        }
    }
}

impl std::fmt::Display for PairStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one (platform, category) pipeline within a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairReport {
    pub platform: String,
    pub category: String,
    pub status: PairStatus,
    pub pages_fetched: u32,
    /// Listings extracted successfully and handed to the reconciler.
    pub products_seen: u32,
    /// Listing containers dropped during extraction.
    pub discarded: u32,
    pub outcome: ReconcileOutcome,
    pub error: Option<String>,
}

impl PairReport {
    #[must_use]
    pub fn failed(platform: &str, category: &str, pages_fetched: u32, error: String) -> Self {
        Self {
            platform: platform.to_owned(),
            category: category.to_owned(),
            status: PairStatus::Failed,
            pages_fetched,
            products_seen: 0,
            discarded: 0,
            outcome: ReconcileOutcome::default(),
            error: Some(error),
        }
    }

    /// Items that did not make it into the catalog, whichever stage dropped them.
    #[must_use]
    pub fn skipped(&self) -> u32 {
        self.outcome.skipped.saturating_add(self.discarded)
    }
}

/// Per-platform rollup inside a [`RunSummary`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformTotals {
    pub created: u32,
    pub updated: u32,
    pub unchanged: u32,
    pub skipped: u32,
    pub products_seen: u32,
    pub pairs_failed: u32,
}

/// Aggregate result of one full run over all selected pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub created: u32,
    pub updated: u32,
    pub unchanged: u32,
    pub skipped: u32,
    pub products_seen: u32,
    pub pairs_attempted: u32,
    pub pairs_failed: u32,
    pub by_platform: BTreeMap<String, PlatformTotals>,
    pub pairs: Vec<PairReport>,
}

impl RunSummary {
    /// Folds one pair report into the run totals.
    pub fn record(&mut self, report: PairReport) {
        let skipped = report.skipped();
        let failed = u32::from(report.status == PairStatus::Failed);

        self.created = self.created.saturating_add(report.outcome.created);
        self.updated = self.updated.saturating_add(report.outcome.updated);
        self.unchanged = self.unchanged.saturating_add(report.outcome.unchanged);
        self.skipped = self.skipped.saturating_add(skipped);
        self.products_seen = self.products_seen.saturating_add(report.products_seen);
        self.pairs_attempted = self.pairs_attempted.saturating_add(1);
        self.pairs_failed = self.pairs_failed.saturating_add(failed);

        let totals = self.by_platform.entry(report.platform.clone()).or_default();
        totals.created = totals.created.saturating_add(report.outcome.created);
        totals.updated = totals.updated.saturating_add(report.outcome.updated);
        totals.unchanged = totals.unchanged.saturating_add(report.outcome.unchanged);
        totals.skipped = totals.skipped.saturating_add(skipped);
        totals.products_seen = totals.products_seen.saturating_add(report.products_seen);
        totals.pairs_failed = totals.pairs_failed.saturating_add(failed);

        self.pairs.push(report);
    }

    /// `true` when every attempted pair failed (and at least one was attempted).
    #[must_use]
    pub fn all_failed(&self) -> bool {
        self.pairs_attempted > 0 && self.pairs_failed == self.pairs_attempted
    }
}
