//! `run` subcommand: one full scrape run over the catalog.

use std::time::Duration;

use pricewatch_core::{AppConfig, RunSummary};
use pricewatch_ingest::{Orchestrator, PgSink, RunFilter};
use pricewatch_scraper::{FetchPolicy, PageFetcher};

/// Scrapes every listing matching `filter` and prints the run summary.
///
/// # Errors
///
/// Returns an error if the catalog cannot be loaded, no listing matches the
/// filter, the HTTP client cannot be built, or every listing failed.
/// Individual listing failures only show up in the summary.
pub(crate) async fn run_scrape(
    pool: sqlx::PgPool,
    config: &AppConfig,
    filter: &RunFilter,
    json: bool,
) -> anyhow::Result<()> {
    let catalog = pricewatch_core::load_catalog(&config.catalog_path)?;

    let selected = catalog.select_pairs(filter.platform.as_deref(), filter.category.as_deref());
    if selected.is_empty() {
        anyhow::bail!(
            "no listings in {} match platform={} category={}",
            config.catalog_path.display(),
            filter.platform.as_deref().unwrap_or("*"),
            filter.category.as_deref().unwrap_or("*")
        );
    }

    let fetcher = PageFetcher::new(
        Duration::from_secs(config.fetch_timeout_secs),
        catalog.user_agents.clone(),
    )?;
    let orchestrator = Orchestrator::new(
        selected,
        fetcher,
        FetchPolicy::from_config(config),
        config.default_currency.clone(),
        PgSink::new(pool, "cli"),
    );

    let summary = orchestrator.run_once(filter).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary, filter.dry_run);
    }

    if summary.all_failed() {
        anyhow::bail!("all {} listings failed", summary.pairs_failed);
    }
    Ok(())
}

fn print_summary(summary: &RunSummary, dry_run: bool) {
    println!(
        "{:<12}{:<16}{:<11}{:>6}{:>6}{:>8}{:>8}{:>10}{:>8}",
        "PLATFORM",
        "CATEGORY",
        "STATUS",
        "PAGES",
        "SEEN",
        "CREATED",
        "UPDATED",
        "UNCHANGED",
        "SKIPPED",
    );
    for pair in &summary.pairs {
        println!(
            "{:<12}{:<16}{:<11}{:>6}{:>6}{:>8}{:>8}{:>10}{:>8}",
            pair.platform,
            pair.category,
            pair.status.as_str(),
            pair.pages_fetched,
            pair.products_seen,
            pair.outcome.created,
            pair.outcome.updated,
            pair.outcome.unchanged,
            pair.skipped()
        );
        if let Some(error) = &pair.error {
            println!("  error: {error}");
        }
    }

    println!();
    if dry_run {
        println!(
            "dry-run: {} listing(s), {} product(s) extracted, nothing written",
            summary.pairs_attempted, summary.products_seen
        );
    } else {
        println!(
            "{} created, {} updated, {} unchanged, {} skipped across {} listing(s) ({} failed)",
            summary.created,
            summary.updated,
            summary.unchanged,
            summary.skipped,
            summary.pairs_attempted,
            summary.pairs_failed
        );
    }
}
