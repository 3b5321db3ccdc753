//! Read-only catalog and run ledger commands.

use chrono::{DateTime, Utc};
use pricewatch_core::ProductView;
use pricewatch_db::{DbError, ProductFilter};

fn fmt_ts(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M").to_string()
}

fn fmt_opt_ts(ts: Option<DateTime<Utc>>) -> String {
    ts.map_or_else(|| "\u{2014}".to_string(), fmt_ts)
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        format!("{}...", s.chars().take(max).collect::<String>())
    } else {
        s.to_string()
    }
}

/// Prints one product as JSON in its read shape.
///
/// # Errors
///
/// Returns an error if the product does not exist or the query fails.
pub(crate) async fn show_product(
    pool: &sqlx::PgPool,
    url: Option<&str>,
    id: Option<i64>,
) -> anyhow::Result<()> {
    let lookup = match (url, id) {
        (Some(url), _) => pricewatch_db::get_product_view_by_url(pool, url).await,
        (None, Some(id)) => pricewatch_db::get_product_view(pool, id).await,
        (None, None) => anyhow::bail!("either --url or --id is required"),
    };

    let product = match lookup {
        Ok(product) => product,
        Err(DbError::NotFound) => anyhow::bail!("product not found"),
        Err(e) => return Err(e.into()),
    };

    println!("{}", serde_json::to_string_pretty(&product)?);
    Ok(())
}

/// Prints products matching `filter`, most recently repriced first.
///
/// # Errors
///
/// Returns an error if the query fails.
pub(crate) async fn search_products(
    pool: &sqlx::PgPool,
    filter: &ProductFilter,
) -> anyhow::Result<()> {
    let products = pricewatch_db::search_product_views(pool, filter).await?;

    if products.is_empty() {
        println!("no products found; run `pricewatch-cli run` first");
        return Ok(());
    }

    println!(
        "{:<8}{:<10}{:>12}{:>12}{:>6}  {:<17}NAME",
        "ID", "PLATFORM", "PRICE", "LOWEST", "CHG", "LAST UPDATE"
    );
    for product in &products {
        print_product_row(product);
    }
    Ok(())
}

fn print_product_row(product: &ProductView) {
    let price = format!("{} {}", product.currency, product.current_price);
    let lowest = product.lowest_price().to_string();
    println!(
        "{:<8}{:<10}{:>12}{:>12}{:>6}  {:<17}{}",
        product.id,
        product.platform_name,
        price,
        lowest,
        product.price_history.len(),
        fmt_ts(product.last_update),
        truncate(&product.name, 50)
    );
}

/// Prints the most recent `limit` scrape runs.
///
/// # Errors
///
/// Returns an error if the query fails.
pub(crate) async fn list_runs(pool: &sqlx::PgPool, limit: i64) -> anyhow::Result<()> {
    let runs = pricewatch_db::list_scrape_runs(pool, limit).await?;

    if runs.is_empty() {
        println!("no scrape runs recorded yet");
        return Ok(());
    }

    println!(
        "{:<6}{:<11}{:<5}{:<18}{:<18}{:>7}{:>8}{:>8}{:>8}{:>8}",
        "ID",
        "STATUS",
        "DRY",
        "STARTED",
        "COMPLETED",
        "PAIRS",
        "FAILED",
        "CREATED",
        "UPDATED",
        "SKIPPED",
    );
    for run in &runs {
        println!(
            "{:<6}{:<11}{:<5}{:<18}{:<18}{:>7}{:>8}{:>8}{:>8}{:>8}",
            run.id,
            run.status,
            if run.dry_run { "yes" } else { "no" },
            fmt_opt_ts(run.started_at),
            fmt_opt_ts(run.completed_at),
            run.pairs_attempted,
            run.pairs_failed,
            run.created_count,
            run.updated_count,
            run.skipped_count
        );
        if let Some(message) = &run.error_message {
            println!("  error: {message}");
        }
    }
    Ok(())
}

/// Prints one run and its per-listing rows.
///
/// # Errors
///
/// Returns an error if the run does not exist or a query fails.
pub(crate) async fn show_run(pool: &sqlx::PgPool, run_id: i64) -> anyhow::Result<()> {
    let run = match pricewatch_db::get_scrape_run(pool, run_id).await {
        Ok(run) => run,
        Err(DbError::NotFound) => anyhow::bail!("scrape run {run_id} not found"),
        Err(e) => return Err(e.into()),
    };
    let pairs = pricewatch_db::list_scrape_run_pairs(pool, run_id).await?;

    println!(
        "run {} ({}) status={} started={} completed={}",
        run.id,
        run.public_id,
        run.status,
        fmt_opt_ts(run.started_at),
        fmt_opt_ts(run.completed_at)
    );
    println!();
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
    for pair in &pairs {
        println!(
            "{:<12}{:<16}{:<11}{:>6}{:>6}{:>8}{:>8}{:>10}{:>8}",
            pair.platform_name,
            pair.category_name,
            pair.status,
            pair.pages_fetched,
            pair.products_seen,
            pair.created_count,
            pair.updated_count,
            pair.unchanged_count,
            pair.skipped_count
        );
        if let Some(message) = &pair.error_message {
            println!("  error: {message}");
        }
    }
    Ok(())
}
