//! Database operations for `scrape_runs` and `scrape_run_pairs`.

use chrono::{DateTime, Utc};
use pricewatch_core::{PairReport, RunSummary};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{db_count, DbError};

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ScrapeRunRow {
    pub id: i64,
    pub public_id: Uuid,
    pub trigger_source: String,
    pub status: String,
    pub dry_run: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub products_seen: i32,
    pub created_count: i32,
    pub updated_count: i32,
    pub unchanged_count: i32,
    pub skipped_count: i32,
    pub pairs_attempted: i32,
    pub pairs_failed: i32,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ScrapeRunPairRow {
    pub id: i64,
    pub scrape_run_id: i64,
    pub platform_name: String,
    pub category_name: String,
    pub status: String,
    pub pages_fetched: i32,
    pub products_seen: i32,
    pub created_count: i32,
    pub updated_count: i32,
    pub unchanged_count: i32,
    pub skipped_count: i32,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

const RUN_COLUMNS: &str = "id, public_id, trigger_source, status, dry_run, started_at, \
     completed_at, products_seen, created_count, updated_count, unchanged_count, \
     skipped_count, pairs_attempted, pairs_failed, error_message, created_at";

// ---------------------------------------------------------------------------
// scrape_runs operations
// ---------------------------------------------------------------------------

/// Creates a new scrape run in `queued` status.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_scrape_run(
    pool: &PgPool,
    trigger_source: &str,
    dry_run: bool,
) -> Result<ScrapeRunRow, DbError> {
    let row = sqlx::query_as::<_, ScrapeRunRow>(&format!(
        "INSERT INTO scrape_runs (public_id, trigger_source, status, dry_run) \
         VALUES ($1, $2, 'queued', $3) \
         RETURNING {RUN_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(trigger_source)
    .bind(dry_run)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Marks a run as `running` and sets `started_at = NOW()`.
///
/// # Errors
///
/// Returns [`DbError::InvalidRunTransition`] if the run is not `queued`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn start_scrape_run(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE scrape_runs \
         SET status = 'running', started_at = NOW() \
         WHERE id = $1 AND status = 'queued'",
    )
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidRunTransition {
            id,
            expected_status: "queued",
        });
    }

    Ok(())
}

/// Marks a running run as `succeeded` and stores its totals.
///
/// # Errors
///
/// Returns [`DbError::InvalidRunTransition`] if the run is not `running`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn complete_scrape_run(
    pool: &PgPool,
    id: i64,
    summary: &RunSummary,
) -> Result<(), DbError> {
    finish_scrape_run(pool, id, "succeeded", summary, None).await
}

/// Marks a running run as `failed`, storing whatever totals it reached.
///
/// # Errors
///
/// Returns [`DbError::InvalidRunTransition`] if the run is not `running`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn fail_scrape_run(
    pool: &PgPool,
    id: i64,
    summary: &RunSummary,
    error_message: &str,
) -> Result<(), DbError> {
    finish_scrape_run(pool, id, "failed", summary, Some(error_message)).await
}

async fn finish_scrape_run(
    pool: &PgPool,
    id: i64,
    status: &str,
    summary: &RunSummary,
    error_message: Option<&str>,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE scrape_runs SET \
             status = $2, \
             completed_at = NOW(), \
             products_seen = $3, \
             created_count = $4, \
             updated_count = $5, \
             unchanged_count = $6, \
             skipped_count = $7, \
             pairs_attempted = $8, \
             pairs_failed = $9, \
             error_message = $10 \
         WHERE id = $1 AND status = 'running'",
    )
    .bind(id)
    .bind(status)
    .bind(db_count(summary.products_seen))
    .bind(db_count(summary.created))
    .bind(db_count(summary.updated))
    .bind(db_count(summary.unchanged))
    .bind(db_count(summary.skipped))
    .bind(db_count(summary.pairs_attempted))
    .bind(db_count(summary.pairs_failed))
    .bind(error_message)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidRunTransition {
            id,
            expected_status: "running",
        });
    }

    Ok(())
}

/// # Errors
///
/// Returns [`DbError::NotFound`] if no run has that `id`, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_scrape_run(pool: &PgPool, id: i64) -> Result<ScrapeRunRow, DbError> {
    sqlx::query_as::<_, ScrapeRunRow>(&format!(
        "SELECT {RUN_COLUMNS} FROM scrape_runs WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Returns the most recent `limit` runs, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_scrape_runs(pool: &PgPool, limit: i64) -> Result<Vec<ScrapeRunRow>, DbError> {
    let rows = sqlx::query_as::<_, ScrapeRunRow>(&format!(
        "SELECT {RUN_COLUMNS} FROM scrape_runs ORDER BY created_at DESC, id DESC LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

// ---------------------------------------------------------------------------
// scrape_run_pairs operations
// ---------------------------------------------------------------------------

/// Inserts or replaces the result row for one pair of a run.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn record_scrape_run_pair(
    pool: &PgPool,
    run_id: i64,
    report: &PairReport,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO scrape_run_pairs \
             (scrape_run_id, platform_name, category_name, status, pages_fetched, \
              products_seen, created_count, updated_count, unchanged_count, \
              skipped_count, error_message) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
         ON CONFLICT (scrape_run_id, platform_name, category_name) DO UPDATE SET \
             status          = EXCLUDED.status, \
             pages_fetched   = EXCLUDED.pages_fetched, \
             products_seen   = EXCLUDED.products_seen, \
             created_count   = EXCLUDED.created_count, \
             updated_count   = EXCLUDED.updated_count, \
             unchanged_count = EXCLUDED.unchanged_count, \
             skipped_count   = EXCLUDED.skipped_count, \
             error_message   = EXCLUDED.error_message",
    )
    .bind(run_id)
    .bind(&report.platform)
    .bind(&report.category)
    .bind(report.status.as_str())
    .bind(db_count(report.pages_fetched))
    .bind(db_count(report.products_seen))
    .bind(db_count(report.outcome.created))
    .bind(db_count(report.outcome.updated))
    .bind(db_count(report.outcome.unchanged))
    .bind(db_count(report.skipped()))
    .bind(report.error.as_deref())
    .execute(pool)
    .await?;

    Ok(())
}

/// Pair rows of a run in the order they were recorded.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_scrape_run_pairs(
    pool: &PgPool,
    run_id: i64,
) -> Result<Vec<ScrapeRunPairRow>, DbError> {
    let rows = sqlx::query_as::<_, ScrapeRunPairRow>(
        "SELECT id, scrape_run_id, platform_name, category_name, status, pages_fetched, \
                products_seen, created_count, updated_count, unchanged_count, skipped_count, \
                error_message, created_at \
         FROM scrape_run_pairs \
         WHERE scrape_run_id = $1 \
         ORDER BY id",
    )
    .bind(run_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
