//! Catalog products and their append-only price history.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use pricewatch_core::{
    plan_batch, ExistingProduct, PlannedProduct, PricePoint, ProductView, ReconcileOutcome,
    ScrapeResult,
};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use crate::reference::{get_category_by_name, get_platform_by_name};
use crate::DbError;

/// Scale of every `NUMERIC(12, 2)` price column.
const PRICE_SCALE: u32 = 2;

#[derive(Debug, Clone, sqlx::FromRow)]
struct ExistingRow {
    id: i64,
    url: String,
    name: String,
    image_url: Option<String>,
    current_price: Decimal,
    last_price_update: DateTime<Utc>,
}

impl From<ExistingRow> for ExistingProduct {
    fn from(row: ExistingRow) -> Self {
        Self {
            id: row.id,
            url: row.url,
            name: row.name,
            image_url: row.image_url,
            current_price: row.current_price,
            last_price_update: row.last_price_update,
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct ProductViewRow {
    id: i64,
    name: String,
    url: String,
    image_url: Option<String>,
    platform_name: String,
    category_name: String,
    current_price: Decimal,
    currency_code: String,
    last_price_update: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct PricePointRow {
    product_id: i64,
    price: Decimal,
    recorded_at: DateTime<Utc>,
}

/// Filter for [`search_product_views`]. `None` fields do not constrain.
#[derive(Debug, Clone)]
pub struct ProductFilter {
    /// Case-insensitive substring of the product name.
    pub name_contains: Option<String>,
    pub platform: Option<String>,
    pub category: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

impl Default for ProductFilter {
    fn default() -> Self {
        Self {
            name_contains: None,
            platform: None,
            category: None,
            limit: 50,
            offset: 0,
        }
    }
}

/// Merges one batch of scrape results for a (platform, category) listing
/// into the catalog.
///
/// The whole batch runs in one transaction:
///
/// 1. Resolve `platform` and `category`. If either is unknown every result is
///    counted as skipped and nothing is written.
/// 2. Take a transaction-scoped advisory lock per distinct URL (sorted, so
///    concurrent batches cannot deadlock) and lock existing rows with
///    `SELECT ... FOR UPDATE`.
/// 3. Plan the batch with [`plan_batch`]; results for another platform or
///    category are skipped.
/// 4. Insert new products, update existing ones, append history rows.
///
/// Any write failure rolls the batch back.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any query fails.
pub async fn reconcile_batch(
    pool: &PgPool,
    platform: &str,
    category: &str,
    results: &[ScrapeResult],
) -> Result<ReconcileOutcome, DbError> {
    let mut tx = pool.begin().await?;

    let platform_id = match get_platform_by_name(&mut *tx, platform).await {
        Ok(row) => Some(row.id),
        Err(DbError::UnknownReference { .. }) => None,
        Err(e) => return Err(e),
    };
    let category_id = match get_category_by_name(&mut *tx, category).await {
        Ok(row) => Some(row.id),
        Err(DbError::UnknownReference { .. }) => None,
        Err(e) => return Err(e),
    };
    let (Some(platform_id), Some(category_id)) = (platform_id, category_id) else {
        tracing::warn!(
            platform,
            category,
            results = results.len(),
            "platform or category is not seeded, skipping batch"
        );
        return Ok(ReconcileOutcome {
            skipped: u32::try_from(results.len()).unwrap_or(u32::MAX),
            ..ReconcileOutcome::default()
        });
    };

    let results: Vec<ScrapeResult> = results.iter().map(to_storage_scale).collect();

    let mut urls: Vec<String> = results.iter().map(|r| r.url.clone()).collect();
    urls.sort();
    urls.dedup();

    sqlx::query(
        "SELECT pg_advisory_xact_lock(hashtextextended(u, 0)) \
         FROM unnest($1::text[]) AS u ORDER BY u",
    )
    .bind(&urls)
    .execute(&mut *tx)
    .await?;

    let existing: HashMap<String, ExistingProduct> = sqlx::query_as::<_, ExistingRow>(
        "SELECT id, url, name, image_url, current_price, last_price_update \
         FROM products \
         WHERE url = ANY($1) \
         ORDER BY id \
         FOR UPDATE",
    )
    .bind(&urls)
    .fetch_all(&mut *tx)
    .await?
    .into_iter()
    .map(|row| (row.url.clone(), ExistingProduct::from(row)))
    .collect();

    let now: DateTime<Utc> = sqlx::query_scalar("SELECT NOW()")
        .fetch_one(&mut *tx)
        .await?;

    let plan = plan_batch(&results, &existing, now, |r| {
        r.platform == platform && r.category == category
    });

    for product in &plan.products {
        let product_id = match product.existing_id {
            Some(id) => {
                update_product(&mut tx, id, product).await?;
                id
            }
            None => insert_product(&mut tx, platform_id, category_id, product, now).await?,
        };
        if !product.appended_history.is_empty() {
            append_price_points(&mut tx, product_id, &product.appended_history).await?;
        }
    }

    tx.commit().await?;

    tracing::debug!(
        platform,
        category,
        created = plan.outcome.created,
        updated = plan.outcome.updated,
        unchanged = plan.outcome.unchanged,
        skipped = plan.outcome.skipped,
        "reconciled batch"
    );

    Ok(plan.outcome)
}

fn to_storage_scale(result: &ScrapeResult) -> ScrapeResult {
    ScrapeResult {
        price: result.price.round_dp(PRICE_SCALE),
        original_price: result.original_price.map(|p| p.round_dp(PRICE_SCALE)),
        discount_pct: result.discount_pct.round_dp(PRICE_SCALE),
        ..result.clone()
    }
}

async fn insert_product(
    conn: &mut PgConnection,
    platform_id: i64,
    category_id: i64,
    product: &PlannedProduct,
    now: DateTime<Utc>,
) -> Result<i64, DbError> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO products \
             (platform_id, category_id, url, name, image_url, source_item_id, \
              current_price, original_price, discount_pct, currency_code, \
              last_price_update, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $12) \
         RETURNING id",
    )
    .bind(platform_id)
    .bind(category_id)
    .bind(&product.url)
    .bind(&product.name)
    .bind(&product.image_url)
    .bind(&product.source_item_id)
    .bind(product.current_price)
    .bind(product.original_price)
    .bind(product.discount_pct)
    .bind(&product.currency)
    .bind(product.last_price_update)
    .bind(now)
    .fetch_one(conn)
    .await?;
    Ok(id)
}

async fn update_product(
    conn: &mut PgConnection,
    id: i64,
    product: &PlannedProduct,
) -> Result<(), DbError> {
    sqlx::query(
        "UPDATE products SET \
             name = $2, \
             image_url = $3, \
             source_item_id = COALESCE($4, source_item_id), \
             current_price = $5, \
             original_price = $6, \
             discount_pct = $7, \
             currency_code = $8, \
             last_price_update = $9, \
             updated_at = NOW() \
         WHERE id = $1",
    )
    .bind(id)
    .bind(&product.name)
    .bind(&product.image_url)
    .bind(&product.source_item_id)
    .bind(product.current_price)
    .bind(product.original_price)
    .bind(product.discount_pct)
    .bind(&product.currency)
    .bind(product.last_price_update)
    .execute(conn)
    .await?;
    Ok(())
}

/// Appends `points` after the product's newest history entry.
///
/// Callers must hold the product row lock so `seq` values cannot race.
async fn append_price_points(
    conn: &mut PgConnection,
    product_id: i64,
    points: &[PricePoint],
) -> Result<(), DbError> {
    let last_seq: i32 = sqlx::query_scalar(
        "SELECT COALESCE(MAX(seq), 0) FROM price_points WHERE product_id = $1",
    )
    .bind(product_id)
    .fetch_one(&mut *conn)
    .await?;

    for (seq, point) in (last_seq + 1..).zip(points) {
        sqlx::query(
            "INSERT INTO price_points (product_id, seq, price, recorded_at) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(product_id)
        .bind(seq)
        .bind(point.price)
        .bind(point.timestamp)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

const VIEW_SELECT: &str = "SELECT p.id, p.name, p.url, p.image_url, \
            pl.name AS platform_name, c.name AS category_name, \
            p.current_price, p.currency_code, p.last_price_update \
     FROM products p \
     JOIN platforms pl ON pl.id = p.platform_id \
     JOIN categories c ON c.id = p.category_id";

/// Fetches one product in its read shape, history included.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no product has that `id`, or
/// [`DbError::Sqlx`] if a query fails.
pub async fn get_product_view(pool: &PgPool, id: i64) -> Result<ProductView, DbError> {
    let row = sqlx::query_as::<_, ProductViewRow>(&format!("{VIEW_SELECT} WHERE p.id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(DbError::NotFound)?;

    let mut views = attach_history(pool, vec![row]).await?;
    views.pop().ok_or(DbError::NotFound)
}

/// Fetches one product by canonical URL.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no product has that URL, or
/// [`DbError::Sqlx`] if a query fails.
pub async fn get_product_view_by_url(pool: &PgPool, url: &str) -> Result<ProductView, DbError> {
    let row = sqlx::query_as::<_, ProductViewRow>(&format!("{VIEW_SELECT} WHERE p.url = $1"))
        .bind(url)
        .fetch_optional(pool)
        .await?
        .ok_or(DbError::NotFound)?;

    let mut views = attach_history(pool, vec![row]).await?;
    views.pop().ok_or(DbError::NotFound)
}

/// Lists products matching `filter`, most recently updated first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if a query fails.
pub async fn search_product_views(
    pool: &PgPool,
    filter: &ProductFilter,
) -> Result<Vec<ProductView>, DbError> {
    let rows = sqlx::query_as::<_, ProductViewRow>(&format!(
        "{VIEW_SELECT} \
         WHERE ($1::text IS NULL OR p.name ILIKE '%' || $1 || '%') \
           AND ($2::text IS NULL OR pl.name = $2) \
           AND ($3::text IS NULL OR c.name = $3) \
         ORDER BY p.last_price_update DESC, p.id DESC \
         LIMIT $4 OFFSET $5"
    ))
    .bind(filter.name_contains.as_deref())
    .bind(filter.platform.as_deref())
    .bind(filter.category.as_deref())
    .bind(filter.limit)
    .bind(filter.offset)
    .fetch_all(pool)
    .await?;

    attach_history(pool, rows).await
}

/// Price history of one product, oldest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_price_points(pool: &PgPool, product_id: i64) -> Result<Vec<PricePoint>, DbError> {
    let rows = sqlx::query_as::<_, PricePointRow>(
        "SELECT product_id, price, recorded_at FROM price_points \
         WHERE product_id = $1 ORDER BY seq",
    )
    .bind(product_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| PricePoint {
            price: r.price,
            timestamp: r.recorded_at,
        })
        .collect())
}

async fn attach_history(
    pool: &PgPool,
    rows: Vec<ProductViewRow>,
) -> Result<Vec<ProductView>, DbError> {
    let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
    let mut history: HashMap<i64, Vec<PricePoint>> = HashMap::new();

    if !ids.is_empty() {
        let points = sqlx::query_as::<_, PricePointRow>(
            "SELECT product_id, price, recorded_at FROM price_points \
             WHERE product_id = ANY($1) ORDER BY product_id, seq",
        )
        .bind(&ids)
        .fetch_all(pool)
        .await?;

        for point in points {
            history.entry(point.product_id).or_default().push(PricePoint {
                price: point.price,
                timestamp: point.recorded_at,
            });
        }
    }

    Ok(rows
        .into_iter()
        .map(|row| ProductView {
            price_history: history.remove(&row.id).unwrap_or_default(),
            id: row.id,
            name: row.name,
            url: row.url,
            image_url: row.image_url,
            platform_name: row.platform_name,
            category_name: row.category_name,
            current_price: row.current_price,
            currency: row.currency_code,
            last_update: row.last_price_update,
        })
        .collect())
}
