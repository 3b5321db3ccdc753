//! Platform and category reference data.

use chrono::{DateTime, Utc};
use pricewatch_core::CatalogFile;
use sqlx::{PgExecutor, PgPool};

use crate::DbError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PlatformRow {
    pub id: i64,
    pub name: String,
    pub base_url: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CategoryRow {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub platforms: usize,
    pub categories: usize,
}

/// Upsert the catalog's categories and platforms.
///
/// All upserts run inside a single transaction; if any fails the whole seed
/// is rolled back. Re-seeding an unchanged catalog is a no-op apart from
/// `updated_at`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any database operation fails.
pub async fn seed_catalog(pool: &PgPool, catalog: &CatalogFile) -> Result<SeedSummary, DbError> {
    let mut tx = pool.begin().await?;
    let mut summary = SeedSummary::default();

    for category in &catalog.categories {
        sqlx::query("INSERT INTO categories (name) VALUES ($1) ON CONFLICT (name) DO NOTHING")
            .bind(&category.name)
            .execute(&mut *tx)
            .await?;
        summary.categories += 1;
    }

    for platform in &catalog.platforms {
        sqlx::query(
            "INSERT INTO platforms (name, base_url) VALUES ($1, $2) \
             ON CONFLICT (name) DO UPDATE SET \
                 base_url = EXCLUDED.base_url, \
                 updated_at = NOW()",
        )
        .bind(&platform.name)
        .bind(&platform.base_url)
        .execute(&mut *tx)
        .await?;
        summary.platforms += 1;
    }

    tx.commit().await?;
    Ok(summary)
}

/// Looks up a platform by exact name.
///
/// # Errors
///
/// Returns [`DbError::UnknownReference`] if no platform has that name, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_platform_by_name<'e, E>(executor: E, name: &str) -> Result<PlatformRow, DbError>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, PlatformRow>(
        "SELECT id, name, base_url, created_at FROM platforms WHERE name = $1",
    )
    .bind(name)
    .fetch_optional(executor)
    .await?
    .ok_or_else(|| DbError::UnknownReference {
        kind: "platform",
        name: name.to_owned(),
    })
}

/// Looks up a category by exact name.
///
/// # Errors
///
/// Returns [`DbError::UnknownReference`] if no category has that name, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_category_by_name<'e, E>(executor: E, name: &str) -> Result<CategoryRow, DbError>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, CategoryRow>("SELECT id, name, created_at FROM categories WHERE name = $1")
        .bind(name)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| DbError::UnknownReference {
            kind: "category",
            name: name.to_owned(),
        })
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_platforms(pool: &PgPool) -> Result<Vec<PlatformRow>, DbError> {
    let rows = sqlx::query_as::<_, PlatformRow>(
        "SELECT id, name, base_url, created_at FROM platforms ORDER BY name",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_categories(pool: &PgPool) -> Result<Vec<CategoryRow>, DbError> {
    let rows = sqlx::query_as::<_, CategoryRow>(
        "SELECT id, name, created_at FROM categories ORDER BY name",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
