//! Pure batch reconciliation.
//!
//! [`plan_batch`] decides, for one batch of scrape results, which catalog
//! products are created, which get a new current price (pushing the old one
//! into history), and which are only refreshed. It performs no I/O: the
//! persistence layer loads the existing rows, calls the planner inside its
//! transaction, and writes the returned plan.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::products::{PricePoint, ScrapeResult, MAX_PRICE};
use crate::runs::ReconcileOutcome;

/// Catalog state of a product that already exists when the batch starts.
#[derive(Debug, Clone, PartialEq)]
pub struct ExistingProduct {
    pub id: i64,
    pub url: String,
    pub name: String,
    pub image_url: Option<String>,
    pub current_price: Decimal,
    pub last_price_update: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductChange {
    /// Not in the catalog yet; insert.
    Created,
    /// Existing product whose current price moved at least once in this batch.
    PriceChanged,
    /// Existing product re-observed at its current price; display fields only.
    Refreshed,
}

/// Final state of one product after every result in the batch for its URL
/// has been applied.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedProduct {
    /// `None` for products created by this batch.
    pub existing_id: Option<i64>,
    pub url: String,
    pub name: String,
    pub image_url: Option<String>,
    pub current_price: Decimal,
    pub original_price: Option<Decimal>,
    pub discount_pct: Decimal,
    pub currency: String,
    pub source_item_id: Option<String>,
    pub last_price_update: DateTime<Utc>,
    /// Price points to append to the stored history, oldest first.
    pub appended_history: Vec<PricePoint>,
    pub change: ProductChange,
}

/// Output of [`plan_batch`]: the products to write, in first-seen order, and
/// the batch counters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchPlan {
    pub products: Vec<PlannedProduct>,
    pub outcome: ReconcileOutcome,
}

/// Plans the catalog mutations for one batch.
///
/// - `is_known` decides whether a result's platform and category resolve to
///   reference rows; unresolved results are counted as skipped, as are
///   results whose prices fall outside `0..=MAX_PRICE`.
/// - `existing` holds the current catalog rows keyed by canonical URL.
/// - `now` stamps new products and price changes.
///
/// Results sharing a URL are folded into one planned product in batch order,
/// so a URL never yields two inserts. When the price changes, the previous
/// `{current_price, last_price_update}` is appended to history before the new
/// price becomes current; an unchanged price appends nothing.
pub fn plan_batch<F>(
    results: &[ScrapeResult],
    existing: &HashMap<String, ExistingProduct>,
    now: DateTime<Utc>,
    is_known: F,
) -> BatchPlan
where
    F: Fn(&ScrapeResult) -> bool,
{
    let mut plan = BatchPlan::default();
    let mut index: HashMap<String, usize> = HashMap::new();

    for result in results {
        if !is_known(result) || !has_storable_prices(result) || result.url.is_empty() {
            plan.outcome.skipped += 1;
            continue;
        }

        if let Some(&slot) = index.get(&result.url) {
            let planned = &mut plan.products[slot];
            apply_observation(planned, result, now, &mut plan.outcome);
            continue;
        }

        let planned = match existing.get(&result.url) {
            Some(row) => {
                let mut planned = PlannedProduct {
                    existing_id: Some(row.id),
                    url: row.url.clone(),
                    name: row.name.clone(),
                    image_url: row.image_url.clone(),
                    current_price: row.current_price,
                    original_price: None,
                    discount_pct: Decimal::ZERO,
                    currency: result.currency.clone(),
                    source_item_id: None,
                    last_price_update: row.last_price_update,
                    appended_history: Vec::new(),
                    change: ProductChange::Refreshed,
                };
                apply_observation(&mut planned, result, now, &mut plan.outcome);
                planned
            }
            None => {
                plan.outcome.created += 1;
                PlannedProduct {
                    existing_id: None,
                    url: result.url.clone(),
                    name: result.name.clone(),
                    image_url: result.image_url.clone(),
                    current_price: result.price,
                    original_price: result.original_price,
                    discount_pct: result.discount_pct,
                    currency: result.currency.clone(),
                    source_item_id: result.source_item_id.clone(),
                    last_price_update: now,
                    appended_history: Vec::new(),
                    change: ProductChange::Created,
                }
            }
        };

        index.insert(planned.url.clone(), plan.products.len());
        plan.products.push(planned);
    }

    plan
}

fn has_storable_prices(result: &ScrapeResult) -> bool {
    let in_range = |price: Decimal| !price.is_sign_negative() && price <= MAX_PRICE;
    in_range(result.price) && result.original_price.is_none_or(in_range)
}

fn apply_observation(
    planned: &mut PlannedProduct,
    result: &ScrapeResult,
    now: DateTime<Utc>,
    outcome: &mut ReconcileOutcome,
) {
    if planned.current_price == result.price {
        outcome.unchanged += 1;
    } else {
        planned.appended_history.push(PricePoint {
            price: planned.current_price,
            timestamp: planned.last_price_update,
        });
        planned.current_price = result.price;
        planned.last_price_update = now;
        if planned.change == ProductChange::Refreshed {
            planned.change = ProductChange::PriceChanged;
        }
        outcome.updated += 1;
    }

    planned.name.clone_from(&result.name);
    if result.image_url.is_some() {
        planned.image_url.clone_from(&result.image_url);
    }
    planned.original_price = result.original_price;
    planned.discount_pct = result.discount_pct;
    planned.currency.clone_from(&result.currency);
    if result.source_item_id.is_some() {
        planned.source_item_id.clone_from(&result.source_item_id);
    }
}

#[cfg(test)]
#[path = "reconcile_test.rs"]
mod tests;
