use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Largest price the catalog can hold (`NUMERIC(12, 2)`): 9,999,999,999.99.
pub const MAX_PRICE: Decimal = Decimal::from_parts(0xD4A5_0FFF, 0xE8, 0, false, 2);

/// One product listing observed on a platform page, already normalized.
///
/// Produced by the extractors and consumed by the reconciler; never stored
/// as-is. `price` is always present, non-negative and at most [`MAX_PRICE`];
/// listings without a usable price are dropped before a `ScrapeResult` is
/// built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapeResult {
    pub platform: String,
    pub category: String,
    pub name: String,
    /// Absolute product detail URL; the catalog identity key.
    pub url: String,
    pub image_url: Option<String>,
    pub price: Decimal,
    /// Pre-discount price when the listing advertises one.
    pub original_price: Option<Decimal>,
    /// Percentage off `original_price`, two decimal places. Zero when no
    /// original price is known or it does not exceed `price`.
    pub discount_pct: Decimal,
    /// ISO 4217 currency code (e.g., `"KES"`).
    pub currency: String,
    /// Platform-native item identifier, when the markup exposes one.
    pub source_item_id: Option<String>,
    pub captured_at: DateTime<Utc>,
}

/// One immutable entry in a product's price history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricePoint {
    pub price: Decimal,
    pub timestamp: DateTime<Utc>,
}

/// Read shape of a catalog product, as served to API clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductView {
    pub id: i64,
    pub name: String,
    pub url: String,
    pub image_url: Option<String>,
    pub platform_name: String,
    pub category_name: String,
    pub current_price: Decimal,
    pub currency: String,
    /// Previous prices, oldest first. Never contains `current_price` as its
    /// newest entry unless the price genuinely returned to an older value.
    pub price_history: Vec<PricePoint>,
    pub last_update: DateTime<Utc>,
}

impl ProductView {
    /// Lowest price ever observed, current price included.
    #[must_use]
    pub fn lowest_price(&self) -> Decimal {
        self.price_history
            .iter()
            .map(|p| p.price)
            .fold(self.current_price, Decimal::min)
    }
}
