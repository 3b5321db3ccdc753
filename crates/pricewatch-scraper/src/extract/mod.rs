//! Listing-page extractors.
//!
//! Each [`ListingExtractor`] owns the selectors for one markup family and
//! turns a parsed listing page into candidate [`ScrapeResult`]s. Containers
//! that lack a required field are discarded with an [`ExtractionError`] that
//! is logged here and never propagated.

mod jumia;
mod jumia_ga4;
mod kilimall;

use chrono::{DateTime, Utc};
use pricewatch_core::{ExtractorKind, ScrapeResult};
use scraper::{ElementRef, Html, Selector};

use crate::error::ExtractionError;
use crate::normalize;

pub use jumia::JumiaCatalog;
pub use jumia_ga4::JumiaGa4;
pub use kilimall::Kilimall;

/// Per-listing values stamped onto every result extracted from it.
#[derive(Debug, Clone)]
pub struct ListingContext {
    pub platform: String,
    pub category: String,
    /// Platform base URL, used to resolve relative links.
    pub base_url: String,
    /// Currency applied when the markup does not state one.
    pub currency: String,
    pub captured_at: DateTime<Utc>,
}

pub trait ListingExtractor: Send + Sync {
    fn kind(&self) -> ExtractorKind;

    /// Product containers on `page`, in document order.
    fn list_containers<'a>(&self, page: &'a Html) -> Vec<ElementRef<'a>>;

    /// Extracts one product from a container returned by
    /// [`list_containers`](Self::list_containers).
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError`] when the name, URL or price is missing or
    /// unusable.
    fn extract_one(
        &self,
        container: ElementRef<'_>,
        ctx: &ListingContext,
    ) -> Result<ScrapeResult, ExtractionError>;
}

/// Extractor for a configured markup family.
#[must_use]
pub fn extractor_for(kind: ExtractorKind) -> &'static dyn ListingExtractor {
    match kind {
        ExtractorKind::JumiaCatalog => &JumiaCatalog,
        ExtractorKind::JumiaGa4 => &JumiaGa4,
        ExtractorKind::Kilimall => &Kilimall,
    }
}

/// Outcome of extracting one listing page.
#[derive(Debug, Default)]
pub struct PageExtraction {
    pub results: Vec<ScrapeResult>,
    /// Containers found on the page, usable or not. Zero ends pagination.
    pub containers: usize,
    pub discarded: u32,
}

/// Parses `body` and runs `extractor` over every container on it.
#[must_use]
pub fn extract_page(
    extractor: &dyn ListingExtractor,
    body: &str,
    ctx: &ListingContext,
) -> PageExtraction {
    let document = Html::parse_document(body);
    let containers = extractor.list_containers(&document);

    let mut page = PageExtraction {
        containers: containers.len(),
        ..PageExtraction::default()
    };

    for (position, container) in containers.into_iter().enumerate() {
        match extractor.extract_one(container, ctx) {
            Ok(result) => page.results.push(result),
            Err(err) => {
                page.discarded += 1;
                tracing::debug!(
                    platform = %ctx.platform,
                    category = %ctx.category,
                    extractor = %extractor.kind(),
                    position,
                    error = %err,
                    "discarding listing container"
                );
            }
        }
    }

    page
}

/// Whitespace-normalized text of the first `selector` match under `el`.
fn text_of(el: ElementRef<'_>, selector: &Selector) -> Option<String> {
    el.select(selector)
        .next()
        .and_then(|node| normalize::clean_text(&node.text().collect::<String>()))
}

/// Trimmed, non-empty attribute value on `el` itself.
fn attr(el: ElementRef<'_>, name: &str) -> Option<String> {
    el.value()
        .attr(name)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

/// Image URL from the first `selector` match, preferring lazy-load
/// `data-src` over `src`.
fn image_of(el: ElementRef<'_>, selector: &Selector, base_url: &str) -> Option<String> {
    let img = el.select(selector).next()?;
    ["data-src", "src"]
        .iter()
        .filter_map(|name| attr(img, name))
        .find_map(|raw| normalize::resolve_url(base_url, &raw))
}

fn product_url(raw: Option<String>, base_url: &str) -> Result<String, ExtractionError> {
    let raw = raw.ok_or(ExtractionError::MissingField("url"))?;
    normalize::resolve_url(base_url, &raw).ok_or(ExtractionError::InvalidUrl(raw))
}

fn parse_price(raw: Option<String>) -> Result<rust_decimal::Decimal, ExtractionError> {
    let raw = raw.ok_or(ExtractionError::MissingField("price"))?;
    normalize::clean_price(&raw).ok_or(ExtractionError::InvalidPrice(raw))
}

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static CSS selector must parse")
}

#[cfg(test)]
#[path = "extract_test.rs"]
mod tests;
