//! Multi-page scrape of one (platform, category) listing.

use chrono::Utc;
use pricewatch_core::{ScrapePair, ScrapeResult};

use crate::error::ScraperError;
use crate::extract::{extract_page, extractor_for, ListingContext};
use crate::fetch::{FetchPolicy, PageFetcher};
use crate::pagination::page_url;

/// Everything extracted from one listing across its pages.
#[derive(Debug, Default)]
pub struct ListingScrape {
    /// Results in page order, then document order.
    pub results: Vec<ScrapeResult>,
    pub pages_fetched: u32,
    /// Containers dropped by the extractor across all pages.
    pub discarded: u32,
}

/// Walks listing pages `1..=pair.page_cap` and extracts every product.
///
/// Pagination stops early on the first page that has no product containers.
/// A fetch failure on the first page fails the listing; a failure on a later
/// page stops pagination and keeps what earlier pages produced.
///
/// # Errors
///
/// Returns [`ScraperError::Fetch`] if the first page cannot be fetched.
pub async fn scrape_listing(
    fetcher: &PageFetcher,
    policy: &FetchPolicy,
    pair: &ScrapePair,
    default_currency: &str,
) -> Result<ListingScrape, ScraperError> {
    let extractor = extractor_for(pair.extractor);
    let ctx = ListingContext {
        platform: pair.platform.clone(),
        category: pair.category.clone(),
        base_url: pair.base_url.clone(),
        currency: default_currency.to_owned(),
        captured_at: Utc::now(),
    };

    let mut scrape = ListingScrape::default();

    for page in 1..=pair.page_cap {
        let url = page_url(&pair.base_url, &pair.slug, page)?;

        let body = match fetcher.fetch(&url, policy).await {
            Ok(body) => body,
            Err(e) if page == 1 => return Err(e.into()),
            Err(e) => {
                tracing::warn!(
                    platform = %pair.platform,
                    category = %pair.category,
                    page,
                    error = %e,
                    "page fetch failed, keeping results from earlier pages"
                );
                break;
            }
        };
        scrape.pages_fetched += 1;

        let extraction = extract_page(extractor, &body, &ctx);
        if extraction.containers == 0 {
            tracing::debug!(
                platform = %pair.platform,
                category = %pair.category,
                page,
                "no listings on page, stopping pagination"
            );
            break;
        }

        tracing::debug!(
            platform = %pair.platform,
            category = %pair.category,
            page,
            extracted = extraction.results.len(),
            discarded = extraction.discarded,
            "extracted listing page"
        );
        scrape.discarded += extraction.discarded;
        scrape.results.extend(extraction.results);
    }

    Ok(scrape)
}
