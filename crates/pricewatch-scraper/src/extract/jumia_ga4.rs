//! Jumia cards whose product data is published as GA4 `data-ga4-*`
//! attributes on the card link rather than as visible price nodes.

use std::sync::LazyLock;

use pricewatch_core::{ExtractorKind, ScrapeResult};
use rust_decimal::Decimal;
use scraper::{ElementRef, Html, Selector};

use super::{
    attr, image_of, parse_price, product_url, selector, ListingContext, ListingExtractor,
};
use crate::error::ExtractionError;
use crate::normalize;

static CARD: LazyLock<Selector> = LazyLock::new(|| selector("article.prd"));
static LINK: LazyLock<Selector> = LazyLock::new(|| selector("a.core"));
static IMAGE: LazyLock<Selector> = LazyLock::new(|| selector("img"));

pub struct JumiaGa4;

impl ListingExtractor for JumiaGa4 {
    fn kind(&self) -> ExtractorKind {
        ExtractorKind::JumiaGa4
    }

    fn list_containers<'a>(&self, page: &'a Html) -> Vec<ElementRef<'a>> {
        page.select(&CARD).collect()
    }

    fn extract_one(
        &self,
        container: ElementRef<'_>,
        ctx: &ListingContext,
    ) -> Result<ScrapeResult, ExtractionError> {
        let link = container
            .select(&LINK)
            .next()
            .ok_or(ExtractionError::MissingField("link"))?;

        let name = attr(link, "data-ga4-item_name")
            .and_then(|n| normalize::clean_text(&n))
            .ok_or(ExtractionError::MissingField("name"))?;
        let url = product_url(attr(link, "href"), &ctx.base_url)?;
        let price = parse_price(attr(link, "data-ga4-price"))?;

        let advertised_discount = attr(link, "data-ga4-discount")
            .and_then(|d| normalize::clean_price(&d))
            .unwrap_or(Decimal::ZERO);
        let original_price = normalize::derive_original_price(price, advertised_discount);
        let discount_pct = if original_price.is_some() {
            advertised_discount.round_dp(2)
        } else {
            Decimal::ZERO
        };

        Ok(ScrapeResult {
            platform: ctx.platform.clone(),
            category: ctx.category.clone(),
            name,
            url,
            image_url: image_of(link, &IMAGE, &ctx.base_url),
            price,
            original_price,
            discount_pct,
            currency: normalize::normalize_currency(
                link.value().attr("data-ga4-currency"),
                &ctx.currency,
            ),
            source_item_id: attr(link, "data-ga4-item_id"),
            captured_at: ctx.captured_at,
        })
    }
}
