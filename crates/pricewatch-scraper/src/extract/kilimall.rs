//! Kilimall category listings (`.product-item` cards).

use std::sync::LazyLock;

use pricewatch_core::{ExtractorKind, ScrapeResult};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use super::{
    attr, image_of, parse_price, product_url, selector, text_of, ListingContext, ListingExtractor,
};
use crate::error::ExtractionError;
use crate::normalize;

static CARD: LazyLock<Selector> = LazyLock::new(|| selector(".product-item"));
static TITLE: LazyLock<Selector> = LazyLock::new(|| selector(".product-title"));
static LINK: LazyLock<Selector> = LazyLock::new(|| selector("a.product-link"));
static IMAGE: LazyLock<Selector> = LazyLock::new(|| selector("img.product-image"));
static PRICE: LazyLock<Selector> = LazyLock::new(|| selector(".product-price"));
static OLD_PRICE: LazyLock<Selector> = LazyLock::new(|| selector(".original-price"));

static ITEM_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/item/(\d+)\.html").expect("static regex must compile"));

pub struct Kilimall;

impl ListingExtractor for Kilimall {
    fn kind(&self) -> ExtractorKind {
        ExtractorKind::Kilimall
    }

    fn list_containers<'a>(&self, page: &'a Html) -> Vec<ElementRef<'a>> {
        page.select(&CARD).collect()
    }

    fn extract_one(
        &self,
        container: ElementRef<'_>,
        ctx: &ListingContext,
    ) -> Result<ScrapeResult, ExtractionError> {
        let name = text_of(container, &TITLE).ok_or(ExtractionError::MissingField("name"))?;
        let href = container.select(&LINK).next().and_then(|a| attr(a, "href"));
        let url = product_url(href, &ctx.base_url)?;
        let price = parse_price(text_of(container, &PRICE))?;

        let original_price =
            text_of(container, &OLD_PRICE).and_then(|t| normalize::clean_price(&t));
        let source_item_id = ITEM_ID
            .captures(&url)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_owned());

        Ok(ScrapeResult {
            platform: ctx.platform.clone(),
            category: ctx.category.clone(),
            name,
            url,
            image_url: image_of(container, &IMAGE, &ctx.base_url),
            price,
            original_price,
            discount_pct: normalize::compute_discount(price, original_price),
            currency: ctx.currency.clone(),
            source_item_id,
            captured_at: ctx.captured_at,
        })
    }
}
