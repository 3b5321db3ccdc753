//! Jumia catalog grid (`article.prd` cards with a `.prc` price node).

use std::sync::LazyLock;

use pricewatch_core::{ExtractorKind, ScrapeResult};
use scraper::{ElementRef, Html, Selector};

use super::{
    attr, image_of, parse_price, product_url, selector, text_of, ListingContext, ListingExtractor,
};
use crate::error::ExtractionError;
use crate::normalize;

static CARD: LazyLock<Selector> = LazyLock::new(|| selector("article.prd"));
static LINK: LazyLock<Selector> = LazyLock::new(|| selector("a.core"));
static NAME: LazyLock<Selector> = LazyLock::new(|| selector(".name"));
static IMAGE: LazyLock<Selector> = LazyLock::new(|| selector("img"));
static PRICE: LazyLock<Selector> = LazyLock::new(|| selector("div.prc"));
static OLD_PRICE: LazyLock<Selector> = LazyLock::new(|| selector("div.old"));

pub struct JumiaCatalog;

impl ListingExtractor for JumiaCatalog {
    fn kind(&self) -> ExtractorKind {
        ExtractorKind::JumiaCatalog
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

        let name = attr(link, "data-name")
            .and_then(|n| normalize::clean_text(&n))
            .or_else(|| text_of(container, &NAME))
            .ok_or(ExtractionError::MissingField("name"))?;
        let url = product_url(attr(link, "href"), &ctx.base_url)?;
        let price = parse_price(text_of(container, &PRICE))?;

        let original_price =
            text_of(container, &OLD_PRICE).and_then(|t| normalize::clean_price(&t));

        Ok(ScrapeResult {
            platform: ctx.platform.clone(),
            category: ctx.category.clone(),
            name,
            url,
            image_url: image_of(link, &IMAGE, &ctx.base_url),
            price,
            original_price,
            discount_pct: normalize::compute_discount(price, original_price),
            currency: ctx.currency.clone(),
            source_item_id: attr(link, "data-id"),
            captured_at: ctx.captured_at,
        })
    }
}
