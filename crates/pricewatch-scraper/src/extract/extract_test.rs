use std::fmt::Write as _;
use std::str::FromStr;

use chrono::TimeZone;
use rust_decimal::Decimal;

use super::*;

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn ctx(platform: &str, category: &str, base_url: &str) -> ListingContext {
    ListingContext {
        platform: platform.to_owned(),
        category: category.to_owned(),
        base_url: base_url.to_owned(),
        currency: "KES".to_owned(),
        captured_at: Utc.with_ymd_and_hms(2025, 1, 9, 6, 0, 0).unwrap(),
    }
}

fn jumia_ctx() -> ListingContext {
    ctx("Jumia", "Mobile Phones", "https://www.jumia.co.ke")
}

fn kilimall_ctx() -> ListingContext {
    ctx("Kilimall", "Televisions", "https://www.kilimall.co.ke")
}

fn page(cards: &str) -> String {
    format!(
        r#"<!DOCTYPE html><html><head><title>Listing</title></head>
<body><main><section class="card -fh"><div class="-paxs row _no-g _4cl-3cm-shs">{cards}</div></section></main></body></html>"#
    )
}

const JUMIA_CARD: &str = r#"
<article class="prd _fb col c-prd">
  <a class="core" href="/samsung-galaxy-a15-128gb-blue-220312345.html"
     data-id="SA948MP3ABCDENAFAMZ"
     data-name="Samsung Galaxy A15, 6.5&quot;, 128GB + 4GB RAM, Blue">
    <div class="img-c">
      <img class="img" data-src="https://ke.jumia.is/unsafe/fit-in/300x300/product/12/345/1.jpg"
           src="data:image/svg+xml;base64,PHN2Zz48L3N2Zz4=" alt="">
    </div>
    <div class="info">
      <h3 class="name">Samsung Galaxy A15</h3>
      <div class="prc">KSh 18,999</div>
      <div class="s-prc-w"><div class="old">KSh 24,999</div><div class="bdg _dsct _sm">24%</div></div>
    </div>
  </a>
</article>"#;

const JUMIA_GA4_CARD: &str = r#"
<article class="prd _fb col c-prd">
  <a class="core" href="/vitron-43-inch-smart-android-tv-12345.html"
     data-ga4-item_id="VI123EA456XYZ"
     data-ga4-item_name="Vitron 43&quot; Smart Android TV"
     data-ga4-price="21999"
     data-ga4-discount="12"
     data-ga4-item_brand="Vitron">
    <div class="img-c"><img class="img" data-src="/unsafe/fit-in/300x300/tv.jpg" alt=""></div>
    <div class="info"><h3 class="name">Vitron 43" Smart Android TV</h3></div>
  </a>
</article>"#;

const KILIMALL_CARD: &str = r#"
<div class="product-item">
  <a class="product-link" href="/item/1234567.html">
    <img class="product-image" src="//image.kilimall.com/kenya/shop/tv.jpg">
    <p class="product-title">  Vision Plus 32"
        HD LED TV </p>
  </a>
  <div class="product-price">KSh 12,499</div>
  <div class="original-price">KSh 15,000</div>
</div>"#;

// ---------------------------------------------------------------------------
// Jumia catalog
// ---------------------------------------------------------------------------

#[test]
fn jumia_catalog_card_extracts_all_fields() {
    let out = extract_page(&JumiaCatalog, &page(JUMIA_CARD), &jumia_ctx());
    assert_eq!(out.containers, 1);
    assert_eq!(out.discarded, 0);

    let r = &out.results[0];
    assert_eq!(r.platform, "Jumia");
    assert_eq!(r.category, "Mobile Phones");
    assert_eq!(r.name, "Samsung Galaxy A15, 6.5\", 128GB + 4GB RAM, Blue");
    assert_eq!(
        r.url,
        "https://www.jumia.co.ke/samsung-galaxy-a15-128gb-blue-220312345.html"
    );
    assert_eq!(
        r.image_url.as_deref(),
        Some("https://ke.jumia.is/unsafe/fit-in/300x300/product/12/345/1.jpg")
    );
    assert_eq!(r.price, dec("18999"));
    assert_eq!(r.original_price, Some(dec("24999")));
    assert_eq!(r.discount_pct, dec("24.00"));
    assert_eq!(r.currency, "KES");
    assert_eq!(r.source_item_id.as_deref(), Some("SA948MP3ABCDENAFAMZ"));
}

#[test]
fn jumia_catalog_without_old_price_has_zero_discount() {
    let card = JUMIA_CARD.replace(r#"<div class="old">KSh 24,999</div>"#, "");
    let out = extract_page(&JumiaCatalog, &page(&card), &jumia_ctx());
    let r = &out.results[0];
    assert_eq!(r.original_price, None);
    assert_eq!(r.discount_pct, Decimal::ZERO);
}

#[test]
fn jumia_catalog_falls_back_to_visible_name() {
    let card = JUMIA_CARD.replace(
        r#"data-name="Samsung Galaxy A15, 6.5&quot;, 128GB + 4GB RAM, Blue""#,
        "",
    );
    let out = extract_page(&JumiaCatalog, &page(&card), &jumia_ctx());
    assert_eq!(out.results[0].name, "Samsung Galaxy A15");
}

#[test]
fn jumia_catalog_card_without_link_is_discarded() {
    let card = r#"<article class="prd"><div class="prc">KSh 100</div></article>"#;
    let document = Html::parse_document(&page(card));
    let container = JumiaCatalog.list_containers(&document)[0];
    assert_eq!(
        JumiaCatalog.extract_one(container, &jumia_ctx()),
        Err(ExtractionError::MissingField("link"))
    );
}

#[test]
fn jumia_catalog_unparsable_price_is_discarded() {
    let card = JUMIA_CARD.replace("KSh 18,999", "Price on request");
    let document = Html::parse_document(&page(&card));
    let container = JumiaCatalog.list_containers(&document)[0];
    assert_eq!(
        JumiaCatalog.extract_one(container, &jumia_ctx()),
        Err(ExtractionError::InvalidPrice("Price on request".to_owned()))
    );
}

#[test]
fn jumia_catalog_price_range_is_discarded_and_neighbours_kept() {
    let range = JUMIA_CARD
        .replace("samsung-galaxy-a15-128gb-blue-220312345", "tecno-spark-20-bundle-3")
        .replace("KSh 18,999", "KSh 45,999 - KSh 129,999");
    let cheaper = JUMIA_CARD
        .replace("samsung-galaxy-a15-128gb-blue-220312345", "infinix-hot-40i-7")
        .replace("KSh 18,999", "KSh 13,499");
    let document = Html::parse_document(&page(&range));
    let container = JumiaCatalog.list_containers(&document)[0];
    assert_eq!(
        JumiaCatalog.extract_one(container, &jumia_ctx()),
        Err(ExtractionError::InvalidPrice("KSh 45,999 - KSh 129,999".to_owned()))
    );

    let out = extract_page(
        &JumiaCatalog,
        &page(&format!("{JUMIA_CARD}{range}{cheaper}")),
        &jumia_ctx(),
    );
    assert_eq!(out.containers, 3);
    assert_eq!(out.discarded, 1);
    let prices: Vec<Decimal> = out.results.iter().map(|r| r.price).collect();
    assert_eq!(prices, vec![dec("18999"), dec("13499")]);
}

#[test]
fn malformed_items_are_discarded_without_failing_the_page() {
    let mut cards = String::new();
    for i in 0..10 {
        let price = if i % 3 == 1 {
            String::new()
        } else {
            format!(r#"<div class="prc">KSh {},000</div>"#, 10 + i)
        };
        write!(
            cards,
            r#"<article class="prd"><a class="core" href="/phone-{i}.html" data-name="Phone {i}">{price}</a></article>"#
        )
        .unwrap();
    }

    let out = extract_page(&JumiaCatalog, &page(&cards), &jumia_ctx());
    assert_eq!(out.containers, 10);
    assert_eq!(out.results.len(), 7);
    assert_eq!(out.discarded, 3);
    let names: Vec<&str> = out.results.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["Phone 0", "Phone 2", "Phone 3", "Phone 5", "Phone 6", "Phone 8", "Phone 9"]
    );
}

#[test]
fn page_without_containers_reports_zero() {
    let out = extract_page(
        &JumiaCatalog,
        "<html><body><p>No results found</p></body></html>",
        &jumia_ctx(),
    );
    assert_eq!(out.containers, 0);
    assert!(out.results.is_empty());
    assert_eq!(out.discarded, 0);
}

// ---------------------------------------------------------------------------
// Jumia GA4
// ---------------------------------------------------------------------------

#[test]
fn jumia_ga4_reads_attributes_and_derives_original_price() {
    let tv_ctx = ctx("Jumia", "Televisions", "https://www.jumia.co.ke");
    let out = extract_page(&JumiaGa4, &page(JUMIA_GA4_CARD), &tv_ctx);
    assert_eq!(out.discarded, 0);

    let r = &out.results[0];
    assert_eq!(r.name, "Vitron 43\" Smart Android TV");
    assert_eq!(
        r.url,
        "https://www.jumia.co.ke/vitron-43-inch-smart-android-tv-12345.html"
    );
    assert_eq!(
        r.image_url.as_deref(),
        Some("https://www.jumia.co.ke/unsafe/fit-in/300x300/tv.jpg")
    );
    assert_eq!(r.price, dec("21999"));
    // 21999 / 0.88
    assert_eq!(r.original_price, Some(dec("24998.86")));
    assert_eq!(r.discount_pct, dec("12"));
    assert_eq!(r.source_item_id.as_deref(), Some("VI123EA456XYZ"));
    assert_eq!(r.currency, "KES");
}

#[test]
fn jumia_ga4_without_discount_has_no_original_price() {
    let card = JUMIA_GA4_CARD.replace(r#"data-ga4-discount="12""#, "");
    let out = extract_page(&JumiaGa4, &page(&card), &jumia_ctx());
    let r = &out.results[0];
    assert_eq!(r.original_price, None);
    assert_eq!(r.discount_pct, Decimal::ZERO);
}

#[test]
fn jumia_ga4_honours_listing_currency() {
    let card = JUMIA_GA4_CARD.replace(
        r#"data-ga4-item_brand="Vitron""#,
        r#"data-ga4-currency="ugx""#,
    );
    let out = extract_page(&JumiaGa4, &page(&card), &jumia_ctx());
    assert_eq!(out.results[0].currency, "UGX");
}

#[test]
fn jumia_ga4_missing_price_attribute_is_discarded() {
    let card = JUMIA_GA4_CARD.replace(r#"data-ga4-price="21999""#, "");
    let out = extract_page(&JumiaGa4, &page(&card), &jumia_ctx());
    assert_eq!(out.containers, 1);
    assert!(out.results.is_empty());
    assert_eq!(out.discarded, 1);
}

#[test]
fn jumia_ga4_price_beyond_storage_is_discarded() {
    let card = JUMIA_GA4_CARD.replace(
        r#"data-ga4-price="21999""#,
        r#"data-ga4-price="45999129999""#,
    );
    let out = extract_page(&JumiaGa4, &page(&card), &jumia_ctx());
    assert_eq!(out.containers, 1);
    assert!(out.results.is_empty());
    assert_eq!(out.discarded, 1);
}

#[test]
fn jumia_ga4_near_total_discount_keeps_price_without_original() {
    let card = JUMIA_GA4_CARD
        .replace(r#"data-ga4-price="21999""#, r#"data-ga4-price="2999999""#)
        .replace(r#"data-ga4-discount="12""#, r#"data-ga4-discount="99.99""#);
    let out = extract_page(&JumiaGa4, &page(&card), &jumia_ctx());
    assert_eq!(out.discarded, 0);
    let r = &out.results[0];
    assert_eq!(r.price, dec("2999999"));
    assert_eq!(r.original_price, None);
    assert_eq!(r.discount_pct, Decimal::ZERO);
}

// ---------------------------------------------------------------------------
// Kilimall
// ---------------------------------------------------------------------------

#[test]
fn kilimall_card_extracts_all_fields() {
    let out = extract_page(&Kilimall, &page(KILIMALL_CARD), &kilimall_ctx());
    assert_eq!(out.discarded, 0);

    let r = &out.results[0];
    assert_eq!(r.platform, "Kilimall");
    assert_eq!(r.name, "Vision Plus 32\" HD LED TV");
    assert_eq!(r.url, "https://www.kilimall.co.ke/item/1234567.html");
    assert_eq!(
        r.image_url.as_deref(),
        Some("https://image.kilimall.com/kenya/shop/tv.jpg")
    );
    assert_eq!(r.price, dec("12499"));
    assert_eq!(r.original_price, Some(dec("15000")));
    assert_eq!(r.discount_pct, dec("16.67"));
    assert_eq!(r.source_item_id.as_deref(), Some("1234567"));
}

#[test]
fn kilimall_item_id_is_optional() {
    let card = KILIMALL_CARD.replace("/item/1234567.html", "/listing/vision-plus-32");
    let out = extract_page(&Kilimall, &page(&card), &kilimall_ctx());
    let r = &out.results[0];
    assert_eq!(r.url, "https://www.kilimall.co.ke/listing/vision-plus-32");
    assert_eq!(r.source_item_id, None);
}

#[test]
fn kilimall_missing_title_is_discarded() {
    let card = KILIMALL_CARD.replace("product-title", "product-subtitle");
    let document = Html::parse_document(&page(&card));
    let container = Kilimall.list_containers(&document)[0];
    assert_eq!(
        Kilimall.extract_one(container, &kilimall_ctx()),
        Err(ExtractionError::MissingField("name"))
    );
}

#[test]
fn kilimall_missing_link_is_discarded() {
    let card = KILIMALL_CARD.replace("product-link", "product-anchor");
    let document = Html::parse_document(&page(&card));
    let container = Kilimall.list_containers(&document)[0];
    assert_eq!(
        Kilimall.extract_one(container, &kilimall_ctx()),
        Err(ExtractionError::MissingField("url"))
    );
}

#[test]
fn containers_come_back_in_document_order() {
    let second = KILIMALL_CARD
        .replace("/item/1234567.html", "/item/7654321.html")
        .replace("Vision Plus", "Hisense");
    let out = extract_page(
        &Kilimall,
        &page(&format!("{KILIMALL_CARD}{second}")),
        &kilimall_ctx(),
    );
    let ids: Vec<_> = out
        .results
        .iter()
        .map(|r| r.source_item_id.clone().unwrap())
        .collect();
    assert_eq!(ids, vec!["1234567", "7654321"]);
}

#[test]
fn extractor_for_maps_each_kind() {
    for kind in [
        ExtractorKind::JumiaCatalog,
        ExtractorKind::JumiaGa4,
        ExtractorKind::Kilimall,
    ] {
        assert_eq!(extractor_for(kind).kind(), kind);
    }
}
