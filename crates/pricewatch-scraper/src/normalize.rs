//! Pure value cleaning shared by every extractor.

use std::str::FromStr;

use reqwest::Url;
use pricewatch_core::MAX_PRICE;
use rust_decimal::Decimal;

/// Parses a displayed price such as `"KSh 18,999"` into a decimal.
///
/// The text must carry exactly one number; currency symbols, signs and `,`
/// separators around it are dropped. Returns `None` when there is no number,
/// more than one (`"KSh 45,999 - KSh 129,999"`), a malformed one (`"1.2.3"`),
/// or one above [`MAX_PRICE`].
#[must_use]
pub fn clean_price(raw: &str) -> Option<Decimal> {
    let mut numbers = raw
        .split(|c: char| !(c.is_ascii_digit() || c == '.' || c == ','))
        .filter(|token| token.chars().any(|c| c.is_ascii_digit()));
    let number = numbers.next()?;
    if numbers.next().is_some() {
        return None;
    }
    let digits: String = number.chars().filter(|c| *c != ',').collect();
    Decimal::from_str(&digits)
        .ok()
        .filter(|price| *price <= MAX_PRICE)
}

/// Percentage off `original`, rounded to two decimal places.
///
/// Zero when there is no original price or it does not exceed `price`.
#[must_use]
pub fn compute_discount(price: Decimal, original: Option<Decimal>) -> Decimal {
    match original {
        Some(old) if old > price && old > Decimal::ZERO => {
            ((old - price) / old * Decimal::ONE_HUNDRED).round_dp(2)
        }
        _ => Decimal::ZERO,
    }
}

/// Recovers the pre-discount price from a price and a percentage discount.
///
/// `None` for discounts outside `(0, 100)` and for results above
/// [`MAX_PRICE`].
#[must_use]
pub fn derive_original_price(price: Decimal, discount_pct: Decimal) -> Option<Decimal> {
    if discount_pct <= Decimal::ZERO || discount_pct >= Decimal::ONE_HUNDRED {
        return None;
    }
    let remaining = Decimal::ONE - discount_pct / Decimal::ONE_HUNDRED;
    price
        .checked_div(remaining)
        .map(|original| original.round_dp(2))
        .filter(|original| *original <= MAX_PRICE)
}

/// Resolves a possibly relative `href`/`src` against the platform base URL.
///
/// Protocol-relative (`//cdn...`) and absolute inputs are accepted as-is.
/// Returns `None` for blank input, unparsable URLs and non-HTTP schemes
/// (`data:`, `javascript:`).
#[must_use]
pub fn resolve_url(base: &str, raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let resolved = Url::parse(base).ok()?.join(raw).ok()?;
    matches!(resolved.scheme(), "http" | "https").then(|| resolved.to_string())
}

/// Collapses runs of whitespace to single spaces; `None` if nothing is left.
#[must_use]
pub fn clean_text(raw: &str) -> Option<String> {
    let text = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    (!text.is_empty()).then_some(text)
}

/// Uses the listing's own currency code when it looks like ISO 4217,
/// otherwise `default`.
#[must_use]
pub fn normalize_currency(raw: Option<&str>, default: &str) -> String {
    raw.map(str::trim)
        .filter(|code| code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()))
        .map_or_else(|| default.to_owned(), str::to_ascii_uppercase)
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
