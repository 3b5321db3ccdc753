//! Listing page addressing.
//!
//! Both platforms paginate category listings with a `page` query parameter
//! counted from 1. The parameter is appended after any query the slug already
//! carries (`category/television?id=2070&form=category&page=2`), and any
//! fragment (`#catalog-listing`) is dropped.

use reqwest::Url;

use crate::error::FetchError;

/// Builds the URL of listing page `page` (1-based) for `slug` under `base_url`.
///
/// # Errors
///
/// Returns [`FetchError::InvalidUrl`] if `base_url` is not an absolute URL or
/// `slug` cannot be joined onto it.
pub fn page_url(base_url: &str, slug: &str, page: u32) -> Result<String, FetchError> {
    let invalid = |reason: String| FetchError::InvalidUrl {
        url: format!("{base_url} + {slug}"),
        reason,
    };

    let base = Url::parse(base_url).map_err(|e| invalid(e.to_string()))?;
    let mut url = base.join(slug).map_err(|e| invalid(e.to_string()))?;
    url.set_fragment(None);
    url.query_pairs_mut().append_pair("page", &page.to_string());

    Ok(url.to_string())
}
