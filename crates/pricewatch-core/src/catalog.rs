//! Static catalog definition: which platforms exist, which categories they
//! are scraped for, and how each listing page is addressed and parsed.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Page cap applied when a listing does not set one.
pub const DEFAULT_PAGE_CAP: u32 = 5;

/// Upper bound on any configured page cap.
const MAX_PAGE_CAP: u32 = 50;

/// Markup family a listing page is parsed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractorKind {
    /// Jumia catalog grid: `article.prd` cards with `.prc` / `.old` price nodes.
    JumiaCatalog,
    /// Jumia cards whose price data lives in `data-ga4-*` attributes.
    JumiaGa4,
    /// Kilimall `.product-item` cards.
    Kilimall,
}

impl std::fmt::Display for ExtractorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractorKind::JumiaCatalog => write!(f, "jumia_catalog"),
            ExtractorKind::JumiaGa4 => write!(f, "jumia_ga4"),
            ExtractorKind::Kilimall => write!(f, "kilimall"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryConfig {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingConfig {
    /// Name of a category declared in the top-level `categories` list.
    pub category: String,
    /// Path (and optional query) appended to the platform base URL.
    pub slug: String,
    pub extractor: ExtractorKind,
    #[serde(default)]
    pub page_cap: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    pub name: String,
    pub base_url: String,
    #[serde(default)]
    pub listings: Vec<ListingConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogFile {
    /// Optional override for the fetcher's user-agent pool.
    #[serde(default)]
    pub user_agents: Vec<String>,
    pub categories: Vec<CategoryConfig>,
    pub platforms: Vec<PlatformConfig>,
}

/// One unit of work for a run: a platform listing for a single category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapePair {
    pub platform: String,
    pub base_url: String,
    pub category: String,
    pub slug: String,
    pub extractor: ExtractorKind,
    pub page_cap: u32,
}

impl CatalogFile {
    /// Returns every configured (platform, category) pair in declaration
    /// order: platforms as listed, then each platform's listings as listed.
    ///
    /// Category names are spelled as declared in `categories`, whatever case
    /// the listing used.
    #[must_use]
    pub fn pairs(&self) -> Vec<ScrapePair> {
        self.platforms
            .iter()
            .flat_map(|platform| {
                platform.listings.iter().map(move |listing| ScrapePair {
                    platform: platform.name.clone(),
                    base_url: platform.base_url.clone(),
                    category: self.declared_category(&listing.category),
                    slug: listing.slug.clone(),
                    extractor: listing.extractor,
                    page_cap: listing.page_cap.unwrap_or(DEFAULT_PAGE_CAP),
                })
            })
            .collect()
    }

    fn declared_category(&self, name: &str) -> String {
        self.categories
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
            .map_or_else(|| name.to_owned(), |c| c.name.clone())
    }

    /// Returns the pairs matching the optional platform and category filters.
    /// Name comparison is case-insensitive.
    #[must_use]
    pub fn select_pairs(&self, platform: Option<&str>, category: Option<&str>) -> Vec<ScrapePair> {
        self.pairs()
            .into_iter()
            .filter(|p| platform.is_none_or(|want| p.platform.eq_ignore_ascii_case(want)))
            .filter(|p| category.is_none_or(|want| p.category.eq_ignore_ascii_case(want)))
            .collect()
    }
}

/// Load and validate the catalog definition from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_catalog(path: &Path) -> Result<CatalogFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::CatalogFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_catalog(&content)
}

/// Parse and validate a catalog definition from YAML text.
///
/// # Errors
///
/// Returns `ConfigError` if the text does not parse or fails validation.
pub fn parse_catalog(content: &str) -> Result<CatalogFile, ConfigError> {
    let catalog: CatalogFile =
        serde_yaml::from_str(content).map_err(ConfigError::CatalogFileParse)?;
    validate_catalog(&catalog)?;
    Ok(catalog)
}

fn validate_catalog(catalog: &CatalogFile) -> Result<(), ConfigError> {
    let mut categories = HashSet::new();
    for category in &catalog.categories {
        if category.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "category name must be non-empty".to_string(),
            ));
        }
        if !categories.insert(category.name.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate category name: '{}'",
                category.name
            )));
        }
    }

    let mut platforms = HashSet::new();
    for platform in &catalog.platforms {
        if platform.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "platform name must be non-empty".to_string(),
            ));
        }
        if !platforms.insert(platform.name.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate platform name: '{}'",
                platform.name
            )));
        }
        if !is_http_url(&platform.base_url) {
            return Err(ConfigError::Validation(format!(
                "platform '{}' has invalid base_url '{}'; expected an http(s) URL",
                platform.name, platform.base_url
            )));
        }

        let mut listed = HashSet::new();
        for listing in &platform.listings {
            if !categories.contains(&listing.category.to_lowercase()) {
                return Err(ConfigError::Validation(format!(
                    "platform '{}' lists undeclared category '{}'",
                    platform.name, listing.category
                )));
            }
            if !listed.insert(listing.category.to_lowercase()) {
                return Err(ConfigError::Validation(format!(
                    "platform '{}' lists category '{}' more than once",
                    platform.name, listing.category
                )));
            }
            if listing.slug.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "platform '{}' listing for '{}' has an empty slug",
                    platform.name, listing.category
                )));
            }
            if let Some(cap) = listing.page_cap {
                if cap == 0 || cap > MAX_PAGE_CAP {
                    return Err(ConfigError::Validation(format!(
                        "platform '{}' listing for '{}': page_cap {cap} not in 1..={MAX_PAGE_CAP}",
                        platform.name, listing.category
                    )));
                }
            }
        }
    }

    Ok(())
}

fn is_http_url(raw: &str) -> bool {
    let rest = raw
        .strip_prefix("https://")
        .or_else(|| raw.strip_prefix("http://"));
    rest.and_then(|r| r.split('/').next())
        .is_some_and(|host| !host.is_empty())
}

#[cfg(test)]
#[path = "catalog_test.rs"]
mod tests;
