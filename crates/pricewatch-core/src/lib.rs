pub mod app_config;
pub mod catalog;
pub mod config;
pub mod products;
pub mod reconcile;
pub mod runs;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use catalog::{
    load_catalog, parse_catalog, CatalogFile, CategoryConfig, ExtractorKind, ListingConfig,
    PlatformConfig, ScrapePair, DEFAULT_PAGE_CAP,
};
pub use config::{load_app_config, load_app_config_from_env};
pub use products::{PricePoint, ProductView, ScrapeResult, MAX_PRICE};
pub use reconcile::{plan_batch, BatchPlan, ExistingProduct, PlannedProduct, ProductChange};
pub use runs::{PairReport, PairStatus, PlatformTotals, ReconcileOutcome, RunSummary};

/// Errors raised while loading process or catalog configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read catalog file {path}: {source}")]
    CatalogFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse catalog file: {0}")]
    CatalogFileParse(#[source] serde_yaml::Error),

    #[error("catalog validation failed: {0}")]
    Validation(String),
}
