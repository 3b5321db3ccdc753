use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub log_level: String,
    pub catalog_path: PathBuf,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    /// Per-attempt request timeout.
    pub fetch_timeout_secs: u64,
    /// Total attempts per page fetch, the first try included.
    pub fetch_max_attempts: u32,
    /// Minimum pause before every fetch attempt.
    pub fetch_min_delay_ms: u64,
    /// Base for exponential backoff between failed attempts.
    pub fetch_backoff_base_ms: u64,
    /// ISO 4217 code applied when a listing does not state a currency.
    pub default_currency: String,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("catalog_path", &self.catalog_path)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("fetch_timeout_secs", &self.fetch_timeout_secs)
            .field("fetch_max_attempts", &self.fetch_max_attempts)
            .field("fetch_min_delay_ms", &self.fetch_min_delay_ms)
            .field("fetch_backoff_base_ms", &self.fetch_backoff_base_ms)
            .field("default_currency", &self.default_currency)
            .finish()
    }
}
