use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Reads pricewatch settings, seeding the process environment from a `.env`
/// file in the working directory first when one exists.
///
/// # Errors
///
/// Returns `ConfigError` when `DATABASE_URL` is absent or a `PRICEWATCH_*`
/// value fails to parse.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Reads pricewatch settings from the process environment as it stands; no
/// `.env` file is consulted.
///
/// # Errors
///
/// Same as [`load_app_config`].
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Resolves every setting through `lookup`, applying defaults and range
/// checks for the fetch and currency settings.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_u32 = |var: &str, default: &str| number::<u32>(var, &or_default(var, default));
    let parse_u64 = |var: &str, default: &str| number::<u64>(var, &or_default(var, default));

    let database_url = require("DATABASE_URL")?;

    let env = parse_environment(&or_default("PRICEWATCH_ENV", "development"));
    let log_level = or_default("PRICEWATCH_LOG_LEVEL", "info");
    let catalog_path = PathBuf::from(or_default(
        "PRICEWATCH_CATALOG_PATH",
        "./config/catalog.yaml",
    ));

    let db_max_connections = parse_u32("PRICEWATCH_DB_MAX_CONNECTIONS", "5")?;
    let db_min_connections = parse_u32("PRICEWATCH_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("PRICEWATCH_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let fetch_timeout_secs = parse_u64("PRICEWATCH_FETCH_TIMEOUT_SECS", "15")?;
    let fetch_max_attempts = parse_u32("PRICEWATCH_FETCH_MAX_ATTEMPTS", "3")?;
    if fetch_max_attempts == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "PRICEWATCH_FETCH_MAX_ATTEMPTS".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    let fetch_min_delay_ms = parse_u64("PRICEWATCH_FETCH_MIN_DELAY_MS", "1000")?;
    let fetch_backoff_base_ms = parse_u64("PRICEWATCH_FETCH_BACKOFF_BASE_MS", "1000")?;

    let default_currency = or_default("PRICEWATCH_DEFAULT_CURRENCY", "KES");
    if default_currency.len() != 3 || !default_currency.chars().all(|c| c.is_ascii_uppercase()) {
        return Err(ConfigError::InvalidEnvVar {
            var: "PRICEWATCH_DEFAULT_CURRENCY".to_string(),
            reason: format!("\"{default_currency}\" is not a three-letter ISO 4217 code"),
        });
    }

    Ok(AppConfig {
        database_url,
        env,
        log_level,
        catalog_path,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        fetch_timeout_secs,
        fetch_max_attempts,
        fetch_min_delay_ms,
        fetch_backoff_base_ms,
        default_currency,
    })
}

fn number<T>(var: &str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason: format!("\"{raw}\": {e}"),
    })
}

/// `PRICEWATCH_ENV` value to [`Environment`]; anything unrecognized is
/// development.
fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
