//! Rate-limited, retrying page fetcher.
//!
//! Every attempt waits a minimum delay (plus up to 50% random jitter) before
//! it is sent, and rotates the `User-Agent` / `Accept-Language` pair from a
//! fixed pool. Transient failures are retried with exponential backoff until
//! the attempt budget is spent; see [`FetchError::is_retriable`].

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use pricewatch_core::AppConfig;
use reqwest::{header, Client, Url};

use crate::error::{FetchError, ScraperError};

/// Browser user agents rotated across attempts when the catalog does not
/// supply its own pool.
pub const DEFAULT_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (Linux; Android 14; SM-A155F) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Mobile Safari/537.36",
];

const ACCEPT_LANGUAGES: &[&str] = &[
    "en-US,en;q=0.9",
    "en-GB,en;q=0.9",
    "en-KE,en;q=0.9,sw;q=0.7",
    "en;q=0.8",
];

const ACCEPT_HTML: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";

const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Per-call retry and rate-limit parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchPolicy {
    /// Total attempts, first try included. Values below 1 are treated as 1.
    pub max_attempts: u32,
    /// Wait before every attempt, jitter not included.
    pub min_delay: Duration,
    /// Backoff after the n-th failure is `backoff_base * 2^(n-1)`, capped at 60 s.
    pub backoff_base: Duration,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            min_delay: Duration::from_secs(1),
            backoff_base: Duration::from_secs(1),
        }
    }
}

impl FetchPolicy {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            max_attempts: config.fetch_max_attempts,
            min_delay: Duration::from_millis(config.fetch_min_delay_ms),
            backoff_base: Duration::from_millis(config.fetch_backoff_base_ms),
        }
    }

    /// No pre-attempt delay and no backoff. For tests against local servers.
    #[must_use]
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            min_delay: Duration::ZERO,
            backoff_base: Duration::ZERO,
        }
    }

    fn backoff_after(&self, failed_attempt: u32) -> Duration {
        let exponent = failed_attempt.saturating_sub(1).min(16);
        self.backoff_base
            .saturating_mul(1u32 << exponent)
            .min(MAX_BACKOFF)
    }
}

/// HTTP page fetcher shared by every extractor in a run.
pub struct PageFetcher {
    client: Client,
    user_agents: Vec<String>,
    next_profile: AtomicUsize,
}

impl PageFetcher {
    /// Builds a fetcher with a per-attempt `timeout`.
    ///
    /// An empty `user_agents` pool falls back to [`DEFAULT_USER_AGENTS`].
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::ClientBuild`] if the underlying
    /// `reqwest::Client` cannot be constructed.
    pub fn new(timeout: Duration, user_agents: Vec<String>) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(10)))
            .build()
            .map_err(ScraperError::ClientBuild)?;

        let user_agents = if user_agents.is_empty() {
            DEFAULT_USER_AGENTS.iter().map(|ua| (*ua).to_owned()).collect()
        } else {
            user_agents
        };

        Ok(Self {
            client,
            user_agents,
            next_profile: AtomicUsize::new(0),
        })
    }

    /// Fetches `url` and returns the response body.
    ///
    /// # Errors
    ///
    /// - [`FetchError::InvalidUrl`] if `url` does not parse (no request is made).
    /// - [`FetchError::Status`] / [`FetchError::Http`] for a non-retriable
    ///   failure, returned after the attempt that produced it.
    /// - [`FetchError::Exhausted`] once `policy.max_attempts` attempts have
    ///   all failed with retriable errors.
    pub async fn fetch(&self, url: &str, policy: &FetchPolicy) -> Result<String, FetchError> {
        let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl {
            url: url.to_owned(),
            reason: e.to_string(),
        })?;
        let referer = format!("{}/", parsed.origin().ascii_serialization());
        let max_attempts = policy.max_attempts.max(1);
        let mut attempt = 0u32;

        loop {
            attempt += 1;

            let delay = jittered(policy.min_delay);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            let err = match self.send_once(&parsed, &referer).await {
                Ok(body) => {
                    tracing::debug!(url, attempt, bytes = body.len(), "fetched page");
                    return Ok(body);
                }
                Err(err) => err,
            };

            if !err.is_retriable() {
                return Err(err);
            }
            if attempt >= max_attempts {
                return Err(FetchError::Exhausted {
                    url: url.to_owned(),
                    attempts: attempt,
                    last: Box::new(err),
                });
            }

            let backoff = policy.backoff_after(attempt);
            tracing::warn!(
                url,
                attempt,
                max_attempts,
                backoff_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX),
                error = %err,
                "fetch attempt failed, retrying after backoff"
            );
            tokio::time::sleep(backoff).await;
        }
    }

    async fn send_once(&self, url: &Url, referer: &str) -> Result<String, FetchError> {
        let (user_agent, accept_language) = self.rotate_profile();

        let response = self
            .client
            .get(url.clone())
            .header(header::USER_AGENT, user_agent)
            .header(header::ACCEPT, ACCEPT_HTML)
            .header(header::ACCEPT_LANGUAGE, accept_language)
            .header(header::REFERER, referer)
            .header(header::CACHE_CONTROL, "no-cache")
            .send()
            .await
            .map_err(|source| FetchError::Http {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        response.text().await.map_err(|source| FetchError::Http {
            url: url.to_string(),
            source,
        })
    }

    fn rotate_profile(&self) -> (&str, &'static str) {
        let n = self.next_profile.fetch_add(1, Ordering::Relaxed);
        (
            &self.user_agents[n % self.user_agents.len()],
            ACCEPT_LANGUAGES[n % ACCEPT_LANGUAGES.len()],
        )
    }
}

/// `delay` stretched by a random factor in `[1.0, 1.5)`.
fn jittered(delay: Duration) -> Duration {
    if delay.is_zero() {
        return delay;
    }
    delay.mul_f64(1.0 + rand::random::<f64>() * 0.5)
}
