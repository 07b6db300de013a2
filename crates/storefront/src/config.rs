//! Storefront client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `BOOKSTORE_API_URL` - Base URL of the bookstore REST API
//!
//! ## Optional
//! - `BOOKSTORE_STATE_DIR` - Directory for the persisted token and guest cart (default: .bookstore)
//! - `BOOKSTORE_REQUEST_TIMEOUT_SECS` - HTTP request timeout in seconds (default: 10)
//! - `BOOKSTORE_CURRENCY` - Store currency code for display (default: VND)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::path::PathBuf;
use std::time::Duration;

use bookstore_core::CurrencyCode;
use thiserror::Error;
use url::Url;

const DEFAULT_STATE_DIR: &str = ".bookstore";
const DEFAULT_TIMEOUT_SECS: &str = "10";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// REST API connection settings
    pub api: ApiConfig,
    /// Directory holding the file-backed store
    pub state_dir: PathBuf,
    /// Currency used when displaying prices
    pub currency: CurrencyCode,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// REST API connection settings.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL, always ending in `/` so relative routes join beneath it
    pub base_url: Url,
    /// Timeout applied to every request
    pub request_timeout: Duration,
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let base_url = get_required_env("BOOKSTORE_API_URL")?;
        let timeout = get_env_or_default("BOOKSTORE_REQUEST_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS);
        let api = ApiConfig::new(&base_url, parse_timeout(&timeout)?)?;

        let state_dir = PathBuf::from(get_env_or_default("BOOKSTORE_STATE_DIR", DEFAULT_STATE_DIR));
        let currency = get_env_or_default("BOOKSTORE_CURRENCY", "VND")
            .parse::<CurrencyCode>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("BOOKSTORE_CURRENCY".to_string(), e.to_string())
            })?;

        Ok(Self {
            api,
            state_dir,
            currency,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }
}

impl ApiConfig {
    /// Build API settings from a base URL string.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if the URL does not parse, is not
    /// http(s), or if the timeout is zero.
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self, ConfigError> {
        if request_timeout.is_zero() {
            return Err(ConfigError::InvalidEnvVar(
                "BOOKSTORE_REQUEST_TIMEOUT_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            base_url: parse_api_url(base_url)?,
            request_timeout,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable, treating empty values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse the API base URL, normalizing it to end with `/`.
fn parse_api_url(raw: &str) -> Result<Url, ConfigError> {
    let invalid = |msg: String| ConfigError::InvalidEnvVar("BOOKSTORE_API_URL".to_string(), msg);

    let mut url = Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    if url.cannot_be_a_base() {
        return Err(invalid("must be an absolute URL".to_string()));
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url.set_query(None);
    url.set_fragment(None);

    Ok(url)
}

/// Parse a timeout given in whole seconds.
fn parse_timeout(raw: &str) -> Result<Duration, ConfigError> {
    raw.trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|e| {
            ConfigError::InvalidEnvVar("BOOKSTORE_REQUEST_TIMEOUT_SECS".to_string(), e.to_string())
        })
}
