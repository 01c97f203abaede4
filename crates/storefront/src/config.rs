//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SALEOR_API_URL` - Saleor GraphQL endpoint (e.g., <https://shop.saleor.cloud/graphql/>)
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `DEFAULT_CHANNEL` - Channel used when a request names none (default: default-channel)
//! - `CART_CACHE_TTL_SECS` - Cart snapshot freshness window (default: 30)
//! - `CHECKOUT_COOKIE_MAX_AGE_DAYS` - Checkout ID cookie lifetime (default: 30)
//! - `CHECKOUT_URL` - Hosted checkout base URL (default: `{STOREFRONT_BASE_URL}/checkout`)
//! - `SALEOR_APP_TOKEN` - Server-side token used when the shopper is anonymous
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error event sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.0)

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use baxoq_core::ChannelSlug;
use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const DEFAULT_CACHE_TTL_SECS: u64 = 30;
const DEFAULT_COOKIE_MAX_AGE_DAYS: i64 = 30;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Channel used when a request does not name one
    pub default_channel: ChannelSlug,
    /// Saleor API configuration
    pub saleor: SaleorConfig,
    /// Cart cache and cookie settings
    pub cart: CartConfig,
    /// Hosted checkout base URL
    pub checkout_url: Url,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g. production, staging)
    pub sentry_environment: Option<String>,
    /// Fraction of error events sent to Sentry
    pub sentry_sample_rate: f32,
    /// Fraction of transactions traced
    pub sentry_traces_sample_rate: f32,
}

/// Saleor API configuration.
///
/// Implements `Debug` manually to redact the app token.
#[derive(Clone)]
pub struct SaleorConfig {
    /// GraphQL endpoint
    pub api_url: Url,
    /// Server-side app token (optional)
    pub app_token: Option<SecretString>,
}

impl std::fmt::Debug for SaleorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SaleorConfig")
            .field("api_url", &self.api_url.as_str())
            .field(
                "app_token",
                &self.app_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// Cart cache and checkout cookie settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartConfig {
    /// How long a cached snapshot counts as fresh
    pub cache_ttl: Duration,
    /// Lifetime of the `checkoutId-<channel>` cookie
    pub cookie_max_age: time::Duration,
}

impl Default for CartConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            cookie_max_age: time::Duration::days(DEFAULT_COOKIE_MAX_AGE_DAYS),
        }
    }
}

impl StorefrontConfig {
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

        let host = parse_env("STOREFRONT_HOST", "127.0.0.1")?;
        let port = parse_env("STOREFRONT_PORT", "3000")?;
        let base_url = get_required_env("STOREFRONT_BASE_URL")?;
        let default_channel = parse_env("DEFAULT_CHANNEL", "default-channel")?;
        let saleor = SaleorConfig::from_env()?;
        let cart = CartConfig::from_env()?;
        let checkout_url = match get_optional_env("CHECKOUT_URL") {
            Some(url) => parse_url("CHECKOUT_URL", &url)?,
            None => parse_url(
                "STOREFRONT_BASE_URL",
                &format!("{}/checkout", base_url.trim_end_matches('/')),
            )?,
        };
        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = parse_env("SENTRY_SAMPLE_RATE", "1.0")?;
        let sentry_traces_sample_rate = parse_env("SENTRY_TRACES_SAMPLE_RATE", "0.0")?;

        Ok(Self {
            host,
            port,
            base_url,
            default_channel,
            saleor,
            cart,
            checkout_url,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the storefront is served over HTTPS (cookies get `Secure`).
    #[must_use]
    pub fn is_https(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl SaleorConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let api_url = parse_url("SALEOR_API_URL", &get_required_env("SALEOR_API_URL")?)?;
        Ok(Self {
            api_url,
            app_token: get_optional_env("SALEOR_APP_TOKEN").map(SecretString::from),
        })
    }
}

impl CartConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let ttl_secs: u64 = parse_env("CART_CACHE_TTL_SECS", &DEFAULT_CACHE_TTL_SECS.to_string())?;
        let max_age_days: i64 = parse_env(
            "CHECKOUT_COOKIE_MAX_AGE_DAYS",
            &DEFAULT_COOKIE_MAX_AGE_DAYS.to_string(),
        )?;
        if max_age_days <= 0 {
            return Err(ConfigError::InvalidEnvVar(
                "CHECKOUT_COOKIE_MAX_AGE_DAYS".to_string(),
                "must be positive".to_string(),
            ));
        }
        Ok(Self {
            cache_ttl: Duration::from_secs(ttl_secs),
            cookie_max_age: time::Duration::days(max_age_days),
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

/// Parse an environment variable, falling back to a default.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

fn parse_url(key: &str, value: &str) -> Result<Url, ConfigError> {
    Url::parse(value).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}
