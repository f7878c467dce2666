//! Storefront client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional; defaults match the storefront templates.
//!
//! - `FERRAMAS_BASE_URL` - Storefront origin (default: <http://127.0.0.1:8000>)
//! - `FERRAMAS_CART_KEY` - Local-storage slot holding the cart (default: `cart`)
//! - `FERRAMAS_VOUCHER_KEY` - Session-storage slot for the receipt (default: `voucherData`)
//! - `FERRAMAS_PAYMENT_PATH` - Payment endpoint path (default: `/pagos/procesar/`)
//! - `FERRAMAS_CSRF_COOKIE` - Cookie carrying the CSRF token (default: `csrftoken`)
//! - `FERRAMAS_CURRENCY` - Currency symbol shown in the cart panel (default: `$`)
//! - `FERRAMAS_FEEDBACK_MS` - Feedback toast lifetime (default: 2000)
//! - `FERRAMAS_ANIMATION_MS` - Cart panel close animation (default: 200)
//! - `FERRAMAS_REDIRECT_MS` - Delay before the payment redirect (default: 1500)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
const DEFAULT_FEEDBACK_MS: u64 = 2000;
const DEFAULT_ANIMATION_MS: u64 = 200;
const DEFAULT_REDIRECT_MS: u64 = 1500;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Storefront origin used to resolve the payment endpoint
    pub base_url: String,
    /// Local-storage key of the cart slot
    pub cart_key: String,
    /// Session-storage key of the receipt slot
    pub voucher_key: String,
    /// Path of the payment endpoint, relative to `base_url`
    pub payment_path: String,
    /// Name of the cookie carrying the CSRF token
    pub csrf_cookie: String,
    /// Currency symbol used by the cart panel
    pub currency: String,
    /// Confirmation prompt shown before emptying the cart
    pub confirm_clear_message: String,
    /// Placeholder rendered when the cart has no items
    pub empty_cart_message: String,
    /// How long a feedback toast stays on screen
    pub feedback_duration: Duration,
    /// Cart panel close animation length
    pub animation_duration: Duration,
    /// Delay before navigating to an external payment page
    pub redirect_delay: Duration,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            cart_key: "cart".to_string(),
            voucher_key: "voucherData".to_string(),
            payment_path: "/pagos/procesar/".to_string(),
            csrf_cookie: "csrftoken".to_string(),
            currency: "$".to_string(),
            confirm_clear_message: "¿Estás seguro de que quieres vaciar el carrito?".to_string(),
            empty_cart_message: "Carrito vacío".to_string(),
            feedback_duration: Duration::from_millis(DEFAULT_FEEDBACK_MS),
            animation_duration: Duration::from_millis(DEFAULT_ANIMATION_MS),
            redirect_delay: Duration::from_millis(DEFAULT_REDIRECT_MS),
            sentry_dsn: None,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let defaults = Self::default();

        let base_url = get_env_or_default("FERRAMAS_BASE_URL", DEFAULT_BASE_URL);
        Url::parse(&base_url).map_err(|e| {
            ConfigError::InvalidEnvVar("FERRAMAS_BASE_URL".to_string(), e.to_string())
        })?;

        Ok(Self {
            base_url,
            cart_key: get_non_empty_env("FERRAMAS_CART_KEY", &defaults.cart_key)?,
            voucher_key: get_non_empty_env("FERRAMAS_VOUCHER_KEY", &defaults.voucher_key)?,
            payment_path: get_non_empty_env("FERRAMAS_PAYMENT_PATH", &defaults.payment_path)?,
            csrf_cookie: get_non_empty_env("FERRAMAS_CSRF_COOKIE", &defaults.csrf_cookie)?,
            currency: get_env_or_default("FERRAMAS_CURRENCY", &defaults.currency),
            feedback_duration: get_millis("FERRAMAS_FEEDBACK_MS", DEFAULT_FEEDBACK_MS)?,
            animation_duration: get_millis("FERRAMAS_ANIMATION_MS", DEFAULT_ANIMATION_MS)?,
            redirect_delay: get_millis("FERRAMAS_REDIRECT_MS", DEFAULT_REDIRECT_MS)?,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            ..defaults
        })
    }

    /// Absolute URL of the payment endpoint.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if the base URL is malformed or
    /// the path cannot be joined onto it.
    pub fn payment_endpoint(&self) -> Result<Url, ConfigError> {
        let base = Url::parse(&self.base_url).map_err(|e| {
            ConfigError::InvalidEnvVar("FERRAMAS_BASE_URL".to_string(), e.to_string())
        })?;
        base.join(&self.payment_path).map_err(|e| {
            ConfigError::InvalidEnvVar("FERRAMAS_PAYMENT_PATH".to_string(), e.to_string())
        })
    }

    /// Path of the receipt page for a voucher.
    #[must_use]
    pub fn voucher_path(voucher_id: &str) -> String {
        format!("/pagos/voucher/{}/", urlencoding::encode(voucher_id))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get an environment variable that must not be blank when set.
fn get_non_empty_env(key: &str, default: &str) -> Result<String, ConfigError> {
    let value = get_env_or_default(key, default);
    if value.trim().is_empty() {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must not be empty".to_string(),
        ));
    }
    Ok(value)
}

/// Get a duration in milliseconds.
fn get_millis(key: &str, default: u64) -> Result<Duration, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => parse_millis(key, &raw),
        Err(_) => Ok(Duration::from_millis(default)),
    }
}

fn parse_millis(key: &str, raw: &str) -> Result<Duration, ConfigError> {
    raw.trim()
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}
