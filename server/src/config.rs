//! Configuration module for environment variable parsing.
//!
//! Reads all configuration from environment variables. A `.env` file in the
//! working directory is loaded first by the binary when present.

use std::env;
use tracing::warn;

/// Default port when `PORT` is unset.
pub const DEFAULT_PORT: u16 = 3000;

/// Default signature timestamp tolerance (5 minutes).
pub const DEFAULT_WEBHOOK_TOLERANCE_SECS: u64 = 300;

/// Database used when neither `MONGODB_DATABASE` nor the URL names one.
pub const DEFAULT_DATABASE: &str = "hotel-booking";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// MongoDB connection string. Required; startup fails without it.
    pub mongodb_url: Option<String>,

    /// Explicit database name, overriding the one in the connection string
    pub mongodb_database: Option<String>,

    /// Clerk (Svix) webhook signing secret, usually prefixed with `whsec_`
    pub clerk_webhook_secret: Option<String>,

    /// Maximum clock skew in seconds accepted for webhook timestamps
    pub webhook_tolerance_secs: u64,

    /// Port for the web server to listen on
    pub port: u16,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Config {
            mongodb_url: non_empty("MONGODB_URL"),

            mongodb_database: non_empty("MONGODB_DATABASE"),

            clerk_webhook_secret: non_empty("CLERK_WEBHOOK_SECRET"),

            webhook_tolerance_secs: parse_or("WEBHOOK_TOLERANCE_SECONDS", DEFAULT_WEBHOOK_TOLERANCE_SECS),

            port: parse_or("PORT", DEFAULT_PORT),
        }
    }

    /// Whether a usable webhook secret is configured.
    pub fn webhook_secret_configured(&self) -> bool {
        self.clerk_webhook_secret
            .as_ref()
            .map(|s| !s.trim().is_empty())
            .unwrap_or(false)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            mongodb_url: None,
            mongodb_database: None,
            clerk_webhook_secret: None,
            webhook_tolerance_secs: DEFAULT_WEBHOOK_TOLERANCE_SECS,
            port: DEFAULT_PORT,
        }
    }
}

/// Read a variable, treating blank values as unset.
fn non_empty(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse a variable, falling back to `default` when unset or malformed.
fn parse_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    let raw = match env::var(name) {
        Ok(v) => v,
        Err(_) => return default,
    };

    match raw.trim().parse() {
        Ok(v) => v,
        Err(_) => {
            warn!(env_var = name, value = %raw, "Invalid value, using default");
            default
        }
    }
}
