//! Configuration management for the server.

use micro_engine::EnsureOptions;
use std::env;

/// Longest accepted token lifetime: ten years.
pub const MAX_TOKEN_TTL_SECS: i64 = 10 * 365 * 86_400;

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Where unauthenticated clients are sent to log in
    pub auth_url: String,
    /// Human-readable name of the login provider
    pub auth_text: String,
    /// Log every index synchronization step
    pub ensure_indexes_loud: bool,
    /// Drop and recreate indexes whose options changed
    pub ensure_indexes_overwrite: bool,
    /// Lifetime of newly issued API tokens, in seconds
    pub token_ttl_secs: i64,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());

        let port = lookup("PORT")
            .unwrap_or_else(|| "5000".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidPort)?;

        let auth_url = lookup("AUTH_URL").unwrap_or_else(|| "/login".to_string());
        let auth_text = lookup("AUTH_TEXT").unwrap_or_else(|| "external auth".to_string());

        let ensure_indexes_loud = flag(&lookup, "ENSURE_INDEXES_LOUD")?;
        let ensure_indexes_overwrite = flag(&lookup, "ENSURE_INDEXES_OVERWRITE")?;

        let token_ttl_secs = match lookup("TOKEN_TTL_SECS") {
            Some(raw) => raw
                .parse()
                .ok()
                .filter(|ttl: &i64| (1..=MAX_TOKEN_TTL_SECS).contains(ttl))
                .ok_or(ConfigError::InvalidTokenTtl)?,
            None => 86_400,
        };

        Ok(Self {
            host,
            port,
            auth_url,
            auth_text,
            ensure_indexes_loud,
            ensure_indexes_overwrite,
            token_ttl_secs,
        })
    }

    /// Index synchronization flags.
    pub fn ensure_options(&self) -> EnsureOptions {
        EnsureOptions::default()
            .loud(self.ensure_indexes_loud)
            .overwrite(self.ensure_indexes_overwrite)
    }
}

fn flag(lookup: &impl Fn(&str) -> Option<String>, name: &'static str) -> Result<bool, ConfigError> {
    let Some(raw) = lookup(name) else {
        return Ok(false);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidFlag(name)),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid PORT value")]
    InvalidPort,

    #[error("Invalid boolean value for {0}")]
    InvalidFlag(&'static str),

    #[error("TOKEN_TTL_SECS must be between 1 and {} seconds", MAX_TOKEN_TTL_SECS)]
    InvalidTokenTtl,
}
