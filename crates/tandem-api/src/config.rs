use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub db_path: String,
    pub shopify_store_domain: String,
    pub shopify_admin_api_token: String,
    pub shopify_api_version: String,
    pub session_ttl: Duration,
    pub cors_origin: String,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AppConfig")
            .field("bind_addr", &self.bind_addr)
            .field("db_path", &self.db_path)
            .field("shopify_store_domain", &self.shopify_store_domain)
            .field("shopify_admin_api_token", &"[REDACTED]")
            .field("shopify_api_version", &self.shopify_api_version)
            .field("session_ttl", &self.session_ttl)
            .field("cors_origin", &self.cors_origin)
            .finish()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_addr = value_or_default(&lookup, "TANDEM_BIND_ADDR", "127.0.0.1:3000");
        let db_path = required_trimmed(&lookup, "TANDEM_DB_PATH")?;

        let shopify_store_domain = required_trimmed(&lookup, "SHOPIFY_STORE_DOMAIN")?;
        let shopify_admin_api_token = required_trimmed(&lookup, "SHOPIFY_ADMIN_API_TOKEN")?;
        let shopify_api_version = value_or_default(
            &lookup,
            "SHOPIFY_API_VERSION",
            tandem_core::shopify::DEFAULT_API_VERSION,
        );

        let session_ttl_secs = value_or_default(&lookup, "TANDEM_SESSION_TTL_SECS", "86400")
            .parse::<u64>()
            .map_err(|_| {
                ConfigError::Invalid(
                    "TANDEM_SESSION_TTL_SECS must be an integer in [300, 2592000]".to_string(),
                )
            })?;
        if !(300..=2_592_000).contains(&session_ttl_secs) {
            return Err(ConfigError::Invalid(
                "TANDEM_SESSION_TTL_SECS must be in [300, 2592000]".to_string(),
            ));
        }

        let cors_origin = value_or_default(&lookup, "TANDEM_CORS_ORIGIN", "http://localhost:4200");
        if !is_http_url(&cors_origin) {
            return Err(ConfigError::Invalid(
                "TANDEM_CORS_ORIGIN must start with http:// or https://".to_string(),
            ));
        }

        Ok(Self {
            bind_addr,
            db_path,
            shopify_store_domain,
            shopify_admin_api_token,
            shopify_api_version,
            session_ttl: Duration::from_secs(session_ttl_secs),
            cors_origin,
        })
    }
}

fn value_or_default(lookup: impl Fn(&str) -> Option<String>, name: &str, default: &str) -> String {
    optional_trimmed(lookup, name).unwrap_or_else(|| default.to_string())
}

fn required_trimmed(
    lookup: impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<String, ConfigError> {
    optional_trimmed(lookup, name).ok_or(ConfigError::MissingVar(name))
}

fn optional_trimmed(lookup: impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name).and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}
