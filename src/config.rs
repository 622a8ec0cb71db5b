//! Process-wide configuration, loaded once at startup from the environment.

use crate::error::AppError;
use std::time::Duration;

/// Runtime configuration for the config-file serving cache.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Socket address the HTTP server binds to.
    pub bind_addr: String,
    /// Topic name the invalidator subscribes to on the release message bus.
    pub release_topic: String,
    /// Maximum total cache weight, in UTF-8 characters of rendered payload.
    pub max_cache_weight: u64,
    /// Time-to-live applied to every cache entry at write time.
    pub write_ttl: Duration,
}

impl AppConfig {
    /// Loads configuration from environment variables, applying defaults for
    /// anything unset. Reads a `.env` file in the current directory if present.
    pub fn from_env() -> std::result::Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        let release_topic =
            std::env::var("RELEASE_TOPIC").unwrap_or_else(|_| "config-release".to_string());

        let max_cache_weight = std::env::var("MAX_CACHE_WEIGHT_BYTES")
            .unwrap_or_else(|_| "52428800".to_string())
            .parse::<u64>()
            .map_err(|e| AppError::Config(format!("MAX_CACHE_WEIGHT_BYTES: {e}")))?;

        let write_ttl_minutes = std::env::var("WRITE_TTL_MINUTES")
            .unwrap_or_else(|_| "30".to_string())
            .parse::<u64>()
            .map_err(|e| AppError::Config(format!("WRITE_TTL_MINUTES: {e}")))?;

        Ok(Self {
            bind_addr,
            release_topic,
            max_cache_weight,
            write_ttl: Duration::from_secs(write_ttl_minutes * 60),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Both defaults and overrides are asserted in one test, sequentially on
    // the same process-global env vars: `cargo test` runs tests in a module
    // concurrently by default, and two tests each mutating `BIND_ADDR`/
    // `WRITE_TTL_MINUTES` via `std::env::set_var`/`remove_var` would race.
    #[test]
    fn defaults_then_env_var_overrides() {
        std::env::remove_var("BIND_ADDR");
        std::env::remove_var("RELEASE_TOPIC");
        std::env::remove_var("MAX_CACHE_WEIGHT_BYTES");
        std::env::remove_var("WRITE_TTL_MINUTES");

        let defaults = AppConfig::from_env().unwrap();
        assert_eq!(defaults.bind_addr, "0.0.0.0:8080");
        assert_eq!(defaults.release_topic, "config-release");
        assert_eq!(defaults.max_cache_weight, 52_428_800);
        assert_eq!(defaults.write_ttl, Duration::from_secs(1800));

        std::env::set_var("BIND_ADDR", "127.0.0.1:9000");
        std::env::set_var("WRITE_TTL_MINUTES", "5");

        let overridden = AppConfig::from_env().unwrap();
        assert_eq!(overridden.bind_addr, "127.0.0.1:9000");
        assert_eq!(overridden.write_ttl, Duration::from_secs(300));

        std::env::remove_var("BIND_ADDR");
        std::env::remove_var("WRITE_TTL_MINUTES");
    }
}
