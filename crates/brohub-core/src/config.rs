//! Configuration module
//!
//! Settings come from the environment with validated defaults. The delivery
//! constants (poll count, poll delay, emission throttle) are configurable per
//! environment but default to the values the registry contract assumes.

use std::env;

const REQUEST_TIMEOUT_SECS: u64 = 30;
const DELIVERY_POLL_ATTEMPTS: u32 = 4;
const DELIVERY_POLL_DELAY_SECS: u64 = 10;
const BULK_EMISSION_DELAY_SECS: u64 = 10;
const WORKER_MAX_WORKERS: usize = 4;
const WORKER_POLL_INTERVAL_MS: u64 = 1000;

/// Application configuration for the delivery hub.
#[derive(Clone, Debug)]
pub struct Config {
    /// Base URL of the Bronhouderportaal, e.g. `https://www.bronhouderportaal-bro.nl`.
    pub portal_base_url: String,
    /// Base URL of the public geometry service used by the tube-length fixup.
    pub geometry_base_url: String,
    pub request_timeout_secs: u64,
    pub delivery_poll_attempts: u32,
    pub delivery_poll_delay_secs: u64,
    pub bulk_emission_delay_secs: u64,
    pub worker_max_workers: usize,
    pub worker_poll_interval_ms: u64,
    pub environment: String,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let portal_base_url = env::var("BRONHOUDERSPORTAAL_URL")
            .map_err(|_| anyhow::anyhow!("BRONHOUDERSPORTAAL_URL must be set"))?;

        let config = Config {
            portal_base_url,
            geometry_base_url: env::var("BRO_UITGIFTE_URL")
                .unwrap_or_else(|_| "https://publiek.broservices.nl".to_string()),
            request_timeout_secs: parse_env("REQUEST_TIMEOUT_SECS", REQUEST_TIMEOUT_SECS),
            delivery_poll_attempts: parse_env("DELIVERY_POLL_ATTEMPTS", DELIVERY_POLL_ATTEMPTS),
            delivery_poll_delay_secs: parse_env(
                "DELIVERY_POLL_DELAY_SECS",
                DELIVERY_POLL_DELAY_SECS,
            ),
            bulk_emission_delay_secs: parse_env(
                "BULK_EMISSION_DELAY_SECS",
                BULK_EMISSION_DELAY_SECS,
            ),
            worker_max_workers: parse_env("WORKER_MAX_WORKERS", WORKER_MAX_WORKERS),
            worker_poll_interval_ms: parse_env("WORKER_POLL_INTERVAL_MS", WORKER_POLL_INTERVAL_MS),
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !self.portal_base_url.starts_with("http") {
            return Err(anyhow::anyhow!(
                "BRONHOUDERSPORTAAL_URL must be an absolute http(s) URL"
            ));
        }
        if self.delivery_poll_attempts == 0 {
            return Err(anyhow::anyhow!("DELIVERY_POLL_ATTEMPTS must be at least 1"));
        }
        if self.worker_max_workers == 0 {
            return Err(anyhow::anyhow!("WORKER_MAX_WORKERS must be at least 1"));
        }
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }
}

impl Default for Config {
    /// Defaults for tests and local tooling; `portal_base_url` points at the
    /// demo portal so nothing accidentally reaches production.
    fn default() -> Self {
        Config {
            portal_base_url: "https://demo.bronhouderportaal-bro.nl".to_string(),
            geometry_base_url: "https://publiek.broservices.nl".to_string(),
            request_timeout_secs: REQUEST_TIMEOUT_SECS,
            delivery_poll_attempts: DELIVERY_POLL_ATTEMPTS,
            delivery_poll_delay_secs: DELIVERY_POLL_DELAY_SECS,
            bulk_emission_delay_secs: BULK_EMISSION_DELAY_SECS,
            worker_max_workers: WORKER_MAX_WORKERS,
            worker_poll_interval_ms: WORKER_POLL_INTERVAL_MS,
            environment: "development".to_string(),
        }
    }
}

fn parse_env<T: std::str::FromStr + Copy>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_registry_contract() {
        let config = Config::default();
        assert_eq!(config.delivery_poll_attempts, 4);
        assert_eq!(config.delivery_poll_delay_secs, 10);
        assert_eq!(config.bulk_emission_delay_secs, 10);
        assert_eq!(config.request_timeout_secs, 30);
    }

    #[test]
    fn validate_rejects_zero_poll_attempts() {
        let config = Config {
            delivery_poll_attempts: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_relative_portal_url() {
        let config = Config {
            portal_base_url: "bronhouderportaal".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
