//! Controller configuration

use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Annotations consulted on watched resources
pub mod annotations {
    /// Selects which controller owns an ingress; absence means opt-in.
    pub const INGRESS_CLASS: &str = "kubernetes.io/ingress.class";
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value}")]
    InvalidValue { var: String, value: String },
}

/// Controller configuration, loaded from the environment.
///
/// A value per controller instance rather than process-global state, so test
/// code can shrink the resync interval without touching the environment.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ControllerConfig {
    /// Gateway admin API base URL.
    pub admin_url: String,

    /// Ingress class this controller owns.
    pub ingress_class: String,

    /// Period of both the dispatcher's full resync and the reaper sweep.
    pub full_resync_seconds: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            admin_url: "http://kong-admin:8001".to_string(),
            ingress_class: "kong".to_string(),
            full_resync_seconds: 60,
        }
    }
}

impl ControllerConfig {
    /// Load configuration from `KONG_ADMIN_URL`, `KONG_INGRESS_CLASS`, and
    /// `KONG_FULL_RESYNC_SECONDS`, defaulting anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(value) = env::var("KONG_ADMIN_URL") {
            config.admin_url = value;
        }

        if let Ok(value) = env::var("KONG_INGRESS_CLASS") {
            config.ingress_class = value;
        }

        if let Ok(value) = env::var("KONG_FULL_RESYNC_SECONDS") {
            config.full_resync_seconds =
                value.parse().map_err(|_| ConfigError::InvalidValue {
                    var: "KONG_FULL_RESYNC_SECONDS".to_string(),
                    value,
                })?;
        }

        Ok(config)
    }

    pub fn full_resync_interval(&self) -> Duration {
        Duration::from_secs(self.full_resync_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ControllerConfig::default();
        assert_eq!(config.admin_url, "http://kong-admin:8001");
        assert_eq!(config.ingress_class, "kong");
        assert_eq!(config.full_resync_interval(), Duration::from_secs(60));
    }

    #[test]
    fn test_config_roundtrips_through_serde() {
        let config = ControllerConfig {
            admin_url: "http://localhost:8001".to_string(),
            ingress_class: "kong-staging".to_string(),
            full_resync_seconds: 5,
        };

        let json = serde_json::to_string(&config).expect("config should serialize");
        let parsed: ControllerConfig =
            serde_json::from_str(&json).expect("config should deserialize");
        assert_eq!(parsed.ingress_class, "kong-staging");
        assert_eq!(parsed.full_resync_seconds, 5);
    }
}
