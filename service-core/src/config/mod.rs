use serde::Deserialize;
use std::env;

use crate::error::AppError;

/// Environment shared by every service in the fleet.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }
}

/// Read an env var with a default.
pub fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Read a required env var, surfacing a configuration error when absent.
pub fn env_required(key: &str) -> Result<String, AppError> {
    env::var(key).map_err(|_| {
        AppError::ConfigError(anyhow::anyhow!("{} must be set", key))
    })
}

/// Read and parse an env var with a default, falling back on parse failure.
pub fn env_parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_or_falls_back_to_default() {
        assert_eq!(env_or("SERVICE_CORE_TEST_UNSET_VAR", "fallback"), "fallback");
    }

    #[test]
    fn env_parse_or_falls_back_on_missing() {
        let parsed: i64 = env_parse_or("SERVICE_CORE_TEST_UNSET_NUM", 330);
        assert_eq!(parsed, 330);
    }
}
