use anyhow::Result;
use dotenvy::dotenv;
use secrecy::Secret;
use serde::Deserialize;
use service_core::config::{env_or, env_parse_or, env_required};

#[derive(Deserialize, Clone, Debug)]
pub struct SettlementConfig {
    pub service_name: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub database: DatabaseConfig,
    pub business: BusinessConfig,
}

#[derive(Deserialize, Clone, Debug)]
pub struct DatabaseConfig {
    pub url: Secret<String>,
    pub db_name: String,
}

/// Business rules that vary by deployment region.
#[derive(Deserialize, Clone, Copy, Debug)]
pub struct BusinessConfig {
    /// Offset in minutes applied when bucketing bills into business dates.
    pub timezone_offset_minutes: i64,
    /// A client created within this window counts as new on the dashboard.
    pub new_client_window_hours: i64,
}

impl Default for BusinessConfig {
    fn default() -> Self {
        Self {
            timezone_offset_minutes: 330,
            new_client_window_hours: 24,
        }
    }
}

impl SettlementConfig {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let db_url = env_required("SETTLEMENT_DATABASE_URL")?;
        let db_name = env_or("SETTLEMENT_DATABASE_NAME", "settlement_db");

        Ok(Self {
            service_name: "settlement-service".to_string(),
            log_level: env_or("SETTLEMENT_LOG_LEVEL", "info"),
            otlp_endpoint: std::env::var("SETTLEMENT_OTLP_ENDPOINT").ok(),
            database: DatabaseConfig {
                url: Secret::new(db_url),
                db_name,
            },
            business: BusinessConfig {
                timezone_offset_minutes: env_parse_or("SETTLEMENT_TZ_OFFSET_MINUTES", 330),
                new_client_window_hours: env_parse_or("SETTLEMENT_NEW_CLIENT_WINDOW_HOURS", 24),
            },
        })
    }
}
