//! Application configuration loaded from environment variables.

use crate::errors::{ApiError, Result};

#[derive(Debug, Clone)]
pub struct Config {
    /// Identity granted the platform authority role at startup
    pub authority_id: String,
    /// Endpoint that executes payouts (`POST {to, amount}`)
    pub payout_url: String,
    /// Path to the SQLite event journal
    pub database_url: String,
    /// Port for the REST API server
    pub api_port: u16,
    /// Per-request timeout for the payout endpoint
    pub payout_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let authority_id = env_var("AUTHORITY_ID").map_err(|_| {
            ApiError::Config("AUTHORITY_ID environment variable is required".to_string())
        })?;
        if authority_id.trim().is_empty() {
            return Err(ApiError::Config("AUTHORITY_ID must not be empty".to_string()));
        }

        Ok(Config {
            authority_id,
            payout_url: env_var("PAYOUT_URL").map_err(|_| {
                ApiError::Config("PAYOUT_URL environment variable is required".to_string())
            })?,
            database_url: env_var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:./escrow_events.db".to_string()),
            api_port: env_var("API_PORT")
                .unwrap_or_else(|_| "3001".to_string())
                .parse()
                .map_err(|_| ApiError::Config("Invalid API_PORT".to_string()))?,
            payout_timeout_secs: env_var("PAYOUT_TIMEOUT_SECS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .map_err(|_| ApiError::Config("Invalid PAYOUT_TIMEOUT_SECS".to_string()))?,
        })
    }
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| ApiError::Config(format!("Missing env var: {key}")))
}
