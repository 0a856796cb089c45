use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub recognition_base_url: String,
    pub recognition_timeout_secs: u64,
    pub blob_root: String,
    pub jwt_secret: String,
    pub jwt_issuer: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            recognition_base_url: env::var("RECOGNITION_BASE_URL")
                .context("RECOGNITION_BASE_URL must be set")?,
            recognition_timeout_secs: env::var("RECOGNITION_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .context("RECOGNITION_TIMEOUT_SECS must be a valid number")?,
            blob_root: env::var("BLOB_ROOT").unwrap_or_else(|_| "./data/receipts".to_string()),
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            jwt_issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| "receipt-scanner".to_string()),
        })
    }
}
