use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use chrono::Duration;

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
    "secret",
];

const DEFAULT_TOKEN_TTL_HOURS: i64 = 24 * 30;

pub struct Config {
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub host: String,
    pub port: u16,
    pub token_ttl: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let jwt_secret = get("BAZAAR_JWT_SECRET").unwrap_or_default();
        if jwt_secret.trim().is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("BAZAAR_JWT_SECRET is unset or still a placeholder; set it in .env and restart");
        }

        let db_path: PathBuf = get("BAZAAR_DB_PATH")
            .filter(|v| !v.trim().is_empty())
            .context("BAZAAR_DB_PATH is required")?
            .into();

        let host = get("BAZAAR_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = get("BAZAAR_PORT")
            .unwrap_or_else(|| "3000".into())
            .parse()
            .context("BAZAAR_PORT must be a port number")?;

        let ttl_hours: i64 = match get("BAZAAR_TOKEN_TTL_HOURS") {
            Some(raw) => raw
                .parse()
                .context("BAZAAR_TOKEN_TTL_HOURS must be a whole number of hours")?,
            None => DEFAULT_TOKEN_TTL_HOURS,
        };
        if ttl_hours <= 0 {
            bail!("BAZAAR_TOKEN_TTL_HOURS must be positive");
        }

        Ok(Self {
            db_path,
            jwt_secret,
            host,
            port,
            token_ttl: Duration::hours(ttl_hours),
        })
    }
}
