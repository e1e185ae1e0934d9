use std::{env, fmt::Display, str::FromStr};

use anyhow::{anyhow, Result};
use tracing::{info, warn};

use crate::backend::auth::password;

const DEV_JWT_SECRET: &str = "dev-only-secret-change-me";

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub db_max_connections: u32,
    pub jwt_secret: String,
    pub jwt_expires_in_hours: i64,
    pub password_hash_rounds: u32,
    pub cors_origin: String,
    pub wipe_notifications_on_boot: bool,
}

impl Config {
    pub fn load() -> Result<Self> {
        let config = Self {
            host: try_load("HOST", "127.0.0.1")?,
            port: try_load("PORT", "3000")?,
            database_url: try_load("DATABASE_URL", "sqlite://./budget_tracker.db")?,
            db_max_connections: try_load("DB_MAX_CONNECTIONS", "5")?,
            jwt_secret: load_jwt_secret(),
            jwt_expires_in_hours: try_load("JWT_EXPIRES_IN_HOURS", "72")?,
            password_hash_rounds: try_load("PASSWORD_HASH_ROUNDS", &password::DEFAULT_ROUNDS.to_string())?,
            cors_origin: try_load("CORS_ORIGIN", "*")?,
            wipe_notifications_on_boot: try_load("WIPE_NOTIFICATIONS_ON_BOOT", "true")?,
        };

        if config.password_hash_rounds == 0 {
            return Err(anyhow!("Environment misconfigured: PASSWORD_HASH_ROUNDS must be positive"));
        }
        if config.jwt_expires_in_hours <= 0 {
            return Err(anyhow!("Environment misconfigured: JWT_EXPIRES_IN_HOURS must be positive"));
        }

        Ok(config)
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T>
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .trim()
        .parse()
        .map_err(|e| {
            warn!("Invalid {key} value: {e}");
            anyhow!("Environment misconfigured: {key}: {e}")
        })
}

fn load_jwt_secret() -> String {
    var("JWT_SECRET").unwrap_or_else(|| {
        warn!("JWT_SECRET not set, using an insecure development secret");
        DEV_JWT_SECRET.to_string()
    })
}
