pub mod rate_limits;

use anyhow::{anyhow, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::net::SocketAddr;
use std::str::FromStr;

use crate::app::policy::{INTERPRETATION_HIDE_THRESHOLD, REPLY_HIDE_THRESHOLD};
use crate::config::rate_limits::RateLimits;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "postgres" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => Err(format!("unknown store backend {}", other)),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub http_addr: String,
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub db_connect_timeout_seconds: u64,
    pub db_idle_timeout_seconds: u64,
    pub db_max_lifetime_seconds: u64,
    /// Rate limiting is off when unset.
    pub redis_url: Option<String>,
    pub session_key: [u8; 32],
    pub session_issuer: String,
    pub admin_token: Option<String>,
    pub interpretation_hide_threshold: i64,
    pub reply_hide_threshold: i64,
    pub rate_limits: RateLimits,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let http_addr = env_or("HTTP_ADDR", "0.0.0.0:8080");
        let _parsed_http_addr = SocketAddr::from_str(&http_addr)
            .map_err(|err| anyhow!("invalid HTTP_ADDR: {}", err))?;

        let store_backend: StoreBackend = env_or_parse("STORE_BACKEND", "postgres")?;
        let database_url = std::env::var("DATABASE_URL").ok();
        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            return Err(anyhow!("missing required env var: DATABASE_URL"));
        }

        let defaults = RateLimits::default();
        let rate_limits = RateLimits {
            votes_per_hour: env_or_parse("VOTES_PER_HOUR", &defaults.votes_per_hour.to_string())?,
            flags_per_hour: env_or_parse("FLAGS_PER_HOUR", &defaults.flags_per_hour.to_string())?,
            replies_per_hour: env_or_parse(
                "REPLIES_PER_HOUR",
                &defaults.replies_per_hour.to_string(),
            )?,
            interpretations_per_day: env_or_parse(
                "INTERPRETATIONS_PER_DAY",
                &defaults.interpretations_per_day.to_string(),
            )?,
        };

        Ok(Self {
            http_addr,
            store_backend,
            database_url,
            db_max_connections: env_or_parse("DB_MAX_CONNECTIONS", "25")?,
            db_connect_timeout_seconds: env_or_parse("DB_CONNECT_TIMEOUT_SECONDS", "5")?,
            db_idle_timeout_seconds: env_or_parse("DB_IDLE_TIMEOUT_SECONDS", "300")?,
            db_max_lifetime_seconds: env_or_parse("DB_MAX_LIFETIME_SECONDS", "1800")?,
            redis_url: std::env::var("REDIS_URL").ok(),
            session_key: env_key_32("SESSION_KEY")?,
            session_issuer: env_or("SESSION_ISSUER", "lions"),
            admin_token: std::env::var("ADMIN_TOKEN").ok(),
            interpretation_hide_threshold: env_or_parse(
                "INTERPRETATION_HIDE_THRESHOLD",
                &INTERPRETATION_HIDE_THRESHOLD.to_string(),
            )?,
            reply_hide_threshold: env_or_parse(
                "REPLY_HIDE_THRESHOLD",
                &REPLY_HIDE_THRESHOLD.to_string(),
            )?,
            rate_limits,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_or_err(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| anyhow!("missing required env var: {}", key))
}

fn env_or_parse<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    <T as FromStr>::Err: std::fmt::Display,
{
    let value = std::env::var(key).unwrap_or_else(|_| default.to_string());
    value
        .parse::<T>()
        .map_err(|err| anyhow!("invalid {}: {}", key, err))
}

fn env_key_32(key: &str) -> Result<[u8; 32]> {
    let value = env_or_err(key)?;
    decode_key_32(key, &value)
}

fn decode_key_32(key: &str, value: &str) -> Result<[u8; 32]> {
    let decoded = STANDARD
        .decode(value.as_bytes())
        .map_err(|err| anyhow!("invalid {}: {}", key, err))?;
    if decoded.len() != 32 {
        return Err(anyhow!("invalid {}: expected 32 bytes", key));
    }
    let mut key_bytes = [0u8; 32];
    key_bytes.copy_from_slice(&decoded);
    Ok(key_bytes)
}
