use std::{net::SocketAddr, str::FromStr};

use anyhow::Context;

/// Runtime settings, read from the environment (and `.env` when present).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub db_max_connections: u32,
    pub room_capacity: usize,
    pub session_idle_minutes: i64,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Config> {
        dotenv::dotenv().ok();

        Ok(Config {
            database_url: var_or("DATABASE_URL", "sqlite://jobchat.db?mode=rwc"),
            bind_addr: parse_var("BIND_ADDR", "0.0.0.0:8080")?,
            db_max_connections: parse_var("DB_MAX_CONNECTIONS", "16")?,
            room_capacity: parse_var("ROOM_CAPACITY", "64")?,
            session_idle_minutes: parse_var("SESSION_IDLE_MINUTES", "60")?,
            rust_log: var_or("RUST_LOG", "info"),
        })
    }
}

fn var_or(key: &str, default: &str) -> String {
    dotenv::var(key).unwrap_or_else(|_| default.to_owned())
}

fn parse_var<T>(key: &str, default: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw = var_or(key, default);
    raw.parse()
        .with_context(|| format!("parse {key}={raw}"))
}
