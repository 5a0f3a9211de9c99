use std::env;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow, bail};
use chrono::FixedOffset;
use dotenvy::dotenv;
use strum_macros::EnumString;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum StorageBackend {
    #[strum(serialize = "mysql")]
    MySql,
    #[strum(serialize = "memory")]
    Memory,
}

#[derive(Clone)]
pub struct Config {
    pub server_addr: String,
    pub storage_backend: StorageBackend,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub run_migrations: bool,

    pub jwt_secret: String,
    pub access_token_ttl: usize,
    pub refresh_token_ttl: usize,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_register_per_min: u32,
    pub rate_refresh_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,

    pub password_hash_memory_kib: u32,
    pub password_hash_iterations: u32,

    /// Offset used to cut report windows (day, week, month).
    pub report_offset: FixedOffset,

    pub log_dir: String,
    pub log_level: tracing::Level,

    pub bootstrap_owner: Option<BootstrapOwner>,
}

#[derive(Clone)]
pub struct BootstrapOwner {
    pub email: String,
    pub password: String,
    pub full_name: String,
}

fn var_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("{} has an invalid value '{}': {}", key, raw, e)),
        Err(_) => Ok(default),
    }
}

fn optional_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let storage_backend = var_or("STORAGE_BACKEND", StorageBackend::MySql)?;
        let database_url = optional_var("DATABASE_URL");
        if storage_backend == StorageBackend::MySql && database_url.is_none() {
            bail!("DATABASE_URL must be set when STORAGE_BACKEND=mysql");
        }

        let offset_minutes: i32 = var_or("REPORT_UTC_OFFSET_MINUTES", 0)?;
        let report_offset = FixedOffset::east_opt(offset_minutes * 60)
            .with_context(|| format!("REPORT_UTC_OFFSET_MINUTES out of range: {}", offset_minutes))?;

        let bootstrap_owner = match (
            optional_var("BOOTSTRAP_OWNER_EMAIL"),
            optional_var("BOOTSTRAP_OWNER_PASSWORD"),
        ) {
            (Some(email), Some(password)) => Some(BootstrapOwner {
                email,
                password,
                full_name: optional_var("BOOTSTRAP_OWNER_NAME")
                    .unwrap_or_else(|| "Owner".to_string()),
            }),
            (None, None) => None,
            _ => bail!("BOOTSTRAP_OWNER_EMAIL and BOOTSTRAP_OWNER_PASSWORD must be set together"),
        };

        Ok(Self {
            server_addr: var_or("SERVER_ADDR", "127.0.0.1:8080".to_string())?,
            storage_backend,
            database_url,
            db_max_connections: var_or("DB_MAX_CONNECTIONS", 10)?,
            run_migrations: var_or("RUN_MIGRATIONS", true)?,

            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            access_token_ttl: var_or("ACCESS_TOKEN_TTL", 900)?, // default 15 min
            refresh_token_ttl: var_or("REFRESH_TOKEN_TTL", 604_800)?, // default 7 days

            rate_login_per_min: var_or("RATE_LOGIN_PER_MIN", 60)?,
            rate_register_per_min: var_or("RATE_REGISTER_PER_MIN", 30)?,
            rate_refresh_per_min: var_or("RATE_REFRESH_PER_MIN", 30)?,
            rate_protected_per_min: var_or("RATE_PROTECTED_PER_MIN", 1000)?,

            api_prefix: var_or("API_PREFIX", "/api".to_string())?,

            password_hash_memory_kib: var_or("PASSWORD_HASH_MEMORY_KIB", 19_456)?,
            password_hash_iterations: var_or("PASSWORD_HASH_ITERATIONS", 2)?,

            report_offset,

            log_dir: var_or("LOG_DIR", "logs".to_string())?,
            log_level: var_or("LOG_LEVEL", tracing::Level::INFO)?,

            bootstrap_owner,
        })
    }
}

#[cfg(test)]
pub fn test_config() -> Config {
    Config {
        server_addr: "127.0.0.1:0".to_string(),
        storage_backend: StorageBackend::Memory,
        database_url: None,
        db_max_connections: 1,
        run_migrations: false,
        jwt_secret: "test-secret".to_string(),
        access_token_ttl: 900,
        refresh_token_ttl: 3600,
        rate_login_per_min: 10_000,
        rate_register_per_min: 10_000,
        rate_refresh_per_min: 10_000,
        rate_protected_per_min: 10_000,
        api_prefix: "/api".to_string(),
        password_hash_memory_kib: 64,
        password_hash_iterations: 1,
        report_offset: FixedOffset::east_opt(0).unwrap(),
        log_dir: "logs".to_string(),
        log_level: tracing::Level::DEBUG,
        bootstrap_owner: None,
    }
}
