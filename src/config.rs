use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{ArgAction, Parser};
use serde::Deserialize;

use crate::errors::ConfigError;

/// Process settings, each flag also read from the environment (and `.env`).
#[derive(Parser, Clone, Debug)]
pub struct Config {
    /// Named entry of the database config file to use.
    #[clap(env, long, default_value = "development")]
    pub environment: String,

    #[clap(env, long, default_value = "config/database.json")]
    pub database_config: PathBuf,

    #[clap(env, long, default_value = "127.0.0.1:3000")]
    pub bind_address: SocketAddr,

    /// Comma separated list of origins allowed by CORS.
    #[clap(env, long, default_value = "http://localhost:8081")]
    pub origin_urls: String,

    /// Refuse to start when the database is unreachable.
    #[clap(env, long, default_value_t = true, action = ArgAction::Set)]
    pub fail_fast: bool,

    #[clap(env, long, default_value_t = false, action = ArgAction::Set)]
    pub run_migrations: bool,

    /// Window during which a repeated reservation for the same listing and
    /// user returns the first one. 0 disables it.
    #[clap(env, long, default_value_t = 5_000)]
    pub dedup_window_ms: u64,

    #[clap(env, long, default_value_t = 10_000)]
    pub request_timeout_ms: u64,

    #[clap(env, long, default_value = "info")]
    pub log_level: String,

    /// `pretty` or `json`.
    #[clap(env, long, default_value = "pretty")]
    pub log_format: String,
}

impl Config {
    pub fn dedup_window(&self) -> Duration {
        Duration::from_millis(self.dedup_window_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

const SUPPORTED_DIALECTS: [&str; 2] = ["postgres", "postgresql"];

/// One environment entry of the database config file.
#[derive(Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseSettings {
    pub database: String,
    pub username: String,
    #[serde(default)]
    pub password: Option<String>,
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub dialect: String,
    #[serde(default)]
    pub dialect_options: DialectOptions,
    #[serde(default)]
    pub pool: PoolOptions,
}

#[derive(Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DialectOptions {
    pub connect_timeout_ms: Option<u64>,
    pub application_name: Option<String>,
    #[serde(default)]
    pub ssl: bool,
}

#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PoolOptions {
    #[serde(default = "default_pool_size")]
    pub max_size: u32,
    #[serde(default = "default_acquire_timeout_ms")]
    pub acquire_timeout_ms: u64,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            max_size: default_pool_size(),
            acquire_timeout_ms: default_acquire_timeout_ms(),
        }
    }
}

fn default_port() -> u16 {
    5432
}

fn default_pool_size() -> u32 {
    (num_cpus::get() as u32).saturating_mul(2).max(2)
}

fn default_acquire_timeout_ms() -> u64 {
    5_000
}

// Keep the password out of logs.
impl fmt::Debug for DatabaseSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseSettings")
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("host", &self.host)
            .field("port", &self.port)
            .field("dialect", &self.dialect)
            .field("dialect_options", &self.dialect_options)
            .field("pool", &self.pool)
            .finish()
    }
}

impl DatabaseSettings {
    /// Reads the config file, picks `environment`, then applies the `DB_*`
    /// environment overrides.
    pub fn load(path: &Path, environment: &str) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut settings = Self::from_json(&raw, environment)?;
        settings.apply_overrides(|key| std::env::var(key).ok())?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_json(raw: &str, environment: &str) -> Result<Self, ConfigError> {
        let mut environments: HashMap<String, DatabaseSettings> = serde_json::from_str(raw)?;
        environments
            .remove(environment)
            .ok_or_else(|| ConfigError::UnknownEnvironment(environment.to_string()))
    }

    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("DB_HOST") {
            self.host = host;
        }
        if let Some(port) = lookup("DB_PORT") {
            self.port = port.parse().map_err(|_| ConfigError::InvalidOverride {
                key: "DB_PORT".to_string(),
                value: port.clone(),
            })?;
        }
        if let Some(database) = lookup("DB_NAME") {
            self.database = database;
        }
        if let Some(username) = lookup("DB_USERNAME") {
            self.username = username;
        }
        if let Some(password) = lookup("DB_PASSWORD") {
            self.password = Some(password);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !SUPPORTED_DIALECTS.contains(&self.dialect.to_lowercase().as_str()) {
            return Err(ConfigError::UnsupportedDialect(self.dialect.clone()));
        }
        if self.dialect_options.ssl {
            return Err(ConfigError::TlsUnsupported);
        }
        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.dialect_options.connect_timeout_ms.unwrap_or(5_000))
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.pool.acquire_timeout_ms)
    }
}
