// restmigrate/src/config/mod.rs
use anyhow::{Context, Result};
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use url::Url;

use crate::errors::AppError;

pub const DEFAULT_CONFIG_PATH: &str = "migration/config.env";

const DEFAULT_PAGE_SIZE: usize = 1000;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_TARGET_PORT: u16 = 5432;
const DEFAULT_EXPORT_DIR: &str = "migration/exports";
const DEFAULT_LAST_EXPORT_FILE: &str = "migration/.last_export";
const DEFAULT_ERROR_DISPLAY_LIMIT: usize = 3;

// Secrets may come from the process environment instead of the file.
const ENV_OVERRIDABLE_KEYS: &[&str] = &["SOURCE_API_KEY", "TARGET_PASSWORD"];

/// Key/value pairs read from the `config.env` file.
#[derive(Debug, Clone, Default)]
pub struct RawEnvConfig {
    values: HashMap<String, String>,
}

impl RawEnvConfig {
    pub fn load_from_env_file(config_path: &Path) -> Result<Self> {
        if !config_path.is_file() {
            return Err(AppError::Config(format!(
                "Configuration file not found: {}",
                config_path.display()
            ))
            .into());
        }

        let iter = dotenv::from_path_iter(config_path)
            .with_context(|| format!("Failed to read config file at {}", config_path.display()))?;

        let mut values = HashMap::new();
        for item in iter {
            let (key, value) = item.map_err(|e| {
                AppError::Config(format!(
                    "Failed to parse config file at {}: {}",
                    config_path.display(),
                    e
                ))
            })?;
            values.insert(key, value);
        }

        Ok(RawEnvConfig { values })
    }

    /// Replaces secret keys with values from the process environment when set.
    pub fn with_process_env(mut self) -> Self {
        for key in ENV_OVERRIDABLE_KEYS {
            if let Ok(value) = std::env::var(key) {
                if !value.trim().is_empty() {
                    self.values.insert((*key).to_string(), value);
                }
            }
        }
        self
    }

    /// Returns the trimmed value for `key`, treating blank values as unset.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    fn require(&self, key: &str) -> Result<&str> {
        self.get(key).ok_or_else(|| {
            AppError::Config(format!("{} must be set in the configuration file", key)).into()
        })
    }

    fn parse_or<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        match self.get(key) {
            Some(value) => value.parse::<T>().map_err(|e| {
                AppError::Config(format!("Invalid value '{}' for {}: {}", value, key, e)).into()
            }),
            None => Ok(default),
        }
    }

    fn flag_or(&self, key: &str, default: bool) -> Result<bool> {
        match self.get(key).map(|v| v.to_ascii_lowercase()) {
            None => Ok(default),
            Some(v) if matches!(v.as_str(), "true" | "1" | "yes" | "on") => Ok(true),
            Some(v) if matches!(v.as_str(), "false" | "0" | "no" | "off") => Ok(false),
            Some(v) => Err(AppError::Config(format!("Invalid boolean '{}' for {}", v, key)).into()),
        }
    }
}

/// Settings for talking to the REST data API of the source table store.
#[derive(Clone)]
pub struct SourceConfig {
    pub base_url: Url,
    pub api_key: String,
    pub page_size: usize,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
}

impl fmt::Debug for SourceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceConfig")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &"<redacted>")
            .field("page_size", &self.page_size)
            .field("request_timeout", &self.request_timeout)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

/// Connection parameters for the PostgreSQL target.
#[derive(Clone)]
pub struct TargetConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    pub connect_timeout: Duration,
}

impl TargetConfig {
    /// `host:port/database`, safe to print.
    pub fn display_target(&self) -> String {
        format!("{}:{}/{}", self.host, self.port, self.database)
    }
}

impl fmt::Debug for TargetConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub tables: Vec<String>,
    pub export_root: PathBuf,
    pub last_export_file: PathBuf,
    pub error_display_limit: usize,
    pub reset_sequences: bool,
    pub raw_env_config: RawEnvConfig,
}

impl AppConfig {
    pub fn load(config_path: &Path) -> Result<Self> {
        let raw = RawEnvConfig::load_from_env_file(config_path)?.with_process_env();
        Self::from_raw(raw)
    }

    pub fn from_raw(raw_env_config: RawEnvConfig) -> Result<Self> {
        let tables = parse_table_list(raw_env_config.require("TABLES")?)?;

        Ok(AppConfig {
            tables,
            export_root: PathBuf::from(raw_env_config.get("EXPORT_DIR").unwrap_or(DEFAULT_EXPORT_DIR)),
            last_export_file: PathBuf::from(
                raw_env_config
                    .get("LAST_EXPORT_FILE")
                    .unwrap_or(DEFAULT_LAST_EXPORT_FILE),
            ),
            error_display_limit: raw_env_config
                .parse_or("ERROR_DISPLAY_LIMIT", DEFAULT_ERROR_DISPLAY_LIMIT)?,
            reset_sequences: raw_env_config.flag_or("RESET_SEQUENCES", true)?,
            raw_env_config,
        })
    }
}

pub fn load_source_config(raw_config: &RawEnvConfig) -> Result<SourceConfig> {
    let base_url = match (raw_config.get("SOURCE_URL"), raw_config.get("SOURCE_PROJECT_ID")) {
        (Some(url), _) => url.to_string(),
        (None, Some(project_id)) => format!("https://{}.supabase.co", project_id),
        (None, None) => {
            return Err(AppError::Config(
                "SOURCE_PROJECT_ID or SOURCE_URL must be set in the configuration file".into(),
            )
            .into());
        }
    };
    let base_url = Url::parse(&base_url)
        .map_err(|e| AppError::Config(format!("Invalid source URL '{}': {}", base_url, e)))?;

    let api_key = raw_config
        .get("SOURCE_API_KEY")
        .ok_or_else(|| {
            AppError::Config(
                "SOURCE_API_KEY must be set in the configuration file or the environment".into(),
            )
        })?
        .to_string();

    let page_size: usize = raw_config.parse_or("PAGE_SIZE", DEFAULT_PAGE_SIZE)?;
    if page_size == 0 {
        return Err(AppError::Config("PAGE_SIZE must be at least 1".into()).into());
    }

    Ok(SourceConfig {
        base_url,
        api_key,
        page_size,
        request_timeout: Duration::from_secs(
            raw_config.parse_or("REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS)?,
        ),
        connect_timeout: Duration::from_secs(
            raw_config.parse_or("CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS)?,
        ),
    })
}

pub fn load_target_config(raw_config: &RawEnvConfig) -> Result<TargetConfig> {
    Ok(TargetConfig {
        host: raw_config.require("TARGET_HOST")?.to_string(),
        port: raw_config.parse_or("TARGET_PORT", DEFAULT_TARGET_PORT)?,
        database: raw_config.require("TARGET_DB_NAME")?.to_string(),
        user: raw_config.require("TARGET_USER")?.to_string(),
        password: raw_config.get("TARGET_PASSWORD").unwrap_or_default().to_string(),
        connect_timeout: Duration::from_secs(
            raw_config.parse_or("CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS)?,
        ),
    })
}

/// Splits the comma-separated `TABLES` value, dropping blank entries and
/// repeats of an earlier entry.
fn parse_table_list(value: &str) -> Result<Vec<String>> {
    let valid_name = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").context("Invalid table name pattern")?;

    let mut seen = HashSet::new();
    let mut tables: Vec<String> = Vec::new();
    for name in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if seen.insert(name) {
            tables.push(name.to_string());
        } else {
            tracing::warn!(table = name, "table listed more than once in TABLES; keeping the first");
        }
    }

    if tables.is_empty() {
        return Err(AppError::Config("TABLES must list at least one table".into()).into());
    }
    if let Some(bad) = tables.iter().find(|t| !valid_name.is_match(t)) {
        return Err(AppError::Config(format!("Invalid table name in TABLES: '{}'", bad)).into());
    }

    Ok(tables)
}
