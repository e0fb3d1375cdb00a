//! Environment-driven configuration.

use std::path::PathBuf;
use std::time::Duration;

use swagstock_backup::BackupConfig;
use swagstock_inventory::DEFAULT_MIN_STOCK;
use swagstock_observability::LogFormat;
use swagstock_store::DatabaseConfig;
use thiserror::Error;

pub const ENV_DATA_FILE: &str = "SWAGSTOCK_DATA_FILE";
pub const ENV_BACKUP_DIR: &str = "SWAGSTOCK_BACKUP_DIR";
pub const ENV_BACKUP_RETENTION: &str = "SWAGSTOCK_BACKUP_RETENTION";
pub const ENV_AUTO_BACKUP_MINUTES: &str = "SWAGSTOCK_AUTO_BACKUP_MINUTES";
pub const ENV_DEFAULT_MIN_STOCK: &str = "SWAGSTOCK_DEFAULT_MIN_STOCK";
pub const ENV_LOG_FORMAT: &str = "SWAGSTOCK_LOG_FORMAT";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("no per-user data directory on this platform; set {ENV_DATA_FILE}")]
    NoDataDir,

    #[error("invalid {var}='{value}': {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub data_file: PathBuf,
    pub backup_dir: PathBuf,
    pub backup_retention: usize,
    pub auto_backup_interval: Duration,
    pub default_min_stock: i64,
    pub log_format: LogFormat,
}

impl AppConfig {
    /// Everything under one directory; handy for tests and portable installs.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            data_file: dir.join("swagstock.db"),
            backup_dir: dir.join("backups"),
            backup_retention: 2,
            auto_backup_interval: Duration::from_secs(60 * 60),
            default_min_stock: DEFAULT_MIN_STOCK,
            log_format: LogFormat::Json,
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset keys take their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let data_file = match get(ENV_DATA_FILE) {
            Some(path) => PathBuf::from(path),
            None => dirs::data_dir()
                .ok_or(ConfigError::NoDataDir)?
                .join("swagstock")
                .join("swagstock.db"),
        };
        let backup_dir = match get(ENV_BACKUP_DIR) {
            Some(path) => PathBuf::from(path),
            None => data_file
                .parent()
                .map(|p| p.join("backups"))
                .unwrap_or_else(|| PathBuf::from("backups")),
        };

        let mut config = Self::in_dir(".");
        config.data_file = data_file;
        config.backup_dir = backup_dir;

        if let Some(raw) = get(ENV_BACKUP_RETENTION) {
            config.backup_retention = parse_number(ENV_BACKUP_RETENTION, &raw, 1)? as usize;
        }
        if let Some(raw) = get(ENV_AUTO_BACKUP_MINUTES) {
            let minutes = parse_number(ENV_AUTO_BACKUP_MINUTES, &raw, 0)?;
            config.auto_backup_interval = Duration::from_secs(minutes as u64 * 60);
        }
        if let Some(raw) = get(ENV_DEFAULT_MIN_STOCK) {
            config.default_min_stock = parse_number(ENV_DEFAULT_MIN_STOCK, &raw, 0)?;
        }
        if let Some(raw) = get(ENV_LOG_FORMAT) {
            config.log_format = raw.parse().map_err(|reason| ConfigError::Invalid {
                var: ENV_LOG_FORMAT,
                value: raw.clone(),
                reason,
            })?;
        }
        Ok(config)
    }

    pub fn database(&self) -> DatabaseConfig {
        DatabaseConfig::new(&self.data_file).with_default_min_stock(self.default_min_stock)
    }

    pub fn backups(&self) -> BackupConfig {
        let mut backups = BackupConfig::new(&self.data_file, &self.backup_dir);
        backups.retention = self.backup_retention;
        backups.auto_interval = self.auto_backup_interval;
        backups
    }
}

fn parse_number(var: &'static str, raw: &str, min: i64) -> Result<i64, ConfigError> {
    let invalid = |reason: String| ConfigError::Invalid {
        var,
        value: raw.to_string(),
        reason,
    };
    let value: i64 = raw.trim().parse().map_err(|e| invalid(format!("{e}")))?;
    if value < min {
        return Err(invalid(format!("must be at least {min}")));
    }
    Ok(value)
}
