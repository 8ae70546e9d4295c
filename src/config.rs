// Runtime configuration from the environment (and an optional .env file)

use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use tracing::info;

use crate::error::ConfigError;
use crate::logging::LogFormat;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
    /// Seed sample data on startup
    pub seed: bool,
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            db_path: PathBuf::from("homebase.db"),
            host: "0.0.0.0".to_string(),
            port: 3000,
            seed: false,
            log_format: LogFormat::Pretty,
        }
    }
}

impl Config {
    /// Read `HOMEBASE_*` variables, loading `.env` first if one exists.
    pub fn load() -> Result<Self, ConfigError> {
        // A missing .env file is normal
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Config {
            db_path: try_load(&lookup, "HOMEBASE_DB", "homebase.db")?,
            host: try_load(&lookup, "HOMEBASE_HOST", "0.0.0.0")?,
            port: try_load(&lookup, "HOMEBASE_PORT", "3000")?,
            seed: try_load(&lookup, "HOMEBASE_SEED", "false")?,
            log_format: log_format_from(&lookup)?,
        })
    }

    /// Only `HOMEBASE_LOG_FORMAT`, so the subscriber can be installed before
    /// [`Config::load`] logs the defaults it falls back to.
    pub fn log_format() -> Result<LogFormat, ConfigError> {
        let _ = dotenvy::dotenv();
        log_format_from(&|key: &str| env::var(key).ok())
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn log_format_from<F>(lookup: &F) -> Result<LogFormat, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    Ok(lookup("HOMEBASE_LOG_FORMAT")
        .map(|v| v.parse())
        .transpose()?
        .unwrap_or_default())
}

fn try_load<T, F>(lookup: &F, key: &'static str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key,
        reason: format!("{raw:?}: {e}"),
    })
}
