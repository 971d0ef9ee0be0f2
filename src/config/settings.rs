use secrecy::SecretString;
use serde::Deserialize;
use std::{path::Path, time::Duration};
use thiserror::Error;
use tokio::fs;

use crate::backend::PoolOptions;

// -----------------------------------------------------------------------------
// ----- Constants -------------------------------------------------------------

/// Descriptor used by release and stats calls, which only know the tenant.
pub const DEFAULT_RELEASE_DSN: &str =
    "host=localhost port=5432 user=admin password=securepassword dbname=tenant_registry";

// -----------------------------------------------------------------------------
// ----- Settings --------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Settings {
    pub pool: PoolOptions,
    pub release_dsn: SecretString,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            pool: PoolOptions::default(),
            release_dsn: SecretString::new(DEFAULT_RELEASE_DSN.into()),
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Settings: Static ------------------------------------------------------

impl Settings {
    pub async fn from_file_async(path: &Path) -> Result<Settings, SettingsError> {
        let raw = fs::read_to_string(path)
            .await
            .map_err(|e| SettingsError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> Result<Settings, SettingsError> {
        let doc: SettingsFile = toml::from_str(raw).map_err(|e| SettingsError::Toml { source: e })?;

        let defaults = PoolOptions::default();
        let pool = PoolOptions {
            max_connections: doc.pool.max_connections.unwrap_or(defaults.max_connections),
            min_connections: doc.pool.min_connections.unwrap_or(defaults.min_connections),
            max_lifetime: doc.pool.max_lifetime.unwrap_or(defaults.max_lifetime),
            max_idle_time: doc.pool.max_idle_time.unwrap_or(defaults.max_idle_time),
            connect_timeout: doc.pool.connect_timeout.unwrap_or(defaults.connect_timeout),
            reap_interval: doc.pool.reap_interval.unwrap_or(defaults.reap_interval),
        };
        validate(&pool)?;

        let release_dsn = match doc.service.release_dsn {
            Some(dsn) if dsn.trim().is_empty() => {
                return Err(SettingsError::InvalidField("service.release_dsn".into()));
            }
            Some(dsn) => SecretString::new(dsn.into_boxed_str()),
            None => SecretString::new(DEFAULT_RELEASE_DSN.into()),
        };

        Ok(Settings { pool, release_dsn })
    }
}

// -----------------------------------------------------------------------------
// ----- Internal: On-disk format ----------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SettingsFile {
    #[serde(default)]
    pool: PoolSection,

    #[serde(default)]
    service: ServiceSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PoolSection {
    #[serde(default)]
    max_connections: Option<usize>,

    #[serde(default)]
    min_connections: Option<usize>,

    #[serde(default, deserialize_with = "de_duration")]
    max_lifetime: Option<Duration>,

    #[serde(default, deserialize_with = "de_duration")]
    max_idle_time: Option<Duration>,

    #[serde(default, deserialize_with = "de_duration")]
    connect_timeout: Option<Duration>,

    #[serde(default, deserialize_with = "de_duration")]
    reap_interval: Option<Duration>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ServiceSection {
    #[serde(default)]
    release_dsn: Option<String>,
}

// -----------------------------------------------------------------------------
// ----- Internal: Helpers -----------------------------------------------------

fn validate(pool: &PoolOptions) -> Result<(), SettingsError> {
    if pool.max_connections == 0 {
        return Err(SettingsError::InvalidField("pool.max_connections".into()));
    }
    if pool.min_connections > pool.max_connections {
        return Err(SettingsError::InvalidField("pool.min_connections".into()));
    }
    if pool.max_lifetime.is_zero() {
        return Err(SettingsError::InvalidField("pool.max_lifetime".into()));
    }
    if pool.max_idle_time.is_zero() {
        return Err(SettingsError::InvalidField("pool.max_idle_time".into()));
    }
    if pool.connect_timeout.is_zero() {
        return Err(SettingsError::InvalidField("pool.connect_timeout".into()));
    }
    if pool.reap_interval.is_zero() {
        return Err(SettingsError::InvalidField("pool.reap_interval".into()));
    }
    Ok(())
}

/// Human-readable durations: "30m", "5min", "1h 30m", "250ms".
fn de_duration<'de, D>(d: D) -> Result<Option<Duration>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;

    let raw = String::deserialize(d)?;
    humantime::parse_duration(raw.trim())
        .map(Some)
        .map_err(|e| D::Error::custom(format!("invalid duration '{raw}': {e}")))
}

// -----------------------------------------------------------------------------
// ----- Errors ----------------------------------------------------------------

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("invalid or missing field '{0}'")]
    InvalidField(String),

    #[error("read error for {path:?}: {source}")]
    Io {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[error("toml parse error: {source}")]
    Toml { source: toml::de::Error },
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
