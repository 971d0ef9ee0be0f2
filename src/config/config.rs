use secrecy::SecretString;
use std::net::SocketAddr;

use super::{
    cli::CliConfig,
    settings::{Settings, SettingsError},
    types::LogLevel,
};
use crate::backend::PoolOptions;

// -----------------------------------------------------------------------------
// ----- Config ----------------------------------------------------------------

#[derive(Clone, Debug)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub log_level: LogLevel,
    pub pool: PoolOptions,
    pub release_dsn: SecretString,
}

// -----------------------------------------------------------------------------
// ----- Config: Static --------------------------------------------------------

impl Config {
    /// CLI/env first, then the settings file it points at (if any).
    pub async fn load() -> Result<Config, SettingsError> {
        Self::from_cli(CliConfig::from_args()).await
    }

    pub async fn from_cli(cli: CliConfig) -> Result<Config, SettingsError> {
        let settings = match cli.settings_file_location.as_deref() {
            Some(path) => Settings::from_file_async(path).await?,
            None => Settings::default(),
        };

        Ok(Config {
            listen_addr: cli.listen_addr,
            log_level: cli.log_level,
            pool: settings.pool,
            release_dsn: settings.release_dsn,
        })
    }
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
