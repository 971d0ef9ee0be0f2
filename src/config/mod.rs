pub mod cli;
#[allow(clippy::module_inception)]
pub mod config;
pub mod settings;
pub mod types;

pub use config::Config;
pub use settings::{Settings, SettingsError};
pub use types::LogLevel;
