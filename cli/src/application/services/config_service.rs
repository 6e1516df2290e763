//! Application service — configuration use-cases.

use anyhow::Result;

use crate::application::ports::ConfigStore;
use crate::domain::config::{LookoutConfig, apply_config_value};

/// Load configuration.
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be read or parsed.
pub fn load_config(store: &impl ConfigStore) -> Result<LookoutConfig> {
    store.load()
}

/// Save configuration.
///
/// # Errors
///
/// Returns an error if the config file cannot be written.
pub fn save_config(store: &impl ConfigStore, config: &LookoutConfig) -> Result<()> {
    store.save(config)
}

/// Validate and persist one `key = value` setting. Returns the updated config.
///
/// # Errors
///
/// Returns an error if the key is unknown, the value is invalid, or the
/// config cannot be loaded or saved. Nothing is written on a bad value.
pub fn set_value(store: &impl ConfigStore, key: &str, value: &str) -> Result<LookoutConfig> {
    let mut config = store.load()?;
    apply_config_value(&mut config, key, value)?;
    store.save(&config)?;
    Ok(config)
}
