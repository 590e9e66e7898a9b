//! Configuration loading from files and environment variables
//!
//! Environment variables take precedence over the file so containerized
//! deployments can point the client at different trackers without editing
//! it:
//! - `FDFS_TRACKER_ADDRS`: comma-separated `host:port` list
//! - `FDFS_MAX_CONNECTIONS`: pool ceiling

use std::path::Path;

use anyhow::{Context, Result};

use super::types::Config;

/// Load configuration from a TOML file, with environment variable overrides
pub fn load_config(config_path: impl AsRef<Path>) -> Result<Config> {
    let config_path = config_path.as_ref();
    let config_content = std::fs::read_to_string(config_path)
        .with_context(|| format!("Failed to read config file '{}'", config_path.display()))?;

    let mut config: Config = toml::from_str(&config_content)
        .with_context(|| format!("Failed to parse config file '{}'", config_path.display()))?;

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;

    config.validate()?;

    Ok(config)
}

/// Apply `FDFS_*` overrides read through `lookup`
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(addrs) = lookup("FDFS_TRACKER_ADDRS") {
        let trackers: Vec<String> = addrs
            .split(',')
            .map(str::trim)
            .filter(|addr| !addr.is_empty())
            .map(str::to_string)
            .collect();
        tracing::info!(
            "Using {} tracker(s) from FDFS_TRACKER_ADDRS (overriding config file)",
            trackers.len()
        );
        config.tracker_addrs = trackers;
    }

    if let Some(max) = lookup("FDFS_MAX_CONNECTIONS") {
        config.max_connections = max
            .trim()
            .parse()
            .with_context(|| format!("FDFS_MAX_CONNECTIONS is not a number: '{max}'"))?;
    }

    Ok(())
}
