// Configuration module for spatial-telemetry
//
// Provides:
// - YAML configuration file loading
// - Environment variable substitution
// - Configuration validation
// - Default values

pub mod types;
mod loader;

pub use types::*;
pub use loader::ConfigLoader;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a YAML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<TelemetryConfig> {
    ConfigLoader::load(path).context("Failed to load configuration")
}

/// Load configuration with environment variable overrides
pub fn load_config_with_env<P: AsRef<Path>>(path: P) -> Result<TelemetryConfig> {
    let mut config = load_config(path)?;

    // Allow environment variables to override config values
    if let Ok(base_url) = std::env::var("TELEMETRY_BASE_URL") {
        config.network.base_url = base_url;
    }

    if let Ok(api_key) = std::env::var("TELEMETRY_API_KEY") {
        config.network.api_key = Some(api_key);
    }

    if let Ok(cache_dir) = std::env::var("TELEMETRY_CACHE_DIR") {
        config.cache.directory = cache_dir;
    }

    Ok(config)
}
