// Configuration loader with environment variable substitution

use super::types::*;
use anyhow::{bail, Context, Result};
use regex::Regex;
use std::path::Path;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file with environment variable substitution
    pub fn load<P: AsRef<Path>>(path: P) -> Result<TelemetryConfig> {
        let content =
            std::fs::read_to_string(path.as_ref()).context("Failed to read config file")?;

        // Substitute environment variables
        let content = Self::substitute_env_vars(&content);

        // Parse YAML
        let config: TelemetryConfig =
            serde_yaml::from_str(&content).context("Failed to parse YAML configuration")?;

        // Validate configuration
        Self::validate(&config)?;

        Ok(config)
    }

    /// Substitute ${VAR} and ${VAR:-default} patterns with environment variables
    ///
    /// Examples:
    /// - ${HOME} -> /home/user
    /// - ${TELEMETRY_API_KEY:-dev-key} -> dev-key (if TELEMETRY_API_KEY not set)
    fn substitute_env_vars(content: &str) -> String {
        let re = Regex::new(r"\$\{([^}:]+)(?::-([^}]+))?\}").unwrap();

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            let default_value = caps.get(2).map(|m| m.as_str());

            match std::env::var(var_name) {
                Ok(value) => value,
                Err(_) => {
                    if let Some(default) = default_value {
                        default.to_string()
                    } else {
                        // Keep original if no default and var not found
                        format!("${{{}}}", var_name)
                    }
                }
            }
        })
        .to_string()
    }

    /// Validate configuration
    pub(crate) fn validate(config: &TelemetryConfig) -> Result<()> {
        if config.network.base_url.is_empty() {
            bail!("network.base_url cannot be empty");
        }

        if config.network.timeout_seconds == 0 {
            bail!("network.timeout_seconds must be > 0");
        }

        if config.cache.capacity_bytes == 0 {
            bail!("cache.capacity_bytes must be > 0");
        }

        if config.cache.directory.is_empty() {
            bail!("cache.directory cannot be empty");
        }

        for (name, policy) in [
            ("events", &config.batching.events),
            ("gaze", &config.batching.gaze),
            ("sensors", &config.batching.sensors),
            ("dynamics", &config.batching.dynamics),
        ] {
            if policy.batch_size == 0 {
                bail!("batching.{}.batch_size must be > 0", name);
            }
            if policy.interval_seconds == 0 {
                bail!("batching.{}.interval_seconds must be > 0", name);
            }
        }

        Ok(())
    }
}
