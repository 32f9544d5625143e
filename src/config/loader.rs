use std::fs;
use std::path::Path;

use anyhow::{bail, Result};

use crate::config::settings::ServiceConfig;

/// Load and validate settings from a YAML file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ServiceConfig> {
    let raw = fs::read_to_string(path)?;
    let config: ServiceConfig = serde_yaml::from_str(&raw)?;

    // Validate fetch policy
    if let Some(fetch) = &config.settings.fetch {
        if fetch.attempts == Some(0) {
            bail!("settings.fetch.attempts must be at least 1");
        }
    }

    // Validate logging
    if let Some(logging) = &config.settings.logging {
        match logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            level => bail!("unsupported log level '{}'", level),
        }
    }

    Ok(config)
}
