//! Configuration file loading
//!
//! Settings resolve in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! This module owns tier 3. Tiers 1 and 2 are handled by the server's
//! command-line parser; [`pick`] merges the tiers.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Directory name under the platform config dir
pub const APP_DIR: &str = "chorus";

/// Config file name
pub const CONFIG_FILE: &str = "config.toml";

/// Contents of `config.toml`; every key is optional
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TomlConfig {
    /// Store connection string, e.g. `sqlite:///var/lib/chorus/chorus.db`
    pub database_url: Option<String>,
    pub port: Option<u16>,
    /// Browser origin allowed to make cross-origin requests
    pub allowed_origin: Option<String>,
    pub uploads_dir: Option<PathBuf>,
    pub max_upload_bytes: Option<usize>,
}

/// Locate the config file when none was given explicitly
///
/// Linux checks `~/.config/chorus/config.toml`, then `/etc/chorus/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join(APP_DIR).join(CONFIG_FILE));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc").join(APP_DIR).join(CONFIG_FILE);
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Load the TOML config
///
/// An explicit path must exist. Without one, a missing default file is not an
/// error: the remaining tiers still apply.
pub fn load_toml_config(explicit: Option<&Path>) -> Result<TomlConfig> {
    let path = match explicit {
        Some(path) => {
            if !path.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            path.to_path_buf()
        }
        None => match default_config_path() {
            Some(path) => path,
            None => {
                debug!("No config file found; using command line, environment and defaults");
                return Ok(TomlConfig::default());
            }
        },
    };

    let content = std::fs::read_to_string(&path)?;
    let config = parse_toml_config(&content)
        .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
    info!("Loaded config file: {}", path.display());
    Ok(config)
}

/// Parse config file contents
pub fn parse_toml_config(content: &str) -> Result<TomlConfig> {
    toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
}

/// Merge one setting across tiers: command line/environment, file, default
pub fn pick<T>(cli_or_env: Option<T>, file: Option<T>, default: T) -> T {
    cli_or_env.or(file).unwrap_or(default)
}
