//! Configuration resolution for the recognition service and local storage
//!
//! Both the service URL and the data directory follow the same priority
//! order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! The compiled service-URL default is selected by build context: debug
//! builds target a local development server, release builds target the
//! production service. This is deliberately not user-configurable at
//! runtime beyond the override channels above.

use crate::{Error, Result};
use std::path::PathBuf;

/// Production recognition service
pub const PRODUCTION_SERVICE_URL: &str = "https://www.gamesighter.com";

/// Local development recognition service
pub const DEVELOPMENT_SERVICE_URL: &str = "http://localhost:4200";

/// Environment variable overriding the service base URL
pub const SERVICE_URL_ENV: &str = "CAMPRICER_SERVICE_URL";

/// Environment variable overriding the data directory
pub const DATA_DIR_ENV: &str = "CAMPRICER_DATA_DIR";

/// Resolve the recognition service base URL
pub fn resolve_service_url(cli_arg: Option<&str>) -> String {
    // Priority 1: Command-line argument
    if let Some(url) = cli_arg {
        return url.trim_end_matches('/').to_string();
    }

    // Priority 2: Environment variable
    if let Ok(url) = std::env::var(SERVICE_URL_ENV) {
        if !url.trim().is_empty() {
            return url.trim_end_matches('/').to_string();
        }
    }

    // Priority 3: TOML config file
    if let Some(url) = config_file_string("service_url") {
        return url.trim_end_matches('/').to_string();
    }

    // Priority 4: Compiled default by build context
    default_service_url().to_string()
}

/// Compiled default: local server for debug builds, production otherwise
pub fn default_service_url() -> &'static str {
    if cfg!(debug_assertions) {
        DEVELOPMENT_SERVICE_URL
    } else {
        PRODUCTION_SERVICE_URL
    }
}

/// Resolve the directory holding durable state (history blob, preferences)
pub fn resolve_data_dir(cli_arg: Option<&str>) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return PathBuf::from(path);
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(DATA_DIR_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Some(path) = config_file_string("data_dir") {
        return PathBuf::from(path);
    }

    // Priority 4: OS-dependent default
    default_data_dir()
}

/// Platform identifier sent as the `source` field of every service request
///
/// Opaque to this client; the service uses it to pick a payload shape.
pub fn default_source() -> &'static str {
    if cfg!(target_os = "macos") {
        "macOS"
    } else if cfg!(target_os = "windows") {
        "Windows"
    } else if cfg!(target_os = "linux") {
        "Linux"
    } else {
        "Desktop"
    }
}

/// Read a top-level string key from the config file, if one exists
fn config_file_string(key: &str) -> Option<String> {
    let path = locate_config_file().ok()?;
    let content = std::fs::read_to_string(&path).ok()?;
    let config = toml::from_str::<toml::Value>(&content).ok()?;
    config.get(key).and_then(|v| v.as_str()).map(String::from)
}

/// Get the configuration file path for the platform
fn locate_config_file() -> Result<PathBuf> {
    if cfg!(target_os = "linux") {
        // Try ~/.config/campricer/config.toml first, then /etc/campricer/config.toml
        if let Some(path) = dirs::config_dir().map(|d| d.join("campricer").join("config.toml")) {
            if path.exists() {
                return Ok(path);
            }
        }
        let system_config = PathBuf::from("/etc/campricer/config.toml");
        if system_config.exists() {
            return Ok(system_config);
        }
        return Err(Error::Config("No config file found".to_string()));
    }

    let path = dirs::config_dir()
        .map(|d| d.join("campricer").join("config.toml"))
        .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))?;

    if path.exists() {
        Ok(path)
    } else {
        Err(Error::Config(format!("Config file not found: {:?}", path)))
    }
}

/// OS-dependent default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("campricer"))
        .unwrap_or_else(|| PathBuf::from("./campricer_data"))
}
