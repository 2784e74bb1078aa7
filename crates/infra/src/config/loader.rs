//! Configuration loader
//!
//! Loads engine configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If incomplete, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `TIMEFORGE_DB_PATH`: Database file path
//! - `TIMEFORGE_DB_POOL_SIZE`: Connection pool size
//! - `TIMEFORGE_ALLOW_FUTURE_DATES`: Default manual-entry policy for
//!   organizations without an explicit policy row (true/false)
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./config.json` or `./config.toml`
//! 2. `./timeforge.json` or `./timeforge.toml`
//! 3. The same names in the parent directory

use std::path::{Path, PathBuf};

use timeforge_domain::{Config, DatabaseConfig, Result, TimeForgeError, TrackingConfig};

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If any required
/// variables are missing, falls back to loading from a config file.
pub fn load() -> Result<Config> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "environment incomplete, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// # Errors
/// Returns `TimeForgeError::Config` if required variables are missing
/// or have invalid values.
pub fn load_from_env() -> Result<Config> {
    let db_path = env_var("TIMEFORGE_DB_PATH")?;
    let db_pool_size = env_var("TIMEFORGE_DB_POOL_SIZE").and_then(|s| {
        s.parse::<u32>().map_err(|e| TimeForgeError::Config(format!("invalid pool size: {e}")))
    })?;
    let allow_future_dates = env_bool("TIMEFORGE_ALLOW_FUTURE_DATES", false);

    Ok(Config {
        database: DatabaseConfig { path: db_path, pool_size: db_pool_size },
        tracking: TrackingConfig { allow_future_dates },
    })
}

/// Load configuration from a file
///
/// If `path` is `None`, probes the standard locations. Supports both
/// JSON and TOML formats (detected by file extension).
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(TimeForgeError::Config(format!(
                    "config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            TimeForgeError::Config("no config file found in any of the standard locations".into())
        })?,
    };

    tracing::info!(path = %config_path.display(), "loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| TimeForgeError::Config(format!("failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| TimeForgeError::Config(format!("invalid TOML config: {e}"))),
        _ => serde_json::from_str(contents)
            .map_err(|e| TimeForgeError::Config(format!("invalid JSON config: {e}"))),
    }
}

fn probe_config_paths() -> Option<PathBuf> {
    let names = ["config.json", "config.toml", "timeforge.json", "timeforge.toml"];
    let bases = [PathBuf::from("."), PathBuf::from("..")];

    for base in &bases {
        for name in &names {
            let candidate = base.join(name);
            if candidate.exists() {
                return Some(candidate);
            }
        }
    }
    None
}

fn env_var(name: &str) -> Result<String> {
    std::env::var(name)
        .map_err(|_| TimeForgeError::Config(format!("missing environment variable: {name}")))
}

fn env_bool(name: &str, default: bool) -> bool {
    std::env::var(name).map(|v| matches!(v.as_str(), "true" | "1" | "yes")).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_config_parses() {
        let contents = r#"{
            "database": { "path": "engine.db", "pool_size": 4 },
            "tracking": { "allow_future_dates": true }
        }"#;

        let config = parse_config(contents, Path::new("config.json")).unwrap();
        assert_eq!(config.database.path, "engine.db");
        assert_eq!(config.database.pool_size, 4);
        assert!(config.tracking.allow_future_dates);
    }

    #[test]
    fn toml_config_parses() {
        let contents = r#"
            [database]
            path = "engine.db"
            pool_size = 8

            [tracking]
            allow_future_dates = false
        "#;

        let config = parse_config(contents, Path::new("config.toml")).unwrap();
        assert_eq!(config.database.pool_size, 8);
        assert!(!config.tracking.allow_future_dates);
    }

    #[test]
    fn invalid_json_is_a_config_error() {
        let result = parse_config("{ not json", Path::new("config.json"));
        assert!(matches!(result, Err(TimeForgeError::Config(_))));
    }

    #[test]
    fn missing_explicit_file_is_a_config_error() {
        let result = load_from_file(Some(PathBuf::from("/nonexistent/config.json")));
        assert!(matches!(result, Err(TimeForgeError::Config(_))));
    }
}
