//! Configuration management

use serde::{Deserialize, Serialize};

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub tracking: TrackingConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    pub pool_size: u32,
}

/// Time-tracking policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
    /// Default for organizations with no explicit policy row.
    pub allow_future_dates: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig { path: "timeforge.db".to_string(), pool_size: 8 },
            tracking: TrackingConfig { allow_future_dates: false },
        }
    }
}
