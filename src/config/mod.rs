//! Application configuration
//!
//! Static configuration loaded once at startup from an optional TOML file
//! (`SNAPLINK_CONFIG`, default `snaplink.toml`) with `SNAPLINK__*`
//! environment overrides layered on top. Every field has a default so the
//! server boots with no file at all.

use std::sync::OnceLock;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::errors::{Result, SnaplinkError};

mod structs;

pub use structs::{
    AppConfig, CacheConfig, ClicksConfig, DatabaseConfig, ExportConfig, ExportFormat,
    GeneratorConfig, LoggingConfig, ServerConfig,
};

static CONFIG: OnceLock<AppConfig> = OnceLock::new();

/// Load configuration from file + environment, validated and cached for
/// the process lifetime.
///
/// Idempotent: repeated calls keep the first loaded value.
pub fn init_config() -> Result<&'static AppConfig> {
    if let Some(cfg) = CONFIG.get() {
        return Ok(cfg);
    }

    let config_path =
        std::env::var("SNAPLINK_CONFIG").unwrap_or_else(|_| "snaplink.toml".to_string());

    let loaded = Config::builder()
        .add_source(File::with_name(&config_path).required(false))
        // SNAPLINK__SERVER__PORT=8080 形式的环境变量覆盖
        .add_source(Environment::with_prefix("SNAPLINK").separator("__"))
        .build()
        .map_err(|e| SnaplinkError::configuration(format!("failed to load config: {}", e)))?;

    let app_config: AppConfig = loaded
        .try_deserialize()
        .map_err(|e| SnaplinkError::configuration(format!("invalid config: {}", e)))?;

    app_config.validate()?;

    Ok(CONFIG.get_or_init(|| app_config))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedactedSummary {
    pub database_backend: String,
    pub cache_enabled: bool,
    pub export_enabled: bool,
}

impl AppConfig {
    /// Log-safe summary (the database URL may embed credentials).
    pub fn summary(&self) -> RedactedSummary {
        let database_backend = self
            .database
            .url
            .split(':')
            .next()
            .unwrap_or("unknown")
            .to_string();
        RedactedSummary {
            database_backend,
            cache_enabled: self.cache.enabled,
            export_enabled: self.export.enabled,
        }
    }
}
