use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumIter};

use crate::errors::{Result, SnaplinkError};

/// 静态配置（TOML + 环境变量，启动时加载一次）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
    pub generator: GeneratorConfig,
    pub clicks: ClicksConfig,
    pub export: ExportConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Public base URL used to build `short_url` in creation responses and
    /// to reject self-referential destinations.
    pub public_base_url: String,
    /// 302 (default) or 301
    pub redirect_status: u16,
    /// Where `GET /` (empty code) redirects.
    pub default_url: String,
    pub workers: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            public_base_url: "http://127.0.0.1:8080".to_string(),
            redirect_status: 302,
            default_url: "https://example.com".to_string(),
            workers: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `sqlite://...`, `postgres://...`, `mysql://...` or `memory://`
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://snaplink.db?mode=rwc".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    /// Entry cap of the positive cache (TinyLFU eviction above this).
    pub max_capacity: u64,
    /// Positive entry TTL, capped per entry by the link's remaining lifetime.
    pub default_ttl_secs: u64,
    /// Negative ("confirmed absent") entry TTL. Seconds, not minutes: this
    /// bounds how long a freshly created code can be shadowed.
    pub negative_ttl_secs: u64,
    pub negative_max_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_capacity: 100_000,
            default_ttl_secs: 300,
            negative_ttl_secs: 5,
            negative_max_capacity: 50_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Starting code length.
    pub code_length: usize,
    /// Escalation ceiling; exhausting retries here is `CapacityExhausted`.
    pub max_code_length: usize,
    /// Collision retries per length before escalating.
    pub max_retries: u32,
    /// Code alphabet, base62 by default. Case-sensitive.
    pub alphabet: String,
    /// Birthday-bound collision probability target used by
    /// `generator::required_length` sizing checks.
    pub collision_target: f64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            code_length: 7,
            max_code_length: 12,
            max_retries: 5,
            alphabet: "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789"
                .to_string(),
            collision_target: 1e-9,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClicksConfig {
    /// Bounded queue between the redirect path and the flush task. When
    /// full, the newest event is dropped (counted, never blocking).
    pub queue_capacity: usize,
    pub flush_interval_secs: u64,
    /// Flush early once this many events are buffered.
    pub flush_batch_size: usize,
    /// Best-effort drain budget at shutdown.
    pub shutdown_timeout_secs: u64,
}

impl Default for ClicksConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 8192,
            flush_interval_secs: 10,
            flush_batch_size: 512,
            shutdown_timeout_secs: 5,
        }
    }
}

/// Click export file format
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, EnumIter, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Jsonl,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Jsonl => "jsonl",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub enabled: bool,
    pub format: ExportFormat,
    pub interval_secs: u64,
    pub output_dir: String,
    /// Max events per export cycle.
    pub batch_limit: u64,
    /// Exported events older than this are pruned; 0 disables pruning.
    pub retention_days: u32,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            format: ExportFormat::Csv,
            interval_secs: 300,
            output_dir: "./exports".to_string(),
            batch_limit: 50_000,
            retention_days: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// EnvFilter directive, e.g. `info` or `snaplink=debug,sea_orm=warn`.
    pub level: String,
    /// Empty = stdout.
    pub file: String,
    /// `text` or `json`
    pub format: String,
    pub enable_rotation: bool,
    pub max_backups: u32,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: String::new(),
            format: "text".to_string(),
            enable_rotation: true,
            max_backups: 7,
        }
    }
}

impl AppConfig {
    /// 启动前的合法性检查，配置错误直接拒绝启动
    pub fn validate(&self) -> Result<()> {
        if self.server.redirect_status != 301 && self.server.redirect_status != 302 {
            return Err(SnaplinkError::configuration(format!(
                "server.redirect_status must be 301 or 302, got {}",
                self.server.redirect_status
            )));
        }

        if self.generator.code_length == 0 {
            return Err(SnaplinkError::configuration(
                "generator.code_length must be at least 1",
            ));
        }
        if self.generator.max_code_length < self.generator.code_length {
            return Err(SnaplinkError::configuration(format!(
                "generator.max_code_length ({}) must be >= generator.code_length ({})",
                self.generator.max_code_length, self.generator.code_length
            )));
        }
        if self.generator.max_retries == 0 {
            return Err(SnaplinkError::configuration(
                "generator.max_retries must be at least 1",
            ));
        }

        if !(self.generator.collision_target > 0.0 && self.generator.collision_target < 1.0) {
            return Err(SnaplinkError::configuration(format!(
                "generator.collision_target must be in (0, 1), got {}",
                self.generator.collision_target
            )));
        }

        let alphabet = &self.generator.alphabet;
        if alphabet.chars().count() < 2 {
            return Err(SnaplinkError::configuration(
                "generator.alphabet must contain at least 2 characters",
            ));
        }
        let mut seen = std::collections::HashSet::new();
        for c in alphabet.chars() {
            if !seen.insert(c) {
                return Err(SnaplinkError::configuration(format!(
                    "generator.alphabet contains duplicate character '{}'",
                    c
                )));
            }
            if !c.is_ascii_alphanumeric() {
                return Err(SnaplinkError::configuration(format!(
                    "generator.alphabet must be ASCII alphanumeric, found '{}'",
                    c
                )));
            }
        }

        if self.cache.negative_ttl_secs > self.cache.default_ttl_secs {
            return Err(SnaplinkError::configuration(
                "cache.negative_ttl_secs must not exceed cache.default_ttl_secs",
            ));
        }

        if self.clicks.queue_capacity == 0 {
            return Err(SnaplinkError::configuration(
                "clicks.queue_capacity must be at least 1",
            ));
        }
        if self.clicks.flush_batch_size == 0 {
            return Err(SnaplinkError::configuration(
                "clicks.flush_batch_size must be at least 1",
            ));
        }

        url::Url::parse(&self.server.public_base_url).map_err(|e| {
            SnaplinkError::configuration(format!(
                "server.public_base_url is not a valid URL: {}",
                e
            ))
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.generator.code_length, 7);
        assert_eq!(config.generator.alphabet.len(), 62);
        assert_eq!(config.server.redirect_status, 302);
    }

    #[test]
    fn test_rejects_bad_redirect_status() {
        let mut config = AppConfig::default();
        config.server.redirect_status = 307;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_duplicate_alphabet_chars() {
        let mut config = AppConfig::default();
        config.generator.alphabet = "abca".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_length_inversion() {
        let mut config = AppConfig::default();
        config.generator.code_length = 10;
        config.generator.max_code_length = 8;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_collision_target_out_of_range() {
        let mut config = AppConfig::default();
        config.generator.collision_target = 0.0;
        assert!(config.validate().is_err());
        config.generator.collision_target = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_long_negative_ttl() {
        let mut config = AppConfig::default();
        config.cache.negative_ttl_secs = config.cache.default_ttl_secs + 1;
        assert!(config.validate().is_err());
    }
}
