//! Configuration schema types
//!
//! This module defines the configuration structure for Quire. Every field
//! has a serde default, so an empty file is a valid configuration.

use crate::core::export::policy::ReconciliationMode;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Main Quire configuration
///
/// This is the root configuration structure that maps to the TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuireConfig {
    /// Application-level settings
    #[serde(default)]
    pub application: ApplicationConfig,

    /// Export defaults (page size, policy, destination)
    #[serde(default)]
    pub export: ExportConfig,

    /// Retry and timeout policy for page workers, merge and publish
    #[serde(default)]
    pub retry: RetryConfig,

    /// Batch coordinator settings
    #[serde(default)]
    pub coordinator: CoordinatorConfig,

    /// Scratch area for chunk and merged files
    #[serde(default)]
    pub scratch: ScratchConfig,

    /// Durable artifact store
    #[serde(default)]
    pub store: StoreConfig,

    /// Export record persistence
    #[serde(default)]
    pub repository: RepositoryConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl QuireConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid
    pub fn validate(&self) -> Result<(), String> {
        self.application.validate()?;
        self.export.validate()?;
        self.retry.validate()?;
        self.coordinator.validate()?;
        self.scratch.validate()?;
        self.store.validate()?;
        self.repository.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Application name, used in log lines
    #[serde(default = "default_app_name")]
    pub name: String,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            log_level: default_log_level(),
        }
    }
}

impl ApplicationConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }
        Ok(())
    }
}

/// Export defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Export name, embedded in the merged file name
    #[serde(default = "default_export_name")]
    pub name: String,

    /// Rows per page
    #[serde(default = "default_page_size")]
    pub page_size: u64,

    /// Barrier failure policy (tolerant or strict)
    #[serde(default)]
    pub policy: ReconciliationMode,

    /// Destination disk in the durable store
    #[serde(default = "default_disk")]
    pub disk: String,

    /// Destination directory on the disk, may be empty
    #[serde(default)]
    pub directory: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            name: default_export_name(),
            page_size: default_page_size(),
            policy: ReconciliationMode::default(),
            disk: default_disk(),
            directory: String::new(),
        }
    }
}

impl ExportConfig {
    fn validate(&self) -> Result<(), String> {
        validate_export_name(&self.name)?;

        if self.page_size == 0 {
            return Err("export.page_size must be > 0".to_string());
        }

        if self.disk.trim().is_empty() {
            return Err("export.disk cannot be empty".to_string());
        }

        if self.directory.split(['/', '\\']).any(|s| s == "..") {
            return Err(format!(
                "export.directory '{}' must not contain '..' segments",
                self.directory
            ));
        }

        Ok(())
    }
}

/// Export names end up in file names, so they must be a single path segment
pub fn validate_export_name(name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("export.name cannot be empty".to_string());
    }
    if name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(format!(
            "export.name '{name}' must not contain path separators"
        ));
    }
    Ok(())
}

/// Retry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Attempts per unit of work, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Per-attempt timeout in seconds
    #[serde(default = "default_attempt_timeout_secs")]
    pub attempt_timeout_secs: u64,

    /// Overall retry deadline in seconds
    #[serde(default = "default_deadline_secs")]
    pub deadline_secs: u64,

    /// Initial backoff in milliseconds
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Maximum backoff in milliseconds
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// Backoff multiplier
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Randomize backoff delays
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            attempt_timeout_secs: default_attempt_timeout_secs(),
            deadline_secs: default_deadline_secs(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

impl RetryConfig {
    fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 {
            return Err("retry.max_attempts must be >= 1".to_string());
        }
        if self.max_attempts > 100 {
            return Err(format!(
                "retry.max_attempts must be <= 100, got {}",
                self.max_attempts
            ));
        }
        if self.attempt_timeout_secs == 0 {
            return Err("retry.attempt_timeout_secs must be > 0".to_string());
        }
        if self.deadline_secs < self.attempt_timeout_secs {
            return Err(format!(
                "retry.deadline_secs ({}) must be >= retry.attempt_timeout_secs ({})",
                self.deadline_secs, self.attempt_timeout_secs
            ));
        }
        if self.initial_backoff_ms > self.max_backoff_ms {
            return Err(format!(
                "retry.initial_backoff_ms ({}) must be <= retry.max_backoff_ms ({})",
                self.initial_backoff_ms, self.max_backoff_ms
            ));
        }
        if self.backoff_multiplier.is_nan() || self.backoff_multiplier < 1.0 {
            return Err(format!(
                "retry.backoff_multiplier must be >= 1.0, got {}",
                self.backoff_multiplier
            ));
        }
        Ok(())
    }
}

/// Batch coordinator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Maximum page workers running at once
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
        }
    }
}

impl CoordinatorConfig {
    fn validate(&self) -> Result<(), String> {
        if self.max_concurrency == 0 || self.max_concurrency > 256 {
            return Err(format!(
                "coordinator.max_concurrency must be between 1 and 256, got {}",
                self.max_concurrency
            ));
        }
        Ok(())
    }
}

/// Scratch area configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScratchConfig {
    /// Directory holding chunk files and merged files before publish
    #[serde(default = "default_scratch_directory")]
    pub directory: String,
}

impl Default for ScratchConfig {
    fn default() -> Self {
        Self {
            directory: default_scratch_directory(),
        }
    }
}

impl ScratchConfig {
    fn validate(&self) -> Result<(), String> {
        if self.directory.trim().is_empty() {
            return Err("scratch.directory cannot be empty".to_string());
        }
        Ok(())
    }
}

/// Durable store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Root directory of the local disk store
    #[serde(default = "default_store_root")]
    pub root: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: default_store_root(),
        }
    }
}

impl StoreConfig {
    fn validate(&self) -> Result<(), String> {
        if self.root.trim().is_empty() {
            return Err("store.root cannot be empty".to_string());
        }
        Ok(())
    }
}

/// Export repository backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepositoryBackend {
    /// Records live only for the lifetime of the process
    Memory,
    /// Records are persisted to a JSON file
    #[default]
    JsonFile,
}

impl FromStr for RepositoryBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "memory" => Ok(Self::Memory),
            "json_file" => Ok(Self::JsonFile),
            other => Err(format!(
                "Invalid repository backend '{other}'. Must be one of: memory, json_file"
            )),
        }
    }
}

/// Export repository configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Backend (memory or json_file)
    #[serde(default)]
    pub backend: RepositoryBackend,

    /// JSON file path for the json_file backend
    #[serde(default = "default_repository_path")]
    pub path: String,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            backend: RepositoryBackend::default(),
            path: default_repository_path(),
        }
    }
}

impl RepositoryConfig {
    fn validate(&self) -> Result<(), String> {
        if self.backend == RepositoryBackend::JsonFile && self.path.trim().is_empty() {
            return Err(
                "repository.path is required when repository.backend = 'json_file'".to_string(),
            );
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Enable local file logging
    #[serde(default = "default_true")]
    pub local_enabled: bool,

    /// Local log directory
    #[serde(default = "default_local_path")]
    pub local_path: String,

    /// Log rotation strategy (daily, hourly, never)
    #[serde(default = "default_local_rotation")]
    pub local_rotation: String,

    /// Rotated log files to keep
    #[serde(default = "default_local_max_files")]
    pub local_max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: true,
            local_path: default_local_path(),
            local_rotation: default_local_rotation(),
            local_max_files: default_local_max_files(),
        }
    }
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid logging.local_rotation '{}'. Must be one of: {}",
                self.local_rotation,
                valid_rotations.join(", ")
            ));
        }

        if self.local_max_files == 0 {
            return Err("logging.local_max_files must be > 0".to_string());
        }

        Ok(())
    }
}

fn default_app_name() -> String {
    "quire".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_export_name() -> String {
    "export".to_string()
}

fn default_page_size() -> u64 {
    2000
}

fn default_disk() -> String {
    "local".to_string()
}

fn default_true() -> bool {
    true
}

fn default_max_attempts() -> u32 {
    6
}

fn default_attempt_timeout_secs() -> u64 {
    90
}

fn default_deadline_secs() -> u64 {
    3600
}

fn default_initial_backoff_ms() -> u64 {
    1000
}

fn default_max_backoff_ms() -> u64 {
    30_000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_max_concurrency() -> usize {
    4
}

fn default_scratch_directory() -> String {
    "./scratch".to_string()
}

fn default_store_root() -> String {
    "./artifacts".to_string()
}

fn default_repository_path() -> String {
    "./quire-exports.json".to_string()
}

fn default_local_path() -> String {
    "./logs".to_string()
}

fn default_local_rotation() -> String {
    "daily".to_string()
}

fn default_local_max_files() -> usize {
    14
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config: QuireConfig = toml::from_str("").unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.export.page_size, 2000);
        assert_eq!(config.export.policy, ReconciliationMode::Tolerant);
        assert_eq!(config.export.disk, "local");
        assert_eq!(config.export.directory, "");
        assert_eq!(config.retry.max_attempts, 6);
        assert_eq!(config.retry.attempt_timeout_secs, 90);
        assert_eq!(config.retry.deadline_secs, 3600);
        assert_eq!(config.coordinator.max_concurrency, 4);
        assert_eq!(config.repository.backend, RepositoryBackend::JsonFile);
    }

    #[test]
    fn test_application_config_validation() {
        let mut config = ApplicationConfig::default();
        assert!(config.validate().is_ok());

        config.log_level = "invalid".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_export_config_validation() {
        let mut config = ExportConfig::default();
        assert!(config.validate().is_ok());

        config.page_size = 0;
        assert!(config.validate().is_err());

        config.page_size = 500;
        config.name = "reports/daily".to_string();
        assert!(config.validate().is_err());

        config.name = "daily".to_string();
        config.directory = "a/../../b".to_string();
        assert!(config.validate().is_err());

        config.directory = "exports/2025".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_retry_config_validation() {
        let mut config = RetryConfig::default();
        assert!(config.validate().is_ok());

        config.max_attempts = 0;
        assert!(config.validate().is_err());

        config.max_attempts = 3;
        config.deadline_secs = 10;
        assert!(config.validate().unwrap_err().contains("deadline_secs"));

        config.deadline_secs = 3600;
        config.backoff_multiplier = 0.5;
        assert!(config.validate().is_err());

        config.backoff_multiplier = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_coordinator_config_validation() {
        let mut config = CoordinatorConfig::default();
        assert!(config.validate().is_ok());

        config.max_concurrency = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_policy_and_backend_parse_from_toml() {
        let config: QuireConfig = toml::from_str(
            r#"
            [export]
            policy = "strict"

            [repository]
            backend = "memory"
            "#,
        )
        .unwrap();
        assert_eq!(config.export.policy, ReconciliationMode::Strict);
        assert_eq!(config.repository.backend, RepositoryBackend::Memory);
    }

    #[test]
    fn test_logging_config_validation() {
        let mut config = LoggingConfig::default();
        assert!(config.validate().is_ok());

        config.local_rotation = "weekly".to_string();
        assert!(config.validate().is_err());
    }
}
