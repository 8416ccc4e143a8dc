//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the Quire configuration file.

use crate::config::load_config;
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        // Loading also validates
        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Configuration is invalid");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        println!("✅ Configuration is valid");
        println!();
        println!("Configuration Summary:");
        println!("  Application: {}", config.application.name);
        println!("  Log Level: {}", config.application.log_level);
        println!("  Export Name: {}", config.export.name);
        println!("  Page Size: {}", config.export.page_size);
        println!("  Policy: {}", config.export.policy);
        println!(
            "  Destination: {}:{}",
            config.export.disk,
            if config.export.directory.is_empty() {
                "/"
            } else {
                config.export.directory.as_str()
            }
        );
        println!("  Max Attempts: {}", config.retry.max_attempts);
        println!(
            "  Attempt Timeout: {}s",
            config.retry.attempt_timeout_secs
        );
        println!("  Max Concurrency: {}", config.coordinator.max_concurrency);
        println!("  Scratch Directory: {}", config.scratch.directory);
        println!("  Store Root: {}", config.store.root);
        println!("  Repository: {:?} ({})", config.repository.backend, config.repository.path);
        println!();
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_valid_config_returns_zero() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("quire.toml");
        std::fs::write(&path, "[export]\nname = \"visits\"\npage_size = 100\n").unwrap();

        let code = ValidateArgs {}
            .execute(&path.to_string_lossy())
            .await
            .unwrap();
        assert_eq!(code, 0);
    }

    #[tokio::test]
    async fn test_invalid_config_returns_two() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("quire.toml");
        std::fs::write(&path, "[export]\npage_size = 0\n").unwrap();

        let code = ValidateArgs {}
            .execute(&path.to_string_lossy())
            .await
            .unwrap();
        assert_eq!(code, 2);
    }
}
