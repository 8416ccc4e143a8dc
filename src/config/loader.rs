//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::QuireConfig;
use crate::domain::errors::QuireError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into QuireConfig
/// 4. Applies environment variable overrides (QUIRE_* prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns a configuration error if the file cannot be read, TOML parsing
/// fails, a referenced environment variable is missing, an override cannot
/// be parsed, or validation fails.
///
/// # Examples
///
/// ```no_run
/// use quire::config::loader::load_config;
///
/// let config = load_config("quire.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<QuireConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(QuireError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        QuireError::Configuration(format!(
            "Failed to read configuration file {}: {e}",
            path.display()
        ))
    })?;

    load_config_str(&contents)
}

/// Loads configuration from TOML text, with the same substitution,
/// override and validation steps as [`load_config`]
pub fn load_config_str(contents: &str) -> Result<QuireConfig> {
    let contents = substitute_env_vars(contents)?;

    let mut config: QuireConfig = toml::from_str(&contents)?;

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        QuireError::Configuration(format!("Configuration validation failed: {e}"))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are left untouched.
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| QuireError::Configuration(format!("Invalid substitution pattern: {e}")))?;
    let mut result = String::with_capacity(input.len());
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let processed = re.replace_all(line, |caps: &regex::Captures<'_>| {
            let var_name = &caps[1];
            match std::env::var(var_name) {
                Ok(value) => value,
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                    String::new()
                }
            }
        });
        result.push_str(&processed);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(QuireError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

/// Overwrite `target` with the parsed value of `key`, if set
fn env_override<T>(key: &str, target: &mut T) -> Result<()>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    if let Ok(raw) = std::env::var(key) {
        *target = raw.trim().parse().map_err(|e| {
            QuireError::Configuration(format!("Invalid value '{raw}' for {key}: {e}"))
        })?;
    }
    Ok(())
}

/// Applies environment variable overrides using the QUIRE_* prefix
///
/// Environment variables follow the pattern QUIRE_<SECTION>_<KEY>, for
/// example QUIRE_EXPORT_PAGE_SIZE or QUIRE_RETRY_MAX_ATTEMPTS.
fn apply_env_overrides(config: &mut QuireConfig) -> Result<()> {
    // Application overrides
    env_override("QUIRE_APPLICATION_NAME", &mut config.application.name)?;
    env_override("QUIRE_APPLICATION_LOG_LEVEL", &mut config.application.log_level)?;

    // Export overrides
    env_override("QUIRE_EXPORT_NAME", &mut config.export.name)?;
    env_override("QUIRE_EXPORT_PAGE_SIZE", &mut config.export.page_size)?;
    env_override("QUIRE_EXPORT_POLICY", &mut config.export.policy)?;
    env_override("QUIRE_EXPORT_DISK", &mut config.export.disk)?;
    env_override("QUIRE_EXPORT_DIRECTORY", &mut config.export.directory)?;

    // Retry overrides
    env_override("QUIRE_RETRY_MAX_ATTEMPTS", &mut config.retry.max_attempts)?;
    env_override(
        "QUIRE_RETRY_ATTEMPT_TIMEOUT_SECS",
        &mut config.retry.attempt_timeout_secs,
    )?;
    env_override("QUIRE_RETRY_DEADLINE_SECS", &mut config.retry.deadline_secs)?;
    env_override(
        "QUIRE_RETRY_INITIAL_BACKOFF_MS",
        &mut config.retry.initial_backoff_ms,
    )?;
    env_override("QUIRE_RETRY_MAX_BACKOFF_MS", &mut config.retry.max_backoff_ms)?;
    env_override(
        "QUIRE_RETRY_BACKOFF_MULTIPLIER",
        &mut config.retry.backoff_multiplier,
    )?;
    env_override("QUIRE_RETRY_JITTER", &mut config.retry.jitter)?;

    // Coordinator overrides
    env_override(
        "QUIRE_COORDINATOR_MAX_CONCURRENCY",
        &mut config.coordinator.max_concurrency,
    )?;

    // Scratch, store and repository overrides
    env_override("QUIRE_SCRATCH_DIRECTORY", &mut config.scratch.directory)?;
    env_override("QUIRE_STORE_ROOT", &mut config.store.root)?;
    env_override("QUIRE_REPOSITORY_BACKEND", &mut config.repository.backend)?;
    env_override("QUIRE_REPOSITORY_PATH", &mut config.repository.path)?;

    // Logging overrides
    env_override("QUIRE_LOGGING_LOCAL_ENABLED", &mut config.logging.local_enabled)?;
    env_override("QUIRE_LOGGING_LOCAL_PATH", &mut config.logging.local_path)?;
    env_override(
        "QUIRE_LOGGING_LOCAL_ROTATION",
        &mut config.logging.local_rotation,
    )?;
    env_override(
        "QUIRE_LOGGING_LOCAL_MAX_FILES",
        &mut config.logging.local_max_files,
    )?;

    Ok(())
}
