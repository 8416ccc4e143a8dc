//! Export policy value object
//!
//! One orchestrator and one collator serve every export; behavioural
//! differences between runs are expressed here rather than in separate types.

use crate::config::schema::{CoordinatorConfig, RetryConfig};
use crate::config::QuireConfig;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// How the barrier treats failed pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReconciliationMode {
    /// Collate once every page is terminal, even if some failed
    #[default]
    Tolerant,
    /// Any page failure cancels the run; collation never starts
    Strict,
}

impl ReconciliationMode {
    /// Lowercase name as used in configuration
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tolerant => "tolerant",
            Self::Strict => "strict",
        }
    }
}

impl fmt::Display for ReconciliationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReconciliationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "tolerant" => Ok(Self::Tolerant),
            "strict" => Ok(Self::Strict),
            other => Err(format!(
                "Invalid policy '{other}'. Must be one of: tolerant, strict"
            )),
        }
    }
}

/// Bounded retry with exponential backoff
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Attempts including the first one
    pub max_attempts: u32,
    /// Wall-clock budget of a single attempt
    pub attempt_timeout: Duration,
    /// No retry starts once this much time has passed since the first attempt
    pub deadline: Duration,
    /// Delay before the second attempt
    pub initial_backoff: Duration,
    /// Upper bound of any delay
    pub max_backoff: Duration,
    /// Growth factor between consecutive delays
    pub multiplier: f64,
    /// Randomize each delay within [50%, 100%] of its nominal value
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 6,
            attempt_timeout: Duration::from_secs(90),
            deadline: Duration::from_secs(3600),
            initial_backoff: Duration::from_millis(1000),
            max_backoff: Duration::from_millis(30_000),
            multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay to wait after the failed attempt numbered `attempt` (1-based)
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31) as i32;
        let nominal_ms = self.initial_backoff.as_millis() as f64 * self.multiplier.powi(exponent);
        let capped_ms = nominal_ms.min(self.max_backoff.as_millis() as f64).max(0.0);

        let ms = if self.jitter && capped_ms > 0.0 {
            rand::thread_rng().gen_range(capped_ms / 2.0..=capped_ms)
        } else {
            capped_ms
        };
        Duration::from_millis(ms as u64)
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            attempt_timeout: Duration::from_secs(config.attempt_timeout_secs),
            deadline: Duration::from_secs(config.deadline_secs),
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
            multiplier: config.backoff_multiplier,
            jitter: config.jitter,
        }
    }
}

/// Everything that varies between export runs besides the data itself
#[derive(Debug, Clone, PartialEq)]
pub struct ExportPolicy {
    /// Failure tolerance of the barrier
    pub reconciliation: ReconciliationMode,
    /// Retry policy shared by page workers, merge and publish
    pub retry: RetryPolicy,
    /// Maximum page workers running at once
    pub max_concurrency: usize,
}

impl Default for ExportPolicy {
    fn default() -> Self {
        Self {
            reconciliation: ReconciliationMode::Tolerant,
            retry: RetryPolicy::default(),
            max_concurrency: CoordinatorConfig::default().max_concurrency,
        }
    }
}

impl ExportPolicy {
    /// Builds the policy from loaded configuration
    pub fn from_config(config: &QuireConfig) -> Self {
        Self {
            reconciliation: config.export.policy,
            retry: RetryPolicy::from(&config.retry),
            max_concurrency: config.coordinator.max_concurrency,
        }
    }

    /// Whether a failed page aborts the whole run
    pub fn is_strict(&self) -> bool {
        self.reconciliation == ReconciliationMode::Strict
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn no_jitter() -> RetryPolicy {
        RetryPolicy {
            jitter: false,
            ..RetryPolicy::default()
        }
    }

    #[test_case(1, 1000 ; "first retry waits the initial backoff")]
    #[test_case(2, 2000 ; "second retry doubles")]
    #[test_case(5, 16000 ; "fifth retry")]
    #[test_case(6, 30000 ; "capped at max backoff")]
    #[test_case(40, 30000 ; "large attempts stay capped")]
    fn test_backoff_for(attempt: u32, expected_ms: u64) {
        assert_eq!(
            no_jitter().backoff_for(attempt),
            Duration::from_millis(expected_ms)
        );
    }

    #[test]
    fn test_jitter_stays_within_bounds() {
        let policy = RetryPolicy::default();
        for attempt in 1..8 {
            let nominal = no_jitter().backoff_for(attempt);
            let delay = policy.backoff_for(attempt);
            assert!(delay <= nominal);
            assert!(delay >= nominal / 2 - Duration::from_millis(1));
        }
    }

    #[test]
    fn test_defaults() {
        let policy = ExportPolicy::default();
        assert_eq!(policy.reconciliation, ReconciliationMode::Tolerant);
        assert_eq!(policy.retry.max_attempts, 6);
        assert_eq!(policy.retry.attempt_timeout, Duration::from_secs(90));
        assert_eq!(policy.retry.deadline, Duration::from_secs(3600));
        assert!(!policy.is_strict());
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!(
            "STRICT".parse::<ReconciliationMode>().unwrap(),
            ReconciliationMode::Strict
        );
        assert!("lenient".parse::<ReconciliationMode>().is_err());
    }

    #[test]
    fn test_from_config() {
        let mut config = QuireConfig::default();
        config.export.policy = ReconciliationMode::Strict;
        config.retry.max_attempts = 2;
        config.coordinator.max_concurrency = 9;

        let policy = ExportPolicy::from_config(&config);
        assert!(policy.is_strict());
        assert_eq!(policy.retry.max_attempts, 2);
        assert_eq!(policy.max_concurrency, 9);
    }
}
