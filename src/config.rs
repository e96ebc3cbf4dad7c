// Resolver configuration

use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::lifecycle::LifecycleWindows;

// Upper bounds for the configurable windows and intervals
const MAX_WINDOW_DAYS: i64 = 3650;
const MAX_WINDOW_HOURS: i64 = MAX_WINDOW_DAYS * 24;
const MAX_STORAGE_TIMEOUT_MS: u64 = 10 * 60 * 1000;
const MAX_SWEEP_INTERVAL_SECONDS: u64 = 24 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    // Upper bound for any single store call
    pub storage_timeout_ms: u64,
    pub pending_expiry_hours: i64,
    pub cancellation_cutoff_hours: i64,
    pub review_window_days: i64,
    pub max_special_requests_len: usize,
    pub sweep_interval_seconds: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            storage_timeout_ms: 2000,
            pending_expiry_hours: 24,
            cancellation_cutoff_hours: 24,
            review_window_days: 14,
            max_special_requests_len: 1000,
            sweep_interval_seconds: 300,
        }
    }
}

impl ResolverConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: ResolverConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_STORAGE_TIMEOUT_MS).contains(&self.storage_timeout_ms) {
            return Err(ConfigError::Invalid(format!(
                "storage_timeout_ms must be between 1 and {}",
                MAX_STORAGE_TIMEOUT_MS
            )));
        }
        if !(1..=MAX_SWEEP_INTERVAL_SECONDS).contains(&self.sweep_interval_seconds) {
            return Err(ConfigError::Invalid(format!(
                "sweep_interval_seconds must be between 1 and {}",
                MAX_SWEEP_INTERVAL_SECONDS
            )));
        }
        for (name, value, max) in [
            ("pending_expiry_hours", self.pending_expiry_hours, MAX_WINDOW_HOURS),
            ("cancellation_cutoff_hours", self.cancellation_cutoff_hours, MAX_WINDOW_HOURS),
            ("review_window_days", self.review_window_days, MAX_WINDOW_DAYS),
        ] {
            if !(0..=max).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "{} must be between 0 and {}",
                    name, max
                )));
            }
        }
        Ok(())
    }

    pub fn storage_timeout(&self) -> Duration {
        Duration::from_millis(self.storage_timeout_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds)
    }

    // Clamped to the validated bounds, so an unvalidated config cannot
    // produce an out-of-range duration
    pub fn windows(&self) -> LifecycleWindows {
        let hours = |value: i64| chrono::Duration::hours(value.clamp(0, MAX_WINDOW_HOURS));
        let days = |value: i64| chrono::Duration::days(value.clamp(0, MAX_WINDOW_DAYS));
        LifecycleWindows {
            pending_expiry: hours(self.pending_expiry_hours),
            review_window: days(self.review_window_days),
            cancellation_cutoff: hours(self.cancellation_cutoff_hours),
        }
    }
}
