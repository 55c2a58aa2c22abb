//! Restart policies.

use std::time::Duration;

use crate::config::RestartSettings;
use crate::domain::ServiceIdentity;
use crate::ports::{RestartDecision, RestartPolicy};

/// Restarts every failed tunnel at once, without limit.
///
/// A target that is permanently gone restarts in a tight loop under this policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImmediateRestart;

impl RestartPolicy for ImmediateRestart {
    fn decide(&self, _identity: &ServiceIdentity, _consecutive_failures: u32) -> RestartDecision {
        RestartDecision::Restart {
            delay: Duration::ZERO,
        }
    }
}

/// Exponential backoff with an optional attempt ceiling.
#[derive(Debug, Clone, PartialEq)]
pub struct ExponentialBackoff {
    /// Delay before the first restart.
    pub initial: Duration,
    /// Upper bound for any delay.
    pub max: Duration,
    /// Growth factor between consecutive failures.
    pub multiplier: f64,
    /// Consecutive failures after which the connection is left stopped (None = unlimited).
    pub max_attempts: Option<u32>,
}

impl ExponentialBackoff {
    /// Delay for the n-th consecutive failure (1-based).
    pub fn delay_for(&self, consecutive_failures: u32) -> Duration {
        let exponent = consecutive_failures.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.initial.as_secs_f64() * self.multiplier.powi(exponent);

        if !secs.is_finite() || secs >= self.max.as_secs_f64() {
            self.max
        } else {
            Duration::from_secs_f64(secs.max(0.0))
        }
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::from(&RestartSettings::default())
    }
}

impl From<&RestartSettings> for ExponentialBackoff {
    fn from(settings: &RestartSettings) -> Self {
        Self {
            initial: Duration::from_millis(settings.initial_backoff_ms),
            max: Duration::from_millis(settings.max_backoff_ms),
            multiplier: settings.multiplier,
            max_attempts: settings.max_attempts,
        }
    }
}

impl RestartPolicy for ExponentialBackoff {
    fn decide(&self, _identity: &ServiceIdentity, consecutive_failures: u32) -> RestartDecision {
        if let Some(max_attempts) = self.max_attempts {
            if consecutive_failures > max_attempts {
                return RestartDecision::GiveUp;
            }
        }

        RestartDecision::Restart {
            delay: self.delay_for(consecutive_failures),
        }
    }
}
