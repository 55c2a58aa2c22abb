//! Restart policy port (interface).

use std::time::Duration;

use crate::domain::ServiceIdentity;

/// What to do after a worker failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartDecision {
    /// Start a replacement after waiting `delay`.
    Restart { delay: Duration },
    /// Leave the connection stopped.
    GiveUp,
}

/// Port consulted by the supervisor before every restart.
pub trait RestartPolicy: Send + Sync {
    /// `consecutive_failures` is at least 1 and counts the failure being handled.
    fn decide(&self, identity: &ServiceIdentity, consecutive_failures: u32) -> RestartDecision;
}
