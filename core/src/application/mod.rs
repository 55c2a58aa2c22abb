//! Application layer - Tunnel supervision.
//!
//! This module contains the moving parts that coordinate tunnels:
//! - `ContextWatcher` polls the active context and reports switches
//! - `Supervisor` owns all worker state and decides restarts
//! - restart policies consulted by the supervisor
//!
//! Everything here depends only on the traits in `ports`, so collaborators
//! can be swapped for mocks in tests.

mod restart;
mod supervisor;
mod watcher;
mod worker;

pub use restart::{ExponentialBackoff, ImmediateRestart};
pub use supervisor::Supervisor;
pub use watcher::ContextWatcher;
