//! Domain layer - Pure data models.
//!
//! This module contains the contexts, connections and worker lifecycle types.
//! These types have no I/O dependencies and can be tested in isolation.

mod connection;
mod worker;

// Re-export all domain types
pub use connection::{ClusterContext, Connection, ContextSet, ServiceIdentity, Target};
pub use worker::{
    StatusEvent, SupervisorSnapshot, TunnelOutcome, WorkerMessage, WorkerSnapshot, WorkerState,
};
