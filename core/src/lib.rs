//! kpfm core library
//!
//! Keeps a set of Kubernetes port forwards alive and re-targets them
//! whenever the operator switches kube context.
//! Provides functionality to:
//! - Load contexts and their connections from a YAML file
//! - Watch the active kube context for switches
//! - Resolve services to pods and run `kubectl port-forward` tunnels
//! - Supervise every tunnel, restarting failures through a pluggable policy
//!
//! # Architecture
//! This library follows hexagonal architecture (ports & adapters):
//! - `domain`: Pure data models
//! - `ports`: Trait definitions (interfaces)
//! - `adapters`: kubeconfig and kubectl implementations
//! - `application`: Watcher, supervisor and restart policies

// Hexagonal architecture layers
pub mod adapters;
pub mod application;
pub mod domain;
pub mod ports;

pub mod config;
pub mod error;

// Re-export domain types (primary API)
pub use domain::{
    ClusterContext, Connection, ContextSet, ServiceIdentity, StatusEvent, SupervisorSnapshot,
    Target, TunnelOutcome, WorkerSnapshot, WorkerState,
};

// Re-export other commonly used types
pub use application::{ContextWatcher, ExponentialBackoff, ImmediateRestart, Supervisor};
pub use config::{Config, ConfigStore, RestartSettings};
pub use error::{EndpointError, Error, Result, TunnelError, WorkerError};
pub use ports::{
    ContextSource, EndpointResolver, RestartDecision, RestartPolicy, TunnelRequest,
    TunnelTransport,
};
