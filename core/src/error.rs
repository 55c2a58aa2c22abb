//! Error types for the kpfm-core library.

use thiserror::Error;

use crate::adapters::kubectl::KubectlError;

/// Result type alias for kpfm operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that stop the process at startup.
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The active kube context could not be read.
    #[error("Could not read active kube context: {0}")]
    ContextSource(String),

    /// The configuration file is not valid YAML for the expected shape.
    #[error("Failed to parse config: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Failure to turn a service name into a pod name.
#[derive(Error, Debug)]
pub enum EndpointError {
    #[error("service {namespace}/{service} has no selector")]
    NoSelector { namespace: String, service: String },

    #[error("no pods found for service {namespace}/{service}")]
    NoPodsFound { namespace: String, service: String },

    #[error(transparent)]
    Kubernetes(#[from] KubectlError),
}

/// Failure of an established or starting tunnel.
#[derive(Error, Debug)]
pub enum TunnelError {
    #[error("Failed to start port-forward: {0}")]
    Spawn(String),

    #[error("port-forward exited ({status}): {stderr}")]
    Exited { status: String, stderr: String },

    #[error(transparent)]
    Kubernetes(#[from] KubectlError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a worker ended with a failure. Both kinds take the restart path.
#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("endpoint resolution failed: {0}")]
    Endpoint(#[from] EndpointError),

    #[error("tunnel failed: {0}")]
    Tunnel(#[from] TunnelError),
}
