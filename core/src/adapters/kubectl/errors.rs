//! Errors raised while talking to the cluster through kubectl.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, KubectlError>;

/// stderr fragments that mean the API server could not be reached.
const NOT_CONNECTED_PATTERNS: &[&str] = &[
    "connection refused",
    "no configuration has been provided",
    "dial tcp",
    "unable to connect to the server",
    "i/o timeout",
];

#[derive(Error, Debug)]
pub enum KubectlError {
    #[error("kubectl executable not found")]
    KubectlNotFound,

    #[error("Cluster not reachable: {0}")]
    ClusterNotConnected(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("kubectl failed: {0}")]
    CommandFailed(String),

    #[error("Failed to parse kubectl output: {0}")]
    ParsingFailed(String),

    #[error("kubectl timed out")]
    Timeout,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl KubectlError {
    /// Classifies kubectl's stderr output.
    pub fn from_kubectl_error(stderr: &str) -> Self {
        let message = stderr.trim().to_string();
        let lower = message.to_lowercase();

        if NOT_CONNECTED_PATTERNS.iter().any(|p| lower.contains(p)) {
            Self::ClusterNotConnected(message)
        } else if lower.contains("notfound") || lower.contains("not found") {
            Self::NotFound(message)
        } else {
            Self::CommandFailed(message)
        }
    }
}
