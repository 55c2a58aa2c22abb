//! kubectl-backed collaborators.
//!
//! This module provides:
//! - Locating and executing the kubectl binary
//! - Service to pod resolution through label selectors
//! - `kubectl port-forward` as the tunnel transport

mod errors;
mod models;
mod resolver;
mod transport;

pub use errors::{KubectlError, Result};
pub use resolver::KubectlEndpointResolver;
pub use transport::KubectlTunnelTransport;

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::process::Command;
use tokio::time::timeout;

/// Default paths to search for kubectl.
const KUBECTL_PATHS: &[&str] = &[
    "/opt/homebrew/bin/kubectl", // Apple Silicon
    "/usr/local/bin/kubectl",    // Intel Mac / Homebrew
    "/usr/bin/kubectl",          // System
];

/// Timeout for one-shot kubectl queries.
const KUBECTL_TIMEOUT: Duration = Duration::from_secs(15);

/// Handle on the kubectl executable.
#[derive(Debug, Clone)]
pub struct Kubectl {
    path: Option<PathBuf>,
}

impl Kubectl {
    /// Searches the well-known install locations, then `PATH`.
    pub fn new() -> Self {
        let path = find_executable(KUBECTL_PATHS).or_else(|| find_in_path("kubectl"));
        Self { path }
    }

    /// Uses an explicit kubectl path.
    pub fn with_path(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    pub fn path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }

    pub fn is_available(&self) -> bool {
        self.path.is_some()
    }

    /// Runs a kubectl query and returns its stdout.
    pub async fn execute(&self, args: &[&str]) -> Result<String> {
        let kubectl_path = self.path.as_ref().ok_or(KubectlError::KubectlNotFound)?;

        let result = timeout(KUBECTL_TIMEOUT, async {
            let output = Command::new(kubectl_path)
                .args(args)
                .kill_on_drop(true)
                .output()
                .await?;

            Ok::<_, std::io::Error>((output.status, output.stdout, output.stderr))
        })
        .await;

        match result {
            Ok(Ok((status, stdout, stderr))) => {
                if status.success() {
                    String::from_utf8(stdout)
                        .map_err(|e| KubectlError::ParsingFailed(e.to_string()))
                } else {
                    let stderr_str = String::from_utf8_lossy(&stderr);
                    Err(KubectlError::from_kubectl_error(&stderr_str))
                }
            }
            Ok(Err(e)) => Err(KubectlError::Io(e)),
            Err(_) => Err(KubectlError::Timeout),
        }
    }
}

impl Default for Kubectl {
    fn default() -> Self {
        Self::new()
    }
}

/// Finds an executable in the given paths.
fn find_executable(paths: &[&str]) -> Option<PathBuf> {
    paths.iter().map(PathBuf::from).find(|p| p.exists())
}

fn find_in_path(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(name))
        .find(|candidate| is_file(candidate))
}

fn is_file(path: &Path) -> bool {
    path.metadata().map(|m| m.is_file()).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_executable() {
        // Test with a path that should exist on most systems
        let result = find_executable(&["/nonexistent/path", "/bin/sh"]);
        assert_eq!(result, Some(PathBuf::from("/bin/sh")));

        // Test with a path that shouldn't exist
        let result = find_executable(&["/nonexistent/path"]);
        assert!(result.is_none());
    }

    #[test]
    fn test_find_in_path() {
        assert!(find_in_path("sh").is_some());
        assert!(find_in_path("definitely-not-a-real-binary-kpfm").is_none());
    }

    #[tokio::test]
    async fn test_execute_without_kubectl() {
        let kubectl = Kubectl::with_path(None);
        assert!(!kubectl.is_available());

        let result = kubectl.execute(&["version"]).await;
        assert!(matches!(result, Err(KubectlError::KubectlNotFound)));
    }
}
