//! Active context lookup from kubeconfig files.

use std::path::PathBuf;

use serde::Deserialize;
use tokio::fs;

use crate::error::{Error, Result};
use crate::ports::ContextSource;

/// The only kubeconfig field this crate cares about.
#[derive(Debug, Default, Deserialize)]
struct KubeconfigFile {
    #[serde(default, rename = "current-context")]
    current_context: Option<String>,
}

/// Reads `current-context` the way kubectl merges kubeconfig files:
/// the first file that sets it wins.
#[derive(Debug, Clone)]
pub struct KubeconfigContextSource {
    paths: Vec<PathBuf>,
}

impl KubeconfigContextSource {
    /// Uses `KUBECONFIG` when set, otherwise `~/.kube/config`.
    pub fn new() -> Result<Self> {
        if let Some(value) = std::env::var_os("KUBECONFIG").filter(|v| !v.is_empty()) {
            let paths: Vec<PathBuf> = std::env::split_paths(&value)
                .filter(|p| !p.as_os_str().is_empty())
                .collect();
            if !paths.is_empty() {
                return Ok(Self { paths });
            }
        }

        let home = dirs::home_dir()
            .ok_or_else(|| Error::Config("Could not determine home directory".to_string()))?;
        Ok(Self {
            paths: vec![home.join(".kube").join("config")],
        })
    }

    /// Uses an explicit list of kubeconfig files.
    pub fn with_paths(paths: Vec<PathBuf>) -> Self {
        Self { paths }
    }
}

impl ContextSource for KubeconfigContextSource {
    async fn current(&self) -> Result<String> {
        let mut read_any = false;

        for path in &self.paths {
            let content = match fs::read_to_string(path).await {
                Ok(content) => content,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => {
                    return Err(Error::ContextSource(format!(
                        "cannot read {}: {}",
                        path.display(),
                        e
                    )))
                }
            };
            read_any = true;

            let file: KubeconfigFile = serde_yaml::from_str(&content).map_err(|e| {
                Error::ContextSource(format!("cannot parse {}: {}", path.display(), e))
            })?;

            if let Some(context) = file.current_context.filter(|c| !c.is_empty()) {
                return Ok(context);
            }
        }

        if read_any {
            Err(Error::ContextSource("current-context is not set".to_string()))
        } else {
            Err(Error::ContextSource("cannot find kubeconfig file".to_string()))
        }
    }
}
