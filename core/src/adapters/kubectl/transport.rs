//! `kubectl port-forward` as a tunnel transport.

use std::collections::VecDeque;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::errors::KubectlError;
use super::Kubectl;
use crate::domain::TunnelOutcome;
use crate::error::TunnelError;
use crate::ports::{TunnelRequest, TunnelTransport};

/// Number of trailing stderr lines kept for the failure report.
const STDERR_TAIL_LINES: usize = 5;

/// Runs one `kubectl port-forward` child per tunnel.
#[derive(Debug, Clone, Default)]
pub struct KubectlTunnelTransport {
    kubectl: Kubectl,
}

impl KubectlTunnelTransport {
    pub fn new(kubectl: Kubectl) -> Self {
        Self { kubectl }
    }

    async fn forward(
        &self,
        request: &TunnelRequest,
        cancel: &CancellationToken,
    ) -> Result<TunnelOutcome, TunnelError> {
        let kubectl_path = self.kubectl.path().ok_or(KubectlError::KubectlNotFound)?;

        let mut child = Command::new(kubectl_path)
            .args(port_forward_args(request))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| TunnelError::Spawn(e.to_string()))?;

        let label = format!("{}/{}", request.namespace, request.pod);
        let stdout = child
            .stdout
            .take()
            .map(|out| tokio::spawn(read_tail(out, label.clone())));
        let stderr = child
            .stderr
            .take()
            .map(|err| tokio::spawn(read_tail(err, label.clone())));

        // A child that exits while the token fires still ended by cancellation.
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                // Already-exited children report an error here; either way it is gone.
                let _ = child.kill().await;
                debug!(pod = %label, "port-forward cancelled");
                Ok(TunnelOutcome::Cancelled)
            }
            status = child.wait() => {
                let status = status?;
                if let Some(task) = stdout {
                    let _ = task.await;
                }
                let stderr = match stderr {
                    Some(task) => task.await.unwrap_or_default(),
                    None => String::new(),
                };
                Ok(TunnelOutcome::Failed(
                    TunnelError::Exited {
                        status: status.to_string(),
                        stderr,
                    }
                    .into(),
                ))
            }
        }
    }
}

impl TunnelTransport for KubectlTunnelTransport {
    async fn start(&self, request: TunnelRequest, cancel: CancellationToken) -> TunnelOutcome {
        info!(
            pod = %request.pod,
            namespace = %request.namespace,
            "Forwarding 127.0.0.1:{} -> {}",
            request.local_port,
            request.remote_port
        );
        match self.forward(&request, &cancel).await {
            Ok(outcome) => outcome,
            Err(e) => TunnelOutcome::Failed(e.into()),
        }
    }
}

fn port_forward_args(request: &TunnelRequest) -> Vec<String> {
    vec![
        "port-forward".to_string(),
        "-n".to_string(),
        request.namespace.clone(),
        format!("pod/{}", request.pod),
        format!("{}:{}", request.local_port, request.remote_port),
        "--address=127.0.0.1".to_string(),
    ]
}

/// Logs each line at debug level and returns the last few lines joined.
async fn read_tail<R: AsyncRead + Unpin>(reader: R, label: String) -> String {
    let mut lines = BufReader::new(reader).lines();
    let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);

    while let Ok(Some(line)) = lines.next_line().await {
        debug!(pod = %label, "kubectl: {}", line);
        if tail.len() == STDERR_TAIL_LINES {
            tail.pop_front();
        }
        tail.push_back(line);
    }

    tail.into_iter().collect::<Vec<_>>().join("\n")
}
