//! Tunnel worker task.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

use crate::domain::{Connection, ServiceIdentity, StatusEvent, TunnelOutcome, WorkerMessage};
use crate::ports::{EndpointResolver, TunnelRequest, TunnelTransport};

/// Runs one tunnel's lifetime on its own task.
///
/// The worker never touches supervisor state. It reports `Started` once the
/// endpoint is resolved and exactly one `Terminated` at the end.
pub(crate) struct Worker<R, T> {
    pub(crate) id: Uuid,
    pub(crate) connection: Connection,
    pub(crate) delay: Duration,
    pub(crate) cancel: CancellationToken,
    pub(crate) resolver: Arc<R>,
    pub(crate) transport: Arc<T>,
    pub(crate) messages: mpsc::Sender<WorkerMessage>,
}

impl<R, T> Worker<R, T>
where
    R: EndpointResolver,
    T: TunnelTransport,
{
    pub(crate) async fn run(self) {
        let identity = self.connection.identity();
        let outcome = self.drive(&identity).await;

        let event = StatusEvent {
            worker_id: self.id,
            identity,
            outcome,
        };
        if self
            .messages
            .send(WorkerMessage::Terminated(event))
            .await
            .is_err()
        {
            debug!(worker = %self.id, "Supervisor gone, dropping status event");
        }
    }

    async fn drive(&self, identity: &ServiceIdentity) -> TunnelOutcome {
        if !self.delay.is_zero() {
            debug!(%identity, delay_ms = self.delay.as_millis() as u64, "Waiting before restart");
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return TunnelOutcome::Cancelled,
                _ = tokio::time::sleep(self.delay) => {}
            }
        }

        let pod = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return TunnelOutcome::Cancelled,
            resolved = self.resolver.resolve(&self.connection.namespace, &self.connection.target) => {
                match resolved {
                    Ok(pod) => pod,
                    Err(e) => return TunnelOutcome::Failed(e.into()),
                }
            }
        };

        let started = WorkerMessage::Started {
            worker_id: self.id,
            identity: identity.clone(),
        };
        if self.messages.send(started).await.is_err() {
            debug!(%identity, "Supervisor gone, not starting tunnel");
            return TunnelOutcome::Cancelled;
        }

        let request = TunnelRequest {
            namespace: self.connection.namespace.clone(),
            pod,
            local_port: self.connection.local_port,
            remote_port: self.connection.remote_port(),
        };
        self.transport.start(request, self.cancel.clone()).await
    }
}
