//! Tunnel transport port (interface).

use tokio_util::sync::CancellationToken;

use crate::domain::TunnelOutcome;

/// Everything a transport needs to open one tunnel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TunnelRequest {
    pub namespace: String,
    pub pod: String,
    pub local_port: u16,
    pub remote_port: u16,
}

/// Port for running a single tunnel to a pod.
///
/// `start` blocks for the whole life of the tunnel. It returns
/// [`TunnelOutcome::Cancelled`] when `cancel` caused the closure and
/// [`TunnelOutcome::Failed`] otherwise. Implementations never retry.
pub trait TunnelTransport: Send + Sync {
    fn start(
        &self,
        request: TunnelRequest,
        cancel: CancellationToken,
    ) -> impl std::future::Future<Output = TunnelOutcome> + Send;
}
