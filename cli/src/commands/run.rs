//! Run command - supervise the port forwards of the active context.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use kpfm_core::adapters::{
    KubeconfigContextSource, Kubectl, KubectlEndpointResolver, KubectlTunnelTransport,
};
use kpfm_core::{
    ContextSet, ContextWatcher, ExponentialBackoff, ImmediateRestart, RestartPolicy, Supervisor,
};
use tokio::sync::mpsc;
use tracing::{info, warn};

use super::load_config;

pub async fn run(config_path: Option<PathBuf>, interval: Option<u64>) -> Result<()> {
    let config = load_config(config_path).await?;

    let interval = match interval {
        Some(0) => bail!("--interval must be at least 1 second"),
        Some(secs) => Duration::from_secs(secs),
        None => config.poll_interval,
    };

    let kubectl = Kubectl::new();
    if !kubectl.is_available() {
        bail!("kubectl not found in the usual locations or on PATH");
    }

    let source = KubeconfigContextSource::new()?;
    let contexts = Arc::new(config.contexts);
    let resolver = Arc::new(KubectlEndpointResolver::new(kubectl.clone()));
    let transport = Arc::new(KubectlTunnelTransport::new(kubectl));

    match config.restart {
        Some(settings) => {
            let policy = ExponentialBackoff::from(&settings);
            info!(?policy, "Restarting failed tunnels with backoff");
            supervise(source, contexts, resolver, transport, policy, interval).await
        }
        None => {
            warn!("No restart backoff configured, failed tunnels restart immediately");
            supervise(source, contexts, resolver, transport, ImmediateRestart, interval).await
        }
    }
}

async fn supervise<P: RestartPolicy>(
    source: KubeconfigContextSource,
    contexts: Arc<ContextSet>,
    resolver: Arc<KubectlEndpointResolver>,
    transport: Arc<KubectlTunnelTransport>,
    policy: P,
    interval: Duration,
) -> Result<()> {
    let mut supervisor = Supervisor::new(contexts, resolver, transport, policy);
    let initial = supervisor
        .start(&source)
        .await
        .context("Cannot determine the active kube context")?;

    let (notify_tx, notify_rx) = mpsc::channel(1);
    let watcher = tokio::spawn(
        ContextWatcher::new(source, interval)
            .with_baseline(initial)
            .watch(notify_tx),
    );

    let supervisor = supervisor.run(notify_rx);
    tokio::pin!(supervisor);

    tokio::select! {
        _ = &mut supervisor => {}
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl-C")?;
            info!("Interrupted, stopping tunnels");
            watcher.abort();
            supervisor.await;
        }
    }

    Ok(())
}
