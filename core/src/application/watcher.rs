//! Polling watcher for the active kube context.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::ports::ContextSource;

/// Polls a [`ContextSource`] and reports context switches.
///
/// The first successful read only sets the baseline, so a switch that
/// completes before it is absorbed silently. Use [`ContextWatcher::with_baseline`]
/// to seed the baseline with the context the supervisor started from.
/// Detection latency is bounded by the interval.
pub struct ContextWatcher<C> {
    source: C,
    interval: Duration,
    baseline: Option<String>,
}

impl<C: ContextSource> ContextWatcher<C> {
    pub fn new(source: C, interval: Duration) -> Self {
        Self {
            source,
            interval,
            baseline: None,
        }
    }

    /// Starts with a known baseline instead of taking it from the first tick.
    pub fn with_baseline(mut self, context: impl Into<String>) -> Self {
        self.baseline = Some(context.into());
        self
    }

    pub fn baseline(&self) -> Option<&str> {
        self.baseline.as_deref()
    }

    /// Polls until the receiving side of `notify` is dropped.
    ///
    /// Sending waits while the previous notification is still unconsumed.
    pub async fn watch(mut self, notify: mpsc::Sender<String>) {
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            if let Some(context) = self.poll().await {
                info!(%context, "Active kube context changed");
                if notify.send(context).await.is_err() {
                    debug!("Context notifications no longer consumed, stopping watcher");
                    return;
                }
            }
        }
    }

    /// Performs one read. Returns the new context when it differs from the baseline.
    pub async fn poll(&mut self) -> Option<String> {
        let current = match self.source.current().await {
            Ok(current) => current,
            Err(e) => {
                warn!(error = %e, "Failed to read active kube context");
                return None;
            }
        };

        match self.baseline.as_deref() {
            None => {
                debug!(context = %current, "Context baseline established");
                self.baseline = Some(current);
                None
            }
            Some(previous) if previous == current => None,
            Some(_) => {
                self.baseline = Some(current.clone());
                Some(current)
            }
        }
    }
}
