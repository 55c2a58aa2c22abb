//! Tunnel supervisor.
//!
//! Owns every worker record and is the only code that reads or writes them.
//! Workers and the context watcher talk to it exclusively through channels:
//! - context-change notifications (`run`'s receiver)
//! - worker messages (`Started` and the terminal `StatusEvent`)
//!
//! A context change cancels every worker, drains their terminal events
//! without restarting anything, then starts the new context's connections.
//! A `Failed` event outside a drain restarts the connection if the active
//! context still defines it and the restart policy agrees. When the policy
//! gives up, the record stays behind in the `Stopped` state until the next
//! context switch.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::restart::ImmediateRestart;
use super::worker::Worker;
use crate::domain::{
    Connection, ContextSet, ServiceIdentity, StatusEvent, SupervisorSnapshot, TunnelOutcome,
    WorkerMessage, WorkerSnapshot, WorkerState,
};
use crate::error::Result;
use crate::ports::{
    ContextSource, EndpointResolver, RestartDecision, RestartPolicy, TunnelTransport,
};

/// Capacity of the worker message channel.
const WORKER_CHANNEL_CAPACITY: usize = 64;

/// A worker that ran at least this long before failing starts a fresh failure streak.
const STABLE_RUN: Duration = Duration::from_secs(10);

/// Supervisor-owned bookkeeping for one live worker.
struct WorkerRecord {
    worker_id: Uuid,
    connection: Connection,
    cancel: CancellationToken,
    state: WorkerState,
    running_since: Option<Instant>,
    consecutive_failures: u32,
}

impl WorkerRecord {
    fn snapshot(&self) -> WorkerSnapshot {
        WorkerSnapshot {
            identity: self.connection.identity(),
            worker_id: self.worker_id,
            state: self.state,
            local_port: self.connection.local_port,
            consecutive_failures: self.consecutive_failures,
        }
    }
}

/// Keeps one worker per connection of the active context.
pub struct Supervisor<R, T, P = ImmediateRestart> {
    contexts: Arc<ContextSet>,
    resolver: Arc<R>,
    transport: Arc<T>,
    policy: P,

    /// Name of the active context; only ever a name present in `contexts`.
    active: Option<String>,
    workers: HashMap<ServiceIdentity, WorkerRecord>,
    restarts_issued: u64,

    messages_tx: mpsc::Sender<WorkerMessage>,
    messages_rx: mpsc::Receiver<WorkerMessage>,
    snapshot_tx: watch::Sender<SupervisorSnapshot>,
}

impl<R, T, P> Supervisor<R, T, P>
where
    R: EndpointResolver + 'static,
    T: TunnelTransport + 'static,
    P: RestartPolicy,
{
    pub fn new(contexts: Arc<ContextSet>, resolver: Arc<R>, transport: Arc<T>, policy: P) -> Self {
        let (messages_tx, messages_rx) = mpsc::channel(WORKER_CHANNEL_CAPACITY);
        let (snapshot_tx, _) = watch::channel(SupervisorSnapshot::default());

        Self {
            contexts,
            resolver,
            transport,
            policy,
            active: None,
            workers: HashMap::new(),
            restarts_issued: 0,
            messages_tx,
            messages_rx,
            snapshot_tx,
        }
    }

    /// Subscribes to the snapshots published after every handled message.
    pub fn subscribe(&self) -> watch::Receiver<SupervisorSnapshot> {
        self.snapshot_tx.subscribe()
    }

    pub fn snapshot(&self) -> SupervisorSnapshot {
        let mut workers: Vec<WorkerSnapshot> =
            self.workers.values().map(WorkerRecord::snapshot).collect();
        workers.sort_by(|a, b| a.local_port.cmp(&b.local_port));

        SupervisorSnapshot {
            active_context: self.active.clone(),
            workers,
            restarts_issued: self.restarts_issued,
        }
    }

    /// Reads the active context and starts its connections.
    ///
    /// Returns the context name that was read, which is the natural baseline
    /// for a [`ContextWatcher`](super::ContextWatcher). A failed read is fatal.
    pub async fn start<C: ContextSource>(&mut self, source: &C) -> Result<String> {
        let context = source.current().await?;
        info!(%context, "Starting tunnels for active kube context");
        self.activate(&context);
        self.publish();
        Ok(context)
    }

    /// Event loop. Returns after a full teardown once `context_changes` closes.
    pub async fn run(mut self, mut context_changes: mpsc::Receiver<String>) {
        loop {
            tokio::select! {
                biased;
                changed = context_changes.recv() => match changed {
                    Some(context) => self.switch_context(context).await,
                    None => {
                        info!("Context watcher stopped, tearing down tunnels");
                        self.teardown().await;
                        self.publish();
                        return;
                    }
                },
                Some(message) = self.messages_rx.recv() => {
                    self.handle_message(message);
                    self.publish();
                }
            }
        }
    }

    async fn switch_context(&mut self, context: String) {
        info!(
            from = self.active.as_deref().unwrap_or("<none>"),
            to = %context,
            "Re-targeting tunnels"
        );
        self.teardown().await;
        self.activate(&context);
        self.publish();
    }

    /// Cancels every live worker and waits for each terminal event.
    ///
    /// Events received here never cause restarts. Stopped records have no
    /// worker left and are simply dropped.
    async fn teardown(&mut self) {
        let mut pending: HashSet<Uuid> = HashSet::with_capacity(self.workers.len());
        for record in self.workers.values_mut().filter(|r| r.state.is_active()) {
            record.cancel.cancel();
            record.state = WorkerState::Stopping;
            pending.insert(record.worker_id);
        }
        self.publish();

        while !pending.is_empty() {
            match self.messages_rx.recv().await {
                Some(WorkerMessage::Terminated(event)) => {
                    if pending.remove(&event.worker_id) {
                        debug!(
                            identity = %event.identity,
                            cancelled = event.outcome.is_cancelled(),
                            "Worker drained"
                        );
                    }
                }
                Some(WorkerMessage::Started { .. }) => {}
                None => break,
            }
        }

        self.workers.clear();
    }

    /// Makes `context` active and starts one worker per connection.
    ///
    /// An unknown context leaves no active context and no workers.
    fn activate(&mut self, context: &str) {
        let contexts = Arc::clone(&self.contexts);
        let Some(cluster) = contexts.get(context) else {
            warn!(%context, "Context is not configured, no tunnels will run");
            self.active = None;
            return;
        };

        self.active = Some(cluster.name.clone());
        for connection in &cluster.connections {
            self.spawn_worker(connection.clone(), Duration::ZERO, 0);
        }
    }

    fn spawn_worker(&mut self, connection: Connection, delay: Duration, consecutive_failures: u32) {
        let identity = connection.identity();
        let worker_id = Uuid::new_v4();
        let cancel = CancellationToken::new();

        let worker = Worker {
            id: worker_id,
            connection: connection.clone(),
            delay,
            cancel: cancel.clone(),
            resolver: Arc::clone(&self.resolver),
            transport: Arc::clone(&self.transport),
            messages: self.messages_tx.clone(),
        };
        tokio::spawn(worker.run());

        debug!(%identity, worker = %worker_id, "Worker started");
        let previous = self.workers.insert(
            identity,
            WorkerRecord {
                worker_id,
                connection,
                cancel,
                state: WorkerState::Starting,
                running_since: None,
                consecutive_failures,
            },
        );
        if let Some(previous) = previous {
            // Only reachable if a live worker were replaced; keep it from leaking.
            previous.cancel.cancel();
        }
    }

    fn handle_message(&mut self, message: WorkerMessage) {
        match message {
            WorkerMessage::Started {
                worker_id,
                identity,
            } => {
                if let Some(record) = self
                    .workers
                    .get_mut(&identity)
                    .filter(|r| r.worker_id == worker_id && r.state == WorkerState::Starting)
                {
                    record.state = WorkerState::Running;
                    record.running_since = Some(Instant::now());
                    info!(%identity, local_port = record.connection.local_port, "Tunnel running");
                }
            }
            WorkerMessage::Terminated(event) => self.handle_status(event),
        }
    }

    fn handle_status(&mut self, event: StatusEvent) {
        let StatusEvent {
            worker_id,
            identity,
            outcome,
        } = event;

        let is_current = self
            .workers
            .get(&identity)
            .is_some_and(|r| r.worker_id == worker_id);
        if !is_current {
            debug!(%identity, worker = %worker_id, "Ignoring status of a stale worker");
            return;
        }
        let Some(record) = self.workers.remove(&identity) else {
            return;
        };

        let err = match outcome {
            TunnelOutcome::Cancelled => {
                info!(%identity, "Tunnel stopped");
                return;
            }
            TunnelOutcome::Failed(err) => err,
        };

        let stable = record
            .running_since
            .is_some_and(|since| since.elapsed() >= STABLE_RUN);
        let consecutive_failures = if stable {
            1
        } else {
            record.consecutive_failures.saturating_add(1)
        };
        warn!(%identity, error = %err, consecutive_failures, "Tunnel failed");

        let connection = self
            .active
            .as_deref()
            .and_then(|context| self.contexts.find_connection(context, &identity))
            .cloned();
        let Some(connection) = connection else {
            debug!(%identity, "Connection no longer in the active context, not restarting");
            return;
        };

        match self.policy.decide(&identity, consecutive_failures) {
            RestartDecision::Restart { delay } => {
                self.restarts_issued += 1;
                info!(%identity, delay_ms = delay.as_millis() as u64, "Restarting tunnel");
                self.spawn_worker(connection, delay, consecutive_failures);
            }
            RestartDecision::GiveUp => {
                error!(%identity, consecutive_failures, "Giving up on tunnel");
                self.workers.insert(
                    identity,
                    WorkerRecord {
                        state: WorkerState::Stopped,
                        running_since: None,
                        consecutive_failures,
                        ..record
                    },
                );
            }
        }
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(self.snapshot());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ExponentialBackoff;
    use crate::domain::{ClusterContext, Target};
    use crate::error::{EndpointError, TunnelError, WorkerError};
    use crate::ports::TunnelRequest;

    /// Never resolves; keeps spawned workers parked.
    struct PendingResolver;

    impl EndpointResolver for PendingResolver {
        async fn resolve(
            &self,
            _namespace: &str,
            _target: &Target,
        ) -> std::result::Result<String, EndpointError> {
            std::future::pending().await
        }
    }

    struct PendingTransport;

    impl TunnelTransport for PendingTransport {
        async fn start(&self, _request: TunnelRequest, cancel: CancellationToken) -> TunnelOutcome {
            cancel.cancelled().await;
            TunnelOutcome::Cancelled
        }
    }

    fn supervisor() -> Supervisor<PendingResolver, PendingTransport> {
        let contexts = ContextSet::new(vec![
            ClusterContext::new("a", vec![Connection::service("x", "ns", 9000, 80)]),
            ClusterContext::new("b", vec![Connection::service("y", "ns", 9001, 80)]),
        ]);
        Supervisor::new(
            Arc::new(contexts),
            Arc::new(PendingResolver),
            Arc::new(PendingTransport),
            ImmediateRestart,
        )
    }

    fn insert_record<P: RestartPolicy>(
        supervisor: &mut Supervisor<PendingResolver, PendingTransport, P>,
        connection: Connection,
    ) -> Uuid {
        let worker_id = Uuid::new_v4();
        supervisor.workers.insert(
            connection.identity(),
            WorkerRecord {
                worker_id,
                connection,
                cancel: CancellationToken::new(),
                state: WorkerState::Running,
                running_since: Some(Instant::now()),
                consecutive_failures: 0,
            },
        );
        worker_id
    }

    fn failed() -> TunnelOutcome {
        TunnelOutcome::Failed(WorkerError::Tunnel(TunnelError::Spawn("boom".to_string())))
    }

    #[tokio::test]
    async fn test_failed_event_restarts_known_connection() {
        let mut supervisor = supervisor();
        supervisor.active = Some("a".to_string());
        let x = Connection::service("x", "ns", 9000, 80);
        let worker_id = insert_record(&mut supervisor, x.clone());

        supervisor.handle_status(StatusEvent {
            worker_id,
            identity: x.identity(),
            outcome: failed(),
        });

        let record = supervisor.workers.get(&x.identity()).unwrap();
        assert_ne!(record.worker_id, worker_id);
        assert_eq!(record.state, WorkerState::Starting);
        assert_eq!(record.consecutive_failures, 1);
        assert_eq!(supervisor.restarts_issued, 1);
    }

    #[tokio::test]
    async fn test_failed_event_for_connection_outside_active_context_is_dropped() {
        let mut supervisor = supervisor();
        supervisor.active = Some("b".to_string());
        let x = Connection::service("x", "ns", 9000, 80);
        let worker_id = insert_record(&mut supervisor, x.clone());

        supervisor.handle_status(StatusEvent {
            worker_id,
            identity: x.identity(),
            outcome: failed(),
        });

        assert!(supervisor.workers.is_empty());
        assert_eq!(supervisor.restarts_issued, 0);
    }

    #[tokio::test]
    async fn test_cancelled_event_removes_record_without_restart() {
        let mut supervisor = supervisor();
        supervisor.active = Some("a".to_string());
        let x = Connection::service("x", "ns", 9000, 80);
        let worker_id = insert_record(&mut supervisor, x.clone());

        supervisor.handle_status(StatusEvent {
            worker_id,
            identity: x.identity(),
            outcome: TunnelOutcome::Cancelled,
        });

        assert!(supervisor.workers.is_empty());
        assert_eq!(supervisor.restarts_issued, 0);
    }

    #[tokio::test]
    async fn test_give_up_leaves_stopped_record_until_teardown() {
        let contexts = ContextSet::new(vec![ClusterContext::new(
            "a",
            vec![Connection::service("x", "ns", 9000, 80)],
        )]);
        let policy = ExponentialBackoff {
            max_attempts: Some(0),
            ..ExponentialBackoff::default()
        };
        let mut supervisor = Supervisor::new(
            Arc::new(contexts),
            Arc::new(PendingResolver),
            Arc::new(PendingTransport),
            policy,
        );
        supervisor.active = Some("a".to_string());
        let x = Connection::service("x", "ns", 9000, 80);
        let worker_id = insert_record(&mut supervisor, x.clone());

        supervisor.handle_status(StatusEvent {
            worker_id,
            identity: x.identity(),
            outcome: failed(),
        });

        let snapshot = supervisor.snapshot();
        let stopped = snapshot.worker(&x.identity()).unwrap();
        assert_eq!(stopped.state, WorkerState::Stopped);
        assert_eq!(stopped.consecutive_failures, 1);
        assert_eq!(supervisor.restarts_issued, 0);

        tokio::time::timeout(Duration::from_secs(1), supervisor.teardown())
            .await
            .expect("teardown waited on a stopped record");
        assert!(supervisor.workers.is_empty());
    }

    #[tokio::test]
    async fn test_stale_event_is_ignored() {
        let mut supervisor = supervisor();
        supervisor.active = Some("a".to_string());
        let x = Connection::service("x", "ns", 9000, 80);
        let worker_id = insert_record(&mut supervisor, x.clone());

        supervisor.handle_status(StatusEvent {
            worker_id: Uuid::new_v4(),
            identity: x.identity(),
            outcome: failed(),
        });

        assert_eq!(supervisor.workers.get(&x.identity()).unwrap().worker_id, worker_id);
        assert_eq!(supervisor.restarts_issued, 0);
    }

    #[tokio::test]
    async fn test_started_marks_running_only_for_current_worker() {
        let mut supervisor = supervisor();
        supervisor.activate("a");
        let identity = Connection::service("x", "ns", 9000, 80).identity();
        let worker_id = supervisor.workers.get(&identity).unwrap().worker_id;

        supervisor.handle_message(WorkerMessage::Started {
            worker_id: Uuid::new_v4(),
            identity: identity.clone(),
        });
        assert_eq!(supervisor.workers[&identity].state, WorkerState::Starting);

        supervisor.handle_message(WorkerMessage::Started {
            worker_id,
            identity: identity.clone(),
        });
        assert_eq!(supervisor.workers[&identity].state, WorkerState::Running);
        assert!(supervisor.workers[&identity].running_since.is_some());
    }

    #[tokio::test]
    async fn test_long_running_failure_resets_streak() {
        let mut supervisor = supervisor();
        supervisor.active = Some("a".to_string());
        let x = Connection::service("x", "ns", 9000, 80);
        let worker_id = insert_record(&mut supervisor, x.clone());
        {
            let record = supervisor.workers.get_mut(&x.identity()).unwrap();
            record.consecutive_failures = 7;
            record.running_since = Instant::now().checked_sub(STABLE_RUN * 2);
        }

        supervisor.handle_status(StatusEvent {
            worker_id,
            identity: x.identity(),
            outcome: failed(),
        });

        assert_eq!(supervisor.workers[&x.identity()].consecutive_failures, 1);
    }

    #[tokio::test]
    async fn test_snapshot_reflects_records() {
        let mut supervisor = supervisor();
        let rx = supervisor.subscribe();
        supervisor.activate("b");
        supervisor.publish();

        let snapshot = rx.borrow().clone();
        assert_eq!(snapshot.active_context.as_deref(), Some("b"));
        assert_eq!(snapshot.workers.len(), 1);
        assert_eq!(snapshot.workers[0].local_port, 9001);
        assert_eq!(snapshot.workers[0].state, WorkerState::Starting);
    }
}
