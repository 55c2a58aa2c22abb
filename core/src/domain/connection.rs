//! Connection and context domain models.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The workload a tunnel points at.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "name")]
pub enum Target {
    /// A named service, resolved to one of its pods before every tunnel start.
    Service(String),
    /// A pod addressed directly.
    Pod(String),
}

impl Target {
    /// Returns the name of the service or pod.
    pub fn name(&self) -> &str {
        match self {
            Self::Service(name) | Self::Pod(name) => name,
        }
    }

    /// Short kind prefix as kubectl spells it.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Service(_) => "svc",
            Self::Pod(_) => "pod",
        }
    }
}

/// Identity of a desired tunnel. Keys the supervisor's worker map.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceIdentity {
    pub namespace: String,
    pub target: Target,
}

impl fmt::Display for ServiceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.namespace,
            self.target.kind(),
            self.target.name()
        )
    }
}

/// One desired tunnel: a target inside a namespace plus its port mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub target: Target,
    pub namespace: String,
    pub local_port: u16,
    pub remote_service_port: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_pod_port: Option<u16>,
}

impl Connection {
    /// Creates a connection to a service.
    pub fn service(
        name: impl Into<String>,
        namespace: impl Into<String>,
        local_port: u16,
        remote_service_port: u16,
    ) -> Self {
        Self {
            target: Target::Service(name.into()),
            namespace: namespace.into(),
            local_port,
            remote_service_port,
            remote_pod_port: None,
        }
    }

    /// Creates a connection to a pod addressed by name.
    pub fn pod(
        name: impl Into<String>,
        namespace: impl Into<String>,
        local_port: u16,
        remote_service_port: u16,
    ) -> Self {
        Self {
            target: Target::Pod(name.into()),
            namespace: namespace.into(),
            local_port,
            remote_service_port,
            remote_pod_port: None,
        }
    }

    /// Sets the port the pod itself listens on.
    pub fn with_remote_pod_port(mut self, port: u16) -> Self {
        self.remote_pod_port = Some(port);
        self
    }

    pub fn identity(&self) -> ServiceIdentity {
        ServiceIdentity {
            namespace: self.namespace.clone(),
            target: self.target.clone(),
        }
    }

    /// Returns the port forwarded to on the pod.
    ///
    /// Tunnels always terminate at a pod, so the pod port wins when configured.
    pub fn remote_port(&self) -> u16 {
        self.remote_pod_port.unwrap_or(self.remote_service_port)
    }
}

/// A named group of connections that is active while its kube context is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterContext {
    pub name: String,
    pub connections: Vec<Connection>,
}

impl ClusterContext {
    pub fn new(name: impl Into<String>, connections: Vec<Connection>) -> Self {
        Self {
            name: name.into(),
            connections,
        }
    }

    /// Finds the connection with the given identity.
    pub fn find(&self, identity: &ServiceIdentity) -> Option<&Connection> {
        self.connections
            .iter()
            .find(|c| c.namespace == identity.namespace && c.target == identity.target)
    }
}

/// Every configured context, in file order. Read-only once loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ContextSet {
    contexts: Vec<ClusterContext>,
}

impl ContextSet {
    /// Wraps already validated contexts.
    pub fn new(contexts: Vec<ClusterContext>) -> Self {
        Self { contexts }
    }

    pub fn get(&self, name: &str) -> Option<&ClusterContext> {
        self.contexts.iter().find(|c| c.name == name)
    }

    /// Looks up a connection under a specific context.
    pub fn find_connection(&self, context: &str, identity: &ServiceIdentity) -> Option<&Connection> {
        self.get(context).and_then(|c| c.find(identity))
    }

    pub fn contexts(&self) -> &[ClusterContext] {
        &self.contexts
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }
}
