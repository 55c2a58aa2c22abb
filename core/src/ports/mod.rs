//! Ports layer - Trait definitions (interfaces).
//!
//! This module defines the collaborators the supervisor depends on.
//! Implementations live in `adapters` (and `application` for restart policies).

mod context;
mod resolver;
mod restart;
mod transport;

pub use context::ContextSource;
pub use resolver::EndpointResolver;
pub use restart::{RestartDecision, RestartPolicy};
pub use transport::{TunnelRequest, TunnelTransport};
