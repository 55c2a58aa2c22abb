//! Context source port (interface).

use crate::error::Result;

/// Port for reading the operator's active cluster context.
pub trait ContextSource: Send + Sync {
    /// Returns the name of the currently active context.
    fn current(&self) -> impl std::future::Future<Output = Result<String>> + Send;
}
