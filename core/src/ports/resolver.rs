//! Endpoint resolver port (interface).

use crate::domain::Target;
use crate::error::EndpointError;

/// Port for mapping a connection target to a concrete pod.
///
/// Pod targets are returned unchanged. Service targets are resolved through
/// their label selector and the first matching pod is returned; there is no
/// load-balancing or failover across several matching pods.
pub trait EndpointResolver: Send + Sync {
    fn resolve(
        &self,
        namespace: &str,
        target: &Target,
    ) -> impl std::future::Future<Output = Result<String, EndpointError>> + Send;
}
