//! Adapters layer - External system implementations.
//!
//! Implementations of the traits in `ports` backed by the local
//! kubeconfig file and the kubectl binary.

pub mod kubeconfig;
pub mod kubectl;

pub use kubeconfig::KubeconfigContextSource;
pub use kubectl::{Kubectl, KubectlEndpointResolver, KubectlError, KubectlTunnelTransport};
