//! Service to pod resolution via kubectl.

use tracing::debug;

use super::errors::KubectlError;
use super::models::{PodListResponse, ServiceResponse};
use super::Kubectl;
use crate::domain::Target;
use crate::error::EndpointError;
use crate::ports::EndpointResolver;

/// Resolves services to the first pod matching their selector.
#[derive(Debug, Clone, Default)]
pub struct KubectlEndpointResolver {
    kubectl: Kubectl,
}

impl KubectlEndpointResolver {
    pub fn new(kubectl: Kubectl) -> Self {
        Self { kubectl }
    }

    async fn resolve_service(&self, namespace: &str, service: &str) -> Result<String, EndpointError> {
        let output = self
            .kubectl
            .execute(&["get", "service", service, "-n", namespace, "-o", "json"])
            .await?;

        let response: ServiceResponse = serde_json::from_str(&output)
            .map_err(|e| KubectlError::ParsingFailed(e.to_string()))?;

        let selector = response
            .label_selector()
            .ok_or_else(|| EndpointError::NoSelector {
                namespace: namespace.to_string(),
                service: service.to_string(),
            })?;

        let output = self
            .kubectl
            .execute(&["get", "pods", "-n", namespace, "-l", &selector, "-o", "json"])
            .await?;

        let pods: PodListResponse = serde_json::from_str(&output)
            .map_err(|e| KubectlError::ParsingFailed(e.to_string()))?;

        let pod = pods
            .first_pod_name()
            .ok_or_else(|| EndpointError::NoPodsFound {
                namespace: namespace.to_string(),
                service: service.to_string(),
            })?;

        debug!(%namespace, %service, %pod, %selector, "Resolved service to pod");
        Ok(pod)
    }
}

impl EndpointResolver for KubectlEndpointResolver {
    async fn resolve(&self, namespace: &str, target: &Target) -> Result<String, EndpointError> {
        match target {
            Target::Pod(pod) => Ok(pod.clone()),
            Target::Service(service) => self.resolve_service(namespace, service).await,
        }
    }
}
