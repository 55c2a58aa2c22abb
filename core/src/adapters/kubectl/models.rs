//! kubectl JSON response parsing.

use std::collections::BTreeMap;

use serde::Deserialize;

/// Response structure for `kubectl get service <name> -o json`.
#[derive(Debug, Deserialize)]
pub struct ServiceResponse {
    pub metadata: ObjectMetadata,
    #[serde(default)]
    pub spec: ServiceSpec,
}

#[derive(Debug, Deserialize)]
pub struct ObjectMetadata {
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ServiceSpec {
    #[serde(default)]
    pub selector: Option<BTreeMap<String, String>>,
}

impl ServiceResponse {
    /// Returns the selector in `-l` form, or `None` for selector-less services.
    pub fn label_selector(&self) -> Option<String> {
        self.spec
            .selector
            .as_ref()
            .filter(|s| !s.is_empty())
            .map(selector_string)
    }
}

/// Response structure for `kubectl get pods -o json`.
#[derive(Debug, Deserialize)]
pub struct PodListResponse {
    #[serde(default)]
    pub items: Vec<PodItem>,
}

#[derive(Debug, Deserialize)]
pub struct PodItem {
    pub metadata: ObjectMetadata,
}

impl PodListResponse {
    /// Name of the first pod in listing order.
    pub fn first_pod_name(self) -> Option<String> {
        self.items.into_iter().next().map(|p| p.metadata.name)
    }
}

/// Renders a selector as `key=value` pairs joined by commas, sorted by key.
pub fn selector_string(selector: &BTreeMap<String, String>) -> String {
    selector
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(",")
}
