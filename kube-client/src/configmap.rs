use std::collections::BTreeMap;

use playground_tracker::TrackerDocument;
use serde::{Deserialize, Serialize};

/// The subset of a core/v1 ConfigMap the tracker reads and writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigMap {
    pub api_version: String,
    pub kind: String,
    pub metadata: ObjectMeta,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub data: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    pub name: String,
    pub namespace: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,
}

impl From<&TrackerDocument> for ConfigMap {
    fn from(doc: &TrackerDocument) -> Self {
        Self {
            api_version: "v1".to_string(),
            kind: "ConfigMap".to_string(),
            metadata: ObjectMeta {
                name: doc.name.clone(),
                namespace: doc.namespace.clone(),
                labels: doc.labels.clone(),
                resource_version: doc.resource_version.clone(),
            },
            data: doc.data.clone(),
        }
    }
}

impl From<ConfigMap> for TrackerDocument {
    fn from(cm: ConfigMap) -> Self {
        Self {
            namespace: cm.metadata.namespace,
            name: cm.metadata.name,
            labels: cm.metadata.labels,
            data: cm.data,
            resource_version: cm.metadata.resource_version,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn new_document_serializes_without_version_or_data() {
        let cm = ConfigMap::from(&TrackerDocument::new_empty());
        let value = serde_json::to_value(&cm).unwrap();

        assert_eq!(
            value,
            json!({
                "apiVersion": "v1",
                "kind": "ConfigMap",
                "metadata": {
                    "name": "playground-plugin-installer-tracker",
                    "namespace": "kube-system",
                    "labels": {
                        "app.kubernetes.io/component": "installer-tracker",
                        "app.kubernetes.io/managed-by": "playground",
                        "app.kubernetes.io/name": "playground",
                    },
                },
            })
        );
    }

    #[test]
    fn server_response_with_extra_fields_parses() {
        let body = json!({
            "apiVersion": "v1",
            "kind": "ConfigMap",
            "metadata": {
                "name": "playground-plugin-installer-tracker",
                "namespace": "kube-system",
                "uid": "2b8e4c1a",
                "resourceVersion": "4711",
                "creationTimestamp": "2026-01-01T00:00:00Z",
            },
            "data": { "cert-manager": "helm" },
        });

        let doc = TrackerDocument::from(serde_json::from_value::<ConfigMap>(body).unwrap());

        assert_eq!(doc.resource_version.as_deref(), Some("4711"));
        assert!(doc.labels.is_empty());
        assert_eq!(doc.data.get("cert-manager").map(String::as_str), Some("helm"));
    }
}
