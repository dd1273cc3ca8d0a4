//! `playground-kube-client`: the tracker document as a Kubernetes ConfigMap.
//!
//! Talks to the API server's core/v1 ConfigMap endpoints with `reqwest`,
//! using credentials resolved from a kubeconfig file. Failures are
//! classified from the HTTP status code, never from message text:
//!
//! | Status | Kind |
//! |---|---|
//! | 404 | `NotFound` |
//! | 409 | `Conflict` (existing object on create, stale `resourceVersion` on update) |
//! | 400, 401, 403, 405, 422 | `Permanent` |
//! | 408, 429, 500, 502, 503, 504 | `Transient` |
//! | anything else | `Other` |

mod client;
mod configmap;
pub mod kubeconfig;

pub use client::{KubeConfigMapClient, classify_status};
pub use configmap::{ConfigMap, ObjectMeta};
pub use kubeconfig::{Auth, ClusterConnection, Kubeconfig, KubeconfigError};
