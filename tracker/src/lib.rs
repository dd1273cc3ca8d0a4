//! `playground-tracker`: plugin installer provenance.
//!
//! Every plugin installed into a playground cluster is tagged with the
//! mechanism that installed it (Helm or Argo CD). The tags live in a single
//! shared document inside the cluster, so any process holding cluster
//! credentials can read or change them.
//!
//! The store never keeps a local copy between calls. Each mutation is a
//! fetch, an in-memory edit, and a version-checked replace; a stale version
//! restarts the whole sequence, so concurrent writers cannot silently drop
//! each other's entries.
//!
//! ```text
//! InstallerTracker ──► DocumentClient ──► remote document
//!   record / remove      get / create / update
//!   get_installer
//!   list_by_installer
//! ```

mod client;
mod document;
mod error;
mod installer;
pub mod memory;
mod store;

pub use client::{DocumentClient, RemoteError, RemoteErrorKind};
pub use document::TrackerDocument;
pub use error::{Operation, TrackerError};
pub use installer::{InstallerType, ParseInstallerTypeError};
pub use store::{InstallerTracker, TrackerConfig};

/// Namespace holding the tracker document.
pub const TRACKER_NAMESPACE: &str = "kube-system";

/// Name of the tracker document. One per cluster.
pub const TRACKER_NAME: &str = "playground-plugin-installer-tracker";

/// Labels stamped on the tracker document when it is first created.
pub const TRACKER_LABELS: [(&str, &str); 3] = [
    ("app.kubernetes.io/name", "playground"),
    ("app.kubernetes.io/component", "installer-tracker"),
    ("app.kubernetes.io/managed-by", "playground"),
];
