use std::sync::Arc;

use async_trait::async_trait;

use crate::TrackerDocument;

/// Structured classification of a remote failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteErrorKind {
    /// The document does not exist.
    NotFound,
    /// A create found an existing document, or an update carried a stale version.
    Conflict,
    /// Timeouts, throttling, unavailable servers.
    Transient,
    /// Authentication, authorization, rejected payloads.
    Permanent,
    Other,
}

impl RemoteErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not found",
            Self::Conflict => "conflict",
            Self::Transient => "transient failure",
            Self::Permanent => "permanent failure",
            Self::Other => "remote failure",
        }
    }
}

impl std::fmt::Display for RemoteErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Failure reported by a [`DocumentClient`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct RemoteError {
    pub kind: RemoteErrorKind,
    pub message: String,
}

impl RemoteError {
    pub fn new(kind: RemoteErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::NotFound, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Conflict, message)
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Transient, message)
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Permanent, message)
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == RemoteErrorKind::NotFound
    }

    pub fn is_conflict(&self) -> bool {
        self.kind == RemoteErrorKind::Conflict
    }
}

/// Access to the single namespaced tracker document.
///
/// Implementations must honor two concurrency rules:
/// - `create` fails with [`RemoteErrorKind::Conflict`] when the document exists.
/// - `update` fails with [`RemoteErrorKind::Conflict`] when
///   `document.resource_version` is not the current version.
#[async_trait]
pub trait DocumentClient: Send + Sync {
    /// Fetch the document. `Ok(None)` means it does not exist.
    async fn get(&self, namespace: &str, name: &str)
    -> Result<Option<TrackerDocument>, RemoteError>;

    /// Create the document, returning it with its assigned version.
    async fn create(&self, document: &TrackerDocument) -> Result<TrackerDocument, RemoteError>;

    /// Replace the document, conditioned on its `resource_version`.
    async fn update(&self, document: &TrackerDocument) -> Result<TrackerDocument, RemoteError>;
}

#[async_trait]
impl<T> DocumentClient for Arc<T>
where
    T: DocumentClient + ?Sized,
{
    async fn get(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<TrackerDocument>, RemoteError> {
        (**self).get(namespace, name).await
    }

    async fn create(&self, document: &TrackerDocument) -> Result<TrackerDocument, RemoteError> {
        (**self).create(document).await
    }

    async fn update(&self, document: &TrackerDocument) -> Result<TrackerDocument, RemoteError> {
        (**self).update(document).await
    }
}
