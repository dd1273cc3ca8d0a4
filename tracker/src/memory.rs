//! In-process [`DocumentClient`] with the same version semantics as the API
//! server: creates conflict when the document exists and updates conflict
//! on a stale `resource_version`.
//!
//! Also supports scripted failures, artificial latency, and interleaving a
//! foreign write just before the next update, which is how tests reproduce
//! racing writers deterministically.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::{DocumentClient, RemoteError, RemoteErrorKind, TrackerDocument};

/// Which client call a scripted failure applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCall {
    Get,
    Create,
    Update,
}

impl ClientCall {
    fn as_str(self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Create => "create",
            Self::Update => "update",
        }
    }
}

/// Counters of calls that reached the store.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CallCounts {
    pub gets: usize,
    /// Successful creates only.
    pub creates: usize,
    /// Successful updates only.
    pub updates: usize,
    /// Creates and updates rejected for version reasons.
    pub conflicts: usize,
}

type ForeignWrite = Box<dyn FnOnce(&mut BTreeMap<String, String>) + Send>;

#[derive(Default)]
struct State {
    document: Option<TrackerDocument>,
    version: u64,
    faults: VecDeque<(ClientCall, RemoteErrorKind)>,
    before_update: VecDeque<ForeignWrite>,
    calls: CallCounts,
}

impl State {
    fn take_fault(&mut self, call: ClientCall) -> Option<RemoteError> {
        let index = self.faults.iter().position(|(c, _)| *c == call)?;
        let (_, kind) = self.faults.remove(index)?;
        Some(RemoteError::new(
            kind,
            format!("injected {} failure", call.as_str()),
        ))
    }

    fn next_version(&mut self) -> String {
        self.version += 1;
        self.version.to_string()
    }
}

#[derive(Default)]
pub struct MemoryDocumentClient {
    state: Mutex<State>,
    latency: Option<Duration>,
}

impl MemoryDocumentClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every call by `latency` before it touches the store.
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            state: Mutex::default(),
            latency: Some(latency),
        }
    }

    /// Replace the stored document with one holding `entries`.
    pub fn seed<'a>(&self, entries: impl IntoIterator<Item = (&'a str, &'a str)>) {
        let mut state = self.lock();
        let mut doc = TrackerDocument::new_empty();
        doc.data = entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        doc.resource_version = Some(state.next_version());
        state.document = Some(doc);
    }

    /// Fail the next `call` with `kind`. Faults queue up per call type.
    pub fn fail_next(&self, call: ClientCall, kind: RemoteErrorKind) {
        self.lock().faults.push_back((call, kind));
    }

    /// Apply `write` to the stored mapping (bumping the version) right before
    /// the next update is checked.
    pub fn interleave_before_update(
        &self,
        write: impl FnOnce(&mut BTreeMap<String, String>) + Send + 'static,
    ) {
        self.lock().before_update.push_back(Box::new(write));
    }

    pub fn snapshot(&self) -> Option<TrackerDocument> {
        self.lock().document.clone()
    }

    pub fn calls(&self) -> CallCounts {
        self.lock().calls
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn delay(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl DocumentClient for MemoryDocumentClient {
    async fn get(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<TrackerDocument>, RemoteError> {
        self.delay().await;
        let mut state = self.lock();
        state.calls.gets += 1;
        if let Some(err) = state.take_fault(ClientCall::Get) {
            return Err(err);
        }
        Ok(state
            .document
            .as_ref()
            .filter(|doc| doc.namespace == namespace && doc.name == name)
            .cloned())
    }

    async fn create(&self, document: &TrackerDocument) -> Result<TrackerDocument, RemoteError> {
        self.delay().await;
        let mut state = self.lock();
        if let Some(err) = state.take_fault(ClientCall::Create) {
            return Err(err);
        }
        if state.document.is_some() {
            state.calls.conflicts += 1;
            return Err(RemoteError::conflict(format!(
                "{}/{} already exists",
                document.namespace, document.name
            )));
        }

        let mut created = document.clone();
        created.resource_version = Some(state.next_version());
        state.document = Some(created.clone());
        state.calls.creates += 1;
        Ok(created)
    }

    async fn update(&self, document: &TrackerDocument) -> Result<TrackerDocument, RemoteError> {
        self.delay().await;
        let mut state = self.lock();
        if let Some(err) = state.take_fault(ClientCall::Update) {
            return Err(err);
        }

        if let Some(write) = state.before_update.pop_front() {
            let version = state.next_version();
            if let Some(current) = state.document.as_mut() {
                write(&mut current.data);
                current.resource_version = Some(version);
            }
        }

        let Some(current_version) = state
            .document
            .as_ref()
            .map(|doc| doc.resource_version.clone())
        else {
            return Err(RemoteError::not_found(format!(
                "{}/{} does not exist",
                document.namespace, document.name
            )));
        };
        if current_version != document.resource_version {
            state.calls.conflicts += 1;
            return Err(RemoteError::conflict(format!(
                "version {} is stale",
                document.resource_version.as_deref().unwrap_or("<none>")
            )));
        }

        let mut updated = document.clone();
        updated.resource_version = Some(state.next_version());
        state.document = Some(updated.clone());
        state.calls.updates += 1;
        Ok(updated)
    }
}
