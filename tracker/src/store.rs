use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use backon::{BackoffBuilder, ExponentialBuilder};
use playground_async_utils::WithDeadlineExt;

use crate::{
    DocumentClient, InstallerType, Operation, TRACKER_NAME, TRACKER_NAMESPACE, TrackerDocument,
    TrackerError,
};

/// Longest plugin name accepted; matches the remote key length limit.
const MAX_PLUGIN_NAME_LEN: usize = 253;

/// Deadlines and conflict-retry bounds for tracker operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerConfig {
    /// Deadline for `record`/`remove`, covering every attempt.
    pub mutate_timeout: Duration,
    /// Deadline for read-only operations.
    pub read_timeout: Duration,
    /// Total fetch-mutate-update attempts before giving up on conflicts.
    pub max_attempts: usize,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            mutate_timeout: Duration::from_secs(30),
            read_timeout: Duration::from_secs(10),
            max_attempts: 5,
            initial_backoff: Duration::from_millis(50),
            max_backoff: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Written,
    Unchanged,
}

/// Records which installer put each plugin into the cluster.
pub struct InstallerTracker<C> {
    client: C,
    config: TrackerConfig,
}

impl<C: DocumentClient> InstallerTracker<C> {
    pub fn new(client: C) -> Self {
        Self::with_config(client, TrackerConfig::default())
    }

    pub fn with_config(client: C, config: TrackerConfig) -> Self {
        Self { client, config }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Associate `plugin` with `installer`, overwriting any previous association.
    pub async fn record(&self, plugin: &str, installer: InstallerType) -> Result<(), TrackerError> {
        let plugin = validate_plugin_name(plugin)?;
        let op = Operation::Record;

        self.mutate(op, plugin, true, |data| {
            data.insert(plugin.to_string(), installer.as_str().to_string());
            true
        })
        .await?;

        tracing::debug!("Recorded installer type '{installer}' for plugin '{plugin}'");
        Ok(())
    }

    /// Installer recorded for `plugin`, or `None` if it is untracked.
    pub async fn get_installer(&self, plugin: &str) -> Result<Option<InstallerType>, TrackerError> {
        let op = Operation::GetInstaller;
        let Some(doc) = self.read(op, Some(plugin)).await? else {
            tracing::debug!(
                "Tracker document not found, no installer recorded for plugin '{plugin}'"
            );
            return Ok(None);
        };

        let Some(value) = doc.data.get(plugin) else {
            return Ok(None);
        };
        let installer =
            InstallerType::from_stored(value).ok_or_else(|| TrackerError::UnknownInstaller {
                plugin: plugin.to_string(),
                value: value.clone(),
            })?;

        tracing::debug!("Found recorded installer type '{installer}' for plugin '{plugin}'");
        Ok(Some(installer))
    }

    /// Plugins currently associated with `installer`.
    pub async fn list_by_installer(
        &self,
        installer: InstallerType,
    ) -> Result<BTreeSet<String>, TrackerError> {
        let Some(doc) = self.read(Operation::ListByInstaller, None).await? else {
            tracing::debug!("Tracker document not found, no installers recorded");
            return Ok(BTreeSet::new());
        };

        Ok(doc
            .plugins_with(installer)
            .map(str::to_string)
            .collect())
    }

    /// Every tracked plugin with its raw recorded installer value.
    pub async fn entries(&self) -> Result<BTreeMap<String, String>, TrackerError> {
        match self.read(Operation::ListEntries, None).await? {
            Some(doc) => Ok(doc.data),
            None => {
                tracing::debug!("Tracker document not found, no installers recorded");
                Ok(BTreeMap::new())
            }
        }
    }

    /// Forget `plugin`. Succeeds without writing when nothing is recorded.
    pub async fn remove(&self, plugin: &str) -> Result<(), TrackerError> {
        let outcome = self
            .mutate(Operation::Remove, plugin, false, |data| {
                data.remove(plugin).is_some()
            })
            .await?;

        match outcome {
            Outcome::Written => {
                tracing::debug!("Removed installer tracking record for plugin '{plugin}'")
            }
            Outcome::Unchanged => {
                tracing::debug!("No installer tracking record to remove for plugin '{plugin}'")
            }
        }
        Ok(())
    }

    fn timeout_for(&self, op: Operation) -> Duration {
        if op.is_mutation() {
            self.config.mutate_timeout
        } else {
            self.config.read_timeout
        }
    }

    async fn read(
        &self,
        op: Operation,
        plugin: Option<&str>,
    ) -> Result<Option<TrackerDocument>, TrackerError> {
        let timeout = self.timeout_for(op);
        self.fetch(op, plugin)
            .with_deadline(timeout)
            .await
            .map_err(|_| TrackerError::DeadlineExceeded { op, timeout })?
    }

    /// Optimistic-concurrency loop around [`Self::mutate_once`], bounded by the
    /// operation deadline as a whole.
    async fn mutate<F>(
        &self,
        op: Operation,
        plugin: &str,
        create_if_missing: bool,
        apply: F,
    ) -> Result<Outcome, TrackerError>
    where
        F: Fn(&mut BTreeMap<String, String>) -> bool + Send + Sync,
    {
        let timeout = self.timeout_for(op);
        let attempts = async {
            let mut backoff = ExponentialBuilder::default()
                .with_min_delay(self.config.initial_backoff)
                .with_max_delay(self.config.max_backoff)
                .with_max_times(self.config.max_attempts.saturating_sub(1))
                .with_jitter()
                .build();
            let mut attempt = 1;

            loop {
                match self.mutate_once(op, plugin, create_if_missing, &apply).await {
                    Err(err) if err.is_conflict() => match backoff.next() {
                        Some(delay) => {
                            tracing::debug!(
                                "Conflict on {op} for plugin '{plugin}' (attempt {attempt}), retrying in {delay:?}"
                            );
                            tokio::time::sleep(delay).await;
                            attempt += 1;
                        }
                        None => {
                            return Err(TrackerError::Contention {
                                op,
                                plugin: plugin.to_string(),
                                attempts: attempt,
                            });
                        }
                    },
                    other => return other,
                }
            }
        };

        attempts
            .with_deadline(timeout)
            .await
            .map_err(|_| TrackerError::DeadlineExceeded { op, timeout })?
    }

    /// One fetch (or get-or-create), one in-memory edit, at most one
    /// version-checked update.
    async fn mutate_once<F>(
        &self,
        op: Operation,
        plugin: &str,
        create_if_missing: bool,
        apply: &F,
    ) -> Result<Outcome, TrackerError>
    where
        F: Fn(&mut BTreeMap<String, String>) -> bool + Send + Sync,
    {
        let doc = if create_if_missing {
            Some(self.get_or_create(op, plugin).await?)
        } else {
            self.fetch(op, Some(plugin)).await?
        };

        let Some(mut doc) = doc else {
            tracing::debug!("Tracker document not found, nothing to change for plugin '{plugin}'");
            return Ok(Outcome::Unchanged);
        };

        if !apply(&mut doc.data) {
            return Ok(Outcome::Unchanged);
        }

        self.client
            .update(&doc)
            .await
            .map_err(|source| TrackerError::remote(op, Some(plugin), source))?;
        Ok(Outcome::Written)
    }

    async fn fetch(
        &self,
        op: Operation,
        plugin: Option<&str>,
    ) -> Result<Option<TrackerDocument>, TrackerError> {
        match self.client.get(TRACKER_NAMESPACE, TRACKER_NAME).await {
            Ok(doc) => Ok(doc),
            Err(err) if err.is_not_found() => Ok(None),
            Err(source) => Err(TrackerError::remote(op, plugin, source)),
        }
    }

    async fn get_or_create(
        &self,
        op: Operation,
        plugin: &str,
    ) -> Result<TrackerDocument, TrackerError> {
        if let Some(doc) = self.fetch(op, Some(plugin)).await? {
            return Ok(doc);
        }

        // A racing creator surfaces here as a conflict and restarts the attempt.
        let created = self
            .client
            .create(&TrackerDocument::new_empty())
            .await
            .map_err(|source| TrackerError::remote(op, Some(plugin), source))?;

        tracing::debug!(
            "Created new installer tracker document {}/{}",
            created.namespace,
            created.name
        );
        Ok(created)
    }
}

fn validate_plugin_name(plugin: &str) -> Result<&str, TrackerError> {
    let invalid = |reason| TrackerError::InvalidPluginName {
        name: plugin.to_string(),
        reason,
    };

    if plugin.is_empty() {
        return Err(invalid("must not be empty"));
    }
    if plugin.len() > MAX_PLUGIN_NAME_LEN {
        return Err(invalid("must be at most 253 characters"));
    }
    if !plugin
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return Err(invalid(
            "may only contain letters, digits, '-', '_' and '.'",
        ));
    }
    Ok(plugin)
}
