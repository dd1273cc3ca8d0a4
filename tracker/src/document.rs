use std::collections::BTreeMap;

use crate::{InstallerType, TRACKER_LABELS, TRACKER_NAME, TRACKER_NAMESPACE};

/// The shared record mapping plugin names to the installer that placed them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerDocument {
    pub namespace: String,
    pub name: String,
    pub labels: BTreeMap<String, String>,
    /// `plugin name -> installer type` as stored remotely.
    pub data: BTreeMap<String, String>,
    /// Opaque version token issued by the remote store. `None` until created.
    pub resource_version: Option<String>,
}

impl TrackerDocument {
    /// A not-yet-created document at the fixed identity with an empty mapping.
    pub fn new_empty() -> Self {
        Self {
            namespace: TRACKER_NAMESPACE.to_string(),
            name: TRACKER_NAME.to_string(),
            labels: TRACKER_LABELS
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
            data: BTreeMap::new(),
            resource_version: None,
        }
    }

    /// Plugins whose stored value is exactly `installer`'s stored form.
    pub fn plugins_with(&self, installer: InstallerType) -> impl Iterator<Item = &str> {
        self.data
            .iter()
            .filter(move |(_, value)| InstallerType::from_stored(value) == Some(installer))
            .map(|(plugin, _)| plugin.as_str())
    }
}
