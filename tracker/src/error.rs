use std::time::Duration;

use thiserror::Error;

use crate::RemoteError;

/// Public tracker operation, used to give errors context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Record,
    GetInstaller,
    ListByInstaller,
    ListEntries,
    Remove,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Record => "record installer",
            Self::GetInstaller => "get installer",
            Self::ListByInstaller => "list plugins by installer",
            Self::ListEntries => "list tracked plugins",
            Self::Remove => "remove installer record",
        }
    }

    pub fn is_mutation(self) -> bool {
        matches!(self, Self::Record | Self::Remove)
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors surfaced by the installer tracker.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// No session to the remote store could be established.
    #[error("failed to initialize tracker client: {0}")]
    Initialization(String),

    #[error("invalid plugin name '{name}': {reason}")]
    InvalidPluginName { name: String, reason: &'static str },

    #[error("{op} failed{}: {source}", for_plugin(.plugin))]
    Remote {
        op: Operation,
        plugin: Option<String>,
        source: RemoteError,
    },

    #[error("{op} exceeded its deadline of {timeout:?}")]
    DeadlineExceeded { op: Operation, timeout: Duration },

    #[error("{op} for plugin '{plugin}' gave up after {attempts} conflicting attempts")]
    Contention {
        op: Operation,
        plugin: String,
        attempts: usize,
    },

    #[error("plugin '{plugin}' has unrecognized installer '{value}' recorded")]
    UnknownInstaller { plugin: String, value: String },
}

impl TrackerError {
    pub(crate) fn remote(op: Operation, plugin: Option<&str>, source: RemoteError) -> Self {
        Self::Remote {
            op,
            plugin: plugin.map(str::to_string),
            source,
        }
    }

    /// True when the failure is a version conflict that a fresh attempt may resolve.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Remote { source, .. } if source.is_conflict())
    }

    pub fn is_deadline_exceeded(&self) -> bool {
        matches!(self, Self::DeadlineExceeded { .. })
    }
}

fn for_plugin(plugin: &Option<String>) -> String {
    match plugin {
        Some(name) => format!(" for plugin '{name}'"),
        None => String::new(),
    }
}
