use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Mechanism that installed a plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallerType {
    /// Package-manager style install through Helm releases.
    Helm,
    /// GitOps style install through an Argo CD `Application`.
    ArgoCd,
}

impl InstallerType {
    pub const ALL: [InstallerType; 2] = [InstallerType::Helm, InstallerType::ArgoCd];

    /// Value stored in the tracker document.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Helm => "helm",
            Self::ArgoCd => "argocd",
        }
    }

    /// Exact inverse of [`Self::as_str`], for values read back from the
    /// tracker document. Anything else is unrecognized.
    pub fn from_stored(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|installer| installer.as_str() == value)
    }
}

impl std::fmt::Display for InstallerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Returned when a string names no known installer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown installer type '{0}' (expected one of: helm, argocd)")]
pub struct ParseInstallerTypeError(pub String);

/// Lenient parse for user input: trims, ignores case, accepts `argo-cd`.
impl FromStr for InstallerType {
    type Err = ParseInstallerTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "helm" => Ok(Self::Helm),
            "argocd" | "argo-cd" => Ok(Self::ArgoCd),
            _ => Err(ParseInstallerTypeError(s.to_string())),
        }
    }
}
