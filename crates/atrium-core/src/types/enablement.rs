//! Enablement and lifecycle states

use serde::{Deserialize, Serialize};
use std::fmt;

/// Effective enablement of an installed extension
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum EnablementState {
    EnabledGlobally,
    EnabledWorkspace,
    EnabledByEnvironment,
    DisabledGlobally,
    DisabledWorkspace,
    DisabledByEnvironment,
    DisabledByExtensionKind,
    DisabledByInvalidExtension,
    DisabledByAllowlist,
    DisabledByMalicious,
    DisabledByVirtualWorkspace,
    DisabledByTrustRequirement,
    DisabledByExtensionDependency,
}

impl EnablementState {
    pub fn is_enabled(&self) -> bool {
        matches!(
            self,
            Self::EnabledGlobally | Self::EnabledWorkspace | Self::EnabledByEnvironment
        )
    }

    /// Disabled by an explicit user choice (as opposed to an environmental constraint)
    pub fn is_disabled_by_user(&self) -> bool {
        matches!(self, Self::DisabledGlobally | Self::DisabledWorkspace)
    }
}

impl fmt::Display for EnablementState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::EnabledGlobally => "enabled",
            Self::EnabledWorkspace => "enabled (workspace)",
            Self::EnabledByEnvironment => "enabled (environment)",
            Self::DisabledGlobally => "disabled",
            Self::DisabledWorkspace => "disabled (workspace)",
            Self::DisabledByEnvironment => "disabled (environment)",
            Self::DisabledByExtensionKind => "disabled (extension kind)",
            Self::DisabledByInvalidExtension => "disabled (invalid)",
            Self::DisabledByAllowlist => "disabled (not allowed)",
            Self::DisabledByMalicious => "disabled (malicious)",
            Self::DisabledByVirtualWorkspace => "disabled (virtual workspace)",
            Self::DisabledByTrustRequirement => "disabled (untrusted workspace)",
            Self::DisabledByExtensionDependency => "disabled (dependency)",
        };
        f.write_str(label)
    }
}

/// Lifecycle state of an Extension
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ExtensionState {
    Installing,
    Installed,
    Uninstalling,
    Uninstalled,
}

impl fmt::Display for ExtensionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Installing => write!(f, "installing"),
            Self::Installed => write!(f, "installed"),
            Self::Uninstalling => write!(f, "uninstalling"),
            Self::Uninstalled => write!(f, "uninstalled"),
        }
    }
}
