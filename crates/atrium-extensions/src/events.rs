use crate::extension::Extension;
use atrium_core::types::{
    ExtensionIdentifier, GalleryExtension, LocalExtension, ResourceExtension,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// What an install was started from
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InstallEventSource {
    Gallery(GalleryExtension),
    Package { location: String },
    Resource(ResourceExtension),
}

impl InstallEventSource {
    pub fn gallery(&self) -> Option<&GalleryExtension> {
        match self {
            Self::Gallery(gallery) => Some(gallery),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InstallOperation {
    Install,
    Update,
    Migrate,
}

/// Outcome of one install reported by a backend
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InstallResult {
    pub identifier: ExtensionIdentifier,
    pub operation: InstallOperation,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub source: Option<InstallEventSource>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub local: Option<LocalExtension>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
    /// Profile the install applied to; `None` for the active profile
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub profile: Option<String>,
}

/// Lifecycle events emitted by an install backend
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    InstallStarted {
        identifier: ExtensionIdentifier,
        source: InstallEventSource,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        profile: Option<String>,
    },

    InstallsFinished { results: Vec<InstallResult> },

    UninstallStarted {
        identifier: ExtensionIdentifier,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        profile: Option<String>,
    },

    UninstallFinished {
        identifier: ExtensionIdentifier,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        error: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        profile: Option<String>,
    },

    MetadataUpdated { local: LocalExtension },

    /// The active profile switched; installed records must be re-read
    ProfileChanged,
}

/// Enablement of the listed extensions changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnablementEvent {
    pub identifiers: Vec<ExtensionIdentifier>,
}

/// Extension host notifications
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    /// The set of running extensions changed
    ExtensionsChanged,
    ExtensionActivated { identifier: ExtensionIdentifier },
}

/// Notifications raised by the lifecycle manager
#[derive(Debug, Clone)]
pub enum WorkbenchEvent {
    /// One extension's observable state changed
    ExtensionChanged(Arc<Extension>),
    /// The aggregated view was recomputed
    ViewChanged,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_event_tagging() {
        let event = ServerEvent::UninstallStarted {
            identifier: ExtensionIdentifier::new("pub.ext"),
            profile: None,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "uninstall_started");
        assert_eq!(json["identifier"]["id"], "pub.ext");
        assert!(json.get("profile").is_none());
    }

    #[test]
    fn test_install_source_round_trip() {
        let source = InstallEventSource::Package {
            location: "/tmp/pub.ext-1.0.0.vsix".into(),
        };
        let json = serde_json::to_string(&source).unwrap();
        let back: InstallEventSource = serde_json::from_str(&json).unwrap();
        assert_eq!(back, source);
        assert!(back.gallery().is_none());
    }
}
