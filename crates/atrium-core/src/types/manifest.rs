//! Extension manifest (the package's `package.json` contents)

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where an extension's code is able to run
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ExtensionKind {
    Ui,
    Workspace,
    Web,
}

impl fmt::Display for ExtensionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ui => write!(f, "ui"),
            Self::Workspace => write!(f, "workspace"),
            Self::Web => write!(f, "web"),
        }
    }
}

/// Engine compatibility requirements
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Engines {
    /// Host version requirement (semver range, `*` for any)
    #[serde(default = "default_engine")]
    pub host: String,
}

impl Default for Engines {
    fn default() -> Self {
        Self {
            host: default_engine(),
        }
    }
}

fn default_engine() -> String {
    "*".to_string()
}

/// Extension manifest
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionManifest {
    pub name: String,

    pub publisher: String,

    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub engines: Engines,

    /// Entry point for workspace-hosted code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main: Option<String>,

    /// Entry point for web-hosted code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browser: Option<String>,

    /// Declared kinds, in preference order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension_kind: Option<Vec<ExtensionKind>>,

    /// Hard dependencies (`publisher.name` ids)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extension_dependencies: Vec<String>,

    /// Pack members (`publisher.name` ids)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extension_pack: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,
}

impl ExtensionManifest {
    /// `publisher.name` identifier declared by this manifest
    pub fn identifier(&self) -> String {
        format!("{}.{}", self.publisher, self.name)
    }

    /// Kinds this extension can run as, deduced from entry points when not declared
    pub fn extension_kinds(&self) -> Vec<ExtensionKind> {
        if let Some(kinds) = &self.extension_kind {
            if !kinds.is_empty() {
                return kinds.clone();
            }
        }
        deduce_extension_kind(self)
    }

    /// Whether the extension contributes no code
    pub fn is_declarative(&self) -> bool {
        self.main.is_none() && self.browser.is_none()
    }
}

/// Kinds implied by the manifest's entry points
pub fn deduce_extension_kind(manifest: &ExtensionManifest) -> Vec<ExtensionKind> {
    match (&manifest.main, &manifest.browser) {
        (Some(_), Some(_)) => vec![ExtensionKind::Workspace, ExtensionKind::Web],
        (Some(_), None) => vec![ExtensionKind::Workspace],
        (None, Some(_)) => vec![ExtensionKind::Web],
        (None, None) => vec![
            ExtensionKind::Ui,
            ExtensionKind::Workspace,
            ExtensionKind::Web,
        ],
    }
}
