//! Install, catalog and resource records for a single extension

use super::{ExtensionEnvironment, ExtensionIdentifier, ExtensionManifest, TargetPlatform};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Whether the extension ships with the product or was installed by the user
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExtensionType {
    System,
    #[default]
    User,
}

/// How a local copy was acquired
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum InstallSource {
    #[default]
    Gallery,
    Vsix,
    Resource,
}

/// Record of an extension installed in one environment
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct LocalExtension {
    pub identifier: ExtensionIdentifier,

    pub manifest: ExtensionManifest,

    /// Install location (directory or resource URI)
    pub location: String,

    #[serde(rename = "type", default)]
    pub extension_type: ExtensionType,

    #[serde(default)]
    pub is_builtin: bool,

    #[serde(default)]
    pub is_workspace_scoped: bool,

    /// Installed once and shared by every user profile
    #[serde(default)]
    pub is_application_scoped: bool,

    #[serde(default)]
    pub target_platform: TargetPlatform,

    #[serde(default)]
    pub is_pre_release_version: bool,

    /// User prefers pre-release builds of this extension
    #[serde(default)]
    pub pre_release: bool,

    /// Exempt from auto-update
    #[serde(default)]
    pub pinned: bool,

    #[serde(default)]
    pub source: InstallSource,

    #[serde(default = "default_true")]
    pub is_valid: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installed_timestamp: Option<DateTime<Utc>>,
}

fn default_true() -> bool {
    true
}

impl LocalExtension {
    pub fn version(&self) -> &str {
        &self.manifest.version
    }

    pub fn is_system(&self) -> bool {
        self.extension_type == ExtensionType::System
    }
}

/// Catalog-declared properties of a published version
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub struct GalleryProperties {
    #[serde(default)]
    pub dependencies: Vec<String>,

    #[serde(default)]
    pub extension_pack: Vec<String>,

    /// Host version requirement
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine: Option<String>,

    #[serde(default)]
    pub target_platform: TargetPlatform,

    #[serde(default)]
    pub is_pre_release_version: bool,
}

/// Content locations of a published version
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub struct GalleryAssets {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readme: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changelog: Option<String>,

    #[serde(default)]
    pub download: String,
}

/// Deprecation notice attached to a catalog entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub struct DeprecationInfo {
    /// Installing this extension is no longer permitted
    #[serde(default)]
    pub disallow_install: bool,

    /// Replacement extension id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_info: Option<String>,
}

/// Record of a published version in the remote catalog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct GalleryExtension {
    pub identifier: ExtensionIdentifier,

    pub name: String,

    #[serde(default)]
    pub display_name: String,

    pub publisher: String,

    pub version: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub properties: GalleryProperties,

    #[serde(default)]
    pub assets: GalleryAssets,

    /// A pre-release build is published alongside this one
    #[serde(default)]
    pub has_pre_release_version: bool,

    #[serde(default)]
    pub all_target_platforms: Vec<TargetPlatform>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecation_info: Option<DeprecationInfo>,

    #[serde(default)]
    pub malicious: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_date: Option<DateTime<Utc>>,
}

impl GalleryExtension {
    /// Whether the catalog forbids installing this extension
    pub fn disallows_install(&self) -> bool {
        self.deprecation_info
            .as_ref()
            .is_some_and(|info| info.disallow_install)
    }
}

/// Extension loaded straight from a workspace folder or URI
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct ResourceExtension {
    pub identifier: ExtensionIdentifier,

    pub location: String,

    pub manifest: ExtensionManifest,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readme: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changelog: Option<String>,
}

/// Metadata fields a backend can rewrite on an installed copy
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataUpdate {
    pub pinned: Option<bool>,
    pub pre_release: Option<bool>,
}

/// Descriptor of an extension currently loaded by the host
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct RunningExtension {
    pub identifier: ExtensionIdentifier,

    pub version: String,

    #[serde(default)]
    pub target_platform: TargetPlatform,

    pub environment: ExtensionEnvironment,

    #[serde(default)]
    pub location: String,
}
