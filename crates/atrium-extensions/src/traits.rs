//! Collaborator trait definitions
//!
//! The lifecycle manager drives these services but does not implement them:
//! one install backend per execution environment, the remote catalog, the
//! enablement store, user-facing dialogs, the extension host and the
//! profile registry.

use crate::events::{EnablementEvent, HostEvent, ServerEvent};
use async_trait::async_trait;
use atrium_core::types::{
    EnablementState, ExtensionEnvironment, ExtensionIdentifier, ExtensionManifest, ExtensionType,
    GalleryExtension, LocalExtension, MetadataUpdate, ResourceExtension, RunningExtension,
    TargetPlatform,
};
use atrium_core::Result;
use chrono::{DateTime, Utc};
use std::path::Path;
use tokio::sync::broadcast;

/// Options forwarded to a backend install call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerInstallOptions {
    /// Install the pre-release build
    pub pre_release: bool,
    /// Pin the installed version
    pub pinned: bool,
    /// Reinstall even when the same version is present
    pub force: bool,
    /// Also install dependencies and pack members
    pub install_dependencies: bool,
}

/// One entry of an uninstall batch
#[derive(Debug, Clone, PartialEq)]
pub struct UninstallItem {
    pub local: LocalExtension,
    /// Profile to uninstall from; `None` for the active profile
    pub profile: Option<String>,
}

/// Install backend for one execution environment
#[async_trait]
pub trait ExtensionManagementServer: Send + Sync {
    /// Environment this backend serves
    fn environment(&self) -> ExtensionEnvironment;

    /// Subscribe to install/uninstall lifecycle events
    fn subscribe(&self) -> broadcast::Receiver<ServerEvent>;

    /// Installed records, optionally filtered by type and profile
    async fn get_installed(
        &self,
        extension_type: Option<ExtensionType>,
        profile: Option<&str>,
    ) -> Result<Vec<LocalExtension>>;

    async fn install_from_gallery(
        &self,
        gallery: &GalleryExtension,
        options: &ServerInstallOptions,
    ) -> Result<LocalExtension>;

    async fn update_from_gallery(
        &self,
        gallery: &GalleryExtension,
        local: &LocalExtension,
        options: &ServerInstallOptions,
    ) -> Result<LocalExtension>;

    /// Install a package file
    async fn install_vsix(
        &self,
        location: &str,
        options: &ServerInstallOptions,
    ) -> Result<LocalExtension>;

    async fn install_resource_extension(
        &self,
        resource: &ResourceExtension,
        options: &ServerInstallOptions,
    ) -> Result<LocalExtension>;

    async fn uninstall_extensions(&self, items: &[UninstallItem]) -> Result<()>;

    async fn update_metadata(
        &self,
        local: &LocalExtension,
        update: &MetadataUpdate,
    ) -> Result<LocalExtension>;

    /// Whether the catalog record can be installed in this environment
    async fn can_install(&self, gallery: &GalleryExtension) -> Result<bool>;

    async fn get_target_platform(&self) -> Result<TargetPlatform>;

    /// Read the manifest embedded in a package file
    async fn get_package_manifest(&self, location: &str) -> Result<ExtensionManifest>;
}

/// Catalog query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOptions {
    pub text: Option<String>,
    pub ids: Vec<String>,
    pub page: usize,
    pub page_size: usize,
    pub include_pre_release: bool,
}

/// One page of catalog results
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub total: usize,
    pub items: Vec<T>,
}

/// Identifies a catalog entry to fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionInfo {
    pub id: String,
    pub uuid: Option<String>,
    pub version: Option<String>,
    pub pre_release: bool,
}

impl ExtensionInfo {
    pub fn from_identifier(identifier: &ExtensionIdentifier, pre_release: bool) -> Self {
        Self {
            id: identifier.id.clone(),
            uuid: identifier.uuid.clone(),
            version: None,
            pre_release,
        }
    }
}

/// Context for a batch catalog lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryQueryContext {
    pub target_platform: TargetPlatform,
    /// Only return versions compatible with `product_version`
    pub compatible: bool,
    pub product_version: String,
    /// Search older versions when the latest is incompatible
    pub query_all_versions: bool,
}

/// A published version of a catalog entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryVersion {
    pub version: String,
    pub is_pre_release: bool,
    pub date: Option<DateTime<Utc>>,
}

/// Remote catalog client
#[async_trait]
pub trait ExtensionGallery: Send + Sync {
    /// Whether the catalog is reachable and configured
    fn is_enabled(&self) -> bool {
        true
    }

    async fn query(&self, options: &QueryOptions) -> Result<Page<GalleryExtension>>;

    async fn get_extensions(
        &self,
        infos: &[ExtensionInfo],
        context: &GalleryQueryContext,
    ) -> Result<Vec<GalleryExtension>>;

    async fn is_extension_compatible(
        &self,
        gallery: &GalleryExtension,
        pre_release: bool,
        target_platform: TargetPlatform,
        product_version: &str,
    ) -> Result<bool>;

    async fn get_manifest(&self, gallery: &GalleryExtension) -> Result<Option<ExtensionManifest>>;

    async fn get_readme(&self, gallery: &GalleryExtension) -> Result<String>;

    async fn get_changelog(&self, gallery: &GalleryExtension) -> Result<String>;

    async fn get_all_versions(&self, identifier: &ExtensionIdentifier)
        -> Result<Vec<GalleryVersion>>;

    async fn download(&self, gallery: &GalleryExtension, destination: &Path) -> Result<()>;
}

/// Enablement store
#[async_trait]
pub trait ExtensionEnablement: Send + Sync {
    fn subscribe(&self) -> broadcast::Receiver<EnablementEvent>;

    fn get_enablement_state(&self, local: &LocalExtension) -> EnablementState;

    fn is_enabled(&self, local: &LocalExtension) -> bool {
        self.get_enablement_state(local).is_enabled()
    }

    /// Apply a state to every record; returns per-record whether it changed
    async fn set_enablement(
        &self,
        locals: &[LocalExtension],
        state: EnablementState,
    ) -> Result<Vec<bool>>;
}

/// Confirmation dialog request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmRequest {
    pub message: String,
    pub detail: Option<String>,
    pub primary_button: String,
    pub checkbox: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfirmResult {
    pub confirmed: bool,
    pub checkbox_checked: bool,
}

/// Choice prompt request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptRequest {
    pub message: String,
    pub choices: Vec<String>,
    pub checkbox: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PromptResult {
    /// Index of the selected choice; `None` when dismissed
    pub choice: Option<usize>,
    pub checkbox_checked: bool,
}

/// User-facing dialogs and notifications
#[async_trait]
pub trait Dialogs: Send + Sync {
    async fn confirm(&self, request: ConfirmRequest) -> ConfirmResult;

    async fn prompt(&self, request: PromptRequest) -> PromptResult;

    fn notify_error(&self, message: &str);
}

/// Pipeline state of a pending host update
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum UpdateState {
    #[default]
    Idle,
    CheckingForUpdates,
    AvailableForDownload { version: String },
    Downloading,
    Downloaded { version: String },
    Updating { version: String },
    Ready { version: String },
}

impl UpdateState {
    /// Product version the host will run after its pending update
    pub fn pending_version(&self) -> Option<&str> {
        match self {
            Self::AvailableForDownload { version }
            | Self::Downloaded { version }
            | Self::Updating { version }
            | Self::Ready { version } => Some(version),
            _ => None,
        }
    }
}

/// Process that loads and runs extensions
pub trait ExtensionHost: Send + Sync {
    fn subscribe(&self) -> broadcast::Receiver<HostEvent>;

    fn running_extensions(&self) -> Vec<RunningExtension>;

    /// Whether the extension can be started without restarting the host
    fn can_add_extension(&self, local: &LocalExtension) -> bool;

    /// Whether the running extension can be stopped without restarting the host
    fn can_remove_extension(&self, running: &RunningExtension) -> bool;

    fn update_state(&self) -> UpdateState;
}

/// Registry of user profiles
pub trait UserProfiles: Send + Sync {
    /// Locations of every profile other than the active one
    fn other_profiles(&self) -> Vec<String>;
}
