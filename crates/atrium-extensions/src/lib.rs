//! Extension lifecycle management for Atrium
//!
//! This crate handles:
//! - Per-environment tracking of installed extensions
//! - Install, update and uninstall orchestration across environments
//! - Enable/disable cascades over dependencies and extension packs
//! - Auto-update policy and catalog reconciliation
//! - Deciding when the host must reload for a change to take effect

pub mod auto_update;
pub mod dependency;
pub mod events;
pub mod extension;
pub mod extension_set;
pub mod primary;
pub mod runtime_action;
pub mod tasks;
pub mod traits;
pub mod workbench;

pub use auto_update::{should_auto_update, AutoUpdateLists, UpdateCandidate};
pub use events::{
    EnablementEvent, HostEvent, InstallEventSource, InstallOperation, InstallResult, ServerEvent,
    WorkbenchEvent,
};
pub use extension::Extension;
pub use extension_set::ExtensionSet;
pub use runtime_action::{RuntimeAction, RuntimeActionKind};
pub use tasks::{TaskInfo, TaskRegistry};
pub use traits::{
    ConfirmRequest, ConfirmResult, Dialogs, ExtensionEnablement, ExtensionGallery, ExtensionHost,
    ExtensionInfo, ExtensionManagementServer, GalleryQueryContext, GalleryVersion, Page,
    PromptRequest, PromptResult, QueryOptions, ServerInstallOptions, UninstallItem, UpdateState,
    UserProfiles,
};
pub use workbench::{
    AutoUpdateTarget, Collaborators, ExtensionsNotification, ExtensionsWorkbench, InstallOptions,
    InstallRequest, UpdateOutcome,
};
