//! Runtime-action resolver
//!
//! Decides whether the host must be reloaded, restarted or updated for the
//! installed state of an extension to take effect.

use crate::extension::Extension;
use crate::primary::{prefers_ui, prefers_workspace};
use crate::traits::{ExtensionHost, UpdateState};
use atrium_core::config::ProductInfo;
use atrium_core::types::{
    EnablementState, ExtensionEnvironment, ExtensionState, RunningExtension,
};
use atrium_core::version::is_engine_valid;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeActionKind {
    ReloadWindow,
    RestartExtensions,
    DownloadUpdate,
    ApplyUpdate,
    QuitAndInstall,
}

impl fmt::Display for RuntimeActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReloadWindow => write!(f, "reload window"),
            Self::RestartExtensions => write!(f, "restart extensions"),
            Self::DownloadUpdate => write!(f, "download update"),
            Self::ApplyUpdate => write!(f, "apply update"),
            Self::QuitAndInstall => write!(f, "quit and install"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeAction {
    pub kind: RuntimeActionKind,
    pub reason: String,
}

impl RuntimeAction {
    fn new(kind: RuntimeActionKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
        }
    }
}

/// Snapshot of everything the resolver looks at besides the extension
pub struct RuntimeContext<'a> {
    pub host: &'a dyn ExtensionHost,
    pub running: &'a [RunningExtension],
    /// Environments that have an install backend
    pub environments: &'a [ExtensionEnvironment],
    /// Installed copies across every environment
    pub installed: &'a [Arc<Extension>],
    pub product: &'a ProductInfo,
    pub update_state: &'a UpdateState,
}

impl RuntimeContext<'_> {
    fn has_remote(&self) -> bool {
        self.environments.contains(&ExtensionEnvironment::Remote)
    }

    fn copy_in(&self, extension: &Extension, environment: ExtensionEnvironment) -> Option<&Arc<Extension>> {
        let identifier = extension.identifier();
        self.installed.iter().find(|e| {
            e.environment() == Some(environment) && e.identifier().matches(&identifier)
        })
    }

    fn copy_elsewhere(&self, extension: &Extension) -> Option<&Arc<Extension>> {
        let identifier = extension.identifier();
        self.installed.iter().find(|e| {
            e.environment() != extension.environment() && e.identifier().matches(&identifier)
        })
    }
}

/// Action required for the current installed state of `extension` to take effect
pub fn resolve(extension: &Extension, context: &RuntimeContext<'_>) -> Option<RuntimeAction> {
    let identifier = extension.identifier();
    let running = context
        .running
        .iter()
        .find(|r| r.identifier.matches_id(&identifier.id));

    let reload = if context.has_remote() {
        RuntimeActionKind::ReloadWindow
    } else {
        RuntimeActionKind::RestartExtensions
    };
    let reload_label = reload.to_string();

    if extension.state() == ExtensionState::Uninstalled {
        let running = running?;
        let can_remove = context.host.can_remove_extension(running);
        let same_environment = extension
            .environment()
            .map_or(true, |env| env == running.environment);
        let same_resource = extension
            .resource()
            .map_or(true, |resource| resource.location == running.location);
        if !can_remove && same_environment && same_resource {
            return Some(RuntimeAction::new(
                reload,
                format!("Please {} to complete the uninstallation of this extension.", reload_label),
            ));
        }
        return None;
    }

    let local = extension.local()?;
    let kinds = local.manifest.extension_kinds();
    let is_enabled = extension.is_enabled();

    let Some(running) = running else {
        if is_enabled && !context.host.can_add_extension(&local) {
            return Some(RuntimeAction::new(
                reload,
                format!("Please {} to enable this extension.", reload_label),
            ));
        }
        let other = match extension.environment() {
            Some(ExtensionEnvironment::Local) => Some(ExtensionEnvironment::Remote),
            Some(ExtensionEnvironment::Remote) => Some(ExtensionEnvironment::Local),
            _ => None,
        };
        if let Some(other) = other {
            if extension.enablement_state() == EnablementState::DisabledByExtensionKind
                && context
                    .copy_in(extension, other)
                    .is_some_and(|copy| copy.has_local() && copy.is_enabled())
            {
                return Some(RuntimeAction::new(
                    reload,
                    format!("Please {} to enable this extension.", reload_label),
                ));
            }
        }
        return None;
    };

    let same_environment_running = extension.environment() == Some(running.environment);

    if !is_enabled {
        if same_environment_running {
            return Some(RuntimeAction::new(
                reload,
                format!("Please {} to disable this extension.", reload_label),
            ));
        }
        return None;
    }

    if context.host.can_add_extension(&local) {
        return None;
    }

    if same_environment_running {
        if local.version() != running.version || local.target_platform != running.target_platform {
            return Some(version_drift_action(&local.manifest.engines.host, reload, context));
        }

        if context.environments.len() > 1 {
            if let Some(other) = context.copy_elsewhere(extension) {
                if running.environment == ExtensionEnvironment::Remote
                    && prefers_ui(&kinds)
                    && other.environment() == Some(ExtensionEnvironment::Local)
                {
                    return Some(RuntimeAction::new(
                        reload,
                        format!("Please {} to enable this extension locally.", reload_label),
                    ));
                }
                if running.environment == ExtensionEnvironment::Local
                    && prefers_workspace(&kinds)
                    && other.environment() == Some(ExtensionEnvironment::Remote)
                {
                    return Some(RuntimeAction::new(
                        reload,
                        format!(
                            "Please {} to enable this extension in the remote environment.",
                            reload_label
                        ),
                    ));
                }
            }
        }
        return None;
    }

    match (extension.environment(), running.environment) {
        (Some(ExtensionEnvironment::Local), ExtensionEnvironment::Remote) if prefers_ui(&kinds) => {
            Some(RuntimeAction::new(
                reload,
                format!("Please {} to enable this extension locally.", reload_label),
            ))
        }
        (Some(ExtensionEnvironment::Remote), ExtensionEnvironment::Local)
            if prefers_workspace(&kinds) =>
        {
            Some(RuntimeAction::new(
                reload,
                format!(
                    "Please {} to enable this extension in the remote environment.",
                    reload_label
                ),
            ))
        }
        _ => None,
    }
}

/// A different build is running; defer to the host's own update when only
/// the pending host version satisfies the extension's engine
fn version_drift_action(
    engine: &str,
    reload: RuntimeActionKind,
    context: &RuntimeContext<'_>,
) -> RuntimeAction {
    if let Some(pending) = context.update_state.pending_version() {
        if !is_engine_valid(engine, &context.product.version) && is_engine_valid(engine, pending) {
            let reason = "Please update the application to enable the updated extension.";
            return match context.update_state {
                UpdateState::AvailableForDownload { .. } => {
                    RuntimeAction::new(RuntimeActionKind::DownloadUpdate, reason)
                }
                UpdateState::Downloaded { .. } => {
                    RuntimeAction::new(RuntimeActionKind::ApplyUpdate, reason)
                }
                UpdateState::Ready { .. } => {
                    RuntimeAction::new(RuntimeActionKind::QuitAndInstall, reason)
                }
                _ => RuntimeAction::new(reload, "The application is updating."),
            };
        }
    }
    RuntimeAction::new(
        reload,
        format!("Please {} to enable the updated extension.", reload),
    )
}
