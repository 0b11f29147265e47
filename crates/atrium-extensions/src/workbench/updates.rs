//! Update checks, auto-update, pinning and notifications

use super::install::InstallOptions;
use super::{ExtensionsWorkbench, InstallRequest};
use crate::auto_update::{
    should_auto_update, AutoUpdateLists, UpdateCandidate, DISMISSED_NOTIFICATIONS_KEY,
};
use crate::extension::Extension;
use atrium_core::storage::{read_string_list, write_string_list, StorageScope};
use atrium_core::types::MetadataUpdate;
use atrium_core::{Error, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Scope of an auto-update toggle
#[derive(Debug, Clone)]
pub enum AutoUpdateTarget {
    Extension(Arc<Extension>),
    /// A publisher name, applying to all of its extensions
    Publisher(String),
}

/// Result of updating one extension
#[derive(Debug, Clone)]
pub struct UpdateOutcome {
    pub extension: Arc<Extension>,
    pub error: Option<String>,
}

/// Actionable notice about installed extensions
#[derive(Debug, Clone)]
pub struct ExtensionsNotification {
    pub message: String,
    pub extensions: Vec<Arc<Extension>>,
    /// Identifies the notice in the dismissed list
    pub key: String,
}

fn candidate(extension: &Extension) -> UpdateCandidate {
    UpdateCandidate::from(extension)
}

impl ExtensionsWorkbench {
    /// Re-query the catalog for every installed extension
    ///
    /// Fires a change for every extension whose catalog record changed, then
    /// runs the auto-update pass. Returns the outdated extensions.
    pub async fn check_for_updates(&self) -> Result<Vec<Arc<Extension>>> {
        if self.gallery_service().is_none() {
            debug!("Skipping update check: no catalog");
            return Ok(Vec::new());
        }
        let task = self.tasks.register("check for updates");
        let copies = self.all_installed();
        let was_outdated: Vec<bool> = copies.iter().map(|e| e.outdated()).collect();

        let mut changed = self.sync_with_gallery(&copies, true).await;
        for (extension, before) in copies.iter().zip(was_outdated) {
            if extension.outdated() != before {
                changed.push(extension.clone());
            }
        }
        self.recompute_view();
        self.emit_changes(changed);

        if task.is_cancelled() {
            return Ok(self.outdated());
        }
        self.auto_update_extensions().await?;
        Ok(self.outdated())
    }

    /// Update every outdated extension the policy allows
    ///
    /// A failing update is logged and the pass continues. Returns the
    /// extensions that were updated.
    pub async fn auto_update_extensions(&self) -> Result<Vec<Arc<Extension>>> {
        let lists = AutoUpdateLists::load(self.storage.as_ref())?;
        let mode = self.settings().auto_update;
        let candidates: Vec<Arc<Extension>> = self
            .outdated()
            .into_iter()
            .filter(|e| should_auto_update(&candidate(e), mode, &lists))
            .collect();
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        info!("Auto-updating {} extensions", candidates.len());
        let mut updated = Vec::new();
        for extension in candidates {
            match self.update(&extension).await {
                Ok(result) => updated.push(result),
                Err(e) => warn!("Failed to auto-update {}: {}", extension.identifier(), e),
            }
        }
        Ok(updated)
    }

    /// Update every outdated extension regardless of the auto-update policy
    pub async fn update_all(&self) -> Vec<UpdateOutcome> {
        let task = self.tasks.register("update all");
        let mut outcomes = Vec::new();
        for extension in self.outdated() {
            if task.is_cancelled() {
                break;
            }
            let error = match self.update(&extension).await {
                Ok(_) => None,
                Err(e) => {
                    warn!("Failed to update {}: {}", extension.identifier(), e);
                    Some(e.to_string())
                }
            };
            outcomes.push(UpdateOutcome { extension, error });
        }
        outcomes
    }

    async fn update(&self, extension: &Arc<Extension>) -> Result<Arc<Extension>> {
        if !extension.has_gallery() {
            return Err(Error::not_found(extension.id(), None));
        }
        let options = InstallOptions {
            pre_release: Some(extension.pre_release()),
            ..Default::default()
        };
        self.install_inner(InstallRequest::Extension(extension.clone()), &options)
            .await
    }

    /// Pin or unpin the installed version in every environment
    pub async fn set_pinned(&self, extension: &Arc<Extension>, pinned: bool) -> Result<()> {
        let result = self.set_pinned_inner(extension, pinned).await;
        self.surface(result)
    }

    async fn set_pinned_inner(&self, extension: &Arc<Extension>, pinned: bool) -> Result<()> {
        if !extension.has_local() {
            return Err(Error::missing_local(extension.id()));
        }
        let identifier = extension.identifier();
        let update = MetadataUpdate {
            pinned: Some(pinned),
            pre_release: None,
        };
        let mut changed = Vec::new();
        let mut failure = None;
        for copy in self.all_installed() {
            if !copy.identifier().matches(&identifier) {
                continue;
            }
            let (Some(local), Some(set)) = (
                copy.local(),
                copy.environment().and_then(|env| self.set_for(env)),
            ) else {
                continue;
            };
            match set.server().update_metadata(&local, &update).await {
                Ok(updated) => {
                    copy.set_local(updated);
                    changed.push(copy);
                }
                Err(e) => {
                    warn!(
                        "Failed to update metadata of {} in the {} environment: {}",
                        identifier,
                        set.environment(),
                        e
                    );
                    failure.get_or_insert(e);
                }
            }
        }
        debug!("{} {}", if pinned { "Pinned" } else { "Unpinned" }, identifier);
        self.process_events().await;
        self.emit_changes(changed);
        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Whether the policy currently allows auto-updating the extension
    pub fn is_auto_update_enabled_for(&self, extension: &Extension) -> Result<bool> {
        let lists = AutoUpdateLists::load(self.storage.as_ref())?;
        Ok(should_auto_update(
            &candidate(extension),
            self.settings().auto_update,
            &lists,
        ))
    }

    /// Turn auto-update on or off for one extension or a publisher
    ///
    /// Enabling auto-update for a pinned extension unpins it. A publisher
    /// toggle fires a change for every installed extension whose effective
    /// policy flipped.
    pub async fn update_auto_update_for(&self, target: AutoUpdateTarget, enable: bool) -> Result<()> {
        let mode = self.settings().auto_update;
        let mut lists = AutoUpdateLists::load(self.storage.as_ref())?;
        let installed = self.installed();
        let before: Vec<bool> = installed
            .iter()
            .map(|e| should_auto_update(&candidate(e), mode, &lists))
            .collect();

        match &target {
            AutoUpdateTarget::Extension(extension) => {
                lists.set_extension(&extension.id(), &extension.publisher(), enable, mode);
            }
            AutoUpdateTarget::Publisher(publisher) => {
                lists.set_publisher(publisher, enable)?;
            }
        }
        lists.save(self.storage.as_ref())?;

        let mut changed: Vec<Arc<Extension>> = installed
            .iter()
            .zip(before)
            .filter(|(e, was)| {
                should_auto_update(&candidate(e), mode, &lists) != *was
            })
            .map(|(e, _)| e.clone())
            .collect();

        if let AutoUpdateTarget::Extension(extension) = &target {
            if enable && extension.pinned() {
                self.set_pinned_inner(extension, false).await?;
            }
            changed.push(extension.clone());
        }
        self.emit_changes(changed);
        Ok(())
    }

    /// Notice about installed extensions that are malicious or may no longer
    /// be installed, unless the same notice was dismissed
    pub fn notification(&self) -> Result<Option<ExtensionsNotification>> {
        let flagged: Vec<Arc<Extension>> = self
            .installed()
            .into_iter()
            .filter(|e| {
                e.is_malicious() || e.deprecation_info().is_some_and(|info| info.disallow_install)
            })
            .collect();
        if flagged.is_empty() {
            return Ok(None);
        }

        let mut ids: Vec<String> = flagged.iter().map(|e| e.key()).collect();
        ids.sort();
        let key = ids.join(",");
        let dismissed = read_string_list(
            self.storage.as_ref(),
            DISMISSED_NOTIFICATIONS_KEY,
            StorageScope::Profile,
        )?;
        if dismissed.contains(&key) {
            return Ok(None);
        }

        let names: Vec<String> = flagged.iter().map(|e| e.display_name()).collect();
        Ok(Some(ExtensionsNotification {
            message: format!(
                "The following extensions are malicious or no longer supported and should be uninstalled: {}",
                names.join(", ")
            ),
            extensions: flagged,
            key,
        }))
    }

    /// Remember the current notice as dismissed
    pub fn dismiss_notification(&self) -> Result<()> {
        let Some(notification) = self.notification()? else {
            return Ok(());
        };
        let mut dismissed = read_string_list(
            self.storage.as_ref(),
            DISMISSED_NOTIFICATIONS_KEY,
            StorageScope::Profile,
        )?;
        dismissed.push(notification.key);
        write_string_list(
            self.storage.as_ref(),
            DISMISSED_NOTIFICATIONS_KEY,
            StorageScope::Profile,
            &dismissed,
        )
    }

    /// Download the catalog package of an extension
    pub async fn download(&self, extension: &Extension, destination: &Path) -> Result<()> {
        let gallery = extension
            .gallery()
            .ok_or_else(|| Error::not_found(extension.id(), None))?;
        let service = self
            .gallery_service()
            .ok_or_else(|| Error::backend("The extension catalog is not available"))?;
        service.download(&gallery, destination).await
    }
}
