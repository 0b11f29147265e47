use super::ExtensionsWorkbench;
use crate::dependency::{collect_uninstall_dependents, dependents_message, pack_closure};
use crate::extension::Extension;
use crate::extension_set::ExtensionSet;
use crate::traits::{ConfirmRequest, UninstallItem};
use atrium_core::types::ExtensionType;
use atrium_core::{Error, Result};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};

/// Keeps identities marked as uninstalling until dropped
struct UninstallGuard<'a> {
    uninstalling: &'a Mutex<HashSet<String>>,
    keys: Vec<String>,
}

impl Drop for UninstallGuard<'_> {
    fn drop(&mut self) {
        let mut uninstalling = self
            .uninstalling
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        for key in &self.keys {
            uninstalling.remove(key);
        }
    }
}

impl ExtensionsWorkbench {
    /// Uninstall an extension with its pack members
    ///
    /// Installed extensions that depend on anything being removed are taken
    /// along after the user confirms. A second uninstall of an identity
    /// already being removed returns without calling the backend.
    pub async fn uninstall(&self, extension: &Arc<Extension>) -> Result<()> {
        let result = self.uninstall_inner(extension).await;
        self.surface(result)
    }

    async fn uninstall_inner(&self, extension: &Arc<Extension>) -> Result<()> {
        if !extension.has_local() {
            return Err(Error::missing_local(extension.id()));
        }
        if extension.is_builtin() {
            return Err(Error::invalid_argument(format!(
                "Cannot uninstall built-in extension '{}'",
                extension.id()
            )));
        }
        let set = extension
            .environment()
            .and_then(|environment| self.set_for(environment))
            .ok_or_else(|| Error::missing_local(extension.id()))?;

        let installed = set.installed();
        let mut collected = vec![extension.clone()];
        collected.extend(pack_closure(extension, &installed));
        let dependents = collect_uninstall_dependents(&mut collected, &installed);

        let Some(_guard) = self.begin_uninstall(&collected) else {
            debug!("Uninstall of {} already in progress", extension.identifier());
            return Ok(());
        };

        if !dependents.is_empty() {
            let result = self
                .dialogs
                .confirm(ConfirmRequest {
                    message: dependents_message("uninstall", extension, &dependents),
                    detail: None,
                    primary_button: "Uninstall All".to_string(),
                    checkbox: None,
                })
                .await;
            if !result.confirmed {
                return Err(Error::UserCancelled);
            }
        }

        let task = self
            .tasks
            .register(format!("uninstall {}", extension.identifier()));
        let mut items: Vec<UninstallItem> = collected
            .iter()
            .filter_map(|e| e.local())
            .map(|local| UninstallItem {
                local,
                profile: None,
            })
            .collect();
        if collected.iter().any(|e| e.is_application_scoped()) {
            items.extend(self.application_scoped_copies(set, &collected).await);
        }

        info!(
            "Uninstalling {} extensions from the {} environment",
            items.len(),
            set.environment()
        );
        let result = set.server().uninstall_extensions(&items).await;
        self.process_events().await;
        drop(task);
        result
    }

    /// Mark every collected identity as uninstalling, unless the target
    /// already is
    fn begin_uninstall(&self, collected: &[Arc<Extension>]) -> Option<UninstallGuard<'_>> {
        let mut uninstalling = self
            .uninstalling
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let target = collected.first()?.key();
        if uninstalling.contains(&target) {
            return None;
        }
        let keys: Vec<String> = collected
            .iter()
            .map(|e| e.key())
            .filter(|key| uninstalling.insert(key.clone()))
            .collect();
        Some(UninstallGuard {
            uninstalling: &self.uninstalling,
            keys,
        })
    }

    /// Application-scoped copies of the collected extensions in other profiles
    async fn application_scoped_copies(
        &self,
        set: &ExtensionSet,
        collected: &[Arc<Extension>],
    ) -> Vec<UninstallItem> {
        let mut items = Vec::new();
        for profile in self.profiles.other_profiles() {
            let records = match set
                .server()
                .get_installed(Some(ExtensionType::User), Some(&profile))
                .await
            {
                Ok(records) => records,
                Err(e) => {
                    warn!("Failed to read extensions of profile {}: {}", profile, e);
                    continue;
                }
            };
            items.extend(
                records
                    .into_iter()
                    .filter(|record| {
                        record.is_application_scoped
                            && collected
                                .iter()
                                .any(|e| e.identifier().matches(&record.identifier))
                    })
                    .map(|local| UninstallItem {
                        local,
                        profile: Some(profile.clone()),
                    }),
            );
        }
        items
    }
}
