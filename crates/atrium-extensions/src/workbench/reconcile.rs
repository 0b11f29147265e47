//! Catalog reconciliation
//!
//! Links installed extensions to their catalog records and maps catalog
//! query results onto the objects the workbench already tracks.

use super::ExtensionsWorkbench;
use crate::extension::Extension;
use crate::extension_set::ExtensionSet;
use crate::primary::preferred_environment;
use crate::traits::{ExtensionGallery, ExtensionInfo, GalleryQueryContext, Page, QueryOptions};
use atrium_core::types::{ExtensionEnvironment, GalleryExtension, InstallSource};
use atrium_core::Result;
use futures::future::join_all;
use std::sync::{Arc, PoisonError};
use tracing::{debug, warn};

impl ExtensionsWorkbench {
    /// Search the catalog; results reuse installed objects where they exist
    pub async fn query_gallery(&self, options: &QueryOptions) -> Result<Page<Arc<Extension>>> {
        let Some(gallery) = self.gallery_service() else {
            return Ok(Page {
                total: 0,
                items: Vec::new(),
            });
        };
        let page = gallery.query(options).await?;
        Ok(Page {
            total: page.total,
            items: page.items.into_iter().map(|g| self.map_gallery(g)).collect(),
        })
    }

    /// Fetch specific catalog entries compatible with this product
    pub async fn get_extensions(&self, infos: &[ExtensionInfo]) -> Result<Vec<Arc<Extension>>> {
        let Some(gallery) = self.gallery_service() else {
            return Ok(Vec::new());
        };
        let context = GalleryQueryContext {
            target_platform: self.target_platform().await,
            compatible: true,
            product_version: self.settings().product.version,
            query_all_versions: false,
        };
        let records = gallery.get_extensions(infos, &context).await?;
        Ok(records.into_iter().map(|g| self.map_gallery(g)).collect())
    }

    /// Installed object for the record's identity, else a catalog-only object
    pub(super) fn map_gallery(&self, gallery: GalleryExtension) -> Arc<Extension> {
        if let Some(installed) = self.find_local(&gallery.identifier) {
            if !installed.has_gallery() {
                installed.set_gallery(gallery);
            }
            return installed;
        }

        let key = gallery.identifier.key();
        let mut catalog = self.catalog.lock().unwrap_or_else(PoisonError::into_inner);
        match catalog.get(&key) {
            Some(existing) => {
                existing.set_gallery(gallery);
                existing.clone()
            }
            None => {
                let quality = self.settings().product.quality;
                let extension = Arc::new(Extension::from_gallery(None, quality, gallery));
                catalog.insert(key, extension.clone());
                extension
            }
        }
    }

    /// Environments whose backend can install the catalog record
    ///
    /// A backend that fails to answer counts as unable to install.
    pub async fn installable_environments(
        &self,
        gallery: &GalleryExtension,
    ) -> Result<Vec<ExtensionEnvironment>> {
        let answers = join_all(self.sets.iter().map(|set| async move {
            (set.environment(), set.server().can_install(gallery).await)
        }))
        .await;
        Ok(answers
            .into_iter()
            .filter_map(|(environment, answer)| match answer {
                Ok(true) => Some(environment),
                Ok(false) => None,
                Err(e) => {
                    warn!(
                        "The {} environment could not check {}: {}",
                        environment, gallery.identifier, e
                    );
                    None
                }
            })
            .collect())
    }

    /// Whether the extension could be installed somewhere
    pub async fn can_install(&self, extension: &Extension) -> Result<bool> {
        if let Some(gallery) = extension.gallery() {
            if gallery.malicious || gallery.disallows_install() {
                return Ok(false);
            }
            return Ok(!self.installable_environments(&gallery).await?.is_empty());
        }
        if let Some(resource) = extension.resource() {
            let available = self.environments();
            return Ok(preferred_environment(
                &resource.manifest.extension_kinds(),
                &available,
                &available,
            )
            .is_some());
        }
        Ok(false)
    }

    /// Link installed copies to their catalog records
    ///
    /// Copies installed from a resource and copies already flagged missing
    /// from the catalog are skipped; without `force`, so are copies already
    /// linked. Each environment is queried for its own target platform and a
    /// failing environment is logged and skipped. Returns the copies whose
    /// observable state changed.
    pub(super) async fn sync_with_gallery(
        &self,
        extensions: &[Arc<Extension>],
        force: bool,
    ) -> Vec<Arc<Extension>> {
        let Some(gallery) = self.gallery_service() else {
            return Vec::new();
        };
        let targets: Vec<Arc<Extension>> = extensions
            .iter()
            .filter(|e| {
                e.has_local()
                    && e.install_source() != Some(InstallSource::Resource)
                    && !e.missing_from_gallery()
                    && (force || !e.has_gallery())
            })
            .cloned()
            .collect();
        if targets.is_empty() {
            return Vec::new();
        }

        let mut changed = Vec::new();
        for set in &self.sets {
            let environment = set.environment();
            let in_set: Vec<Arc<Extension>> = targets
                .iter()
                .filter(|e| e.environment() == Some(environment))
                .cloned()
                .collect();
            if in_set.is_empty() {
                continue;
            }
            match self.reconcile_environment(gallery, set, &in_set).await {
                Ok(updated) => changed.extend(updated),
                Err(e) => warn!(
                    "Failed to reconcile the {} environment with the catalog: {}",
                    environment, e
                ),
            }
        }
        changed
    }

    async fn reconcile_environment(
        &self,
        gallery: &dyn ExtensionGallery,
        set: &ExtensionSet,
        extensions: &[Arc<Extension>],
    ) -> Result<Vec<Arc<Extension>>> {
        let target_platform = set.server().get_target_platform().await?;
        let settings = self.settings();
        let pending_version = self
            .host
            .update_state()
            .pending_version()
            .map(str::to_string);

        let infos: Vec<ExtensionInfo> = extensions
            .iter()
            .map(|e| ExtensionInfo::from_identifier(&e.identifier(), e.pre_release()))
            .collect();
        let context = GalleryQueryContext {
            target_platform,
            compatible: false,
            product_version: settings.product.version.clone(),
            query_all_versions: false,
        };
        let records = gallery.get_extensions(&infos, &context).await?;
        debug!(
            "Catalog returned {} of {} records for the {} environment",
            records.len(),
            infos.len(),
            set.environment()
        );

        let mut changed = Vec::new();
        for extension in extensions {
            let identifier = extension.identifier();
            let matched = records
                .iter()
                .find(|g| {
                    matches!((&g.identifier.uuid, &identifier.uuid), (Some(a), Some(b)) if a == b)
                })
                .or_else(|| {
                    records
                        .iter()
                        .find(|g| g.identifier.id.eq_ignore_ascii_case(&identifier.id))
                });

            let Some(record) = matched else {
                if extension.set_missing_from_gallery() {
                    debug!("{} is missing from the catalog", identifier);
                    changed.push(extension.clone());
                }
                continue;
            };

            let pre_release = extension.pre_release();
            let mut compatible = gallery
                .is_extension_compatible(record, pre_release, target_platform, &settings.product.version)
                .await?;
            if !compatible {
                if let Some(pending) = &pending_version {
                    compatible = gallery
                        .is_extension_compatible(record, pre_release, target_platform, pending)
                        .await?;
                }
            }
            if !compatible {
                debug!(
                    "Catalog version {} of {} is not compatible",
                    record.version, identifier
                );
                continue;
            }

            if extension.gallery().as_ref() != Some(record) {
                extension.set_gallery(record.clone());
                changed.push(extension.clone());
            }
        }
        Ok(changed)
    }
}
