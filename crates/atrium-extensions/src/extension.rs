//! The Extension entity
//!
//! An `Extension` merges up to three records for one logical extension: the
//! local install record, the catalog record and a filesystem resource record.
//! At least one of them is always present. Objects are shared as
//! `Arc<Extension>` so observers keep a stable identity while the owning
//! Extension Set swaps records underneath.

use crate::traits::ExtensionGallery;
use atrium_core::config::ProductQuality;
use atrium_core::types::{
    DeprecationInfo, EnablementState, ExtensionEnvironment, ExtensionIdentifier, ExtensionKind,
    ExtensionManifest, ExtensionState, GalleryExtension, InstallSource, LocalExtension,
    ResourceExtension, TargetPlatform,
};
use atrium_core::version::{compare_versions, is_newer};
use atrium_core::{Error, Result};
use std::cmp::Ordering;
use std::fmt;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Clone)]
struct ExtensionData {
    local: Option<LocalExtension>,
    gallery: Option<GalleryExtension>,
    resource: Option<ResourceExtension>,
    state: ExtensionState,
    enablement_state: EnablementState,
    missing_from_gallery: bool,
    quality: ProductQuality,
}

/// One logical extension in one environment (or catalog-only)
pub struct Extension {
    environment: Option<ExtensionEnvironment>,
    data: RwLock<ExtensionData>,
}

impl Extension {
    fn with_records(
        environment: Option<ExtensionEnvironment>,
        quality: ProductQuality,
        local: Option<LocalExtension>,
        gallery: Option<GalleryExtension>,
        resource: Option<ResourceExtension>,
    ) -> Self {
        let state = if local.is_some() {
            ExtensionState::Installed
        } else {
            ExtensionState::Uninstalled
        };
        Self {
            environment,
            data: RwLock::new(ExtensionData {
                local,
                gallery,
                resource,
                state,
                enablement_state: EnablementState::EnabledGlobally,
                missing_from_gallery: false,
                quality,
            }),
        }
    }

    /// Extension backed by an installed record
    pub fn from_local(
        environment: ExtensionEnvironment,
        quality: ProductQuality,
        local: LocalExtension,
    ) -> Self {
        Self::with_records(Some(environment), quality, Some(local), None, None)
    }

    /// Extension backed by a catalog record
    pub fn from_gallery(
        environment: Option<ExtensionEnvironment>,
        quality: ProductQuality,
        gallery: GalleryExtension,
    ) -> Self {
        Self::with_records(environment, quality, None, Some(gallery), None)
    }

    /// Extension backed by a filesystem resource
    pub fn from_resource(
        environment: Option<ExtensionEnvironment>,
        quality: ProductQuality,
        resource: ResourceExtension,
    ) -> Self {
        Self::with_records(environment, quality, None, None, Some(resource))
    }

    fn read(&self) -> RwLockReadGuard<'_, ExtensionData> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, ExtensionData> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Environment whose backend owns this object (`None` for catalog-only objects)
    pub fn environment(&self) -> Option<ExtensionEnvironment> {
        self.environment
    }

    pub fn identifier(&self) -> ExtensionIdentifier {
        let data = self.read();
        if let Some(local) = &data.local {
            let mut identifier = local.identifier.clone();
            if identifier.uuid.is_none() {
                identifier.uuid = data.gallery.as_ref().and_then(|g| g.identifier.uuid.clone());
            }
            return identifier;
        }
        if let Some(gallery) = &data.gallery {
            return gallery.identifier.clone();
        }
        data.resource
            .as_ref()
            .map(|r| r.identifier.clone())
            .unwrap_or_else(|| ExtensionIdentifier::new(String::new()))
    }

    pub fn id(&self) -> String {
        self.identifier().id
    }

    /// Lower-cased id
    pub fn key(&self) -> String {
        self.identifier().key()
    }

    pub fn uuid(&self) -> Option<String> {
        self.identifier().uuid
    }

    pub fn publisher(&self) -> String {
        let data = self.read();
        if let Some(local) = &data.local {
            return local.manifest.publisher.clone();
        }
        if let Some(gallery) = &data.gallery {
            return gallery.publisher.clone();
        }
        data.resource
            .as_ref()
            .map(|r| r.manifest.publisher.clone())
            .unwrap_or_default()
    }

    pub fn display_name(&self) -> String {
        let data = self.read();
        if let Some(gallery) = &data.gallery {
            if !gallery.display_name.is_empty() {
                return gallery.display_name.clone();
            }
        }
        data.local
            .as_ref()
            .map(|l| &l.manifest)
            .or(data.resource.as_ref().map(|r| &r.manifest))
            .map(|m| m.display_name.clone().unwrap_or_else(|| m.name.clone()))
            .or_else(|| data.gallery.as_ref().map(|g| g.name.clone()))
            .unwrap_or_default()
    }

    /// Installed version if installed, else the catalog's latest
    pub fn version(&self) -> String {
        let data = self.read();
        if let Some(local) = &data.local {
            return local.version().to_string();
        }
        if let Some(gallery) = &data.gallery {
            return gallery.version.clone();
        }
        data.resource
            .as_ref()
            .map(|r| r.manifest.version.clone())
            .unwrap_or_default()
    }

    /// Catalog version if known, else the installed version
    pub fn latest_version(&self) -> String {
        let gallery_version = self.read().gallery.as_ref().map(|g| g.version.clone());
        gallery_version.unwrap_or_else(|| self.version())
    }

    pub fn local(&self) -> Option<LocalExtension> {
        self.read().local.clone()
    }

    pub fn gallery(&self) -> Option<GalleryExtension> {
        self.read().gallery.clone()
    }

    pub fn resource(&self) -> Option<ResourceExtension> {
        self.read().resource.clone()
    }

    pub fn has_local(&self) -> bool {
        self.read().local.is_some()
    }

    pub fn has_gallery(&self) -> bool {
        self.read().gallery.is_some()
    }

    pub fn state(&self) -> ExtensionState {
        self.read().state
    }

    pub fn enablement_state(&self) -> EnablementState {
        self.read().enablement_state
    }

    pub fn is_enabled(&self) -> bool {
        self.enablement_state().is_enabled()
    }

    pub fn is_builtin(&self) -> bool {
        self.read().local.as_ref().is_some_and(|l| l.is_builtin)
    }

    pub fn is_system(&self) -> bool {
        self.read().local.as_ref().is_some_and(|l| l.is_system())
    }

    pub fn is_workspace_scoped(&self) -> bool {
        self.read()
            .local
            .as_ref()
            .is_some_and(|l| l.is_workspace_scoped)
    }

    pub fn is_application_scoped(&self) -> bool {
        self.read()
            .local
            .as_ref()
            .is_some_and(|l| l.is_application_scoped)
    }

    /// Exempt from auto-update
    pub fn pinned(&self) -> bool {
        self.read().local.as_ref().is_some_and(|l| l.pinned)
    }

    /// The user opted into pre-release builds
    pub fn pre_release(&self) -> bool {
        self.read().local.as_ref().is_some_and(|l| l.pre_release)
    }

    pub fn is_pre_release_version(&self) -> bool {
        let data = self.read();
        match (&data.local, &data.gallery) {
            (Some(local), _) => local.is_pre_release_version,
            (None, Some(gallery)) => gallery.properties.is_pre_release_version,
            _ => false,
        }
    }

    pub fn has_pre_release_version(&self) -> bool {
        self.read()
            .gallery
            .as_ref()
            .is_some_and(|g| g.has_pre_release_version)
    }

    pub fn install_source(&self) -> Option<InstallSource> {
        self.read().local.as_ref().map(|l| l.source)
    }

    pub fn is_malicious(&self) -> bool {
        let data = self.read();
        data.enablement_state == EnablementState::DisabledByMalicious
            || data.gallery.as_ref().is_some_and(|g| g.malicious)
    }

    pub fn deprecation_info(&self) -> Option<DeprecationInfo> {
        self.read()
            .gallery
            .as_ref()
            .and_then(|g| g.deprecation_info.clone())
    }

    pub fn missing_from_gallery(&self) -> bool {
        self.read().missing_from_gallery
    }

    /// Manifest available without a catalog round trip
    pub fn local_manifest(&self) -> Option<ExtensionManifest> {
        let data = self.read();
        data.local
            .as_ref()
            .map(|l| l.manifest.clone())
            .or_else(|| data.resource.as_ref().map(|r| r.manifest.clone()))
    }

    /// Hard dependencies, from whichever record declares them
    pub fn dependencies(&self) -> Vec<String> {
        let data = self.read();
        if let Some(local) = &data.local {
            return local.manifest.extension_dependencies.clone();
        }
        if let Some(gallery) = &data.gallery {
            return gallery.properties.dependencies.clone();
        }
        data.resource
            .as_ref()
            .map(|r| r.manifest.extension_dependencies.clone())
            .unwrap_or_default()
    }

    /// Pack members, from whichever record declares them
    pub fn extension_pack(&self) -> Vec<String> {
        let data = self.read();
        if let Some(local) = &data.local {
            return local.manifest.extension_pack.clone();
        }
        if let Some(gallery) = &data.gallery {
            return gallery.properties.extension_pack.clone();
        }
        data.resource
            .as_ref()
            .map(|r| r.manifest.extension_pack.clone())
            .unwrap_or_default()
    }

    pub fn depends_on(&self, id: &str) -> bool {
        self.dependencies().iter().any(|d| d.eq_ignore_ascii_case(id))
    }

    pub fn packs(&self, id: &str) -> bool {
        self.extension_pack()
            .iter()
            .any(|p| p.eq_ignore_ascii_case(id))
    }

    /// Declared or deduced kinds; empty when no manifest is at hand
    pub fn extension_kinds(&self) -> Vec<ExtensionKind> {
        self.local_manifest()
            .map(|m| m.extension_kinds())
            .unwrap_or_default()
    }

    /// A newer catalog version (or a better-matching platform build) is available
    pub fn outdated(&self) -> bool {
        let data = self.read();
        let (Some(local), Some(gallery)) = (&data.local, &data.gallery) else {
            return false;
        };
        if local.is_system() && data.quality == ProductQuality::Stable {
            return false;
        }
        if !local.pre_release && gallery.properties.is_pre_release_version {
            return false;
        }
        if is_newer(&gallery.version, local.version()) {
            return true;
        }
        Self::target_platform_outdated(local, gallery)
    }

    /// Installed build targets another platform than the catalog's equal-version build
    pub fn outdated_target_platform(&self) -> bool {
        let data = self.read();
        match (&data.local, &data.gallery) {
            (Some(local), Some(gallery)) => Self::target_platform_outdated(local, gallery),
            _ => false,
        }
    }

    fn target_platform_outdated(local: &LocalExtension, gallery: &GalleryExtension) -> bool {
        !matches!(
            local.target_platform,
            TargetPlatform::Undefined | TargetPlatform::Web
        ) && gallery.properties.target_platform != TargetPlatform::Web
            && local.target_platform != gallery.properties.target_platform
            && compare_versions(&gallery.version, local.version()) == Some(Ordering::Equal)
    }

    /// Manifest from the local record, the catalog's manifest asset or the resource
    pub async fn get_manifest(
        &self,
        gallery_service: Option<&dyn ExtensionGallery>,
    ) -> Result<ExtensionManifest> {
        if let Some(local) = self.local() {
            return Ok(local.manifest);
        }
        if let (Some(gallery), Some(service)) = (self.gallery(), gallery_service) {
            if gallery.assets.manifest.is_some() {
                if let Some(manifest) = service.get_manifest(&gallery).await? {
                    return Ok(manifest);
                }
            }
        }
        if let Some(resource) = self.resource() {
            return Ok(resource.manifest);
        }
        Err(Error::manifest_unavailable(self.id()))
    }

    pub async fn get_readme(&self, gallery_service: Option<&dyn ExtensionGallery>) -> Result<String> {
        if let (Some(gallery), Some(service)) = (self.gallery(), gallery_service) {
            if gallery.assets.readme.is_some() {
                return service.get_readme(&gallery).await;
            }
        }
        if let Some(readme) = self.resource().and_then(|r| r.readme) {
            return Ok(readme);
        }
        Err(Error::not_found(format!("{} readme", self.id()), None))
    }

    pub async fn get_changelog(
        &self,
        gallery_service: Option<&dyn ExtensionGallery>,
    ) -> Result<String> {
        if let (Some(gallery), Some(service)) = (self.gallery(), gallery_service) {
            if gallery.assets.changelog.is_some() {
                return service.get_changelog(&gallery).await;
            }
        }
        if let Some(changelog) = self.resource().and_then(|r| r.changelog) {
            return Ok(changelog);
        }
        Err(Error::not_found(format!("{} changelog", self.id()), None))
    }

    pub(crate) fn set_local(&self, local: LocalExtension) {
        self.write().local = Some(local);
    }

    pub(crate) fn set_gallery(&self, gallery: GalleryExtension) {
        let mut data = self.write();
        data.gallery = Some(gallery);
        data.missing_from_gallery = false;
    }

    pub(crate) fn set_state(&self, state: ExtensionState) {
        self.write().state = state;
    }

    pub(crate) fn set_enablement_state(&self, state: EnablementState) -> bool {
        let mut data = self.write();
        let changed = data.enablement_state != state;
        data.enablement_state = state;
        changed
    }

    pub(crate) fn set_missing_from_gallery(&self) -> bool {
        let mut data = self.write();
        let changed = !data.missing_from_gallery;
        data.missing_from_gallery = true;
        changed
    }

    pub(crate) fn set_quality(&self, quality: ProductQuality) {
        self.write().quality = quality;
    }
}

impl fmt::Debug for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.read();
        f.debug_struct("Extension")
            .field("environment", &self.environment)
            .field(
                "id",
                &data
                    .local
                    .as_ref()
                    .map(|l| l.identifier.id.as_str())
                    .or(data.gallery.as_ref().map(|g| g.identifier.id.as_str()))
                    .or(data.resource.as_ref().map(|r| r.identifier.id.as_str())),
            )
            .field("state", &data.state)
            .field("enablement_state", &data.enablement_state)
            .field("has_local", &data.local.is_some())
            .field("has_gallery", &data.gallery.is_some())
            .finish()
    }
}
