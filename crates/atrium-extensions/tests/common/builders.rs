//! Record builders for creating test fixtures
//!
//! Provides fluent builders for installed records, catalog records and
//! package manifests.

#![allow(dead_code)]

use atrium_core::types::{
    DeprecationInfo, ExtensionIdentifier, ExtensionKind, ExtensionManifest, ExtensionType,
    GalleryAssets, GalleryExtension, GalleryProperties, InstallSource, LocalExtension,
    ResourceExtension, TargetPlatform,
};

fn split_id(id: &str) -> (String, String) {
    match id.split_once('.') {
        Some((publisher, name)) => (publisher.to_string(), name.to_string()),
        None => ("test".to_string(), id.to_string()),
    }
}

/// Builder for package manifests
#[derive(Clone)]
pub struct ManifestBuilder {
    manifest: ExtensionManifest,
}

impl ManifestBuilder {
    pub fn new(id: &str) -> Self {
        let (publisher, name) = split_id(id);
        Self {
            manifest: ExtensionManifest {
                name,
                publisher,
                version: "1.0.0".to_string(),
                ..Default::default()
            },
        }
    }

    pub fn version(mut self, version: &str) -> Self {
        self.manifest.version = version.to_string();
        self
    }

    pub fn display_name(mut self, name: &str) -> Self {
        self.manifest.display_name = Some(name.to_string());
        self
    }

    pub fn dependencies(mut self, ids: &[&str]) -> Self {
        self.manifest.extension_dependencies = ids.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn pack(mut self, ids: &[&str]) -> Self {
        self.manifest.extension_pack = ids.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn kinds(mut self, kinds: &[ExtensionKind]) -> Self {
        self.manifest.extension_kind = Some(kinds.to_vec());
        self
    }

    pub fn engine(mut self, engine: &str) -> Self {
        self.manifest.engines.host = engine.to_string();
        self
    }

    pub fn build(self) -> ExtensionManifest {
        self.manifest
    }
}

/// Builder for installed records
pub struct LocalBuilder {
    local: LocalExtension,
}

impl LocalBuilder {
    pub fn new(id: &str) -> Self {
        Self::from_manifest(ManifestBuilder::new(id).build())
    }

    pub fn from_manifest(manifest: ExtensionManifest) -> Self {
        let id = manifest.identifier();
        Self {
            local: LocalExtension {
                identifier: ExtensionIdentifier::new(&id),
                location: format!("/extensions/{}-{}", id, manifest.version),
                manifest,
                extension_type: ExtensionType::User,
                is_builtin: false,
                is_workspace_scoped: false,
                is_application_scoped: false,
                target_platform: TargetPlatform::Undefined,
                is_pre_release_version: false,
                pre_release: false,
                pinned: false,
                source: InstallSource::Gallery,
                is_valid: true,
                installed_timestamp: None,
            },
        }
    }

    pub fn version(mut self, version: &str) -> Self {
        self.local.manifest.version = version.to_string();
        self
    }

    pub fn uuid(mut self, uuid: &str) -> Self {
        self.local.identifier.uuid = Some(uuid.to_string());
        self
    }

    pub fn dependencies(mut self, ids: &[&str]) -> Self {
        self.local.manifest.extension_dependencies = ids.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn pack(mut self, ids: &[&str]) -> Self {
        self.local.manifest.extension_pack = ids.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn kinds(mut self, kinds: &[ExtensionKind]) -> Self {
        self.local.manifest.extension_kind = Some(kinds.to_vec());
        self
    }

    pub fn system(mut self) -> Self {
        self.local.extension_type = ExtensionType::System;
        self.local.is_builtin = true;
        self
    }

    pub fn workspace_scoped(mut self) -> Self {
        self.local.is_workspace_scoped = true;
        self
    }

    pub fn application_scoped(mut self) -> Self {
        self.local.is_application_scoped = true;
        self
    }

    pub fn pinned(mut self) -> Self {
        self.local.pinned = true;
        self
    }

    pub fn pre_release(mut self) -> Self {
        self.local.pre_release = true;
        self.local.is_pre_release_version = true;
        self
    }

    pub fn source(mut self, source: InstallSource) -> Self {
        self.local.source = source;
        self
    }

    pub fn target_platform(mut self, platform: TargetPlatform) -> Self {
        self.local.target_platform = platform;
        self
    }

    pub fn build(self) -> LocalExtension {
        self.local
    }
}

/// Builder for catalog records
pub struct GalleryBuilder {
    gallery: GalleryExtension,
}

impl GalleryBuilder {
    pub fn new(id: &str) -> Self {
        let (publisher, name) = split_id(id);
        Self {
            gallery: GalleryExtension {
                identifier: ExtensionIdentifier::with_uuid(id, format!("uuid-{}", id.to_lowercase())),
                name,
                display_name: String::new(),
                publisher,
                version: "1.0.0".to_string(),
                description: String::new(),
                properties: GalleryProperties::default(),
                assets: GalleryAssets {
                    download: format!("https://catalog.test/{}", id),
                    ..Default::default()
                },
                has_pre_release_version: false,
                all_target_platforms: vec![TargetPlatform::Universal],
                deprecation_info: None,
                malicious: false,
                release_date: None,
            },
        }
    }

    pub fn version(mut self, version: &str) -> Self {
        self.gallery.version = version.to_string();
        self
    }

    pub fn display_name(mut self, name: &str) -> Self {
        self.gallery.display_name = name.to_string();
        self
    }

    pub fn without_uuid(mut self) -> Self {
        self.gallery.identifier.uuid = None;
        self
    }

    pub fn dependencies(mut self, ids: &[&str]) -> Self {
        self.gallery.properties.dependencies = ids.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn pack(mut self, ids: &[&str]) -> Self {
        self.gallery.properties.extension_pack = ids.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn engine(mut self, engine: &str) -> Self {
        self.gallery.properties.engine = Some(engine.to_string());
        self
    }

    pub fn pre_release(mut self) -> Self {
        self.gallery.properties.is_pre_release_version = true;
        self
    }

    pub fn target_platform(mut self, platform: TargetPlatform) -> Self {
        self.gallery.properties.target_platform = platform;
        self
    }

    pub fn manifest_asset(mut self) -> Self {
        self.gallery.assets.manifest = Some(format!("https://catalog.test/{}/manifest", self.gallery.identifier.id));
        self
    }

    pub fn malicious(mut self) -> Self {
        self.gallery.malicious = true;
        self
    }

    pub fn disallow_install(mut self) -> Self {
        self.gallery.deprecation_info = Some(DeprecationInfo {
            disallow_install: true,
            extension: None,
            additional_info: Some("No longer maintained".to_string()),
        });
        self
    }

    pub fn build(self) -> GalleryExtension {
        self.gallery
    }
}

/// Resource record backed by a folder
pub fn resource(manifest: ExtensionManifest) -> ResourceExtension {
    let id = manifest.identifier();
    ResourceExtension {
        identifier: ExtensionIdentifier::new(&id),
        location: format!("/workspace/{}", id),
        manifest,
        readme: Some("# Readme".to_string()),
        changelog: None,
    }
}
