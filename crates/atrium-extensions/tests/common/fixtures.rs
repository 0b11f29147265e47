//! Workbench fixture
//!
//! Wires the mocks into an `ExtensionsWorkbench`. Seed the mocks, then call
//! [`TestWorkbench::init`] to load the installed records.

#![allow(dead_code)]

use super::builders::GalleryBuilder;
use super::mocks::{MockDialogs, MockEnablement, MockGallery, MockHost, MockProfiles, MockServer};
use atrium_core::config::{AutoUpdateMode, ExtensionsSettings};
use atrium_core::storage::MemoryStateStorage;
use atrium_core::types::{ExtensionEnvironment, GalleryExtension, LocalExtension};
use atrium_extensions::events::WorkbenchEvent;
use atrium_extensions::extension::Extension;
use atrium_extensions::traits::ExtensionManagementServer;
use atrium_extensions::workbench::{Collaborators, ExtensionsWorkbench};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::TryRecvError};

pub struct TestWorkbench {
    pub local: Arc<MockServer>,
    pub remote: Option<Arc<MockServer>>,
    pub gallery: Arc<MockGallery>,
    pub enablement: Arc<MockEnablement>,
    pub dialogs: Arc<MockDialogs>,
    pub host: Arc<MockHost>,
    pub storage: Arc<MemoryStateStorage>,
    pub workbench: ExtensionsWorkbench,
}

/// Settings with automatic updates off so tests drive updates explicitly
pub fn test_settings() -> ExtensionsSettings {
    ExtensionsSettings {
        auto_update: AutoUpdateMode::Off,
        ..Default::default()
    }
}

impl TestWorkbench {
    /// Workbench with a single local backend
    pub fn new() -> Self {
        Self::build(false, test_settings(), Vec::new())
    }

    /// Workbench with a local and a remote backend
    pub fn with_remote() -> Self {
        Self::build(true, test_settings(), Vec::new())
    }

    pub fn with_settings(settings: ExtensionsSettings) -> Self {
        Self::build(false, settings, Vec::new())
    }

    /// Workbench whose user has other profiles
    pub fn with_profiles(profiles: &[&str]) -> Self {
        Self::build(
            false,
            test_settings(),
            profiles.iter().map(|p| p.to_string()).collect(),
        )
    }

    fn build(remote: bool, settings: ExtensionsSettings, profiles: Vec<String>) -> Self {
        let local = Arc::new(MockServer::new(ExtensionEnvironment::Local));
        let remote = remote.then(|| Arc::new(MockServer::new(ExtensionEnvironment::Remote)));
        let gallery = Arc::new(MockGallery::new());
        let enablement = Arc::new(MockEnablement::new());
        let dialogs = Arc::new(MockDialogs::new());
        let host = Arc::new(MockHost::new());
        let storage = Arc::new(MemoryStateStorage::new());

        let mut servers: Vec<Arc<dyn ExtensionManagementServer>> = vec![local.clone()];
        if let Some(remote) = &remote {
            servers.push(remote.clone());
        }
        let workbench = ExtensionsWorkbench::new(
            settings,
            Collaborators {
                servers,
                gallery: Some(gallery.clone()),
                enablement: enablement.clone(),
                dialogs: dialogs.clone(),
                host: host.clone(),
                profiles: Arc::new(MockProfiles { others: profiles }),
                storage: storage.clone(),
            },
        );

        Self {
            local,
            remote,
            gallery,
            enablement,
            dialogs,
            host,
            storage,
            workbench,
        }
    }

    pub fn remote(&self) -> &MockServer {
        self.remote.as_deref().expect("fixture has no remote backend")
    }

    /// Seed an installed record in the local backend
    pub fn install_locally(&self, local: LocalExtension) -> &Self {
        self.local.add_installed(local);
        self
    }

    /// Publish a catalog record
    pub fn publish(&self, gallery: GalleryExtension) -> &Self {
        self.gallery.publish(gallery);
        self
    }

    /// Publish `id` at each of `versions`
    pub fn publish_versions(&self, id: &str, versions: &[&str]) -> &Self {
        for version in versions {
            self.gallery.publish(GalleryBuilder::new(id).version(version).build());
        }
        self
    }

    pub async fn init(&self) {
        self.workbench
            .initialize()
            .await
            .expect("workbench should initialize");
    }

    pub fn get(&self, id: &str) -> Arc<Extension> {
        self.workbench
            .get(id)
            .unwrap_or_else(|| panic!("{} should be in the view", id))
    }

    /// Ids in the aggregated view, in view order
    pub fn view_ids(&self) -> Vec<String> {
        self.workbench.local().iter().map(|e| e.key()).collect()
    }
}

impl Default for TestWorkbench {
    fn default() -> Self {
        Self::new()
    }
}

/// Drain every event already delivered to `receiver`
pub fn drain(receiver: &mut broadcast::Receiver<WorkbenchEvent>) -> Vec<WorkbenchEvent> {
    let mut events = Vec::new();
    loop {
        match receiver.try_recv() {
            Ok(event) => events.push(event),
            Err(TryRecvError::Lagged(_)) => continue,
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
        }
    }
    events
}

/// Lower-cased ids of the extensions reported changed in `events`
pub fn changed_ids(events: &[WorkbenchEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|event| match event {
            WorkbenchEvent::ExtensionChanged(extension) => Some(extension.key()),
            _ => None,
        })
        .collect()
}
