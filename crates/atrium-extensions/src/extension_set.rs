//! Per-environment Extension Set
//!
//! Owns the install/uninstall event stream of one backend and keeps the
//! environment's `installing`, `installed` and `uninstalling` collections.
//! The collections change only in response to backend events (or a full
//! resync); the orchestrator drains events through [`ExtensionSet::sync_events`]
//! on its single event-processing path.

use crate::events::{InstallEventSource, InstallResult, ServerEvent};
use crate::extension::Extension;
use crate::traits::{ExtensionEnablement, ExtensionManagementServer};
use atrium_core::config::ProductQuality;
use atrium_core::types::{
    ExtensionEnvironment, ExtensionIdentifier, ExtensionState, ExtensionType, InstallSource,
    LocalExtension,
};
use atrium_core::Result;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{debug, warn};

#[derive(Debug, Default)]
struct SetState {
    installing: Vec<Arc<Extension>>,
    uninstalling: Vec<Arc<Extension>>,
    installed: Vec<Arc<Extension>>,
}

impl SetState {
    fn state_of(&self, identifier: &ExtensionIdentifier) -> ExtensionState {
        let same = |e: &Arc<Extension>| e.identifier().matches(identifier);
        if self.installing.iter().any(same) {
            ExtensionState::Installing
        } else if self.uninstalling.iter().any(same) {
            ExtensionState::Uninstalling
        } else if self.installed.iter().any(same) {
            ExtensionState::Installed
        } else {
            ExtensionState::Uninstalled
        }
    }

    fn refresh_state(&self, extension: &Extension) {
        extension.set_state(self.state_of(&extension.identifier()));
    }

    fn find_installed(&self, identifier: &ExtensionIdentifier) -> Option<Arc<Extension>> {
        self.installed
            .iter()
            .find(|e| e.identifier().matches(identifier))
            .cloned()
    }
}

/// Result of draining pending backend events
#[derive(Debug, Default)]
pub struct SetChanges {
    /// Extensions whose observable state changed
    pub changed: Vec<Arc<Extension>>,
    /// Extensions that finished installing without a catalog record
    pub needs_gallery: Vec<Arc<Extension>>,
    /// Events were missed or the profile switched; a full resync is required
    pub needs_resync: bool,
}

pub struct ExtensionSet {
    environment: ExtensionEnvironment,
    server: Arc<dyn ExtensionManagementServer>,
    enablement: Arc<dyn ExtensionEnablement>,
    quality: Mutex<ProductQuality>,
    events: Mutex<broadcast::Receiver<ServerEvent>>,
    state: Mutex<SetState>,
}

impl ExtensionSet {
    /// Create a set and subscribe to the backend's events
    pub fn new(
        server: Arc<dyn ExtensionManagementServer>,
        enablement: Arc<dyn ExtensionEnablement>,
        quality: ProductQuality,
    ) -> Self {
        let events = server.subscribe();
        Self {
            environment: server.environment(),
            server,
            enablement,
            quality: Mutex::new(quality),
            events: Mutex::new(events),
            state: Mutex::new(SetState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SetState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn quality(&self) -> ProductQuality {
        *self.quality.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn environment(&self) -> ExtensionEnvironment {
        self.environment
    }

    pub fn server(&self) -> &Arc<dyn ExtensionManagementServer> {
        &self.server
    }

    pub fn installed(&self) -> Vec<Arc<Extension>> {
        self.lock().installed.clone()
    }

    pub fn installing(&self) -> Vec<Arc<Extension>> {
        self.lock().installing.clone()
    }

    pub fn uninstalling(&self) -> Vec<Arc<Extension>> {
        self.lock().uninstalling.clone()
    }

    /// Logical view: installed plus installing entries not yet installed
    pub fn local(&self) -> Vec<Arc<Extension>> {
        let state = self.lock();
        let mut result = state.installed.clone();
        for installing in &state.installing {
            let identifier = installing.identifier();
            if !state.installed.iter().any(|e| e.identifier().matches(&identifier)) {
                result.push(installing.clone());
            }
        }
        result
    }

    pub fn find(&self, identifier: &ExtensionIdentifier) -> Option<Arc<Extension>> {
        self.lock().find_installed(identifier)
    }

    pub fn state_of(&self, identifier: &ExtensionIdentifier) -> ExtensionState {
        self.lock().state_of(identifier)
    }

    pub fn set_quality(&self, quality: ProductQuality) {
        *self.quality.lock().unwrap_or_else(PoisonError::into_inner) = quality;
        for extension in self.local() {
            extension.set_quality(quality);
        }
    }

    /// Re-read every installed record from the backend
    ///
    /// Duplicates of an identity are resolved workspace-scoped first, then
    /// user, then system. Existing `Extension` objects are reused so
    /// observers keep valid references.
    pub async fn fetch_installed(&self) -> Result<Vec<Arc<Extension>>> {
        let all = self.server.get_installed(None, None).await?;
        let deduped = dedupe_installed(all);
        let quality = self.quality();

        let mut state = self.lock();
        let installed: Vec<Arc<Extension>> = deduped
            .into_iter()
            .map(|local| {
                let enablement_state = self.enablement.get_enablement_state(&local);
                let extension = match state.find_installed(&local.identifier) {
                    Some(existing) => {
                        existing.set_local(local);
                        existing
                    }
                    None => Arc::new(Extension::from_local(self.environment, quality, local)),
                };
                extension.set_enablement_state(enablement_state);
                extension
            })
            .collect();

        let removed: Vec<Arc<Extension>> = state
            .installed
            .iter()
            .filter(|e| !installed.iter().any(|i| Arc::ptr_eq(i, e)))
            .cloned()
            .collect();

        state.installed = installed;
        for extension in state.installed.iter().chain(removed.iter()) {
            state.refresh_state(extension);
        }
        debug!(
            "Resynced {} installed extensions in {} environment",
            state.installed.len(),
            self.environment
        );
        Ok(state.installed.clone())
    }

    /// Drain and apply every pending backend event
    pub fn sync_events(&self) -> SetChanges {
        let mut changes = SetChanges::default();
        let mut events = self.events.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            match events.try_recv() {
                Ok(event) => self.apply_event(event, &mut changes),
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(
                        "Missed {} events from the {} backend; resyncing",
                        skipped, self.environment
                    );
                    changes.needs_resync = true;
                }
            }
        }
        changes
    }

    fn apply_event(&self, event: ServerEvent, changes: &mut SetChanges) {
        match event {
            ServerEvent::InstallStarted {
                source, profile, ..
            } => {
                if profile.is_some() {
                    return;
                }
                if let InstallEventSource::Gallery(gallery) = source {
                    let mut state = self.lock();
                    let extension = state
                        .find_installed(&gallery.identifier)
                        .unwrap_or_else(|| {
                            Arc::new(Extension::from_gallery(
                                Some(self.environment),
                                self.quality(),
                                gallery,
                            ))
                        });
                    state.installing.push(extension.clone());
                    state.refresh_state(&extension);
                    changes.changed.push(extension);
                }
            }
            ServerEvent::InstallsFinished { results } => {
                for result in results {
                    if result.profile.is_some() {
                        continue;
                    }
                    self.apply_install_result(result, changes);
                }
            }
            ServerEvent::UninstallStarted {
                identifier,
                profile,
            } => {
                if profile.is_some() {
                    return;
                }
                let mut state = self.lock();
                if let Some(extension) = state.find_installed(&identifier) {
                    let uninstalling = state
                        .uninstalling
                        .iter()
                        .find(|e| e.identifier().matches(&identifier))
                        .cloned()
                        .unwrap_or(extension);
                    state
                        .uninstalling
                        .retain(|e| !e.identifier().matches(&identifier));
                    state.uninstalling.insert(0, uninstalling.clone());
                    state.refresh_state(&uninstalling);
                    changes.changed.push(uninstalling);
                }
            }
            ServerEvent::UninstallFinished {
                identifier,
                error,
                profile,
            } => {
                if profile.is_some() {
                    return;
                }
                let mut state = self.lock();
                let uninstalled = state
                    .uninstalling
                    .iter()
                    .find(|e| e.identifier().matches(&identifier))
                    .cloned()
                    .or_else(|| state.find_installed(&identifier));
                state
                    .uninstalling
                    .retain(|e| !e.identifier().matches(&identifier));
                match &error {
                    None => state
                        .installed
                        .retain(|e| !e.identifier().matches(&identifier)),
                    Some(message) => {
                        warn!("Uninstalling {} failed: {}", identifier, message);
                    }
                }
                if let Some(extension) = uninstalled {
                    state.refresh_state(&extension);
                    changes.changed.push(extension);
                }
            }
            ServerEvent::MetadataUpdated { local } => {
                let state = self.lock();
                if let Some(extension) = state.find_installed(&local.identifier) {
                    extension.set_local(local);
                    changes.changed.push(extension);
                }
            }
            ServerEvent::ProfileChanged => {
                changes.needs_resync = true;
            }
        }
    }

    fn apply_install_result(&self, result: InstallResult, changes: &mut SetChanges) {
        let InstallResult {
            identifier,
            source,
            local,
            error,
            ..
        } = result;
        let gallery = source.as_ref().and_then(|s| s.gallery().cloned());

        let mut state = self.lock();
        let pending_identifier = gallery
            .as_ref()
            .map(|g| g.identifier.clone())
            .unwrap_or_else(|| identifier.clone());
        let installing = state
            .installing
            .iter()
            .position(|e| e.identifier().matches(&pending_identifier))
            .map(|index| state.installing.remove(index));

        if let Some(message) = &error {
            warn!("Installing {} failed: {}", identifier, message);
        }

        let extension = match (installing, &local) {
            (Some(extension), _) => Some(extension),
            (None, Some(local)) => Some(Arc::new(Extension::from_local(
                self.environment,
                self.quality(),
                local.clone(),
            ))),
            (None, None) => None,
        };
        let Some(mut extension) = extension else {
            return;
        };

        if let Some(local) = local {
            match state.find_installed(&extension.identifier()) {
                Some(existing) => extension = existing,
                None => state.installed.push(extension.clone()),
            }
            let enablement_state = self.enablement.get_enablement_state(&local);
            let source = local.source;
            extension.set_local(local);
            if !extension.has_gallery() {
                if let Some(gallery) = gallery {
                    extension.set_gallery(gallery);
                }
            }
            extension.set_enablement_state(enablement_state);
            if !extension.has_gallery() && source != InstallSource::Resource {
                changes.needs_gallery.push(extension.clone());
            }
        }
        state.refresh_state(&extension);
        changes.changed.push(extension);
    }
}

/// Keep one record per identity: workspace-scoped over user over system
pub fn dedupe_installed(all: Vec<LocalExtension>) -> Vec<LocalExtension> {
    fn priority(local: &LocalExtension) -> u8 {
        if local.is_workspace_scoped {
            2
        } else if local.extension_type == ExtensionType::User {
            1
        } else {
            0
        }
    }

    let mut order: Vec<String> = Vec::new();
    let mut by_key: HashMap<String, LocalExtension> = HashMap::new();
    for local in all {
        let key = local.identifier.key();
        match by_key.get(&key) {
            Some(existing) if priority(existing) >= priority(&local) => {}
            Some(_) => {
                by_key.insert(key, local);
            }
            None => {
                order.push(key.clone());
                by_key.insert(key, local);
            }
        }
    }
    order
        .into_iter()
        .filter_map(|key| by_key.remove(&key))
        .collect()
}
