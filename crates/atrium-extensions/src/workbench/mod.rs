//! Lifecycle orchestrator
//!
//! `ExtensionsWorkbench` owns one [`ExtensionSet`] per environment backend and
//! presents a single aggregated view in which every identity appears once,
//! represented by its primary copy. The view is recomputed from the
//! per-environment collections whenever [`ExtensionsWorkbench::process_events`]
//! applies pending backend or enablement events; mutations (install,
//! uninstall, enablement, updates) call the backends and then drain events
//! through the same path.

mod enablement;
mod install;
mod reconcile;
mod uninstall;
mod updates;

pub use install::{InstallOptions, InstallRequest};
pub use updates::{AutoUpdateTarget, ExtensionsNotification, UpdateOutcome};

use crate::events::{EnablementEvent, WorkbenchEvent};
use crate::extension::Extension;
use crate::extension_set::ExtensionSet;
use crate::primary::select_primary;
use crate::runtime_action::{self, RuntimeAction, RuntimeContext};
use crate::tasks::{TaskInfo, TaskRegistry};
use crate::traits::{
    Dialogs, ExtensionEnablement, ExtensionGallery, ExtensionHost, ExtensionManagementServer,
    UserProfiles,
};
use atrium_core::config::{AutoUpdateMode, ExtensionsSettings};
use atrium_core::storage::StateStorage;
use atrium_core::types::{
    ExtensionEnvironment, ExtensionIdentifier, ExtensionState, TargetPlatform,
};
use atrium_core::Result;
use install::{InstallFingerprint, PendingInstall};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{debug, info, warn};

const EVENT_CAPACITY: usize = 256;

/// Services the workbench drives
pub struct Collaborators {
    /// One install backend per environment
    pub servers: Vec<Arc<dyn ExtensionManagementServer>>,
    pub gallery: Option<Arc<dyn ExtensionGallery>>,
    pub enablement: Arc<dyn ExtensionEnablement>,
    pub dialogs: Arc<dyn Dialogs>,
    pub host: Arc<dyn ExtensionHost>,
    pub profiles: Arc<dyn UserProfiles>,
    pub storage: Arc<dyn StateStorage>,
}

pub struct ExtensionsWorkbench {
    sets: Vec<ExtensionSet>,
    gallery: Option<Arc<dyn ExtensionGallery>>,
    enablement: Arc<dyn ExtensionEnablement>,
    dialogs: Arc<dyn Dialogs>,
    host: Arc<dyn ExtensionHost>,
    profiles: Arc<dyn UserProfiles>,
    storage: Arc<dyn StateStorage>,
    settings: RwLock<ExtensionsSettings>,
    enablement_events: Mutex<broadcast::Receiver<EnablementEvent>>,
    events: broadcast::Sender<WorkbenchEvent>,
    view: RwLock<Vec<Arc<Extension>>>,
    /// Catalog-only objects, keyed by identity
    catalog: Mutex<HashMap<String, Arc<Extension>>>,
    pending_installs: Mutex<HashMap<InstallFingerprint, PendingInstall>>,
    uninstalling: Mutex<HashSet<String>>,
    pump: tokio::sync::Mutex<()>,
    tasks: TaskRegistry,
}

/// Group copies by identity and keep the primary copy of each
pub fn aggregate(
    copies: Vec<Arc<Extension>>,
    environments: &[ExtensionEnvironment],
) -> Vec<Arc<Extension>> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<Arc<Extension>>> = HashMap::new();
    for copy in copies {
        let key = copy.key();
        groups
            .entry(key.clone())
            .or_insert_with(|| {
                order.push(key);
                Vec::new()
            })
            .push(copy);
    }
    order
        .into_iter()
        .filter_map(|key| groups.remove(&key))
        .filter_map(|group| select_primary(&group, environments))
        .collect()
}

impl ExtensionsWorkbench {
    /// Create the workbench and subscribe to every backend once
    pub fn new(settings: ExtensionsSettings, collaborators: Collaborators) -> Self {
        let Collaborators {
            servers,
            gallery,
            enablement,
            dialogs,
            host,
            profiles,
            storage,
        } = collaborators;

        let quality = settings.product.quality;
        let sets = servers
            .into_iter()
            .map(|server| ExtensionSet::new(server, enablement.clone(), quality))
            .collect();
        let enablement_events = Mutex::new(enablement.subscribe());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            sets,
            gallery,
            enablement,
            dialogs,
            host,
            profiles,
            storage,
            settings: RwLock::new(settings),
            enablement_events,
            events,
            view: RwLock::new(Vec::new()),
            catalog: Mutex::new(HashMap::new()),
            pending_installs: Mutex::new(HashMap::new()),
            uninstalling: Mutex::new(HashSet::new()),
            pump: tokio::sync::Mutex::new(()),
            tasks: TaskRegistry::new(),
        }
    }

    /// Load installed records from every backend and link them to the catalog
    ///
    /// A backend that fails to answer is logged and skipped.
    pub async fn initialize(&self) -> Result<()> {
        {
            let _pump = self.pump.lock().await;
            for set in &self.sets {
                // events raised before the initial load are superseded by it
                set.sync_events();
                if let Err(e) = set.fetch_installed().await {
                    warn!(
                        "Failed to load installed extensions from the {} environment: {}",
                        set.environment(),
                        e
                    );
                }
            }
            self.recompute_view();
        }

        let copies = self.all_installed();
        let changed = self.sync_with_gallery(&copies, false).await;
        info!(
            "Loaded {} extensions from {} environments",
            self.local().len(),
            self.sets.len()
        );
        self.emit_changes(changed);
        Ok(())
    }

    /// Apply every pending backend and enablement event, then recompute the view
    pub async fn process_events(&self) {
        let _pump = self.pump.lock().await;

        let mut changed = Vec::new();
        let mut needs_gallery = Vec::new();
        for set in &self.sets {
            let changes = set.sync_events();
            changed.extend(changes.changed);
            needs_gallery.extend(changes.needs_gallery);
            if changes.needs_resync {
                match set.fetch_installed().await {
                    Ok(installed) => changed.extend(installed),
                    Err(e) => warn!(
                        "Failed to resync the {} environment: {}",
                        set.environment(),
                        e
                    ),
                }
            }
        }
        changed.extend(self.sync_enablement());
        if !needs_gallery.is_empty() {
            changed.extend(self.sync_with_gallery(&needs_gallery, false).await);
        }

        self.recompute_view();
        self.emit_changes(changed);
    }

    fn sync_enablement(&self) -> Vec<Arc<Extension>> {
        let mut identifiers: Vec<ExtensionIdentifier> = Vec::new();
        let mut refresh_all = false;
        {
            let mut events = self
                .enablement_events
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            loop {
                match events.try_recv() {
                    Ok(event) => identifiers.extend(event.identifiers),
                    Err(TryRecvError::Lagged(_)) => refresh_all = true,
                    Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
                }
            }
        }
        if identifiers.is_empty() && !refresh_all {
            return Vec::new();
        }

        self.all_installed()
            .into_iter()
            .filter(|extension| {
                refresh_all
                    || identifiers
                        .iter()
                        .any(|identifier| extension.identifier().matches(identifier))
            })
            .filter(|extension| self.refresh_enablement(extension))
            .collect()
    }

    /// Re-read the enablement state of one copy; returns whether it changed
    fn refresh_enablement(&self, extension: &Extension) -> bool {
        match extension.local() {
            Some(local) => {
                extension.set_enablement_state(self.enablement.get_enablement_state(&local))
            }
            None => false,
        }
    }

    fn recompute_view(&self) {
        let copies: Vec<Arc<Extension>> = self.sets.iter().flat_map(|set| set.local()).collect();
        let view = aggregate(copies, &self.environments());
        *self.view.write().unwrap_or_else(PoisonError::into_inner) = view;
    }

    fn emit_changes(&self, changed: Vec<Arc<Extension>>) {
        let mut seen: Vec<Arc<Extension>> = Vec::new();
        for extension in changed {
            if !seen.iter().any(|e| Arc::ptr_eq(e, &extension)) {
                seen.push(extension);
            }
        }
        for extension in seen {
            debug!("Extension changed: {}", extension.identifier());
            let _ = self.events.send(WorkbenchEvent::ExtensionChanged(extension));
        }
        let _ = self.events.send(WorkbenchEvent::ViewChanged);
    }

    /// Report a failed operation to the user unless the user declined it
    fn surface<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            if !e.is_cancellation() {
                self.dialogs.notify_error(&e.to_string());
            }
        }
        result
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WorkbenchEvent> {
        self.events.subscribe()
    }

    /// Aggregated view: one entry per identity, installed or installing
    pub fn local(&self) -> Vec<Arc<Extension>> {
        self.view
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Aggregated view entries that carry an installed record
    pub fn installed(&self) -> Vec<Arc<Extension>> {
        self.local().into_iter().filter(|e| e.has_local()).collect()
    }

    /// Extensions with an install in flight
    pub fn installing(&self) -> Vec<Arc<Extension>> {
        let mut result: Vec<Arc<Extension>> = self
            .pending_installs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(|pending| pending.extension.clone())
            .collect();
        for extension in self.local() {
            if extension.state() == ExtensionState::Installing
                && !result.iter().any(|e| e.key() == extension.key())
            {
                result.push(extension);
            }
        }
        result
    }

    pub fn outdated(&self) -> Vec<Arc<Extension>> {
        self.installed().into_iter().filter(|e| e.outdated()).collect()
    }

    /// Aggregated entry for `id`, if installed or installing
    pub fn get(&self, id: &str) -> Option<Arc<Extension>> {
        self.local()
            .into_iter()
            .find(|e| e.identifier().matches_id(id))
    }

    fn find_local(&self, identifier: &ExtensionIdentifier) -> Option<Arc<Extension>> {
        self.local()
            .into_iter()
            .find(|e| e.has_local() && e.identifier().matches(identifier))
    }

    /// Installed copies across every environment
    fn all_installed(&self) -> Vec<Arc<Extension>> {
        self.sets.iter().flat_map(|set| set.installed()).collect()
    }

    pub fn environments(&self) -> Vec<ExtensionEnvironment> {
        self.sets.iter().map(|set| set.environment()).collect()
    }

    pub fn set_for(&self, environment: ExtensionEnvironment) -> Option<&ExtensionSet> {
        self.sets.iter().find(|set| set.environment() == environment)
    }

    /// Catalog client, when configured and reachable
    pub fn gallery_service(&self) -> Option<&dyn ExtensionGallery> {
        self.gallery
            .as_deref()
            .filter(|gallery| gallery.is_enabled())
    }

    /// Target platform of the local environment (or the first backend)
    async fn target_platform(&self) -> TargetPlatform {
        let set = self
            .set_for(ExtensionEnvironment::Local)
            .or_else(|| self.sets.first());
        let Some(set) = set else {
            return TargetPlatform::Undefined;
        };
        match set.server().get_target_platform().await {
            Ok(platform) => platform,
            Err(e) => {
                warn!("Failed to read the target platform: {}", e);
                TargetPlatform::Undefined
            }
        }
    }

    pub fn settings(&self) -> ExtensionsSettings {
        self.settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Apply changed settings
    ///
    /// Switching auto-update on (or to only-enabled) runs an auto-update pass.
    pub async fn set_settings(&self, settings: ExtensionsSettings) -> Result<()> {
        let previous = std::mem::replace(
            &mut *self.settings.write().unwrap_or_else(PoisonError::into_inner),
            settings.clone(),
        );
        if previous.product.quality != settings.product.quality {
            for set in &self.sets {
                set.set_quality(settings.product.quality);
            }
        }

        let was_automatic = matches!(
            previous.auto_update,
            AutoUpdateMode::On | AutoUpdateMode::OnlyEnabled
        );
        let is_automatic = matches!(
            settings.auto_update,
            AutoUpdateMode::On | AutoUpdateMode::OnlyEnabled
        );
        if is_automatic && !was_automatic {
            info!("Auto-update turned on ({})", settings.auto_update);
            self.auto_update_extensions().await?;
        }
        Ok(())
    }

    /// Host action needed for the installed state of `extension` to take effect
    pub fn runtime_action(&self, extension: &Extension) -> Option<RuntimeAction> {
        let running = self.host.running_extensions();
        let environments = self.environments();
        let installed = self.all_installed();
        let product = self.settings().product;
        let update_state = self.host.update_state();
        let context = RuntimeContext {
            host: self.host.as_ref(),
            running: &running,
            environments: &environments,
            installed: &installed,
            product: &product,
            update_state: &update_state,
        };
        runtime_action::resolve(extension, &context)
    }

    /// Cancel the waiting portion of every in-flight task
    pub fn cancel_all(&self) -> usize {
        self.tasks.cancel_all()
    }

    pub fn in_flight(&self) -> Vec<TaskInfo> {
        self.tasks.in_flight()
    }
}
