//! Mock implementations for testing
//!
//! In-memory stand-ins for the install backends, the catalog, the
//! enablement store, dialogs, the extension host and the profile registry.
//! Every mock records the calls it receives.

#![allow(dead_code)]

use async_trait::async_trait;
use atrium_core::types::{
    EnablementState, ExtensionEnvironment, ExtensionIdentifier, ExtensionManifest, ExtensionType,
    GalleryExtension, InstallSource, LocalExtension, MetadataUpdate, ResourceExtension,
    RunningExtension, TargetPlatform,
};
use atrium_core::version::{compare_versions, is_engine_valid};
use atrium_core::{Error, Result};
use atrium_extensions::events::{
    EnablementEvent, HostEvent, InstallEventSource, InstallOperation, InstallResult, ServerEvent,
};
use atrium_extensions::traits::{
    ConfirmRequest, ConfirmResult, Dialogs, ExtensionEnablement, ExtensionGallery, ExtensionHost,
    ExtensionInfo, ExtensionManagementServer, GalleryQueryContext, GalleryVersion, Page,
    PromptRequest, PromptResult, QueryOptions, ServerInstallOptions, UninstallItem, UpdateState,
    UserProfiles,
};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use std::sync::Mutex;
use tokio::sync::broadcast;

/// In-memory install backend for one environment
pub struct MockServer {
    environment: ExtensionEnvironment,
    events: broadcast::Sender<ServerEvent>,
    installed: Mutex<Vec<LocalExtension>>,
    profiles: Mutex<HashMap<String, Vec<LocalExtension>>>,
    manifests: Mutex<HashMap<String, ExtensionManifest>>,
    packages: Mutex<HashMap<String, ExtensionManifest>>,
    failing_installs: Mutex<HashSet<String>>,
    failing_uninstalls: Mutex<HashSet<String>>,
    failing_metadata: Mutex<HashSet<String>>,
    installable: Mutex<bool>,
    target_platform: TargetPlatform,
    calls: Mutex<Vec<String>>,
}

impl MockServer {
    pub fn new(environment: ExtensionEnvironment) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            environment,
            events,
            installed: Mutex::new(Vec::new()),
            profiles: Mutex::new(HashMap::new()),
            manifests: Mutex::new(HashMap::new()),
            packages: Mutex::new(HashMap::new()),
            failing_installs: Mutex::new(HashSet::new()),
            failing_uninstalls: Mutex::new(HashSet::new()),
            failing_metadata: Mutex::new(HashSet::new()),
            installable: Mutex::new(true),
            target_platform: TargetPlatform::LinuxX64,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Seed an installed record without emitting events
    pub fn add_installed(&self, local: LocalExtension) {
        self.installed.lock().unwrap().push(local);
    }

    pub fn installed_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .installed
            .lock()
            .unwrap()
            .iter()
            .map(|l| l.identifier.key())
            .collect();
        ids.sort();
        ids
    }

    pub fn installed_record(&self, id: &str) -> Option<LocalExtension> {
        self.installed
            .lock()
            .unwrap()
            .iter()
            .find(|l| l.identifier.matches_id(id))
            .cloned()
    }

    pub fn add_profile(&self, profile: &str, records: Vec<LocalExtension>) {
        self.profiles
            .lock()
            .unwrap()
            .insert(profile.to_string(), records);
    }

    pub fn profile_ids(&self, profile: &str) -> Vec<String> {
        self.profiles
            .lock()
            .unwrap()
            .get(profile)
            .map(|records| records.iter().map(|l| l.identifier.key()).collect())
            .unwrap_or_default()
    }

    /// Manifest to use when installing this identity from the catalog
    pub fn register_manifest(&self, manifest: ExtensionManifest) {
        self.manifests
            .lock()
            .unwrap()
            .insert(manifest.identifier().to_lowercase(), manifest);
    }

    pub fn register_package(&self, location: &str, manifest: ExtensionManifest) {
        self.packages
            .lock()
            .unwrap()
            .insert(location.to_string(), manifest);
    }

    pub fn fail_install_of(&self, id: &str) {
        self.failing_installs.lock().unwrap().insert(id.to_lowercase());
    }

    pub fn fail_metadata_of(&self, id: &str) {
        self.failing_metadata.lock().unwrap().insert(id.to_lowercase());
    }

    pub fn fail_uninstall_of(&self, id: &str) {
        self.failing_uninstalls
            .lock()
            .unwrap()
            .insert(id.to_lowercase());
    }

    pub fn set_installable(&self, installable: bool) {
        *self.installable.lock().unwrap() = installable;
    }

    /// Raise an arbitrary backend event
    pub fn emit(&self, event: ServerEvent) {
        let _ = self.events.send(event);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls whose label starts with `prefix`
    pub fn calls_of(&self, prefix: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|call| call.starts_with(prefix))
            .collect()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn store(&self, local: LocalExtension) {
        let mut installed = self.installed.lock().unwrap();
        installed.retain(|l| !l.identifier.matches_id(&local.identifier.id));
        installed.push(local);
    }

    fn record_from_gallery(
        &self,
        gallery: &GalleryExtension,
        options: &ServerInstallOptions,
    ) -> LocalExtension {
        let key = gallery.identifier.key();
        let manifest = match self.manifests.lock().unwrap().get(&key) {
            Some(manifest) => ExtensionManifest {
                version: gallery.version.clone(),
                ..manifest.clone()
            },
            None => ExtensionManifest {
                name: gallery.name.clone(),
                publisher: gallery.publisher.clone(),
                version: gallery.version.clone(),
                extension_dependencies: gallery.properties.dependencies.clone(),
                extension_pack: gallery.properties.extension_pack.clone(),
                ..Default::default()
            },
        };
        LocalExtension {
            identifier: gallery.identifier.clone(),
            location: format!("/{}/{}-{}", self.environment, key, gallery.version),
            manifest,
            extension_type: ExtensionType::User,
            is_builtin: false,
            is_workspace_scoped: false,
            is_application_scoped: false,
            target_platform: gallery.properties.target_platform,
            is_pre_release_version: gallery.properties.is_pre_release_version,
            pre_release: options.pre_release,
            pinned: options.pinned,
            source: InstallSource::Gallery,
            is_valid: true,
            installed_timestamp: None,
        }
    }

    /// Emit the install events for one record and store it
    async fn complete_install(
        &self,
        identifier: ExtensionIdentifier,
        source: InstallEventSource,
        operation: InstallOperation,
        local: LocalExtension,
    ) -> Result<LocalExtension> {
        self.emit(ServerEvent::InstallStarted {
            identifier: identifier.clone(),
            source: source.clone(),
            profile: None,
        });
        // let concurrent callers observe the install in flight
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;

        if self
            .failing_installs
            .lock()
            .unwrap()
            .contains(&identifier.key())
        {
            self.emit(ServerEvent::InstallsFinished {
                results: vec![InstallResult {
                    identifier: identifier.clone(),
                    operation,
                    source: Some(source),
                    local: None,
                    error: Some("download failed".to_string()),
                    profile: None,
                }],
            });
            return Err(Error::backend(format!("Failed to install {}", identifier)));
        }

        self.store(local.clone());
        self.emit(ServerEvent::InstallsFinished {
            results: vec![InstallResult {
                identifier,
                operation,
                source: Some(source),
                local: Some(local.clone()),
                error: None,
                profile: None,
            }],
        });
        Ok(local)
    }
}

#[async_trait]
impl ExtensionManagementServer for MockServer {
    fn environment(&self) -> ExtensionEnvironment {
        self.environment
    }

    fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.events.subscribe()
    }

    async fn get_installed(
        &self,
        extension_type: Option<ExtensionType>,
        profile: Option<&str>,
    ) -> Result<Vec<LocalExtension>> {
        let records = match profile {
            Some(profile) => self
                .profiles
                .lock()
                .unwrap()
                .get(profile)
                .cloned()
                .unwrap_or_default(),
            None => self.installed.lock().unwrap().clone(),
        };
        Ok(records
            .into_iter()
            .filter(|l| extension_type.map_or(true, |t| l.extension_type == t))
            .collect())
    }

    async fn install_from_gallery(
        &self,
        gallery: &GalleryExtension,
        options: &ServerInstallOptions,
    ) -> Result<LocalExtension> {
        self.record(format!("install {}@{}", gallery.identifier.key(), gallery.version));
        let local = self.record_from_gallery(gallery, options);
        self.complete_install(
            gallery.identifier.clone(),
            InstallEventSource::Gallery(gallery.clone()),
            InstallOperation::Install,
            local,
        )
        .await
    }

    async fn update_from_gallery(
        &self,
        gallery: &GalleryExtension,
        _local: &LocalExtension,
        options: &ServerInstallOptions,
    ) -> Result<LocalExtension> {
        self.record(format!("update {}@{}", gallery.identifier.key(), gallery.version));
        let local = self.record_from_gallery(gallery, options);
        self.complete_install(
            gallery.identifier.clone(),
            InstallEventSource::Gallery(gallery.clone()),
            InstallOperation::Update,
            local,
        )
        .await
    }

    async fn install_vsix(
        &self,
        location: &str,
        options: &ServerInstallOptions,
    ) -> Result<LocalExtension> {
        self.record(format!("vsix {}", location));
        let manifest = self.get_package_manifest(location).await?;
        let identifier = ExtensionIdentifier::new(manifest.identifier());
        let local = LocalExtension {
            identifier: identifier.clone(),
            location: format!("/{}/{}", self.environment, identifier.key()),
            manifest,
            extension_type: ExtensionType::User,
            is_builtin: false,
            is_workspace_scoped: false,
            is_application_scoped: false,
            target_platform: self.target_platform,
            is_pre_release_version: false,
            pre_release: false,
            pinned: options.pinned,
            source: InstallSource::Vsix,
            is_valid: true,
            installed_timestamp: None,
        };
        self.complete_install(
            identifier,
            InstallEventSource::Package {
                location: location.to_string(),
            },
            InstallOperation::Install,
            local,
        )
        .await
    }

    async fn install_resource_extension(
        &self,
        resource: &ResourceExtension,
        options: &ServerInstallOptions,
    ) -> Result<LocalExtension> {
        self.record(format!("resource {}", resource.identifier.key()));
        let local = LocalExtension {
            identifier: resource.identifier.clone(),
            location: resource.location.clone(),
            manifest: resource.manifest.clone(),
            extension_type: ExtensionType::User,
            is_builtin: false,
            is_workspace_scoped: true,
            is_application_scoped: false,
            target_platform: TargetPlatform::Undefined,
            is_pre_release_version: false,
            pre_release: false,
            pinned: options.pinned,
            source: InstallSource::Resource,
            is_valid: true,
            installed_timestamp: None,
        };
        self.complete_install(
            resource.identifier.clone(),
            InstallEventSource::Resource(resource.clone()),
            InstallOperation::Install,
            local,
        )
        .await
    }

    async fn uninstall_extensions(&self, items: &[UninstallItem]) -> Result<()> {
        let mut failed = Vec::new();
        for item in items {
            let identifier = item.local.identifier.clone();
            self.record(match &item.profile {
                Some(profile) => format!("uninstall {} from {}", identifier.key(), profile),
                None => format!("uninstall {}", identifier.key()),
            });
            self.emit(ServerEvent::UninstallStarted {
                identifier: identifier.clone(),
                profile: item.profile.clone(),
            });
            tokio::task::yield_now().await;

            let error = if self
                .failing_uninstalls
                .lock()
                .unwrap()
                .contains(&identifier.key())
            {
                failed.push(identifier.id.clone());
                Some("files are locked".to_string())
            } else {
                match &item.profile {
                    Some(profile) => {
                        if let Some(records) = self.profiles.lock().unwrap().get_mut(profile) {
                            records.retain(|l| !l.identifier.matches(&identifier));
                        }
                    }
                    None => self
                        .installed
                        .lock()
                        .unwrap()
                        .retain(|l| !l.identifier.matches(&identifier)),
                }
                None
            };
            self.emit(ServerEvent::UninstallFinished {
                identifier,
                error,
                profile: item.profile.clone(),
            });
        }
        if failed.is_empty() {
            Ok(())
        } else {
            Err(Error::backend(format!("Failed to uninstall {}", failed.join(", "))))
        }
    }

    async fn update_metadata(
        &self,
        local: &LocalExtension,
        update: &MetadataUpdate,
    ) -> Result<LocalExtension> {
        self.record(format!("metadata {}", local.identifier.key()));
        if self
            .failing_metadata
            .lock()
            .unwrap()
            .contains(&local.identifier.key())
        {
            return Err(Error::backend(format!(
                "metadata of {} is read-only",
                local.identifier.id
            )));
        }
        let mut record = self
            .installed_record(&local.identifier.id)
            .ok_or_else(|| Error::missing_local(local.identifier.id.clone()))?;
        if let Some(pinned) = update.pinned {
            record.pinned = pinned;
        }
        if let Some(pre_release) = update.pre_release {
            record.pre_release = pre_release;
        }
        self.store(record.clone());
        self.emit(ServerEvent::MetadataUpdated {
            local: record.clone(),
        });
        Ok(record)
    }

    async fn can_install(&self, _gallery: &GalleryExtension) -> Result<bool> {
        Ok(*self.installable.lock().unwrap())
    }

    async fn get_target_platform(&self) -> Result<TargetPlatform> {
        Ok(self.target_platform)
    }

    async fn get_package_manifest(&self, location: &str) -> Result<ExtensionManifest> {
        self.packages
            .lock()
            .unwrap()
            .get(location)
            .cloned()
            .ok_or_else(|| Error::not_found(location.to_string(), None))
    }
}

/// In-memory catalog holding every published version
#[derive(Default)]
pub struct MockGallery {
    records: Mutex<Vec<GalleryExtension>>,
    manifests: Mutex<HashMap<String, ExtensionManifest>>,
    lookups: Mutex<Vec<Vec<String>>>,
    downloads: Mutex<Vec<String>>,
}

impl MockGallery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, gallery: GalleryExtension) {
        self.records.lock().unwrap().push(gallery);
    }

    pub fn publish_manifest(&self, manifest: ExtensionManifest) {
        self.manifests
            .lock()
            .unwrap()
            .insert(manifest.identifier().to_lowercase(), manifest);
    }

    /// Ids requested by each `get_extensions` call
    pub fn lookups(&self) -> Vec<Vec<String>> {
        self.lookups.lock().unwrap().clone()
    }

    pub fn downloads(&self) -> Vec<String> {
        self.downloads.lock().unwrap().clone()
    }

    fn compatible_with(gallery: &GalleryExtension, product_version: &str) -> bool {
        gallery
            .properties
            .engine
            .as_deref()
            .map_or(true, |engine| is_engine_valid(engine, product_version))
    }

    fn select(&self, info: &ExtensionInfo, context: &GalleryQueryContext) -> Option<GalleryExtension> {
        let records = self.records.lock().unwrap();
        let mut candidates: Vec<&GalleryExtension> = records
            .iter()
            .filter(|g| match (&info.uuid, &g.identifier.uuid) {
                (Some(a), Some(b)) => a == b,
                _ => g.identifier.matches_id(&info.id),
            })
            .filter(|g| info.version.as_ref().map_or(true, |v| *v == g.version))
            .filter(|g| info.pre_release || !g.properties.is_pre_release_version || info.version.is_some())
            .filter(|g| !context.compatible || Self::compatible_with(g, &context.product_version))
            .collect();
        candidates.sort_by(|a, b| {
            compare_versions(&b.version, &a.version).unwrap_or(Ordering::Equal)
        });
        candidates.first().map(|g| (*g).clone())
    }
}

#[async_trait]
impl ExtensionGallery for MockGallery {
    async fn query(&self, options: &QueryOptions) -> Result<Page<GalleryExtension>> {
        let records = self.records.lock().unwrap();
        let mut latest: Vec<GalleryExtension> = Vec::new();
        for record in records.iter() {
            let matches_text = options
                .text
                .as_ref()
                .map_or(true, |text| record.identifier.id.contains(text.as_str()));
            let matches_ids = options.ids.is_empty()
                || options.ids.iter().any(|id| record.identifier.matches_id(id));
            if !matches_text || !matches_ids {
                continue;
            }
            match latest.iter_mut().find(|g| g.identifier.matches(&record.identifier)) {
                Some(existing) => {
                    if compare_versions(&record.version, &existing.version) == Some(Ordering::Greater) {
                        *existing = record.clone();
                    }
                }
                None => latest.push(record.clone()),
            }
        }
        let total = latest.len();
        let page_size = if options.page_size == 0 { total.max(1) } else { options.page_size };
        let items = latest
            .into_iter()
            .skip(options.page * page_size)
            .take(page_size)
            .collect();
        Ok(Page { total, items })
    }

    async fn get_extensions(
        &self,
        infos: &[ExtensionInfo],
        context: &GalleryQueryContext,
    ) -> Result<Vec<GalleryExtension>> {
        self.lookups
            .lock()
            .unwrap()
            .push(infos.iter().map(|i| i.id.to_lowercase()).collect());
        Ok(infos
            .iter()
            .filter_map(|info| self.select(info, context))
            .collect())
    }

    async fn is_extension_compatible(
        &self,
        gallery: &GalleryExtension,
        _pre_release: bool,
        _target_platform: TargetPlatform,
        product_version: &str,
    ) -> Result<bool> {
        Ok(Self::compatible_with(gallery, product_version))
    }

    async fn get_manifest(&self, gallery: &GalleryExtension) -> Result<Option<ExtensionManifest>> {
        Ok(self
            .manifests
            .lock()
            .unwrap()
            .get(&gallery.identifier.key())
            .cloned())
    }

    async fn get_readme(&self, gallery: &GalleryExtension) -> Result<String> {
        Ok(format!("# {}", gallery.name))
    }

    async fn get_changelog(&self, gallery: &GalleryExtension) -> Result<String> {
        Ok(format!("## {}", gallery.version))
    }

    async fn get_all_versions(
        &self,
        identifier: &ExtensionIdentifier,
    ) -> Result<Vec<GalleryVersion>> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|g| g.identifier.matches(identifier))
            .map(|g| GalleryVersion {
                version: g.version.clone(),
                is_pre_release: g.properties.is_pre_release_version,
                date: g.release_date,
            })
            .collect())
    }

    async fn download(&self, gallery: &GalleryExtension, destination: &Path) -> Result<()> {
        std::fs::write(destination, format!("{}@{}", gallery.identifier.id, gallery.version))?;
        self.downloads
            .lock()
            .unwrap()
            .push(gallery.identifier.key());
        Ok(())
    }
}

/// Enablement store keyed by lower-cased id
pub struct MockEnablement {
    states: Mutex<HashMap<String, EnablementState>>,
    events: broadcast::Sender<EnablementEvent>,
    calls: Mutex<Vec<(Vec<String>, EnablementState)>>,
}

impl Default for MockEnablement {
    fn default() -> Self {
        Self::new()
    }
}

impl MockEnablement {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            states: Mutex::new(HashMap::new()),
            events,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Seed a state without emitting an event
    pub fn set_state(&self, id: &str, state: EnablementState) {
        self.states.lock().unwrap().insert(id.to_lowercase(), state);
    }

    /// Change a state the way an external writer would
    pub fn change_externally(&self, id: &str, state: EnablementState) {
        self.set_state(id, state);
        let _ = self.events.send(EnablementEvent {
            identifiers: vec![ExtensionIdentifier::new(id)],
        });
    }

    pub fn state_of(&self, id: &str) -> EnablementState {
        self.states
            .lock()
            .unwrap()
            .get(&id.to_lowercase())
            .copied()
            .unwrap_or(EnablementState::EnabledGlobally)
    }

    pub fn calls(&self) -> Vec<(Vec<String>, EnablementState)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ExtensionEnablement for MockEnablement {
    fn subscribe(&self) -> broadcast::Receiver<EnablementEvent> {
        self.events.subscribe()
    }

    fn get_enablement_state(&self, local: &LocalExtension) -> EnablementState {
        self.state_of(&local.identifier.id)
    }

    async fn set_enablement(
        &self,
        locals: &[LocalExtension],
        state: EnablementState,
    ) -> Result<Vec<bool>> {
        let mut ids: Vec<String> = locals.iter().map(|l| l.identifier.key()).collect();
        ids.sort();
        self.calls.lock().unwrap().push((ids, state));

        let mut changed = Vec::new();
        {
            let mut states = self.states.lock().unwrap();
            for local in locals {
                let previous = states
                    .insert(local.identifier.key(), state)
                    .unwrap_or(EnablementState::EnabledGlobally);
                changed.push(previous != state);
            }
        }
        let _ = self.events.send(EnablementEvent {
            identifiers: locals.iter().map(|l| l.identifier.clone()).collect(),
        });
        Ok(changed)
    }
}

/// Scripted dialogs
pub struct MockDialogs {
    confirm_answer: Mutex<bool>,
    prompt_answer: Mutex<Option<usize>>,
    /// Answers consumed before falling back to `prompt_answer`
    scripted_prompts: Mutex<VecDeque<Option<usize>>>,
    confirms: Mutex<Vec<ConfirmRequest>>,
    prompts: Mutex<Vec<PromptRequest>>,
    errors: Mutex<Vec<String>>,
}

impl Default for MockDialogs {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDialogs {
    pub fn new() -> Self {
        Self {
            confirm_answer: Mutex::new(true),
            prompt_answer: Mutex::new(Some(0)),
            scripted_prompts: Mutex::new(VecDeque::new()),
            confirms: Mutex::new(Vec::new()),
            prompts: Mutex::new(Vec::new()),
            errors: Mutex::new(Vec::new()),
        }
    }

    pub fn decline_confirmations(&self) {
        *self.confirm_answer.lock().unwrap() = false;
    }

    pub fn dismiss_prompts(&self) {
        *self.prompt_answer.lock().unwrap() = None;
    }

    /// Answer the next prompts in order, then use the default answer
    pub fn script_prompts(&self, answers: &[Option<usize>]) {
        self.scripted_prompts
            .lock()
            .unwrap()
            .extend(answers.iter().copied());
    }

    pub fn confirms(&self) -> Vec<ConfirmRequest> {
        self.confirms.lock().unwrap().clone()
    }

    pub fn prompts(&self) -> Vec<PromptRequest> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }
}

#[async_trait]
impl Dialogs for MockDialogs {
    async fn confirm(&self, request: ConfirmRequest) -> ConfirmResult {
        self.confirms.lock().unwrap().push(request);
        ConfirmResult {
            confirmed: *self.confirm_answer.lock().unwrap(),
            checkbox_checked: false,
        }
    }

    async fn prompt(&self, request: PromptRequest) -> PromptResult {
        self.prompts.lock().unwrap().push(request);
        let scripted = self.scripted_prompts.lock().unwrap().pop_front();
        PromptResult {
            choice: scripted.unwrap_or_else(|| *self.prompt_answer.lock().unwrap()),
            checkbox_checked: false,
        }
    }

    fn notify_error(&self, message: &str) {
        self.errors.lock().unwrap().push(message.to_string());
    }
}

/// Extension host with scripted running extensions
pub struct MockHost {
    events: broadcast::Sender<HostEvent>,
    running: Mutex<Vec<RunningExtension>>,
    can_add: Mutex<bool>,
    can_remove: Mutex<bool>,
    update_state: Mutex<UpdateState>,
}

impl Default for MockHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MockHost {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            events,
            running: Mutex::new(Vec::new()),
            can_add: Mutex::new(false),
            can_remove: Mutex::new(false),
            update_state: Mutex::new(UpdateState::Idle),
        }
    }

    pub fn set_running(&self, running: Vec<RunningExtension>) {
        *self.running.lock().unwrap() = running;
    }

    pub fn set_can_add(&self, can_add: bool) {
        *self.can_add.lock().unwrap() = can_add;
    }

    pub fn set_can_remove(&self, can_remove: bool) {
        *self.can_remove.lock().unwrap() = can_remove;
    }

    pub fn set_update_state(&self, state: UpdateState) {
        *self.update_state.lock().unwrap() = state;
    }

    pub fn emit(&self, event: HostEvent) {
        let _ = self.events.send(event);
    }
}

impl ExtensionHost for MockHost {
    fn subscribe(&self) -> broadcast::Receiver<HostEvent> {
        self.events.subscribe()
    }

    fn running_extensions(&self) -> Vec<RunningExtension> {
        self.running.lock().unwrap().clone()
    }

    fn can_add_extension(&self, _local: &LocalExtension) -> bool {
        *self.can_add.lock().unwrap()
    }

    fn can_remove_extension(&self, _running: &RunningExtension) -> bool {
        *self.can_remove.lock().unwrap()
    }

    fn update_state(&self) -> UpdateState {
        self.update_state.lock().unwrap().clone()
    }
}

/// Fixed list of other profiles
#[derive(Default)]
pub struct MockProfiles {
    pub others: Vec<String>,
}

impl UserProfiles for MockProfiles {
    fn other_profiles(&self) -> Vec<String> {
        self.others.clone()
    }
}

/// Running descriptor for an installed record
pub fn running(local: &LocalExtension, environment: ExtensionEnvironment) -> RunningExtension {
    RunningExtension {
        identifier: local.identifier.clone(),
        version: local.manifest.version.clone(),
        target_platform: local.target_platform,
        environment,
        location: local.location.clone(),
    }
}
