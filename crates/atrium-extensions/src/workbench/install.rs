//! Install and update
//!
//! Every install path ends the same way: the backend call, a pass through
//! the event pump, then the post-install steps (enablement refresh, optional
//! enable, activation wait). An identity with an identical install already
//! in flight shares that install's outcome instead of issuing a second
//! backend call.

use super::ExtensionsWorkbench;
use crate::events::HostEvent;
use crate::extension::Extension;
use crate::extension_set::ExtensionSet;
use crate::primary::preferred_environment;
use crate::traits::{
    ConfirmRequest, ExtensionInfo, GalleryQueryContext, ServerInstallOptions,
};
use atrium_core::types::{
    EnablementState, ExtensionEnvironment, ExtensionIdentifier, ExtensionKind, GalleryExtension,
    LocalExtension, ResourceExtension,
};
use atrium_core::{Error, Result};
use futures::future::join_all;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// What to install
#[derive(Debug, Clone)]
pub enum InstallRequest {
    /// A `publisher.name` identifier; an installed non-builtin copy is reused
    ById(String),
    /// An extension object, typically one carrying a catalog record
    Extension(Arc<Extension>),
    Gallery(GalleryExtension),
    Resource(ResourceExtension),
    /// A package file on disk
    Package { location: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallOptions {
    /// Exact catalog version to install; pins the result
    pub version: Option<String>,
    /// Install the pre-release build; defaults to the installed copy's
    /// channel or the `prefer-pre-release` setting
    pub pre_release: Option<bool>,
    /// Install into every environment that can host the extension
    pub install_everywhere: bool,
    /// Enable the extension after installing when it is disabled by the user
    pub enable: bool,
    /// Reason shown to the user; requires confirmation when set
    pub justification: Option<String>,
    /// Reinstall even when the same version is installed
    pub force_reinstall: bool,
    /// Return an installed copy of the same version without reinstalling
    pub reuse_existing: bool,
    pub pinned: bool,
    /// Explicit target environments
    pub environments: Vec<ExtensionEnvironment>,
}

impl InstallOptions {
    fn validate(&self) -> Result<()> {
        if self.force_reinstall && self.reuse_existing {
            return Err(Error::invalid_options(
                "cannot force a reinstall and reuse an existing installation at the same time",
            ));
        }
        if self.install_everywhere && !self.environments.is_empty() {
            return Err(Error::invalid_options(
                "cannot target explicit environments when installing everywhere",
            ));
        }
        Ok(())
    }
}

/// Installs with equal fingerprints share one backend call
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(super) struct InstallFingerprint {
    key: String,
    version: Option<String>,
    pinned: bool,
    pre_release: Option<bool>,
}

impl InstallFingerprint {
    fn new(identifier: &ExtensionIdentifier, options: &InstallOptions) -> Self {
        Self {
            key: identifier.key(),
            version: options.version.clone(),
            pinned: options.pinned,
            pre_release: options.pre_release,
        }
    }
}

type InstallOutcome = Option<std::result::Result<(), String>>;

pub(super) struct PendingInstall {
    pub(super) extension: Arc<Extension>,
    done: watch::Receiver<InstallOutcome>,
}

enum Admission<'a> {
    Started(PendingGuard<'a>),
    Joined(watch::Receiver<InstallOutcome>),
}

/// Keeps an install registered as in flight until dropped
struct PendingGuard<'a> {
    pending: &'a Mutex<HashMap<InstallFingerprint, PendingInstall>>,
    fingerprint: InstallFingerprint,
    sender: watch::Sender<InstallOutcome>,
}

impl PendingGuard<'_> {
    fn finish(&self, result: &Result<Arc<Extension>>) {
        let outcome = match result {
            Ok(_) => Ok(()),
            Err(e) => Err(e.to_string()),
        };
        self.sender.send_replace(Some(outcome));
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.fingerprint);
    }
}

impl ExtensionsWorkbench {
    /// Install (or update) an extension
    ///
    /// Failures other than a declined confirmation are reported through
    /// [`crate::traits::Dialogs::notify_error`] and returned.
    pub async fn install(
        &self,
        request: InstallRequest,
        options: InstallOptions,
    ) -> Result<Arc<Extension>> {
        let result = self.install_inner(request, &options).await;
        self.surface(result)
    }

    pub(super) async fn install_inner(
        &self,
        request: InstallRequest,
        options: &InstallOptions,
    ) -> Result<Arc<Extension>> {
        options.validate()?;
        match request {
            InstallRequest::ById(id) => {
                let existing = self
                    .local()
                    .into_iter()
                    .find(|e| e.identifier().matches_id(&id) && !e.is_builtin());
                match existing {
                    Some(extension) => self.install_extension(extension, options).await,
                    None => {
                        let gallery = self
                            .lookup_gallery(&ExtensionIdentifier::new(id), None, options)
                            .await?;
                        self.install_gallery(gallery, None, options).await
                    }
                }
            }
            InstallRequest::Extension(extension) => self.install_extension(extension, options).await,
            InstallRequest::Gallery(gallery) => {
                let existing = self.find_local(&gallery.identifier);
                let gallery = match &options.version {
                    Some(version) if *version != gallery.version => {
                        self.lookup_gallery(&gallery.identifier, None, options)
                            .await?
                    }
                    _ => gallery,
                };
                self.install_gallery(gallery, existing, options).await
            }
            InstallRequest::Resource(resource) => self.install_resource(resource, options).await,
            InstallRequest::Package { location } => self.install_package(&location, options).await,
        }
    }

    async fn install_extension(
        &self,
        extension: Arc<Extension>,
        options: &InstallOptions,
    ) -> Result<Arc<Extension>> {
        if !extension.has_gallery() {
            if let Some(resource) = extension.resource() {
                return self.install_resource(resource, options).await;
            }
        }
        let gallery = match extension.gallery() {
            Some(gallery)
                if options
                    .version
                    .as_ref()
                    .map_or(true, |version| *version == gallery.version) =>
            {
                gallery
            }
            _ => {
                self.lookup_gallery(&extension.identifier(), extension.local().as_ref(), options)
                    .await?
            }
        };
        let existing = extension.has_local().then_some(extension);
        self.install_gallery(gallery, existing, options).await
    }

    /// Fetch the catalog record to install, filtered for the target platform
    async fn lookup_gallery(
        &self,
        identifier: &ExtensionIdentifier,
        local: Option<&LocalExtension>,
        options: &InstallOptions,
    ) -> Result<GalleryExtension> {
        let gallery = self
            .gallery_service()
            .ok_or_else(|| Error::backend("The extension catalog is not available"))?;
        let settings = self.settings();
        let pre_release = options
            .pre_release
            .or(local.map(|l| l.pre_release))
            .unwrap_or(settings.prefer_pre_release);

        let info = ExtensionInfo {
            version: options.version.clone(),
            ..ExtensionInfo::from_identifier(identifier, pre_release)
        };
        let context = GalleryQueryContext {
            target_platform: self.target_platform().await,
            compatible: true,
            product_version: settings.product.version,
            query_all_versions: options.version.is_none(),
        };
        debug!("Looking up {} in the catalog", identifier);
        gallery
            .get_extensions(&[info], &context)
            .await?
            .into_iter()
            .find(|g| {
                g.identifier.matches(identifier)
                    && options.version.as_ref().map_or(true, |v| *v == g.version)
            })
            .ok_or_else(|| Error::not_found(identifier.id.clone(), options.version.clone()))
    }

    /// Ask the user to confirm an install that carries a justification
    async fn confirm_install(&self, name: &str, options: &InstallOptions) -> Result<()> {
        let Some(justification) = &options.justification else {
            return Ok(());
        };
        let result = self
            .dialogs
            .confirm(ConfirmRequest {
                message: format!("Do you want to install the '{}' extension?", name),
                detail: Some(justification.clone()),
                primary_button: "Install".to_string(),
                checkbox: None,
            })
            .await;
        if result.confirmed {
            Ok(())
        } else {
            Err(Error::UserCancelled)
        }
    }

    fn admit(&self, fingerprint: InstallFingerprint, extension: Arc<Extension>) -> Admission<'_> {
        let mut pending = self
            .pending_installs
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = pending.get(&fingerprint) {
            return Admission::Joined(existing.done.clone());
        }
        let (sender, done) = watch::channel(None);
        pending.insert(fingerprint.clone(), PendingInstall { extension, done });
        Admission::Started(PendingGuard {
            pending: &self.pending_installs,
            fingerprint,
            sender,
        })
    }

    /// Run `install` unless an identical install is already in flight
    async fn deduplicated<F>(
        &self,
        fingerprint: InstallFingerprint,
        tracking: Arc<Extension>,
        install: F,
    ) -> Result<Arc<Extension>>
    where
        F: Future<Output = Result<Arc<Extension>>>,
    {
        let identifier = tracking.identifier();
        let guard = match self.admit(fingerprint, tracking) {
            Admission::Started(guard) => guard,
            Admission::Joined(mut done) => {
                debug!("Joining the install of {} already in flight", identifier);
                let outcome = done.wait_for(|o| o.is_some()).await.map(|o| (*o).clone());
                return match outcome {
                    Ok(Some(Ok(()))) => self
                        .find_local(&identifier)
                        .ok_or_else(|| Error::missing_local(identifier.id.clone())),
                    Ok(Some(Err(message))) => Err(Error::backend(message)),
                    _ => Err(Error::backend(format!(
                        "Installing '{}' was interrupted",
                        identifier
                    ))),
                };
            }
        };
        let result = install.await;
        guard.finish(&result);
        result
    }

    async fn install_gallery(
        &self,
        gallery: GalleryExtension,
        existing: Option<Arc<Extension>>,
        options: &InstallOptions,
    ) -> Result<Arc<Extension>> {
        let name = if gallery.display_name.is_empty() {
            gallery.name.clone()
        } else {
            gallery.display_name.clone()
        };
        if gallery.malicious {
            return Err(Error::backend(format!(
                "Cannot install '{}' extension because it is reported to be malicious",
                name
            )));
        }
        if gallery.disallows_install() {
            return Err(Error::backend(format!(
                "Cannot install '{}' extension because it is deprecated",
                name
            )));
        }

        if options.reuse_existing {
            if let Some(installed) = self.find_local(&gallery.identifier) {
                if installed.version() == gallery.version {
                    debug!("Reusing installed {} {}", installed.id(), gallery.version);
                    return Ok(installed);
                }
            }
        }

        self.confirm_install(&name, options).await?;

        let tracking = existing
            .clone()
            .unwrap_or_else(|| self.map_gallery(gallery.clone()));
        let fingerprint = InstallFingerprint::new(&gallery.identifier, options);
        self.deduplicated(
            fingerprint,
            tracking.clone(),
            self.run_gallery_install(gallery, tracking, existing, options),
        )
        .await
    }

    async fn run_gallery_install(
        &self,
        gallery: GalleryExtension,
        tracking: Arc<Extension>,
        existing: Option<Arc<Extension>>,
        options: &InstallOptions,
    ) -> Result<Arc<Extension>> {
        let identifier = gallery.identifier.clone();
        let task = self.tasks.register(format!("install {}", identifier));
        let host_events = self.host.subscribe();

        let targets = self.install_targets(&gallery, &tracking, options).await?;
        let server_options = ServerInstallOptions {
            pre_release: options
                .pre_release
                .or(existing.as_ref().map(|e| e.pre_release()))
                .unwrap_or(self.settings().prefer_pre_release),
            pinned: options.pinned || options.version.is_some(),
            force: options.force_reinstall,
            install_dependencies: true,
        };

        info!(
            "Installing {} {} into {:?}",
            identifier,
            gallery.version,
            targets.iter().map(|(set, _)| set.environment()).collect::<Vec<_>>()
        );
        let outcomes = join_all(targets.iter().map(|(set, local)| {
            let server = set.server();
            let gallery = &gallery;
            let server_options = &server_options;
            async move {
                match local {
                    Some(local) if !server_options.force => {
                        server.update_from_gallery(gallery, local, server_options).await
                    }
                    _ => server.install_from_gallery(gallery, server_options).await,
                }
            }
        }))
        .await;

        self.process_events().await;
        if let Some(error) = first_error(outcomes) {
            return Err(error);
        }
        self.finish_install(&identifier, options, host_events, task.token())
            .await
    }

    /// Environments to install into, with the copy already installed there
    async fn install_targets(
        &self,
        gallery: &GalleryExtension,
        tracking: &Extension,
        options: &InstallOptions,
    ) -> Result<Vec<(&ExtensionSet, Option<LocalExtension>)>> {
        let identifier = &gallery.identifier;
        let installed_copy =
            |set: &ExtensionSet| set.find(identifier).and_then(|extension| extension.local());

        if !options.environments.is_empty() {
            return options
                .environments
                .iter()
                .map(|environment| {
                    let set = self.set_for(*environment).ok_or_else(|| {
                        Error::invalid_argument(format!(
                            "No install backend for the {} environment",
                            environment
                        ))
                    })?;
                    Ok((set, installed_copy(set)))
                })
                .collect();
        }

        let installed_in: Vec<&ExtensionSet> = self
            .sets
            .iter()
            .filter(|set| set.find(identifier).is_some())
            .collect();
        let disabled_by_kind =
            options.enable && tracking.enablement_state() == EnablementState::DisabledByExtensionKind;
        if !installed_in.is_empty() && !options.install_everywhere && !disabled_by_kind {
            return Ok(installed_in
                .into_iter()
                .map(|set| (set, installed_copy(set)))
                .collect());
        }

        let candidates: Vec<ExtensionEnvironment> = self
            .installable_environments(gallery)
            .await?
            .into_iter()
            .filter(|environment| !installed_in.iter().any(|s| s.environment() == *environment))
            .collect();

        let chosen: Vec<ExtensionEnvironment> = if options.install_everywhere {
            if candidates.is_empty() {
                return Ok(installed_in
                    .into_iter()
                    .map(|set| (set, installed_copy(set)))
                    .collect());
            }
            candidates
        } else if disabled_by_kind {
            candidates.into_iter().take(1).collect()
        } else {
            let kinds = self.manifest_kinds(gallery, tracking).await;
            preferred_environment(&kinds, &self.environments(), &candidates)
                .or_else(|| candidates.first().copied())
                .into_iter()
                .collect()
        };

        if chosen.is_empty() {
            return Err(Error::incompatible_target_platform(
                identifier.id.clone(),
                self.target_platform().await,
            ));
        }
        Ok(chosen
            .into_iter()
            .filter_map(|environment| self.set_for(environment))
            .map(|set| (set, None))
            .collect())
    }

    async fn manifest_kinds(&self, gallery: &GalleryExtension, tracking: &Extension) -> Vec<ExtensionKind> {
        if let Some(manifest) = tracking.local_manifest() {
            return manifest.extension_kinds();
        }
        let Some(service) = self.gallery_service() else {
            return Vec::new();
        };
        if gallery.assets.manifest.is_none() {
            return Vec::new();
        }
        match service.get_manifest(gallery).await {
            Ok(Some(manifest)) => manifest.extension_kinds(),
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("Failed to fetch the manifest of {}: {}", gallery.identifier, e);
                Vec::new()
            }
        }
    }

    async fn install_resource(
        &self,
        resource: ResourceExtension,
        options: &InstallOptions,
    ) -> Result<Arc<Extension>> {
        let identifier = resource.identifier.clone();
        let environment = self
            .single_target(&resource.manifest.extension_kinds(), options)
            .ok_or_else(|| Error::incompatible_target_platform(identifier.id.clone(), "web"))?;
        self.confirm_install(&resource.manifest.name, options).await?;

        let quality = self.settings().product.quality;
        let tracking = Arc::new(Extension::from_resource(
            Some(environment),
            quality,
            resource.clone(),
        ));
        let fingerprint = InstallFingerprint::new(&identifier, options);
        self.deduplicated(fingerprint, tracking, async {
            let task = self.tasks.register(format!("install {}", identifier));
            let host_events = self.host.subscribe();
            let set = self
                .set_for(environment)
                .ok_or_else(|| Error::missing_local(identifier.id.clone()))?;
            let server_options = ServerInstallOptions {
                pinned: options.pinned,
                force: options.force_reinstall,
                ..Default::default()
            };
            let result = set
                .server()
                .install_resource_extension(&resource, &server_options)
                .await;
            self.process_events().await;
            result?;
            self.finish_install(&identifier, options, host_events, task.token())
                .await
        })
        .await
    }

    async fn install_package(&self, location: &str, options: &InstallOptions) -> Result<Arc<Extension>> {
        let reader = self
            .set_for(ExtensionEnvironment::Local)
            .or_else(|| self.sets.first())
            .ok_or_else(|| Error::backend("No install backend is available"))?;
        let manifest = reader.server().get_package_manifest(location).await?;
        let identifier = ExtensionIdentifier::new(manifest.identifier());
        let kinds = manifest.extension_kinds();

        let environments: Vec<ExtensionEnvironment> = if options.install_everywhere {
            let available = self.environments();
            available
                .iter()
                .copied()
                .filter(|environment| {
                    preferred_environment(&kinds, &available, &[*environment]).is_some()
                })
                .collect()
        } else {
            self.single_target(&kinds, options).into_iter().collect()
        };
        if environments.is_empty() {
            return Err(Error::incompatible_target_platform(
                identifier.id.clone(),
                self.target_platform().await,
            ));
        }
        self.confirm_install(&manifest.name, options).await?;

        let quality = self.settings().product.quality;
        let tracking = self.find_local(&identifier).unwrap_or_else(|| {
            Arc::new(Extension::from_resource(
                environments.first().copied(),
                quality,
                ResourceExtension {
                    identifier: identifier.clone(),
                    location: location.to_string(),
                    manifest: manifest.clone(),
                    readme: None,
                    changelog: None,
                },
            ))
        });
        let fingerprint = InstallFingerprint::new(&identifier, options);
        self.deduplicated(fingerprint, tracking, async {
            let task = self.tasks.register(format!("install {}", identifier));
            let host_events = self.host.subscribe();
            let server_options = ServerInstallOptions {
                pinned: options.pinned,
                force: options.force_reinstall,
                ..Default::default()
            };
            let outcomes = join_all(
                environments
                    .iter()
                    .filter_map(|environment| self.set_for(*environment))
                    .map(|set| set.server().install_vsix(location, &server_options)),
            )
            .await;
            self.process_events().await;
            if let Some(error) = first_error(outcomes) {
                return Err(error);
            }
            self.finish_install(&identifier, options, host_events, task.token())
                .await
        })
        .await
    }

    /// Explicit target, else the environment the manifest's kinds prefer
    fn single_target(
        &self,
        kinds: &[ExtensionKind],
        options: &InstallOptions,
    ) -> Option<ExtensionEnvironment> {
        if let Some(environment) = options.environments.first() {
            return Some(*environment);
        }
        let available = self.environments();
        preferred_environment(kinds, &available, &available)
    }

    async fn finish_install(
        &self,
        identifier: &ExtensionIdentifier,
        options: &InstallOptions,
        host_events: broadcast::Receiver<HostEvent>,
        token: &CancellationToken,
    ) -> Result<Arc<Extension>> {
        let extension = self
            .find_local(identifier)
            .ok_or_else(|| Error::missing_local(identifier.id.clone()))?;

        let refreshed: Vec<Arc<Extension>> = self
            .all_installed()
            .into_iter()
            .filter(|copy| copy.identifier().matches(identifier))
            .filter(|copy| self.refresh_enablement(copy))
            .collect();
        if !refreshed.is_empty() {
            self.emit_changes(refreshed);
        }

        if options.enable
            && !extension.is_enabled()
            && extension.enablement_state().is_disabled_by_user()
        {
            self.set_enablement_inner(&[extension.clone()], EnablementState::EnabledGlobally)
                .await?;
        }

        self.wait_for_activation(&extension, host_events, token).await;
        Ok(extension)
    }

    /// Wait until the host reports the extension running
    ///
    /// Returns immediately when the host cannot start it without a reload.
    async fn wait_for_activation(
        &self,
        extension: &Extension,
        mut host_events: broadcast::Receiver<HostEvent>,
        token: &CancellationToken,
    ) {
        let Some(local) = extension.local() else {
            return;
        };
        if !extension.is_enabled() || !self.host.can_add_extension(&local) {
            return;
        }
        let identifier = extension.identifier();
        let is_running = || {
            self.host
                .running_extensions()
                .iter()
                .any(|running| running.identifier.matches_id(&identifier.id))
        };
        if is_running() {
            return;
        }

        debug!("Waiting for {} to activate", identifier);
        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!("Stopped waiting for {} to activate", identifier);
                    return;
                }
                event = host_events.recv() => match event {
                    Ok(HostEvent::ExtensionActivated { identifier: activated })
                        if activated.matches(&identifier) => return,
                    Ok(HostEvent::ExtensionsChanged) if is_running() => return,
                    Ok(_) => {}
                    Err(RecvError::Lagged(_)) => {
                        if is_running() {
                            return;
                        }
                    }
                    Err(RecvError::Closed) => return,
                },
            }
        }
    }
}

/// First failure of a parallel fan-out; the others are logged
fn first_error<T>(outcomes: Vec<Result<T>>) -> Option<Error> {
    let mut first = None;
    for outcome in outcomes {
        if let Err(e) = outcome {
            if first.is_none() {
                first = Some(e);
            } else {
                warn!("Install failed: {}", e);
            }
        }
    }
    first
}
