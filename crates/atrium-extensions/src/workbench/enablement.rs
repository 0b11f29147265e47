use super::ExtensionsWorkbench;
use crate::dependency::{dependents_after_disablement, dependents_message, enablement_closure};
use crate::extension::Extension;
use crate::traits::PromptRequest;
use atrium_core::types::{EnablementState, LocalExtension};
use atrium_core::{Error, Result};
use std::sync::Arc;
use tracing::info;

fn push_unique(batch: &mut Vec<Arc<Extension>>, items: Vec<Arc<Extension>>) {
    for item in items {
        let identifier = item.identifier();
        if !batch.iter().any(|e| e.identifier().matches(&identifier)) {
            batch.push(item);
        }
    }
}

impl ExtensionsWorkbench {
    /// Enable or disable extensions together with their cascade
    ///
    /// Enabling also enables every disabled dependency and pack member,
    /// transitively. Disabling takes the pack members along; enabled
    /// extensions that depend on the batch are added one layer at a time,
    /// each layer only after the user accepts a prompt naming it.
    pub async fn set_enablement(
        &self,
        extensions: &[Arc<Extension>],
        state: EnablementState,
    ) -> Result<()> {
        let result = self.set_enablement_inner(extensions, state).await;
        self.surface(result)
    }

    pub(super) async fn set_enablement_inner(
        &self,
        extensions: &[Arc<Extension>],
        state: EnablementState,
    ) -> Result<()> {
        let Some(first) = extensions.first() else {
            return Ok(());
        };
        if let Some(missing) = extensions.iter().find(|e| !e.has_local()) {
            return Err(Error::missing_local(missing.id()));
        }

        let installed = self.installed();
        let mut batch: Vec<Arc<Extension>> = Vec::new();
        push_unique(&mut batch, extensions.to_vec());

        if state.is_enabled() {
            push_unique(
                &mut batch,
                enablement_closure(extensions, &installed, true, true),
            );
        } else {
            push_unique(
                &mut batch,
                enablement_closure(extensions, &installed, false, false),
            );
            // each layer of enabled dependents is confirmed before it joins the batch
            let mut subject = first.clone();
            loop {
                let dependents = dependents_after_disablement(&batch, &installed);
                let Some(next_subject) = dependents.first().cloned() else {
                    break;
                };
                let result = self
                    .dialogs
                    .prompt(PromptRequest {
                        message: dependents_message("disable", &subject, &dependents),
                        choices: vec!["Disable All".to_string()],
                        checkbox: None,
                    })
                    .await;
                if result.choice.is_none() {
                    return Err(Error::UserCancelled);
                }

                let before = batch.len();
                let packs = enablement_closure(&dependents, &installed, false, false);
                push_unique(&mut batch, dependents);
                push_unique(&mut batch, packs);
                if batch.len() == before {
                    break;
                }
                subject = next_subject;
            }
        }

        let changes: Vec<Arc<Extension>> = batch
            .into_iter()
            .filter(|e| e.enablement_state() != state)
            .collect();
        if changes.is_empty() {
            return Ok(());
        }

        let locals: Vec<LocalExtension> = changes.iter().filter_map(|e| e.local()).collect();
        info!("Setting {} for {} extensions", state, locals.len());
        self.enablement.set_enablement(&locals, state).await?;
        for extension in &changes {
            self.refresh_enablement(extension);
        }

        self.process_events().await;
        self.emit_changes(changes);
        Ok(())
    }
}
