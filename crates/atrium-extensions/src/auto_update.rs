//! Auto-update policy
//!
//! The decision itself is a pure function of the candidate, the global mode
//! and the persisted allow/deny lists. The allow-list holds extension ids,
//! publisher names and `-<id>` negations; the deny-list holds extension ids.

use crate::extension::Extension;
use atrium_core::config::AutoUpdateMode;
use atrium_core::storage::{read_string_list, write_string_list, StateStorage, StorageScope};
use atrium_core::{Error, Result};

pub const AUTO_UPDATE_ALLOWED_KEY: &str = "extensions.autoUpdate.allowed";
pub const AUTO_UPDATE_DENIED_KEY: &str = "extensions.autoUpdate.denied";
pub const DISMISSED_NOTIFICATIONS_KEY: &str = "extensions.dismissedNotifications";

/// Facts about an extension the policy looks at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateCandidate {
    pub id: String,
    pub publisher: String,
    pub pinned: bool,
    pub enabled: bool,
    pub disallow_install: bool,
}

impl From<&Extension> for UpdateCandidate {
    fn from(extension: &Extension) -> Self {
        Self {
            id: extension.id(),
            publisher: extension.publisher(),
            pinned: extension.pinned(),
            enabled: extension.is_enabled(),
            disallow_install: extension
                .deprecation_info()
                .is_some_and(|info| info.disallow_install),
        }
    }
}

/// Persisted allow/deny lists
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AutoUpdateLists {
    pub allowed: Vec<String>,
    pub denied: Vec<String>,
}

fn negated(id: &str) -> String {
    format!("-{}", id)
}

/// Entries are matched without regard to case, whoever wrote them
fn same_entry(stored: &str, entry: &str) -> bool {
    stored.to_lowercase() == entry.to_lowercase()
}

fn contains_entry(list: &[String], entry: &str) -> bool {
    list.iter().any(|e| same_entry(e, entry))
}

fn remove_entry(list: &mut Vec<String>, entry: &str) {
    list.retain(|e| !same_entry(e, entry));
}

fn add_entry(list: &mut Vec<String>, entry: String) {
    if !contains_entry(list, &entry) {
        list.push(entry);
    }
}

impl AutoUpdateLists {
    pub fn load(storage: &dyn StateStorage) -> Result<Self> {
        Ok(Self {
            allowed: read_string_list(storage, AUTO_UPDATE_ALLOWED_KEY, StorageScope::Application)?,
            denied: read_string_list(storage, AUTO_UPDATE_DENIED_KEY, StorageScope::Application)?,
        })
    }

    pub fn save(&self, storage: &dyn StateStorage) -> Result<()> {
        write_string_list(
            storage,
            AUTO_UPDATE_ALLOWED_KEY,
            StorageScope::Application,
            &self.allowed,
        )?;
        write_string_list(
            storage,
            AUTO_UPDATE_DENIED_KEY,
            StorageScope::Application,
            &self.denied,
        )
    }

    /// Publisher entries of the allow-list
    pub fn publishers(&self) -> Vec<&str> {
        self.allowed
            .iter()
            .map(String::as_str)
            .filter(|entry| !entry.starts_with('-') && !entry.contains('.'))
            .collect()
    }

    pub fn is_publisher_allowed(&self, publisher: &str) -> bool {
        self.publishers()
            .into_iter()
            .any(|entry| same_entry(entry, publisher))
    }

    pub fn is_extension_allowed(&self, id: &str) -> bool {
        contains_entry(&self.allowed, id)
    }

    pub fn is_extension_negated(&self, id: &str) -> bool {
        contains_entry(&self.allowed, &negated(id))
    }

    pub fn is_extension_denied(&self, id: &str) -> bool {
        contains_entry(&self.denied, id)
    }

    /// Turn auto-update on or off for one extension
    ///
    /// An id never sits on both lists after this call.
    pub fn set_extension(&mut self, id: &str, publisher: &str, enable: bool, mode: AutoUpdateMode) {
        let id = id.to_lowercase();
        let publisher_allowed = self.is_publisher_allowed(publisher);

        if mode.is_selective() {
            if enable {
                remove_entry(&mut self.allowed, &negated(&id));
                if publisher_allowed {
                    remove_entry(&mut self.allowed, &id);
                } else {
                    add_entry(&mut self.allowed, id.clone());
                }
                remove_entry(&mut self.denied, &id);
            } else {
                remove_entry(&mut self.allowed, &id);
                if publisher_allowed {
                    add_entry(&mut self.allowed, negated(&id));
                } else {
                    remove_entry(&mut self.allowed, &negated(&id));
                }
            }
        } else if enable {
            remove_entry(&mut self.denied, &id);
        } else {
            add_entry(&mut self.denied, id.clone());
            remove_entry(&mut self.allowed, &id);
        }
    }

    /// Turn auto-update on or off for a whole publisher
    pub fn set_publisher(&mut self, publisher: &str, enable: bool) -> Result<()> {
        if publisher.contains('.') {
            return Err(Error::invalid_argument(format!(
                "Expected a publisher name, found extension identifier '{}'",
                publisher
            )));
        }
        if publisher.is_empty() || publisher.starts_with('-') {
            return Err(Error::invalid_argument(format!(
                "Invalid publisher name '{}'",
                publisher
            )));
        }
        let publisher = publisher.to_lowercase();
        if enable {
            add_entry(&mut self.allowed, publisher);
        } else {
            remove_entry(&mut self.allowed, &publisher);
        }
        Ok(())
    }
}

/// Whether the candidate should be updated without asking
pub fn should_auto_update(
    candidate: &UpdateCandidate,
    mode: AutoUpdateMode,
    lists: &AutoUpdateLists,
) -> bool {
    if candidate.disallow_install {
        return false;
    }

    if mode.is_selective() {
        if lists.is_extension_allowed(&candidate.id) {
            return true;
        }
        return lists.is_publisher_allowed(&candidate.publisher)
            && !lists.is_extension_negated(&candidate.id);
    }

    if candidate.pinned {
        return false;
    }

    if lists.is_extension_denied(&candidate.id) {
        return false;
    }

    match mode {
        AutoUpdateMode::On => true,
        AutoUpdateMode::OnlyEnabled => candidate.enabled,
        AutoUpdateMode::Off | AutoUpdateMode::OnlySelected => false,
    }
}
