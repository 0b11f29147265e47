//! # atrium-core
//!
//! Core library for Atrium providing:
//! - Extension identities, install records, manifests and enablement states
//! - Extension settings with hierarchical configuration loading
//! - Persisted key/value state (auto-update lists, dismissed notifications)
//! - Version and engine-compatibility helpers

pub mod config;
pub mod error;
pub mod storage;
pub mod types;
pub mod utils;
pub mod version;

pub use config::{ExtensionsSettings, HierarchicalConfigLoader};
pub use error::{Error, Result};
pub use storage::{FileStateStorage, MemoryStateStorage, StateStorage, StorageScope};
pub use utils::atrium_dir;
