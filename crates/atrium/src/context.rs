//! Settings and persisted state shared by every command

use anyhow::{Context, Result};
use atrium_core::config::{ExtensionsSettings, HierarchicalConfigLoader};
use atrium_core::storage::FileStateStorage;
use camino::Utf8PathBuf;
use tracing::debug;

pub struct StateContext {
    pub loader: HierarchicalConfigLoader,
    pub settings: ExtensionsSettings,
    pub storage: FileStateStorage,
}

impl StateContext {
    /// Resolve settings and open the state directory
    ///
    /// Without an explicit directory the loader roots itself at `~/.atrium`.
    pub fn open(config_dir: Option<Utf8PathBuf>) -> Result<Self> {
        let loader = match config_dir {
            Some(dir) => HierarchicalConfigLoader::with_dir(dir),
            None => HierarchicalConfigLoader::new().context("Failed to locate config directory")?,
        };
        let settings = loader
            .load_settings()
            .context("Failed to load extension settings")?;
        let storage_dir = loader.storage_dir(&settings);
        debug!("Using state directory {}", storage_dir);
        let storage = FileStateStorage::open(storage_dir.clone())
            .with_context(|| format!("Failed to open state directory {}", storage_dir))?;

        Ok(Self {
            loader,
            settings,
            storage,
        })
    }
}
