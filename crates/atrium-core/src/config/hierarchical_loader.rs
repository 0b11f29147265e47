//! Hierarchical settings loader with precedence
//!
//! Loads settings from multiple sources with the following precedence (low to high):
//! 1. Embedded defaults (built into binary)
//! 2. User settings (~/.atrium/settings.yaml)
//! 3. Environment variables (ATRIUM_* prefix)
//! 4. CLI flags (handled by caller)

use crate::config::ExtensionsSettings;
use crate::error::{Error, Result};
use camino::{Utf8Path, Utf8PathBuf};
use rust_embed::RustEmbed;
use serde_yaml_ng::Value;
use std::env;
use std::fs;
use tracing::debug;

/// Embedded configuration files
#[derive(RustEmbed)]
#[folder = "$CARGO_MANIFEST_DIR/../../embedded/config/"]
#[prefix = ""]
struct EmbeddedConfigs;

const SETTINGS_DEFAULTS: &str = "settings-defaults.yaml";
const SETTINGS_FILE: &str = "settings.yaml";

/// Settings hierarchy loader
pub struct HierarchicalConfigLoader {
    /// Base directory for configuration files
    config_dir: Utf8PathBuf,
}

impl HierarchicalConfigLoader {
    /// Create a new hierarchical config loader rooted at ~/.atrium
    pub fn new() -> Result<Self> {
        let config_dir = Self::get_config_dir()?;
        Ok(Self { config_dir })
    }

    /// Create a loader with a custom config directory
    pub fn with_dir(config_dir: Utf8PathBuf) -> Self {
        Self { config_dir }
    }

    /// Get the standard config directory (~/.atrium), creating it if needed
    fn get_config_dir() -> Result<Utf8PathBuf> {
        let config_dir = crate::utils::atrium_dir()?;
        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)?;
        }
        Ok(config_dir)
    }

    /// Load extension settings with hierarchical precedence
    pub fn load_settings(&self) -> Result<ExtensionsSettings> {
        let mut value = Self::load_embedded_value(SETTINGS_DEFAULTS)?;

        let settings_path = self.settings_path();
        if settings_path.exists() {
            debug!("Loading settings overlay from {}", settings_path);
            let overlay = self.load_yaml_value(&settings_path)?;
            merge_values(&mut value, overlay);
        }

        let settings: ExtensionsSettings = serde_yaml_ng::from_value(value)
            .map_err(|e| Error::invalid_config(format!("Failed to parse settings: {}", e)))?;

        self.apply_env_overrides(settings)
    }

    /// Persist settings to the user settings file
    pub fn save_settings(&self, settings: &ExtensionsSettings) -> Result<()> {
        if !self.config_dir.exists() {
            fs::create_dir_all(&self.config_dir)?;
        }
        let content = serde_yaml_ng::to_string(settings)?;
        fs::write(self.settings_path(), content)?;
        Ok(())
    }

    /// Load an embedded configuration file as a YAML tree
    fn load_embedded_value(filename: &str) -> Result<Value> {
        let embedded_file = EmbeddedConfigs::get(filename).ok_or_else(|| {
            Error::config_not_found(format!("Embedded config not found: {}", filename))
        })?;

        let content = std::str::from_utf8(&embedded_file.data).map_err(|_| {
            Error::invalid_config(format!("Invalid UTF-8 in embedded config: {}", filename))
        })?;

        serde_yaml_ng::from_str(content).map_err(|e| {
            Error::invalid_config(format!(
                "Failed to parse embedded config {}: {}",
                filename, e
            ))
        })
    }

    /// Load a YAML file as a tree
    fn load_yaml_value(&self, path: &Utf8Path) -> Result<Value> {
        let content = fs::read_to_string(path)?;
        let value: Value = serde_yaml_ng::from_str(&content)
            .map_err(|e| Error::invalid_config(format!("Failed to parse {}: {}", path, e)))?;
        Ok(value)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&self, mut settings: ExtensionsSettings) -> Result<ExtensionsSettings> {
        if let Ok(val) = env::var("ATRIUM_AUTO_UPDATE") {
            settings.auto_update = val.parse()?;
        }

        if let Ok(val) = env::var("ATRIUM_AUTO_CHECK_UPDATES") {
            settings.auto_check_updates = val.parse().map_err(|_| {
                Error::invalid_config("ATRIUM_AUTO_CHECK_UPDATES must be true or false")
            })?;
        }

        if let Ok(val) = env::var("ATRIUM_PREFER_PRE_RELEASE") {
            settings.prefer_pre_release = val.parse().map_err(|_| {
                Error::invalid_config("ATRIUM_PREFER_PRE_RELEASE must be true or false")
            })?;
        }

        if let Ok(val) = env::var("ATRIUM_PRODUCT_VERSION") {
            semver::Version::parse(&val).map_err(|_| {
                Error::invalid_config("ATRIUM_PRODUCT_VERSION must be a semantic version")
            })?;
            settings.product.version = val;
        }

        if let Ok(val) = env::var("ATRIUM_PRODUCT_QUALITY") {
            settings.product.quality = val.parse()?;
        }

        Ok(settings)
    }

    /// Path of the user settings file
    pub fn settings_path(&self) -> Utf8PathBuf {
        self.config_dir.join(SETTINGS_FILE)
    }

    /// Get the config directory path
    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }

    /// Directory for persisted state, honouring the `storage-dir` setting
    pub fn storage_dir(&self, settings: &ExtensionsSettings) -> Utf8PathBuf {
        settings
            .storage_dir
            .as_ref()
            .map(Utf8PathBuf::from)
            .unwrap_or_else(|| self.config_dir.join("state"))
    }
}

/// Overlay `overlay` onto `base`: mappings merge key by key, everything else replaces
fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Mapping(base_map), Value::Mapping(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (_, Value::Null) => {}
        (base, overlay) => *base = overlay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AutoUpdateMode, ProductQuality};
    use serial_test::serial;
    use tempfile::TempDir;

    fn create_temp_loader() -> (HierarchicalConfigLoader, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config_dir =
            Utf8PathBuf::from_path_buf(temp_dir.path().to_path_buf()).expect("Invalid UTF-8 path");
        let loader = HierarchicalConfigLoader::with_dir(config_dir);
        (loader, temp_dir)
    }

    #[test]
    #[serial]
    fn test_load_settings_defaults() {
        let (loader, _temp) = create_temp_loader();
        let settings = loader.load_settings().unwrap();
        assert_eq!(settings.auto_update, AutoUpdateMode::On);
        assert!(settings.auto_check_updates);
        assert_eq!(settings.product.quality, ProductQuality::Stable);
    }

    #[test]
    #[serial]
    fn test_partial_file_keeps_embedded_defaults() {
        let (loader, _temp) = create_temp_loader();

        let content = r#"
auto-update: only-enabled
product:
  quality: insider
"#;
        fs::write(loader.settings_path(), content).unwrap();

        let settings = loader.load_settings().unwrap();
        assert_eq!(settings.auto_update, AutoUpdateMode::OnlyEnabled);
        assert_eq!(settings.product.quality, ProductQuality::Insider);
        assert_eq!(settings.product.version, "1.95.0");
        assert!(settings.auto_check_updates);
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        let (loader, _temp) = create_temp_loader();

        env::set_var("ATRIUM_AUTO_UPDATE", "off");
        env::set_var("ATRIUM_PREFER_PRE_RELEASE", "true");
        env::set_var("ATRIUM_PRODUCT_VERSION", "2.0.0");

        let settings = loader.load_settings().unwrap();
        assert_eq!(settings.auto_update, AutoUpdateMode::Off);
        assert!(settings.prefer_pre_release);
        assert_eq!(settings.product.version, "2.0.0");

        env::remove_var("ATRIUM_AUTO_UPDATE");
        env::remove_var("ATRIUM_PREFER_PRE_RELEASE");
        env::remove_var("ATRIUM_PRODUCT_VERSION");
    }

    #[test]
    #[serial]
    fn test_invalid_env_value() {
        let (loader, _temp) = create_temp_loader();

        env::set_var("ATRIUM_AUTO_CHECK_UPDATES", "maybe");
        let result = loader.load_settings();
        env::remove_var("ATRIUM_AUTO_CHECK_UPDATES");

        assert!(matches!(result, Err(Error::InvalidConfig { .. })));
    }

    #[test]
    #[serial]
    fn test_save_then_load() {
        let (loader, _temp) = create_temp_loader();
        let mut settings = loader.load_settings().unwrap();
        settings.auto_update = AutoUpdateMode::OnlySelected;
        loader.save_settings(&settings).unwrap();

        let reloaded = loader.load_settings().unwrap();
        assert_eq!(reloaded.auto_update, AutoUpdateMode::OnlySelected);
    }

    #[test]
    fn test_storage_dir_default_and_override() {
        let (loader, _temp) = create_temp_loader();
        let mut settings = ExtensionsSettings::default();
        assert_eq!(loader.storage_dir(&settings), loader.config_dir().join("state"));

        settings.storage_dir = Some("/var/lib/atrium".to_string());
        assert_eq!(
            loader.storage_dir(&settings),
            Utf8PathBuf::from("/var/lib/atrium")
        );
    }

    #[test]
    fn test_merge_values_nested() {
        let mut base: Value = serde_yaml_ng::from_str("a: 1\nb:\n  c: 2\n  d: 3\n").unwrap();
        let overlay: Value = serde_yaml_ng::from_str("b:\n  d: 4\ne: 5\n").unwrap();
        merge_values(&mut base, overlay);

        let expected: Value =
            serde_yaml_ng::from_str("a: 1\nb:\n  c: 2\n  d: 4\ne: 5\n").unwrap();
        assert_eq!(base, expected);
    }
}
