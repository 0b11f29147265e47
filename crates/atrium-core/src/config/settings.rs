//! Extension settings

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Global auto-update mode
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum AutoUpdateMode {
    /// Only allow-listed extensions and publishers are updated
    Off,
    /// Same policy as `Off`; the allow-list is managed explicitly
    OnlySelected,
    /// Every enabled extension is updated
    OnlyEnabled,
    #[default]
    On,
}

impl AutoUpdateMode {
    /// Whether the mode relies on the allow-list alone
    pub fn is_selective(&self) -> bool {
        matches!(self, Self::Off | Self::OnlySelected)
    }
}

impl fmt::Display for AutoUpdateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Off => write!(f, "off"),
            Self::OnlySelected => write!(f, "only-selected"),
            Self::OnlyEnabled => write!(f, "only-enabled"),
            Self::On => write!(f, "on"),
        }
    }
}

impl FromStr for AutoUpdateMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "off" | "false" => Ok(Self::Off),
            "only-selected" | "onlyselected" => Ok(Self::OnlySelected),
            "only-enabled" | "onlyenabled" | "onlyenabledextensions" => Ok(Self::OnlyEnabled),
            "on" | "true" => Ok(Self::On),
            other => Err(Error::invalid_config(format!(
                "Unknown auto-update mode '{}' (expected off, only-selected, only-enabled or on)",
                other
            ))),
        }
    }
}

/// Release channel of the host product
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProductQuality {
    #[default]
    Stable,
    Insider,
}

impl FromStr for ProductQuality {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "stable" => Ok(Self::Stable),
            "insider" | "insiders" => Ok(Self::Insider),
            other => Err(Error::invalid_config(format!(
                "Unknown product quality '{}' (expected stable or insider)",
                other
            ))),
        }
    }
}

impl fmt::Display for ProductQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stable => write!(f, "stable"),
            Self::Insider => write!(f, "insider"),
        }
    }
}

/// Host product identity used for engine-compatibility checks
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct ProductInfo {
    #[serde(default = "default_product_version")]
    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,

    #[serde(default)]
    pub quality: ProductQuality,
}

impl Default for ProductInfo {
    fn default() -> Self {
        Self {
            version: default_product_version(),
            date: None,
            quality: ProductQuality::default(),
        }
    }
}

fn default_product_version() -> String {
    "1.0.0".to_string()
}

/// Settings that drive the extension lifecycle
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct ExtensionsSettings {
    #[serde(default)]
    pub auto_update: AutoUpdateMode,

    /// Periodically query the catalog for newer versions
    #[serde(default = "default_true")]
    pub auto_check_updates: bool,

    /// Install pre-release builds by default when installing by id
    #[serde(default)]
    pub prefer_pre_release: bool,

    #[serde(default)]
    pub product: ProductInfo,

    /// Directory for persisted state (defaults to ~/.atrium/state)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_dir: Option<String>,
}

impl Default for ExtensionsSettings {
    fn default() -> Self {
        Self {
            auto_update: AutoUpdateMode::default(),
            auto_check_updates: true,
            prefer_pre_release: false,
            product: ProductInfo::default(),
            storage_dir: None,
        }
    }
}

fn default_true() -> bool {
    true
}
