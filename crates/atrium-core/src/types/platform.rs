//! Target platforms and execution environments

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Platform a package was built for
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum TargetPlatform {
    #[serde(rename = "win32-x64")]
    Win32X64,
    #[serde(rename = "win32-arm64")]
    Win32Arm64,
    #[serde(rename = "linux-x64")]
    LinuxX64,
    #[serde(rename = "linux-arm64")]
    LinuxArm64,
    #[serde(rename = "linux-armhf")]
    LinuxArmhf,
    #[serde(rename = "alpine-x64")]
    AlpineX64,
    #[serde(rename = "alpine-arm64")]
    AlpineArm64,
    #[serde(rename = "darwin-x64")]
    DarwinX64,
    #[serde(rename = "darwin-arm64")]
    DarwinArm64,
    #[serde(rename = "web")]
    Web,
    #[serde(rename = "universal")]
    Universal,
    #[serde(rename = "unknown")]
    Unknown,
    #[default]
    #[serde(rename = "undefined")]
    Undefined,
}

impl TargetPlatform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Win32X64 => "win32-x64",
            Self::Win32Arm64 => "win32-arm64",
            Self::LinuxX64 => "linux-x64",
            Self::LinuxArm64 => "linux-arm64",
            Self::LinuxArmhf => "linux-armhf",
            Self::AlpineX64 => "alpine-x64",
            Self::AlpineArm64 => "alpine-arm64",
            Self::DarwinX64 => "darwin-x64",
            Self::DarwinArm64 => "darwin-arm64",
            Self::Web => "web",
            Self::Universal => "universal",
            Self::Unknown => "unknown",
            Self::Undefined => "undefined",
        }
    }

    /// Whether this is a concrete OS/architecture pair
    pub fn is_concrete(&self) -> bool {
        !matches!(
            self,
            Self::Web | Self::Universal | Self::Unknown | Self::Undefined
        )
    }
}

impl fmt::Display for TargetPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetPlatform {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "win32-x64" => Self::Win32X64,
            "win32-arm64" => Self::Win32Arm64,
            "linux-x64" => Self::LinuxX64,
            "linux-arm64" => Self::LinuxArm64,
            "linux-armhf" => Self::LinuxArmhf,
            "alpine-x64" => Self::AlpineX64,
            "alpine-arm64" => Self::AlpineArm64,
            "darwin-x64" => Self::DarwinX64,
            "darwin-arm64" => Self::DarwinArm64,
            "web" => Self::Web,
            "universal" => Self::Universal,
            "undefined" => Self::Undefined,
            _ => Self::Unknown,
        })
    }
}

/// Whether a package built for `extension_platform` may run on `product_platform`
pub fn is_target_platform_compatible(
    extension_platform: TargetPlatform,
    product_platform: TargetPlatform,
) -> bool {
    if product_platform == TargetPlatform::Web && extension_platform != TargetPlatform::Web {
        return false;
    }
    match extension_platform {
        TargetPlatform::Undefined | TargetPlatform::Universal => true,
        TargetPlatform::Unknown => false,
        other => other == product_platform,
    }
}

/// Isolated execution environment an install backend serves
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum ExtensionEnvironment {
    Local,
    Remote,
    Web,
}

impl fmt::Display for ExtensionEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Remote => write!(f, "remote"),
            Self::Web => write!(f, "web"),
        }
    }
}
