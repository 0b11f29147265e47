//! Error types for atrium-core

use thiserror::Error;

/// Result type alias using atrium-core's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy shared by the extension lifecycle crates
#[derive(Error, Debug)]
pub enum Error {
    /// Identifier (or a specific version of it) is absent from the catalog
    #[error("{}", not_found_message(.id, .version))]
    NotFound { id: String, version: Option<String> },

    /// Mutually exclusive install flags supplied together
    #[error("Invalid option combination: {message}")]
    InvalidOptionCombination { message: String },

    /// A confirmation was declined
    #[error("Operation cancelled by the user")]
    UserCancelled,

    /// Resource or package cannot be installed on this platform
    #[error("Extension '{id}' is not compatible with target platform '{target_platform}'")]
    IncompatibleTargetPlatform { id: String, target_platform: String },

    /// Operation requires an installed copy that isn't present
    #[error("Extension '{id}' is not installed")]
    MissingLocalRecord { id: String },

    /// No local record, catalog manifest asset or resource manifest available
    #[error("Manifest is not available for extension '{id}'")]
    ManifestUnavailable { id: String },

    /// Argument has the wrong shape (e.g. publisher expected, identifier given)
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// A collaborator (backend, catalog, enablement) rejected the call
    #[error("{message}")]
    Backend { message: String },

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Invalid configuration format
    #[error("Invalid configuration format: {message}")]
    InvalidConfig { message: String },

    /// Invalid semver version
    #[error("Invalid version format: {version}")]
    InvalidVersion { version: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    YamlParse(#[from] serde_yaml_ng::Error),
}

fn not_found_message(id: &str, version: &Option<String>) -> String {
    match version {
        Some(version) => format!("Cannot find version '{}' of extension '{}'", version, id),
        None => format!("Cannot find extension '{}'", id),
    }
}

impl Error {
    /// Create a not found error
    pub fn not_found(id: impl Into<String>, version: Option<String>) -> Self {
        Self::NotFound {
            id: id.into(),
            version,
        }
    }

    /// Create an invalid option combination error
    pub fn invalid_options(message: impl Into<String>) -> Self {
        Self::InvalidOptionCombination {
            message: message.into(),
        }
    }

    /// Create an incompatible target platform error
    pub fn incompatible_target_platform(
        id: impl Into<String>,
        target_platform: impl ToString,
    ) -> Self {
        Self::IncompatibleTargetPlatform {
            id: id.into(),
            target_platform: target_platform.to_string(),
        }
    }

    /// Create a missing local record error
    pub fn missing_local(id: impl Into<String>) -> Self {
        Self::MissingLocalRecord { id: id.into() }
    }

    /// Create a manifest unavailable error
    pub fn manifest_unavailable(id: impl Into<String>) -> Self {
        Self::ManifestUnavailable { id: id.into() }
    }

    /// Create an invalid argument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a backend error
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    /// Create a config not found error
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    /// Create an invalid config error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create an invalid version error
    pub fn invalid_version(version: impl Into<String>) -> Self {
        Self::InvalidVersion {
            version: version.into(),
        }
    }

    /// Whether this error stems from a declined confirmation
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::UserCancelled)
    }
}
