//! Extension identity and comparison

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of an extension: `publisher.name` plus an optional catalog uuid
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExtensionIdentifier {
    /// Case-insensitive `publisher.name` identifier
    pub id: String,

    /// Catalog identifier, when the extension is linked to the catalog
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
}

impl ExtensionIdentifier {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            uuid: None,
        }
    }

    pub fn with_uuid(id: impl Into<String>, uuid: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            uuid: Some(uuid.into()),
        }
    }

    /// Lower-cased id used for map keys and persisted lists
    pub fn key(&self) -> String {
        self.id.to_lowercase()
    }

    /// Publisher part of the identifier (everything before the first dot)
    pub fn publisher(&self) -> &str {
        self.id.split('.').next().unwrap_or_default()
    }

    /// Whether both identifiers denote the same extension
    pub fn matches(&self, other: &ExtensionIdentifier) -> bool {
        are_same_extensions(self, other)
    }

    /// Whether this identifier matches a plain id string (case-insensitive)
    pub fn matches_id(&self, id: &str) -> bool {
        self.id.eq_ignore_ascii_case(id)
    }
}

impl fmt::Display for ExtensionIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// Two identities are the same extension when their uuids match, or when
/// (lacking a uuid on either side) their lower-cased ids match.
pub fn are_same_extensions(a: &ExtensionIdentifier, b: &ExtensionIdentifier) -> bool {
    if let (Some(a_uuid), Some(b_uuid)) = (&a.uuid, &b.uuid) {
        return a_uuid == b_uuid;
    }
    a.id.eq_ignore_ascii_case(&b.id)
}

/// Whether the string has the `publisher.name` shape of an extension identifier
pub fn is_extension_identifier(value: &str) -> bool {
    let mut parts = value.split('.');
    let valid_part = |part: &str| {
        !part.is_empty()
            && part
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    };
    matches!(
        (parts.next(), parts.next(), parts.next()),
        (Some(publisher), Some(name), None) if valid_part(publisher) && valid_part(name)
    )
}
