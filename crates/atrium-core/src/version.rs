//! Version comparison and engine-compatibility helpers

use crate::error::{Error, Result};
use semver::{Version, VersionReq};
use std::cmp::Ordering;

/// Parse a version, padding missing minor/patch components (`1.2` -> `1.2.0`)
pub fn parse_version(value: &str) -> Result<Version> {
    let trimmed = value.trim().trim_start_matches('v');
    if let Ok(version) = Version::parse(trimmed) {
        return Ok(version);
    }

    let (core, rest) = match trimmed.find(['-', '+']) {
        Some(idx) => trimmed.split_at(idx),
        None => (trimmed, ""),
    };
    let mut parts: Vec<&str> = core.split('.').collect();
    if parts.is_empty() || parts.len() > 3 {
        return Err(Error::invalid_version(value));
    }
    while parts.len() < 3 {
        parts.push("0");
    }
    Version::parse(&format!("{}{}", parts.join("."), rest))
        .map_err(|_| Error::invalid_version(value))
}

/// Compare two version strings; `None` when either fails to parse
pub fn compare_versions(a: &str, b: &str) -> Option<Ordering> {
    let a = parse_version(a).ok()?;
    let b = parse_version(b).ok()?;
    Some(a.cmp(&b))
}

/// Whether `candidate` is strictly newer than `current` (false on parse failure)
pub fn is_newer(candidate: &str, current: &str) -> bool {
    compare_versions(candidate, current) == Some(Ordering::Greater)
}

/// Whether an engine requirement accepts the given product version
///
/// `*` accepts everything. Pre-release tags on the product version are
/// ignored so insider builds satisfy the same ranges as stable ones.
pub fn is_engine_valid(engine: &str, product_version: &str) -> bool {
    let engine = engine.trim();
    if engine.is_empty() || engine == "*" {
        return true;
    }

    let Ok(mut product) = parse_version(product_version) else {
        return false;
    };
    product.pre = semver::Prerelease::EMPTY;
    product.build = semver::BuildMetadata::EMPTY;

    match VersionReq::parse(engine) {
        Ok(req) => req.matches(&product),
        Err(_) => false,
    }
}
