//! Per-user locations

use crate::error::{Error, Result};
use camino::Utf8PathBuf;
use std::path::PathBuf;

const ATRIUM_DIR: &str = ".atrium";

/// Directory holding user settings and the default state directory
///
/// `HOME` wins over `dirs::home_dir()` so sandboxed runs and containers can
/// redirect it. The path must be valid UTF-8.
pub fn atrium_dir() -> Result<Utf8PathBuf> {
    let home = std::env::var_os("HOME")
        .filter(|home| !home.is_empty())
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .ok_or_else(|| Error::invalid_config("Could not determine home directory"))?;
    let home = Utf8PathBuf::from_path_buf(home).map_err(|path| {
        Error::invalid_config(format!(
            "Home directory {} is not valid UTF-8",
            path.display()
        ))
    })?;
    Ok(home.join(ATRIUM_DIR))
}
