//! Data directory layout.
//!
//! | Platform | Data Dir |
//! |----------|----------|
//! | **Linux** | `~/.local/share/rigging` (XDG_DATA_HOME) |
//! | **macOS** | `~/Library/Application Support/rigging` |
//! | **Windows** | `%APPDATA%\rigging` |
//!
//! `RIGGING_DATA_DIR` overrides the data directory for testing and CI.

use std::path::{Path, PathBuf};

use crate::policy::EnvSource;
use crate::{Error, Result};

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "RIGGING_DATA_DIR";

/// Name of the static resources directory inside the data directory.
pub const STATIC_DIR_NAME: &str = "static";

/// Get the data directory.
///
/// Resolution order:
/// 1. `RIGGING_DATA_DIR` environment variable
/// 2. Platform data directory + `/rigging`
/// 3. `./.rigging` when the platform reports no data directory
#[must_use]
pub fn data_dir(env: &dyn EnvSource) -> PathBuf {
    if let Some(dir) = env.var(DATA_DIR_ENV)
        && !dir.is_empty()
    {
        return PathBuf::from(dir);
    }

    dirs::data_dir().map_or_else(|| PathBuf::from(".rigging"), |base| base.join("rigging"))
}

/// Get the static resources directory inside `data_dir`.
#[must_use]
pub fn static_dir(data_dir: &Path) -> PathBuf {
    data_dir.join(STATIC_DIR_NAME)
}

/// Create the data directory and its static resources directory.
///
/// # Errors
///
/// Returns [`Error::Io`] if either directory cannot be created.
pub fn ensure_data_dirs(data_dir: &Path) -> Result<PathBuf> {
    let static_dir = static_dir(data_dir);
    std::fs::create_dir_all(&static_dir)
        .map_err(|e| Error::io(e, &static_dir, "create data directory"))?;
    Ok(static_dir)
}
