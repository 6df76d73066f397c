//! Path helpers for the config loader.

use crate::ConfigError;
use std::path::{Path, PathBuf};

/// Canonicalize when possible; a missing path is kept as given.
pub(super) fn normalize_path(path: &Path) -> Result<PathBuf, ConfigError> {
    match path.canonicalize() {
        Ok(path) => Ok(path),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(path.to_path_buf()),
        Err(err) => Err(ConfigError::ReadFailed(err)),
    }
}

/// Stable key used to load each file at most once.
pub(super) fn unique_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// Nearest ancestor of `cwd` (inclusive) containing any marker.
pub(super) fn find_project_root(cwd: &Path, markers: &[String]) -> Option<PathBuf> {
    cwd.ancestors()
        .find(|ancestor| markers.iter().any(|marker| ancestor.join(marker).exists()))
        .map(Path::to_path_buf)
}
