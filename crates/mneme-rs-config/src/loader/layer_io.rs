//! IO helpers for reading config layers from disk.

use super::{ConfigLayer, ConfigLayerSource, DEFAULT_CONFIG_DIR, DEFAULT_CONFIG_FILE, LoadedLayer};
#[cfg(unix)]
use super::SYSTEM_CONFIG_PATH;
use super::{schema, utils};
use crate::ConfigError;
use directories::UserDirs;
use log::debug;
use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Load a layer if the path exists and was not already loaded under another source.
pub(super) fn push_if_present(
    source: ConfigLayerSource,
    path: &Path,
    loaded: &mut Vec<LoadedLayer>,
    seen_paths: &mut HashSet<PathBuf>,
) -> Result<(), ConfigError> {
    if !path.exists() {
        debug!(
            "skipping missing layer (source={:?}, path={})",
            source,
            path.display()
        );
        return Ok(());
    }
    if !seen_paths.insert(utils::unique_path(path)) {
        debug!(
            "skipping duplicate layer (source={:?}, path={})",
            source,
            path.display()
        );
        return Ok(());
    }
    loaded.push(load_required_layer(source, path)?);
    Ok(())
}

/// Load and validate a required layer from disk.
pub(super) fn load_required_layer(
    source: ConfigLayerSource,
    path: &Path,
) -> Result<LoadedLayer, ConfigError> {
    debug!(
        "loading config layer (source={:?}, path={})",
        source,
        path.display()
    );
    let contents = fs::read_to_string(path)?;
    let value: Value = json5::from_str(&contents)?;
    schema::validate_layer_schema(&value, &layer_label(source, path))?;
    Ok(LoadedLayer {
        meta: ConfigLayer {
            source,
            path: path.to_path_buf(),
        },
        value,
    })
}

/// Build a user-friendly label for schema validation errors.
pub(super) fn layer_label(source: ConfigLayerSource, path: &Path) -> String {
    let name = match source {
        ConfigLayerSource::System => "system",
        ConfigLayerSource::User => "user",
        ConfigLayerSource::Project => "project",
        ConfigLayerSource::Cwd => "cwd",
        ConfigLayerSource::Runtime => "runtime",
    };
    format!("{name}({})", path.display())
}

/// Default system config path on Unix; None elsewhere.
pub(super) fn default_system_config_path() -> Option<PathBuf> {
    #[cfg(unix)]
    {
        Some(PathBuf::from(SYSTEM_CONFIG_PATH))
    }
    #[cfg(not(unix))]
    {
        None
    }
}

/// Default user config path under the home directory.
pub(super) fn default_user_config_path() -> Option<PathBuf> {
    UserDirs::new().map(|dirs| {
        dirs.home_dir()
            .join(DEFAULT_CONFIG_DIR)
            .join(DEFAULT_CONFIG_FILE)
    })
}
