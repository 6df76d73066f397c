//! Layered configuration loader.
//!
//! Discovers configuration layers (system/user/project/cwd/runtime), validates
//! each against the schema, merges them, and produces a final `MnemeConfig`.

mod layer_io;
mod merge;
mod schema;
mod utils;


use crate::{ConfigError, MnemeConfig};
use log::{debug, info};
use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Default config filename in local layers.
pub(crate) const DEFAULT_CONFIG_FILE: &str = "mneme.json5";
/// Default config directory under the user's home.
pub(crate) const DEFAULT_CONFIG_DIR: &str = ".mneme";
/// Marker files/dirs that identify a project root.
const DEFAULT_PROJECT_ROOT_MARKERS: &[&str] = &[".git"];

#[cfg(unix)]
/// Default system config path on Unix.
const SYSTEM_CONFIG_PATH: &str = "/etc/mneme/mneme.json5";

/// Effective config plus metadata about which layers were loaded.
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    /// The merged, validated config.
    pub config: MnemeConfig,
    /// Each layer that contributed, lowest precedence first.
    pub layers: Vec<ConfigLayer>,
}

/// Origin for a single config layer in the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLayerSource {
    /// System-wide configuration.
    System,
    /// User-specific configuration.
    User,
    /// Project root configuration.
    Project,
    /// Current working directory configuration.
    Cwd,
    /// Runtime overrides (highest precedence).
    Runtime,
}

/// Metadata about a loaded config layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigLayer {
    pub source: ConfigLayerSource,
    pub path: PathBuf,
}

/// Options controlling layered config discovery and overrides.
#[derive(Debug, Clone)]
pub struct LayeredConfigOptions {
    /// Working directory used to find local layers.
    pub cwd: PathBuf,
    /// Optional system config path (defaults to `/etc/mneme/mneme.json5` on Unix).
    pub system_config_path: Option<PathBuf>,
    /// Optional user config path (defaults to `~/.mneme/mneme.json5`).
    pub user_config_path: Option<PathBuf>,
    /// Runtime override config paths applied last; each must exist.
    pub runtime_paths: Vec<PathBuf>,
    /// Marker files/dirs used to detect the project root.
    pub project_root_markers: Vec<String>,
}

impl LayeredConfigOptions {
    /// Create options with default layer locations for the provided cwd.
    pub fn new(cwd: impl AsRef<Path>) -> Self {
        Self {
            cwd: cwd.as_ref().to_path_buf(),
            system_config_path: layer_io::default_system_config_path(),
            user_config_path: layer_io::default_user_config_path(),
            runtime_paths: Vec::new(),
            project_root_markers: DEFAULT_PROJECT_ROOT_MARKERS
                .iter()
                .map(|marker| marker.to_string())
                .collect(),
        }
    }

    /// Options that only consult local and runtime layers.
    pub fn isolated(cwd: impl AsRef<Path>) -> Self {
        Self {
            system_config_path: None,
            user_config_path: None,
            ..Self::new(cwd)
        }
    }

    /// Add a runtime override config path that is applied last.
    pub fn with_runtime_path(mut self, path: impl AsRef<Path>) -> Self {
        self.runtime_paths.push(path.as_ref().to_path_buf());
        self
    }
}

impl MnemeConfig {
    /// Load a single config from a path (no layering).
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        info!("loading config from path: {}", path.as_ref().display());
        let contents = fs::read_to_string(path)?;
        let value: Value = json5::from_str(&contents)?;
        config_from_value(value, "config")
    }

    /// Load a single config from JSON5 contents (no layering).
    pub fn load_from_str(contents: &str) -> Result<Self, ConfigError> {
        debug!("loading config from raw contents (len={})", contents.len());
        let value: Value = json5::from_str(contents)?;
        config_from_value(value, "config")
    }

    /// Load a layered config stack using the default layer locations.
    pub fn load_layered(cwd: impl AsRef<Path>) -> Result<LayeredConfig, ConfigError> {
        info!(
            "loading layered config with defaults (cwd={})",
            cwd.as_ref().display()
        );
        Self::load_layered_with_options(LayeredConfigOptions::new(cwd))
    }

    /// Load a layered config stack using explicit layer locations and overrides.
    ///
    /// Layer precedence (low -> high): system, user, project, cwd, runtime.
    pub fn load_layered_with_options(
        options: LayeredConfigOptions,
    ) -> Result<LayeredConfig, ConfigError> {
        let cwd = utils::normalize_path(&options.cwd)?;
        debug!("normalized cwd for config load: {}", cwd.display());
        let mut loaded = Vec::new();
        let mut seen_paths = HashSet::new();

        for (source, path) in [
            (
                ConfigLayerSource::System,
                options.system_config_path.as_deref(),
            ),
            (ConfigLayerSource::User, options.user_config_path.as_deref()),
        ] {
            if let Some(path) = path {
                layer_io::push_if_present(source, path, &mut loaded, &mut seen_paths)?;
            }
        }

        match utils::find_project_root(&cwd, &options.project_root_markers) {
            Some(project_root) => {
                debug!("resolved project root: {}", project_root.display());
                layer_io::push_if_present(
                    ConfigLayerSource::Project,
                    &project_root.join(DEFAULT_CONFIG_FILE),
                    &mut loaded,
                    &mut seen_paths,
                )?;
            }
            None => debug!("project root not found; skipping project layer"),
        }

        layer_io::push_if_present(
            ConfigLayerSource::Cwd,
            &cwd.join(DEFAULT_CONFIG_FILE),
            &mut loaded,
            &mut seen_paths,
        )?;

        for runtime_path in &options.runtime_paths {
            let layer = layer_io::load_required_layer(ConfigLayerSource::Runtime, runtime_path)?;
            debug!("loaded runtime layer (path={})", runtime_path.display());
            loaded.push(layer);
        }

        let mut merged = Value::Object(serde_json::Map::new());
        for layer in &loaded {
            merge::merge_json_values(&mut merged, &layer.value);
        }

        let config = config_from_value(merged, "effective")?;
        let layers: Vec<ConfigLayer> = loaded.into_iter().map(|layer| layer.meta).collect();
        info!("layered config loaded (layers={})", layers.len());
        Ok(LayeredConfig { config, layers })
    }

    /// Validate configuration invariants that cannot be expressed in serde.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, threshold) in [
            ("retrieval.category_threshold", self.retrieval.category_threshold),
            ("retrieval.content_threshold", self.retrieval.content_threshold),
        ] {
            if threshold.is_nan() || !(0.0..=100.0).contains(&threshold) {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be within 0..=100 (got {threshold})"
                )));
            }
        }
        for (name, value) in [
            ("retrieval.default_limit", Some(self.retrieval.default_limit)),
            ("retrieval.search_window", self.retrieval.search_window),
            ("conversations.recent_limit", Some(self.conversations.recent_limit)),
        ] {
            if value == Some(0) {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be greater than zero"
                )));
            }
        }
        if self.retention.summary_category.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "retention.summary_category must not be empty".to_string(),
            ));
        }
        if self.storage.long_term_file.is_empty() || self.storage.short_term_file.is_empty() {
            return Err(ConfigError::Invalid(
                "storage file names must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Internal representation of a loaded config layer.
#[derive(Debug, Clone)]
struct LoadedLayer {
    meta: ConfigLayer,
    value: Value,
}

fn config_from_value(value: Value, label: &str) -> Result<MnemeConfig, ConfigError> {
    schema::validate_layer_schema(&value, label)?;
    let config: MnemeConfig = serde_json::from_value(value)?;
    config.validate()?;
    Ok(config)
}
