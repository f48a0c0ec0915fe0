//! Layered configuration loader.
//!
//! Discovers configuration layers (system/user/project/etc), validates each
//! against the schema, merges them under optional locked requirements and
//! produces the effective `ScholarConfig`.

mod layer_io;
mod merge;
mod schema;

#[cfg(test)]
mod tests;

use crate::{ConfigError, ScholarConfig};
use log::{debug, info};
use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Default config filename in local layers.
const DEFAULT_CONFIG_FILE: &str = "scholar.json5";
/// Default config directory under user or repo roots.
const DEFAULT_CONFIG_DIR: &str = ".scholar";
/// Marker files/dirs that identify a project root.
const DEFAULT_PROJECT_ROOT_MARKERS: &[&str] = &[".git"];

#[cfg(unix)]
const SYSTEM_CONFIG_PATH: &str = "/etc/scholar/scholar.json5";
#[cfg(unix)]
const SYSTEM_REQUIREMENTS_PATH: &str = "/etc/scholar/requirements.json5";
#[cfg(windows)]
const SYSTEM_CONFIG_PATH: &str = "C:\\ProgramData\\scholar\\scholar.json5";
#[cfg(windows)]
const SYSTEM_REQUIREMENTS_PATH: &str = "C:\\ProgramData\\scholar\\requirements.json5";

/// Effective config plus metadata about which layers were loaded.
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    pub config: ScholarConfig,
    pub layers: Vec<ConfigLayer>,
}

/// Origin for a single config layer in the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLayerSource {
    /// Locked values; later layers cannot override them.
    Requirements,
    System,
    User,
    Project,
    Cwd,
    Repo,
    /// Explicit override files (highest precedence).
    Runtime,
}

impl ConfigLayerSource {
    fn label(self) -> &'static str {
        match self {
            ConfigLayerSource::Requirements => "requirements",
            ConfigLayerSource::System => "system",
            ConfigLayerSource::User => "user",
            ConfigLayerSource::Project => "project",
            ConfigLayerSource::Cwd => "cwd",
            ConfigLayerSource::Repo => "repo",
            ConfigLayerSource::Runtime => "runtime",
        }
    }
}

/// Metadata about a loaded config layer.
#[derive(Debug, Clone)]
pub struct ConfigLayer {
    pub source: ConfigLayerSource,
    pub path: PathBuf,
}

/// Options controlling layered config discovery and overrides.
#[derive(Debug, Clone)]
pub struct LayeredConfigOptions {
    /// Working directory used to resolve local layers.
    pub cwd: PathBuf,
    pub system_config_path: Option<PathBuf>,
    pub user_config_path: Option<PathBuf>,
    pub requirements_path: Option<PathBuf>,
    /// Override files applied last, in order.
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
            requirements_path: layer_io::default_requirements_path(),
            runtime_paths: Vec::new(),
            project_root_markers: DEFAULT_PROJECT_ROOT_MARKERS
                .iter()
                .map(|marker| marker.to_string())
                .collect(),
        }
    }

    /// Add a runtime override config path that is applied last.
    pub fn with_runtime_path(mut self, path: impl AsRef<Path>) -> Self {
        self.runtime_paths.push(path.as_ref().to_path_buf());
        self
    }
}

impl ScholarConfig {
    /// Load a single config file (no layering).
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        info!("loading config from path: {}", path.as_ref().display());
        let contents = fs::read_to_string(path)?;
        Self::load_from_str(&contents)
    }

    /// Load a single config from JSON5 contents (no layering).
    pub fn load_from_str(contents: &str) -> Result<Self, ConfigError> {
        debug!("loading config from raw contents (len={})", contents.len());
        let value: Value = json5::from_str(contents)?;
        config_from_value(value, "config")
    }

    /// Load a layered config stack using the default layer locations.
    pub fn load_layered(cwd: impl AsRef<Path>) -> Result<LayeredConfig, ConfigError> {
        Self::load_layered_with_options(LayeredConfigOptions::new(cwd))
    }

    /// Load a layered config stack using explicit layer locations.
    ///
    /// Precedence (low -> high): system, user, project, cwd, repo, runtime.
    /// Keys present in the requirements layer are locked to its values.
    pub fn load_layered_with_options(
        options: LayeredConfigOptions,
    ) -> Result<LayeredConfig, ConfigError> {
        let cwd = layer_io::normalize_path(&options.cwd)?;
        let mut layers = Vec::new();
        let mut stack = Vec::new();

        let requirements = match options.requirements_path.as_deref() {
            Some(path) => layer_io::read_layer(ConfigLayerSource::Requirements, path)?,
            None => None,
        };
        let locked = requirements.as_ref().map(|layer| layer.value.clone());
        if let Some(layer) = requirements {
            layers.push(layer.meta);
        }

        let mut candidates = Vec::new();
        if let Some(path) = options.system_config_path.clone() {
            candidates.push((ConfigLayerSource::System, path));
        }
        if let Some(path) = options.user_config_path.clone() {
            candidates.push((ConfigLayerSource::User, path));
        }
        let project_root = layer_io::find_project_root(&cwd, &options.project_root_markers);
        if let Some(root) = project_root.as_ref() {
            debug!("resolved project root: {}", root.display());
            candidates.push((ConfigLayerSource::Project, root.join(DEFAULT_CONFIG_FILE)));
        }
        candidates.push((ConfigLayerSource::Cwd, cwd.join(DEFAULT_CONFIG_FILE)));
        if let Some(root) = project_root.as_ref() {
            candidates.push((
                ConfigLayerSource::Repo,
                root.join(DEFAULT_CONFIG_DIR).join(DEFAULT_CONFIG_FILE),
            ));
        }

        let mut seen = HashSet::new();
        for (source, path) in candidates {
            if !seen.insert(layer_io::unique_path(&path)) {
                debug!(
                    "skipping duplicate layer (source={:?}, path={})",
                    source,
                    path.display()
                );
                continue;
            }
            if let Some(layer) = layer_io::read_layer(source, &path)? {
                layers.push(layer.meta.clone());
                stack.push(layer);
            }
        }

        for path in &options.runtime_paths {
            let layer = layer_io::read_layer(ConfigLayerSource::Runtime, path)?
                .ok_or_else(|| {
                    ConfigError::ReadFailed(std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        format!("runtime config not found: {}", path.display()),
                    ))
                })?;
            layers.push(layer.meta.clone());
            stack.push(layer);
        }

        let mut merged = locked
            .clone()
            .unwrap_or_else(|| Value::Object(serde_json::Map::new()));
        for layer in stack {
            merge::overlay(&mut merged, &layer.value, locked.as_ref());
        }

        let config = config_from_value(merged, "effective")?;
        info!("layered config loaded (layers={})", layers.len());
        Ok(LayeredConfig { config, layers })
    }

    /// Validate ranges that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let matching = &self.memory.matching;
        if matching.prefix_chars == 0 {
            return Err(ConfigError::OutOfRange {
                field: "memory.matching.prefix_chars",
                value: matching.prefix_chars.to_string(),
                expected: ">= 1",
            });
        }
        if !(matching.overlap_ratio > 0.0 && matching.overlap_ratio <= 1.0) {
            return Err(ConfigError::OutOfRange {
                field: "memory.matching.overlap_ratio",
                value: matching.overlap_ratio.to_string(),
                expected: "(0, 1]",
            });
        }
        if !(-1.0..=1.0).contains(&matching.similarity_threshold) {
            return Err(ConfigError::OutOfRange {
                field: "memory.matching.similarity_threshold",
                value: matching.similarity_threshold.to_string(),
                expected: "[-1, 1]",
            });
        }
        if self.memory.recall.limit == 0 {
            return Err(ConfigError::OutOfRange {
                field: "memory.recall.limit",
                value: "0".to_string(),
                expected: ">= 1",
            });
        }
        if self.memory.summary.message_window == 0 {
            return Err(ConfigError::OutOfRange {
                field: "memory.summary.message_window",
                value: "0".to_string(),
                expected: ">= 1",
            });
        }
        Ok(())
    }
}

/// A config layer read from disk.
#[derive(Debug, Clone)]
struct LoadedLayer {
    meta: ConfigLayer,
    value: Value,
}

fn config_from_value(value: Value, label: &str) -> Result<ScholarConfig, ConfigError> {
    schema::validate_layer_schema(&value, label)?;
    let config: ScholarConfig = serde_json::from_value(value)?;
    config.validate()?;
    Ok(config)
}
