// src/config/loader.rs
//! Configuration loader: defaults, layered TOML files, environment overrides

use crate::config::{constants::paths, SystemConfig};
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Default prefix for environment overrides
pub const DEFAULT_ENV_PREFIX: &str = "EMG_LE_";

/// Separates section and key in override variable names
const ENV_SECTION_SEPARATOR: &str = "__";

/// Configuration loader with layered sources
pub struct ConfigLoader {
    config_paths: Vec<PathBuf>,
    env_prefix: String,
    current_config: Arc<RwLock<SystemConfig>>,
    loaded_from: Vec<PathBuf>,
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found: {0}")]
    NotFound(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {message}")]
    Parse { path: String, message: String },

    #[error("failed to serialize configuration: {0}")]
    Serialize(String),

    #[error("configuration validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
}

impl ConfigLoader {
    /// Loader searching the standard locations
    pub fn new() -> Self {
        Self::with_paths(Self::discover_config_paths())
    }

    /// Loader over explicit files, later files overriding earlier ones
    pub fn with_paths(paths: Vec<PathBuf>) -> Self {
        Self {
            config_paths: paths,
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
            current_config: Arc::new(RwLock::new(SystemConfig::default())),
            loaded_from: Vec::new(),
        }
    }

    /// Use a different environment override prefix
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Load one file that must exist, without discovery or env overrides
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<SystemConfig, ConfigError> {
        let path = path.as_ref();
        let value = Self::read_toml(path)?;
        let config = Self::deserialize(value, path)?;
        config.validate_consistency().map_err(ConfigError::Validation)?;
        Ok(config)
    }

    /// Load system configuration with validation
    pub fn load_system_config(&mut self) -> Result<SystemConfig, ConfigError> {
        let config = self.load_and_merge_configs()?;
        config.validate_consistency().map_err(ConfigError::Validation)?;

        *self.current_config.write() = config.clone();

        if self.loaded_from.is_empty() {
            tracing::info!("no configuration file found, using defaults");
        } else {
            tracing::info!(files = ?self.loaded_from, "configuration loaded");
        }
        Ok(config)
    }

    /// Get current configuration
    pub fn get_current_config(&self) -> SystemConfig {
        self.current_config.read().clone()
    }

    /// Shared handle to the configuration last loaded
    pub fn shared_config(&self) -> Arc<RwLock<SystemConfig>> {
        Arc::clone(&self.current_config)
    }

    /// Files merged by the last successful load
    pub fn loaded_from(&self) -> &[PathBuf] {
        &self.loaded_from
    }

    pub fn config_paths(&self) -> &[PathBuf] {
        &self.config_paths
    }

    /// Validate configuration without loading
    pub fn validate_config_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        Self::load_file(path).map(|_| ())
    }

    /// Export current configuration to file
    pub fn export_config<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let config = self.get_current_config();
        let toml_content =
            toml::to_string_pretty(&config).map_err(|e| ConfigError::Serialize(e.to_string()))?;

        std::fs::write(path, toml_content).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })
    }

    fn load_and_merge_configs(&mut self) -> Result<SystemConfig, ConfigError> {
        let mut merged_config = toml::Value::try_from(&SystemConfig::default())
            .map_err(|e| ConfigError::Serialize(e.to_string()))?;

        let mut loaded_from = Vec::new();
        for config_path in &self.config_paths {
            if !config_path.exists() {
                continue;
            }
            let file_config = Self::read_toml(config_path)?;
            Self::merge_toml_values(&mut merged_config, file_config);
            loaded_from.push(config_path.clone());
        }

        self.apply_environment_overrides(&mut merged_config, std::env::vars());

        let source = loaded_from
            .last()
            .cloned()
            .unwrap_or_else(|| PathBuf::from("<defaults>"));
        let config = Self::deserialize(merged_config, &source)?;
        self.loaded_from = loaded_from;
        Ok(config)
    }

    fn read_toml(path: &Path) -> Result<toml::Value, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    fn deserialize(value: toml::Value, source: &Path) -> Result<SystemConfig, ConfigError> {
        value.try_into().map_err(|e: toml::de::Error| ConfigError::Parse {
            path: source.display().to_string(),
            message: e.to_string(),
        })
    }

    fn merge_toml_values(base: &mut toml::Value, overlay: toml::Value) {
        match (base, overlay) {
            (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
                for (key, value) in overlay_table {
                    match base_table.get_mut(&key) {
                        // Tagged enums are replaced wholesale so stale
                        // variant fields do not leak into the new variant
                        Some(base_value) if !Self::is_tagged(&value) => {
                            Self::merge_toml_values(base_value, value)
                        }
                        _ => {
                            base_table.insert(key, value);
                        }
                    }
                }
            }
            (base_value, overlay_value) => {
                *base_value = overlay_value;
            }
        }
    }

    fn is_tagged(value: &toml::Value) -> bool {
        value.as_table().is_some_and(|t| t.contains_key("kind"))
    }

    /// Apply `PREFIX_SECTION__KEY=value` overrides
    fn apply_environment_overrides(
        &self,
        config: &mut toml::Value,
        vars: impl Iterator<Item = (String, String)>,
    ) {
        for (key, value) in vars {
            let Some(rest) = key.strip_prefix(&self.env_prefix) else {
                continue;
            };
            let Some((section, field)) = rest.split_once(ENV_SECTION_SEPARATOR) else {
                continue;
            };

            let section = section.to_lowercase();
            let field = field.to_lowercase();
            let Some(table) = config
                .as_table_mut()
                .and_then(|root| root.get_mut(&section))
                .and_then(|s| s.as_table_mut())
            else {
                tracing::warn!(variable = %key, "ignoring override for unknown section");
                continue;
            };

            tracing::debug!(variable = %key, "applying environment override");
            table.insert(field, Self::parse_env_value(&value));
        }
    }

    fn parse_env_value(value: &str) -> toml::Value {
        if let Ok(int_val) = value.parse::<i64>() {
            toml::Value::Integer(int_val)
        } else if let Ok(float_val) = value.parse::<f64>() {
            toml::Value::Float(float_val)
        } else if let Ok(bool_val) = value.parse::<bool>() {
            toml::Value::Boolean(bool_val)
        } else {
            toml::Value::String(value.to_string())
        }
    }

    fn discover_config_paths() -> Vec<PathBuf> {
        let mut found: Vec<PathBuf> = paths::CONFIG_SEARCH_DIRS
            .iter()
            .map(|dir| Path::new(dir).join(paths::CONFIG_FILE_NAME))
            .collect();

        // Explicit file wins over the search directories
        if let Some(explicit) = std::env::var_os(paths::CONFIG_ENV_VAR) {
            found.push(PathBuf::from(explicit));
        }

        found
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
