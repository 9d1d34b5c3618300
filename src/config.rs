//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/vertree/vertree.toml`
//! 3. Local config: a file passed by the caller
//! 4. Environment variables: `VERTREE__*` prefix

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{TreeError, TreeResult};

/// Buffer growth when an append does not fit the current capacity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SequenceSettings {
    /// Smallest capacity of a reallocated buffer
    pub min_capacity: usize,
    /// Capacity multiplier applied on reallocation
    pub growth_factor: usize,
}

impl Default for SequenceSettings {
    fn default() -> Self {
        Self {
            min_capacity: 4,
            growth_factor: 2,
        }
    }
}

/// Raw sequence settings (fields are Option to detect "not specified").
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSequenceSettings {
    pub min_capacity: Option<usize>,
    pub growth_factor: Option<usize>,
}

/// Raw settings for intermediate parsing.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub sequence: RawSequenceSettings,
}

/// Unified configuration for vertree.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Sequence buffer growth
    pub sequence: SequenceSettings,
}

/// Get the XDG config directory for vertree.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "vertree").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("vertree.toml"))
}

fn config_err(e: ConfigError) -> TreeError {
    TreeError::Config {
        message: e.to_string(),
    }
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> TreeResult<RawSettings> {
    let content = std::fs::read_to_string(path).map_err(|e| TreeError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| TreeError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    /// Overlay wins where it specifies a value.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            sequence: SequenceSettings {
                min_capacity: overlay
                    .sequence
                    .min_capacity
                    .unwrap_or(self.sequence.min_capacity),
                growth_factor: overlay
                    .sequence
                    .growth_factor
                    .unwrap_or(self.sequence.growth_factor),
            },
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `local` - Optional config file layered over the global one; a missing
    ///   file is an error, unlike the global config which is optional
    pub fn load(local: Option<&Path>) -> TreeResult<Self> {
        Self::load_from(global_config_path().as_deref(), local)
    }

    /// As [`Settings::load`] with an explicit global config path.
    pub fn load_from(global: Option<&Path>, local: Option<&Path>) -> TreeResult<Self> {
        let mut current = Self::default();

        if let Some(global_path) = global {
            if global_path.exists() {
                debug!(path = %global_path.display(), "loading global config");
                current = current.merge_with(&load_raw_settings(global_path)?);
            }
        }

        if let Some(local_path) = local {
            debug!(path = %local_path.display(), "loading local config");
            current = current.merge_with(&load_raw_settings(local_path)?);
        }

        current = Self::apply_env_overrides(current)?;
        current.validate()?;
        Ok(current)
    }

    /// Apply VERTREE__* environment variables as explicit overrides.
    ///
    /// Unset variables are skipped; a value of the wrong type is an error.
    fn apply_env_overrides(mut settings: Self) -> TreeResult<Self> {
        let config = Config::builder()
            .add_source(Environment::with_prefix("VERTREE").separator("__"))
            .build()
            .map_err(config_err)?;

        if let Some(val) = env_override(config.get_int("sequence.min_capacity"))? {
            settings.sequence.min_capacity = to_usize("sequence.min_capacity", val)?;
        }
        if let Some(val) = env_override(config.get_int("sequence.growth_factor"))? {
            settings.sequence.growth_factor = to_usize("sequence.growth_factor", val)?;
        }

        Ok(settings)
    }

    pub fn validate(&self) -> TreeResult<()> {
        if self.sequence.growth_factor == 0 {
            return Err(TreeError::Config {
                message: "sequence.growth_factor must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Render as TOML, the format of the config files.
    pub fn to_toml(&self) -> TreeResult<String> {
        toml::to_string_pretty(self).map_err(|e| TreeError::Config {
            message: format!("serialize settings: {}", e),
        })
    }
}

fn env_override<T>(value: Result<T, ConfigError>) -> TreeResult<Option<T>> {
    match value {
        Ok(val) => Ok(Some(val)),
        Err(ConfigError::NotFound(_)) => Ok(None),
        Err(e) => Err(config_err(e)),
    }
}

fn to_usize(key: &str, value: i64) -> TreeResult<usize> {
    usize::try_from(value).map_err(|_| TreeError::Config {
        message: format!("{} must not be negative, got {}", key, value),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    // single test: the process environment is shared between test threads
    #[test]
    fn given_env_overrides_when_loading_then_env_wins_and_bad_values_fail() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("vertree.toml");
        std::fs::write(&path, "[sequence]\ngrowth_factor = 5\n").unwrap();

        env::set_var("VERTREE__SEQUENCE__GROWTH_FACTOR", "3");
        let loaded = Settings::load_from(None, Some(&path));
        env::remove_var("VERTREE__SEQUENCE__GROWTH_FACTOR");
        assert_eq!(loaded.unwrap().sequence.growth_factor, 3);

        env::set_var("VERTREE__SEQUENCE__MIN_CAPACITY", "-1");
        let loaded = Settings::load_from(None, None);
        env::remove_var("VERTREE__SEQUENCE__MIN_CAPACITY");
        assert!(matches!(loaded, Err(TreeError::Config { .. })));

        env::set_var("VERTREE__SEQUENCE__GROWTH_FACTOR", "abc");
        let loaded = Settings::load_from(None, Some(&path));
        env::remove_var("VERTREE__SEQUENCE__GROWTH_FACTOR");
        assert!(matches!(loaded, Err(TreeError::Config { .. })), "{:?}", loaded);

        let loaded = Settings::load_from(None, Some(&path)).unwrap();
        assert_eq!(loaded.sequence.growth_factor, 5, "unset variables leave the file value");
    }
}
