//! Configuration: engine and compiler settings loaded from
//! ~/.wiresynth/config.yaml.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Yaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },
}

/// Runtime engine settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSettings {
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    /// Number of polyphonic voices.
    #[serde(default = "default_voices")]
    pub voices: usize,
    /// Seed for noise sources.
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Frames per `generate` call when rendering offline.
    #[serde(default = "default_block_size")]
    pub block_size: usize,
}

fn default_sample_rate() -> u32 {
    44_100
}

fn default_voices() -> usize {
    5
}

fn default_seed() -> u64 {
    42
}

fn default_block_size() -> usize {
    128
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            voices: default_voices(),
            seed: default_seed(),
            block_size: default_block_size(),
        }
    }
}

/// Options for exporting a compiled structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileOptions {
    /// Drop source spans from the structure.
    #[serde(default = "enabled")]
    pub remove_spans: bool,
    /// Keep only canonical socket names in each object's mixes.
    #[serde(default = "enabled")]
    pub remove_aliases: bool,
}

fn enabled() -> bool {
    true
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            remove_spans: true,
            remove_aliases: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineSettings,
    #[serde(default)]
    pub compile: CompileOptions,
}

impl Config {
    /// Standard config location, if a home directory is known.
    pub fn default_path() -> Option<PathBuf> {
        Some(dirs::home_dir()?.join(".wiresynth").join("config.yaml"))
    }

    /// Load config from the standard path (~/.wiresynth/config.yaml).
    /// Returns None if the file doesn't exist or can't be parsed.
    pub fn load() -> Option<Self> {
        let path = Self::default_path()?;
        if !path.exists() {
            return None;
        }
        match Self::load_from(&path) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!("{e}; using defaults");
                None
            }
        }
    }

    /// Load config from `path`, reporting any problem.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.engine.sample_rate, 44_100);
        assert_eq!(config.engine.voices, 5);
        assert_eq!(config.engine.block_size, 128);
        assert!(config.compile.remove_spans);
        assert!(config.compile.remove_aliases);
    }

    #[test]
    fn serialize_deserialize() {
        let config = Config::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let yaml = r#"
engine:
  voices: 8
compile:
  remove_spans: false
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.engine.voices, 8);
        assert_eq!(config.engine.sample_rate, 44_100);
        assert!(!config.compile.remove_spans);
        assert!(config.compile.remove_aliases);
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "engine:\n  sample_rate: 48000\n  seed: 7").unwrap();
        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.engine.sample_rate, 48_000);
        assert_eq!(config.engine.seed, 7);
    }

    #[test]
    fn load_from_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load_from(&dir.path().join("nope.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn load_from_invalid_yaml_is_yaml_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "engine: [not, a, map]").unwrap();
        let err = Config::load_from(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Yaml { .. }));
        assert!(err.to_string().starts_with("invalid config"));
    }

    #[test]
    fn load_missing_file_returns_none() {
        let _ = Config::load();
    }
}
