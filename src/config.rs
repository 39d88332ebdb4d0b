//! Application configuration management.
//!
//! Settings are layered with figment, later layers winning:
//!
//! 1. Built-in defaults ([`Config::default`])
//! 2. A TOML file: `--config FILE`, or `config.toml` in the platform config
//!    directory when it exists
//! 3. `DUPSIFT_*` environment variables (e.g. `DUPSIFT_IO_THREADS=8`)
//! 4. Command-line flags, applied by the caller
//!
//! Call [`Config::validate`] after the last layer is applied.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::duplicates::{FinderConfig, RunMode, DEFAULT_IO_THREADS};
use crate::scanner::{
    WalkerConfig, DEFAULT_MAX_OPEN_HANDLES, DEFAULT_PIECE_COUNT, DEFAULT_PIECE_SIZE,
};

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "DUPSIFT_";

/// Errors raised while loading or validating configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// An explicitly named config file does not exist.
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// A layer could not be parsed or had the wrong type.
    #[error("Invalid configuration: {0}")]
    Invalid(#[from] figment::Error),

    /// A setting is out of range.
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue {
        /// Setting name
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },

    /// Mode flags that cannot be combined.
    #[error("Invalid option combination: {0}")]
    InvalidCombination(String),
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Ignore files smaller than this many bytes.
    pub min_size: u64,
    /// Piece size in bytes for the prefix stage.
    pub piece_size: u64,
    /// Number of leading pieces hashed by the prefix stage.
    pub piece_count: u64,
    /// Worker threads per hashing stage.
    pub io_threads: usize,
    /// Handles kept open between hashing stages.
    pub max_open_handles: usize,
    /// Follow symbolic links during traversal.
    pub follow_symlinks: bool,
    /// Stop traversal after this many entries.
    pub limit: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            min_size: 1,
            piece_size: DEFAULT_PIECE_SIZE,
            piece_count: DEFAULT_PIECE_COUNT,
            io_threads: DEFAULT_IO_THREADS,
            max_open_handles: DEFAULT_MAX_OPEN_HANDLES,
            follow_symlinks: false,
            limit: None,
        }
    }
}

impl Config {
    /// Load defaults, then the config file, then the environment.
    ///
    /// An explicit `path` must exist. Without one, the platform default file
    /// is used only if present.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotFound`] for a missing explicit file and
    /// [`ConfigError::Invalid`] when a layer cannot be extracted.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        match path {
            Some(path) => {
                if !path.is_file() {
                    return Err(ConfigError::NotFound(path.to_path_buf()));
                }
                log::debug!("Loading config from {}", path.display());
                figment = figment.merge(Toml::file(path));
            }
            None => {
                if let Some(default) = Self::default_path().filter(|p| p.is_file()) {
                    log::debug!("Loading config from {}", default.display());
                    figment = figment.merge(Toml::file(default));
                }
            }
        }

        let config: Self = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;
        Ok(config)
    }

    /// Platform-specific config file location.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "dupsift", "dupsift")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Reject settings the pipeline cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the first bad setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let zero = |field| ConfigError::InvalidValue {
            field,
            reason: "must be at least 1".to_string(),
        };
        if self.piece_size == 0 {
            return Err(zero("piece_size"));
        }
        if self.piece_count == 0 {
            return Err(zero("piece_count"));
        }
        if self.io_threads == 0 {
            return Err(zero("io_threads"));
        }
        Ok(())
    }

    /// Finder settings for this configuration and mode.
    #[must_use]
    pub fn finder_config(&self, mode: RunMode) -> FinderConfig {
        FinderConfig::default()
            .with_io_threads(self.io_threads)
            .with_min_size(self.min_size)
            .with_pieces(self.piece_size, self.piece_count)
            .with_max_open_handles(self.max_open_handles)
            .with_mode(mode)
            .with_walker_config(WalkerConfig::new(self.follow_symlinks, self.limit))
    }
}
