//! Configuration for hackrepl.
//!
//! Settings come from `~/.hackrepl/config.toml`, then command line
//! overrides are merged on top field by field:
//!
//! ```toml
//! # Text placed after the user name in the prompt
//! prompt_delim = "> "
//!
//! # Name shown in the prompt (defaults to $USER)
//! username = "ada"
//!
//! # Printed once at startup; empty disables it
//! motd = "Welcome to the Hackable REPL"
//!
//! # Suppress non-essential output (errors are still shown)
//! verbose = false
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },


    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Shell configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Separator between user name and input
    pub prompt_delim: String,
    /// Name shown in the prompt
    pub username: String,
    /// Message of the day
    pub motd: String,
    /// When set, only forced output reaches the terminal
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            prompt_delim: "$ ".to_string(),
            username: default_username(),
            motd: "Welcome to the Hackable REPL".to_string(),
            verbose: false,
        }
    }
}

/// Caller-supplied values that replace config fields when present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub prompt_delim: Option<String>,
    pub username: Option<String>,
    pub motd: Option<String>,
    pub verbose: Option<bool>,
}

impl Config {
    /// Load `~/.hackrepl/config.toml`, falling back to defaults
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("{}; using defaults", e);
                Self::default()
            }
        }
    }

    /// Load from an explicit file
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Shallow merge: every `Some` in `overrides` wins
    pub fn merged(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(delim) = overrides.prompt_delim {
            self.prompt_delim = delim;
        }
        if let Some(username) = overrides.username {
            self.username = username;
        }
        if let Some(motd) = overrides.motd {
            self.motd = motd;
        }
        if let Some(verbose) = overrides.verbose {
            self.verbose = verbose;
        }
        self
    }

    /// Get config file path
    pub fn config_path() -> Option<PathBuf> {
        data_dir().map(|dir| dir.join("config.toml"))
    }
}

/// `~/.hackrepl`, created on first use
pub fn data_dir() -> Option<PathBuf> {
    let dir = home_dir()?.join(".hackrepl");
    if !dir.exists() {
        let _ = fs::create_dir_all(&dir);
    }
    Some(dir)
}

fn default_username() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "user".to_string())
}

// Get home directory
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
}
