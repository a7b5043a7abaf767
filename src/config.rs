//! Configuration for muxterm.
//!
//! Settings are read from `~/.muxterm/config.toml`. A missing or invalid
//! file gives the defaults.
//!
//! ```toml
//! scrollback_limit = 10000
//! tab_width = 8
//! osc8 = true
//! log_level = "info"
//! # log_file = "/tmp/muxterm.log"
//!
//! [terminal]
//! answerback = "\u001b[?62;22c"
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::core::term::TerminalOptions;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Failed to write config {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Could not determine home directory")]
    NoHome,
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Main configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Rows kept in the primary scrollback
    pub scrollback_limit: usize,
    /// Initial tab stop interval
    pub tab_width: u16,
    /// Keep OSC 8 hyperlinks on cells
    pub osc8: bool,
    /// Log level: error, warn, info, debug, trace
    pub log_level: String,
    /// Log file, `~/.muxterm/muxterm.log` when unset
    pub log_file: Option<PathBuf>,
    pub terminal: TerminalConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scrollback_limit: 10000,
            tab_width: 8,
            osc8: true,
            log_level: "info".to_string(),
            log_file: None,
            terminal: TerminalConfig::default(),
        }
    }
}

/// Terminal identification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminalConfig {
    /// Primary device attributes reply
    pub answerback: String,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            answerback: "\x1b[?62;22c".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        Self::load_from(&path).unwrap_or_else(|e| {
            warn!("{}; using defaults", e);
            Self::default()
        })
    }

    /// Load configuration from `path`
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path().ok_or(ConfigError::NoHome)?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(write_err)?;
        }
        fs::write(path, content).map_err(write_err)
    }

    /// `~/.muxterm`
    pub fn config_dir() -> Option<PathBuf> {
        home_dir().map(|home| home.join(".muxterm"))
    }

    fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Log file path
    pub fn log_path(&self) -> Option<PathBuf> {
        self.log_file
            .clone()
            .or_else(|| Self::config_dir().map(|dir| dir.join("muxterm.log")))
    }

    /// Engine options
    pub fn terminal_options(&self) -> TerminalOptions {
        TerminalOptions {
            scrollback_limit: self.scrollback_limit,
            tab_width: self.tab_width.max(1),
            hyperlinks: self.osc8,
            answerback: self.terminal.answerback.clone(),
        }
    }
}

// Get home directory
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("muxterm-test-{}", std::process::id()))
            .join(name)
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str("tab_width = 4\n[terminal]\n").unwrap();
        assert_eq!(config.tab_width, 4);
        assert_eq!(config.scrollback_limit, 10000);
        assert!(config.osc8);
        assert_eq!(config.terminal.answerback, "\x1b[?62;22c");
    }

    #[test]
    fn test_terminal_options() {
        let config = Config {
            scrollback_limit: 50,
            tab_width: 0,
            osc8: false,
            ..Config::default()
        };
        let options = config.terminal_options();
        assert_eq!(options.scrollback_limit, 50);
        assert_eq!(options.tab_width, 1);
        assert!(!options.hyperlinks);
    }

    #[test]
    fn test_save_and_load() {
        let path = temp_path("saved.toml");
        let config = Config {
            log_level: "debug".into(),
            log_file: Some(PathBuf::from("/tmp/mt.log")),
            ..Config::default()
        };
        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), config);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_errors() {
        let missing = temp_path("missing.toml");
        assert!(matches!(
            Config::load_from(&missing),
            Err(ConfigError::Read { .. })
        ));

        let bad = temp_path("bad.toml");
        fs::create_dir_all(bad.parent().unwrap()).unwrap();
        fs::write(&bad, "tab_width = \"wide\"").unwrap();
        assert!(matches!(Config::load_from(&bad), Err(ConfigError::Parse(_))));
        let _ = fs::remove_file(&bad);
    }
}
