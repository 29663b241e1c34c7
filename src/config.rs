//! Configuration file handling for touchterm.
//!
//! Loads configuration from `<config dir>/touchterm/config.toml` or a custom path.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::pty::{CellSize, DEFAULT_TERM};
use crate::session::SessionOptions;

/// Configuration file structure for touchterm.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub shell: ShellConfig,
    #[serde(default)]
    pub font: FontConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ShellConfig {
    /// Overrides $SHELL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default = "default_term")]
    pub term: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FontConfig {
    #[serde(default = "default_cell_width")]
    pub cell_width: u32,
    #[serde(default = "default_cell_height")]
    pub cell_height: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SessionConfig {
    #[serde(default = "default_max_command_len")]
    pub max_command_len: usize,
    #[serde(default = "default_read_buffer_size")]
    pub read_buffer_size: usize,
    #[serde(default = "default_poll_timeout_ms")]
    pub poll_timeout_ms: u64,
    #[serde(default = "default_idle_sleep_us")]
    pub idle_sleep_us: u64,
    #[serde(default = "default_echo_min_remainder")]
    pub echo_min_remainder: usize,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DisplayConfig {
    #[serde(default = "default_max_transcript_len")]
    pub max_transcript_len: usize,
}

fn default_term() -> String {
    DEFAULT_TERM.to_string()
}

fn default_cell_width() -> u32 {
    CellSize::default().width
}

fn default_cell_height() -> u32 {
    CellSize::default().height
}

fn default_max_command_len() -> usize {
    SessionOptions::default().max_command_len
}

fn default_read_buffer_size() -> usize {
    SessionOptions::default().read_buffer_size
}

fn default_poll_timeout_ms() -> u64 {
    SessionOptions::default().poll_timeout.as_millis() as u64
}

fn default_idle_sleep_us() -> u64 {
    SessionOptions::default().idle_sleep.as_micros() as u64
}

fn default_echo_min_remainder() -> usize {
    SessionOptions::default().echo_min_remainder
}

fn default_max_transcript_len() -> usize {
    crate::terminal::DEFAULT_MAX_TRANSCRIPT_LEN
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            command: None,
            term: default_term(),
        }
    }
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            cell_width: default_cell_width(),
            cell_height: default_cell_height(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_command_len: default_max_command_len(),
            read_buffer_size: default_read_buffer_size(),
            poll_timeout_ms: default_poll_timeout_ms(),
            idle_sleep_us: default_idle_sleep_us(),
            echo_min_remainder: default_echo_min_remainder(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            max_transcript_len: default_max_transcript_len(),
        }
    }
}

impl Config {
    /// Load configuration from a file path.
    ///
    /// With no path, the default location is used and a missing file yields
    /// the default config. An explicit path must exist.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load_from(path),
            None => {
                let path = default_path();
                if path.exists() {
                    Self::load_from(&path)
                } else {
                    Ok(Config::default())
                }
            }
        }
    }

    fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Render as TOML, for `config show` and `config init`.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Session parameters described by this configuration.
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            shell: self.shell.command.clone(),
            term: self.shell.term.clone(),
            cell: CellSize {
                width: self.font.cell_width,
                height: self.font.cell_height,
            },
            max_command_len: self.session.max_command_len,
            read_buffer_size: self.session.read_buffer_size.max(1),
            poll_timeout: Duration::from_millis(self.session.poll_timeout_ms),
            idle_sleep: Duration::from_micros(self.session.idle_sleep_us),
            echo_min_remainder: self.session.echo_min_remainder,
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{}': {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Get the default config file path.
pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("touchterm").join("config.toml"))
        .unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".config/touchterm/config.toml")
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Should create temp file");
        file.write_all(content.as_bytes()).expect("Should write");
        file
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.shell.command, None);
        assert_eq!(config.shell.term, "xterm");
        assert_eq!(config.font.cell_width, 8);
        assert_eq!(config.font.cell_height, 16);
        assert_eq!(config.session.poll_timeout_ms, 10);
        assert_eq!(config.session.echo_min_remainder, 3);
    }

    #[test]
    fn test_load_partial_file_fills_defaults() {
        let file = write_config("[shell]\ncommand = \"/bin/sh\"\n\n[font]\ncell_width = 10\n");
        let config = Config::load(Some(file.path())).expect("Should parse");

        assert_eq!(config.shell.command.as_deref(), Some("/bin/sh"));
        assert_eq!(config.shell.term, "xterm");
        assert_eq!(config.font.cell_width, 10);
        assert_eq!(config.font.cell_height, 16);
        assert_eq!(config.session, SessionConfig::default());
    }

    #[test]
    fn test_load_explicit_missing_file_is_error() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let missing = dir.path().join("nope.toml");
        let err = Config::load(Some(&missing)).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("nope.toml"));
    }

    #[test]
    fn test_load_invalid_toml_is_error() {
        let file = write_config("[font]\ncell_width = \"wide\"\n");
        let err = Config::load(Some(file.path())).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_to_toml_roundtrips() {
        let mut config = Config::default();
        config.shell.command = Some("/bin/bash".to_string());
        let text = config.to_toml().expect("Should serialize");
        let parsed: Config = toml::from_str(&text).expect("Should parse back");
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_session_options_mapping() {
        let file = write_config(
            "[session]\npoll_timeout_ms = 20\nidle_sleep_us = 500\necho_min_remainder = 1\nread_buffer_size = 0\n",
        );
        let options = Config::load(Some(file.path())).unwrap().session_options();
        assert_eq!(options.poll_timeout, Duration::from_millis(20));
        assert_eq!(options.idle_sleep, Duration::from_micros(500));
        assert_eq!(options.echo_min_remainder, 1);
        assert_eq!(options.read_buffer_size, 1, "A zero-sized read buffer is bumped to one byte");
    }
}
