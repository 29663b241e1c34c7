//! Subcommand handlers and the line-to-keystroke translation.

use std::path::{Path, PathBuf};
use thiserror::Error;

use super::args::ConfigAction;
use crate::config::{default_path, Config, ConfigError};

/// The byte an Enter key sends to a terminal.
pub const ENTER: u8 = b'\r';

const CONFIG_HEADER: &str = "# touchterm configuration\n\
# [shell] command overrides $SHELL, e.g. command = \"/bin/bash\"\n\n";

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Config file already exists: {}", .0.display())]
    AlreadyExists(PathBuf),
    #[error("Failed to write config file '{}': {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Handle config subcommand actions.
pub fn handle_config_action(action: ConfigAction, path: Option<&Path>) -> Result<(), CommandError> {
    match action {
        ConfigAction::Show => {
            let config_path = path.map(Path::to_path_buf).unwrap_or_else(default_path);
            let config = Config::load(path)?;

            if config_path.exists() {
                println!("Config file: {} (exists)", config_path.display());
            } else {
                println!("Config file: {} (not found, using defaults)", config_path.display());
            }
            println!();
            print!("{}", config.to_toml()?);
        }
        ConfigAction::Init => {
            let config_path = path.map(Path::to_path_buf).unwrap_or_else(default_path);
            write_default_config(&config_path)?;
            println!("Created config file: {}", config_path.display());
        }
    }
    Ok(())
}

/// Write the default configuration to `path`, refusing to overwrite.
pub fn write_default_config(path: &Path) -> Result<(), CommandError> {
    if path.exists() {
        return Err(CommandError::AlreadyExists(path.to_path_buf()));
    }

    let write_err = |source: std::io::Error| CommandError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(write_err)?;
    }

    let content = format!("{}{}", CONFIG_HEADER, Config::default().to_toml()?);
    std::fs::write(path, content).map_err(write_err)
}

/// Turn one line of input into the bytes a keyboard would send for it.
///
/// The line terminator is replaced with a single Enter byte, so an empty
/// line still submits a bare Enter.
pub fn line_to_command(line: &[u8]) -> Vec<u8> {
    let mut text = line.strip_suffix(b"\n").unwrap_or(line);
    text = text.strip_suffix(b"\r").unwrap_or(text);

    let mut command = Vec::with_capacity(text.len() + 1);
    command.extend_from_slice(text);
    command.push(ENTER);
    command
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_line_to_command() {
        assert_eq!(line_to_command(b"ls -la\n"), b"ls -la\r");
        assert_eq!(line_to_command(b"ls -la\r\n"), b"ls -la\r");
        assert_eq!(line_to_command(b"no newline"), b"no newline\r");
        assert_eq!(line_to_command(b"\n"), b"\r");
    }

    #[test]
    fn test_write_default_config_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        write_default_config(&path).expect("Should write config");
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("# touchterm configuration"));

        let loaded = Config::load(Some(&path)).expect("Should parse written config");
        assert_eq!(loaded, Config::default());
    }

    #[test]
    fn test_write_default_config_refuses_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[shell]\nterm = \"vt100\"\n").unwrap();

        let err = write_default_config(&path).unwrap_err();
        assert!(matches!(err, CommandError::AlreadyExists(_)));
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "[shell]\nterm = \"vt100\"\n"
        );
    }

    #[test]
    fn test_show_with_missing_explicit_path_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.toml");
        let err = handle_config_action(ConfigAction::Show, Some(&path)).unwrap_err();
        assert!(matches!(err, CommandError::Config(ConfigError::Io { .. })));
    }
}
