//! CLI argument parsing with clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Config;

/// Line-driven front end for a PTY shell session sized to a display
#[derive(Parser, Debug)]
#[command(name = "touchterm")]
#[command(version, about = "Shell session for an on-screen keyboard", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Shell to spawn (default: config file, then $SHELL)
    #[arg(short, long)]
    pub shell: Option<String>,

    /// Display width in pixels
    #[arg(long, default_value = "640")]
    pub width: u32,

    /// Display height in pixels
    #[arg(long, default_value = "480")]
    pub height: u32,

    /// Console to switch to graphics mode while the session runs (e.g. /dev/tty1)
    #[arg(long)]
    pub console: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Config file path
    #[arg(long, short)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigAction {
    /// Show current configuration
    Show,
    /// Create default config file
    Init,
}

impl Args {
    /// Layer command-line overrides on top of the loaded config.
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(shell) = &self.shell {
            config.shell.command = Some(shell.clone());
        }
    }
}
