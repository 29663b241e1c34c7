//! PTY module - spawns the user's shell on a pseudo-terminal
//!
//! # Structure
//!
//! - [`error`] - Error types for PTY setup
//! - [`size`] - Terminal geometry from pixel dimensions
//! - [`shell`] - Shell selection and invocation
//! - [`backend`] - Platform capability traits the session is written against
//! - `unix` - libc implementation of those traits

mod backend;
mod error;
mod shell;
mod size;
#[cfg(unix)]
mod unix;

pub use backend::{Backend, Pid, Readiness, ShellExit, ShellPty};
pub use error::PtyError;
pub use shell::{select_shell, ShellCommand, DEFAULT_TERM};
pub use size::{CellSize, PtySize};
#[cfg(unix)]
pub use unix::{UnixBackend, UnixPty};
