//! Platform process capability used by the session controller.
//!
//! The controller only talks to the operating system through these traits,
//! so the multiplex loop can be driven by a scripted fake in tests.

use std::io;
use std::time::Duration;

use super::error::PtyError;
use super::shell::ShellCommand;
use super::size::PtySize;

/// Process id as used by the platform's signal APIs.
pub type Pid = i32;

/// What a poll of the PTY master reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Readiness {
    pub readable: bool,
    pub writable: bool,
    /// The slave side was closed or the descriptor is in error
    pub hangup: bool,
}

/// How the shell process ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellExit {
    Exited(i32),
    /// Killed by a signal, with the signal's description
    Signaled(String),
}

impl ShellExit {
    /// Process exit code; a kill by signal reports 1.
    pub fn code(&self) -> i32 {
        match self {
            ShellExit::Exited(code) => *code,
            ShellExit::Signaled(_) => 1,
        }
    }
}

impl std::fmt::Display for ShellExit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShellExit::Exited(code) => write!(f, "exited with status {}", code),
            ShellExit::Signaled(signal) => write!(f, "killed by signal: {}", signal),
        }
    }
}

/// A shell running on the slave side of a PTY, seen from the master side.
pub trait ShellPty: Send {
    /// Process id of the shell
    fn pid(&self) -> Pid;

    /// Wait up to `timeout` for the master to become readable or writable
    fn poll(&mut self, timeout: Duration) -> io::Result<Readiness>;

    /// Read available shell output
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Write input to the shell, returning how many bytes were accepted
    fn write(&mut self, data: &[u8]) -> io::Result<usize>;

    /// Reap the shell if it has exited, without blocking
    fn try_wait(&mut self) -> io::Result<Option<ShellExit>>;
}

/// Spawn-with-pty, list-children and send-interrupt primitives.
pub trait Backend: Send + 'static {
    type Pty: ShellPty + 'static;

    /// Allocate a PTY pair of `size` and start `command` on its slave side
    fn spawn_shell(&self, command: &ShellCommand, size: PtySize) -> Result<Self::Pty, PtyError>;

    /// Direct children of `pid`, read from the live process table
    fn children(&self, pid: Pid) -> io::Result<Vec<Pid>>;

    /// Deliver an interrupt (SIGINT) to `pid`
    fn interrupt(&self, pid: Pid) -> io::Result<()>;
}
