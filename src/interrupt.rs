//! Interrupt propagation into the shell's process tree.
//!
//! Any thread may request an interrupt; the session loop consumes the request
//! at the top of its next iteration and signals whatever is running under the
//! shell at that moment, then the shell itself.

use std::io;
use std::process::Command;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::pty::{Backend, Pid};

/// Cloneable handle to the session's "interrupt requested" flag.
#[derive(Debug, Clone, Default)]
pub struct InterruptHandle {
    requested: Arc<AtomicBool>,
}

impl InterruptHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the session to interrupt the foreground command.
    ///
    /// Never blocks, so it is safe to call from a signal-handling thread.
    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    /// Whether a request is waiting to be consumed.
    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// Consume a pending request.
    pub(crate) fn take(&self) -> bool {
        self.requested.swap(false, Ordering::SeqCst)
    }
}

/// Send SIGINT to every direct child of `shell`, then to `shell` itself.
///
/// Delivery is best-effort: a child that exits between enumeration and
/// signalling, or a failed process-table query, is logged and skipped.
/// Returns the children that were signalled.
pub fn interrupt_shell<B: Backend>(backend: &B, shell: Pid) -> Vec<Pid> {
    let children = match backend.children(shell) {
        Ok(children) => children,
        Err(e) => {
            log::debug!("Could not list children of {}: {}", shell, e);
            Vec::new()
        }
    };

    let mut signalled = Vec::with_capacity(children.len());
    for child in children {
        match backend.interrupt(child) {
            Ok(()) => signalled.push(child),
            Err(e) => log::debug!("Could not interrupt child {}: {}", child, e),
        }
    }

    if let Err(e) = backend.interrupt(shell) {
        log::debug!("Could not interrupt shell {}: {}", shell, e);
    }

    log::info!(
        "Interrupted shell {} and {} child process(es)",
        shell,
        signalled.len()
    );
    signalled
}

/// Direct children of `parent`, queried from the live process table.
///
/// Reads `/proc` where available and falls back to `pgrep -P`.
pub fn direct_children(parent: Pid) -> io::Result<Vec<Pid>> {
    match std::fs::read_dir("/proc") {
        Ok(entries) => {
            let mut children = Vec::new();
            for entry in entries.flatten() {
                let Some(pid) = entry.file_name().to_str().and_then(|n| n.parse::<Pid>().ok()) else {
                    continue;
                };
                // Processes may vanish while we scan
                let Ok(stat) = std::fs::read_to_string(entry.path().join("stat")) else {
                    continue;
                };
                if parse_parent_pid(&stat) == Some(parent) {
                    children.push(pid);
                }
            }
            children.sort_unstable();
            Ok(children)
        }
        Err(_) => pgrep_children(parent),
    }
}

/// Extract the parent pid (fourth field) from a `/proc/<pid>/stat` line.
///
/// The command name in field two is parenthesised and may itself contain
/// spaces or parentheses, so parsing starts after its last `)`.
fn parse_parent_pid(stat: &str) -> Option<Pid> {
    let rest = &stat[stat.rfind(')')? + 1..];
    let mut fields = rest.split_whitespace();
    let _state = fields.next()?;
    fields.next()?.parse().ok()
}

fn pgrep_children(parent: Pid) -> io::Result<Vec<Pid>> {
    let output = Command::new("pgrep")
        .arg("-P")
        .arg(parent.to_string())
        .output()?;

    // pgrep exits 1 when nothing matched
    Ok(String::from_utf8_lossy(&output.stdout)
        .lines()
        .filter_map(|line| line.trim().parse().ok())
        .collect())
}
