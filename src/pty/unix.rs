//! Native PTY backend - portable-pty for the PTY pair and child, libc for
//! readiness polling and signals.

use portable_pty::{native_pty_system, Child, ChildKiller, CommandBuilder, MasterPty};
use std::io::{self, Read, Write};
use std::os::fd::RawFd;
use std::time::Duration;

use super::backend::{Backend, Pid, Readiness, ShellExit, ShellPty};
use super::error::PtyError;
use super::shell::ShellCommand;
use super::size::PtySize;
use crate::interrupt;

/// Spawns shells on real pseudo-terminals and signals real processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnixBackend;

/// Master side of a PTY with the shell attached to its slave side.
pub struct UnixPty {
    /// The PTY master handle (kept so the pair stays open)
    master: Box<dyn MasterPty + Send>,
    /// Master descriptor used for readiness polling
    master_fd: RawFd,
    /// Child process handle
    child: Box<dyn Child + Send + Sync>,
    pid: Pid,
    /// Reader for shell output
    reader: Box<dyn Read + Send>,
    /// Writer for shell input
    writer: Box<dyn Write + Send>,
}

impl Backend for UnixBackend {
    type Pty = UnixPty;

    fn spawn_shell(&self, command: &ShellCommand, size: PtySize) -> Result<UnixPty, PtyError> {
        let pty_system = native_pty_system();

        let pair = pty_system
            .openpty(size.into())
            .map_err(|e| PtyError::PtyCreationFailed(e.into()))?;

        let mut cmd = CommandBuilder::new(&command.program);
        cmd.args(&command.args);
        cmd.env("TERM", &command.term);

        let mut child = pair
            .slave
            .spawn_command(cmd)
            .map_err(|e| PtyError::SpawnFailed(e.into()))?;
        // The slave end now belongs to the shell; closing ours lets the
        // master see a hangup once the shell is gone
        drop(pair.slave);

        let Some(pid) = child.process_id() else {
            let _ = child.kill();
            return Err(PtyError::SpawnFailed("shell has no process id".into()));
        };

        let master_fd = pair
            .master
            .as_raw_fd()
            .ok_or_else(|| PtyError::PtyCreationFailed("PTY master has no file descriptor".into()))?;

        let reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| PtyError::ReaderFailed(e.into()))?;

        let writer = pair
            .master
            .take_writer()
            .map_err(|e| PtyError::WriterFailed(e.into()))?;

        log::info!(
            "Spawned {} (pid {}) on a {}x{} PTY",
            command.program,
            pid,
            size.cols,
            size.rows
        );

        Ok(UnixPty {
            master: pair.master,
            master_fd,
            child,
            pid: pid as Pid,
            reader,
            writer,
        })
    }

    fn children(&self, pid: Pid) -> io::Result<Vec<Pid>> {
        interrupt::direct_children(pid)
    }

    fn interrupt(&self, pid: Pid) -> io::Result<()> {
        // SAFETY: kill has no memory-safety preconditions
        let rc = unsafe { libc::kill(pid, libc::SIGINT) };
        if rc == -1 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

impl UnixPty {
    /// Terminal size as the PTY currently reports it.
    pub fn size(&self) -> Result<PtySize, PtyError> {
        self.master
            .get_size()
            .map(PtySize::from)
            .map_err(|e| PtyError::Io(io::Error::new(io::ErrorKind::Other, e.to_string())))
    }
}

impl ShellPty for UnixPty {
    fn pid(&self) -> Pid {
        self.pid
    }

    fn poll(&mut self, timeout: Duration) -> io::Result<Readiness> {
        let mut pfd = libc::pollfd {
            fd: self.master_fd,
            events: libc::POLLIN | libc::POLLOUT,
            revents: 0,
        };
        let timeout_ms = i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX);

        // SAFETY: pfd is a valid pollfd for the duration of the call
        let rc = unsafe { libc::poll(&mut pfd, 1, timeout_ms) };
        if rc == -1 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(Readiness::default());
            }
            return Err(err);
        }

        Ok(Readiness {
            readable: pfd.revents & libc::POLLIN != 0,
            writable: pfd.revents & libc::POLLOUT != 0,
            hangup: pfd.revents & (libc::POLLHUP | libc::POLLERR) != 0,
        })
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let n = self.writer.write(data)?;
        self.writer.flush()?;
        Ok(n)
    }

    fn try_wait(&mut self) -> io::Result<Option<ShellExit>> {
        Ok(self.child.try_wait()?.map(|status| match status.signal() {
            Some(signal) => ShellExit::Signaled(signal.to_string()),
            None => ShellExit::Exited(status.exit_code() as i32),
        }))
    }
}
