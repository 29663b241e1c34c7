//! The session's multiplex loop.
//!
//! One thread owns the PTY master and alternates between draining shell
//! output into the output buffer and sending staged commands. Every iteration
//! runs entirely under the session lock.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

use super::staging::Staging;
use super::SessionOptions;
use crate::escape::strip_escape_codes;
use crate::interrupt::{interrupt_shell, InterruptHandle};
use crate::pty::{Backend, Readiness, ShellPty};

/// State shared between the session handle and its loop.
#[derive(Debug, Default)]
pub(crate) struct Shared {
    pub(crate) staging: Mutex<Staging>,
    pub(crate) interrupt: InterruptHandle,
}

/// What one loop iteration did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step {
    Idle,
    /// Read shell output (published or discarded as echo)
    Read,
    /// Wrote (part of) a staged command
    Wrote,
    /// The shell has exited and been reaped
    ShellExited,
}

pub(crate) struct Controller<B: Backend> {
    backend: B,
    pty: B::Pty,
    shared: Arc<Shared>,
    scratch: Vec<u8>,
    poll_timeout: Duration,
    idle_sleep: Duration,
    echo_min_remainder: usize,
}

impl<B: Backend> Controller<B> {
    pub(crate) fn new(backend: B, pty: B::Pty, shared: Arc<Shared>, options: &SessionOptions) -> Self {
        Self {
            backend,
            pty,
            shared,
            scratch: vec![0; options.read_buffer_size.max(1)],
            poll_timeout: options.poll_timeout,
            idle_sleep: options.idle_sleep,
            echo_min_remainder: options.echo_min_remainder,
        }
    }

    /// Run until the shell exits.
    pub(crate) fn run(mut self) {
        log::debug!("Session loop started for shell {}", self.pty.pid());
        loop {
            if self.step() == Step::ShellExited {
                break;
            }
            std::thread::sleep(self.idle_sleep);
        }
        log::debug!("Session loop finished");
    }

    pub(crate) fn step(&mut self) -> Step {
        let shared = Arc::clone(&self.shared);
        let mut staging = shared.staging.lock();

        let ready = match self.pty.poll(self.poll_timeout) {
            Ok(ready) => ready,
            Err(e) => {
                log::trace!("PTY poll failed: {}", e);
                Readiness::default()
            }
        };

        // Interrupts never wait behind pending I/O
        if shared.interrupt.take() {
            interrupt_shell(&self.backend, self.pty.pid());
        }

        let mut step = Step::Idle;
        if ready.readable && !staging.output.needs_update() {
            if self.read_cycle(&mut staging) {
                step = Step::Read;
            }
        } else if ready.writable && staging.command.is_some() {
            self.write_cycle(&mut staging);
            step = Step::Wrote;
        }

        if ready.hangup && step == Step::Idle && !staging.output.needs_update() {
            match self.pty.try_wait() {
                Ok(Some(exit)) => {
                    log::info!("Shell {} exited: {:?}", self.pty.pid(), exit);
                    staging.exit = Some(exit);
                    return Step::ShellExited;
                }
                Ok(None) => {}
                Err(e) => log::trace!("Could not check shell status: {}", e),
            }
        }

        step
    }

    /// Read one chunk and publish it, minus the echo of the last command.
    /// Returns false when nothing could be read.
    fn read_cycle(&mut self, staging: &mut Staging) -> bool {
        let n = match self.pty.read(&mut self.scratch) {
            Ok(0) => return false,
            Ok(n) => n,
            Err(e) => {
                log::trace!("PTY read failed: {}", e);
                return false;
            }
        };
        let data = &self.scratch[..n];

        // Each command's echo is matched at most once
        match staging.echo.take() {
            Some(echo) if !echo.is_empty() && data.starts_with(&echo) => {
                match suppress_echo(data, &echo, self.echo_min_remainder) {
                    Some(rest) => staging.output.publish(&rest),
                    None => log::trace!("Dropped {} byte echo", n),
                }
            }
            _ => staging.output.publish(data),
        }
        true
    }

    fn write_cycle(&mut self, staging: &mut Staging) {
        let Some(request) = staging.command.as_mut() else {
            return;
        };

        match self.pty.write(request.unsent()) {
            Ok(n) => request.advance(n),
            Err(e) => {
                log::debug!("PTY write failed, will retry: {}", e);
                return;
            }
        }

        if request.is_sent() {
            if let Some(request) = staging.command.take() {
                let text = request.into_text();
                log::debug!("Sent {} byte command", text.len());
                staging.echo = Some(text);
            }
        }
    }
}

/// Strip `data`, which starts with the shell's echo of `echo`, down to what
/// follows the echo. Remainders shorter than `min_remainder` bytes are echo
/// noise (typically the line ending) and yield `None`.
pub(crate) fn suppress_echo(data: &[u8], echo: &[u8], min_remainder: usize) -> Option<Vec<u8>> {
    let mut text = data.to_vec();
    strip_escape_codes(&mut text);

    let remainder = text.len().saturating_sub(echo.len());
    if remainder == 0 || remainder < min_remainder {
        return None;
    }

    text.drain(..echo.len());
    Some(text)
}
