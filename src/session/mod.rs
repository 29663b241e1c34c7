//! A single shell session driven by an on-screen keyboard.
//!
//! [`Session::prepare`] sizes a PTY to the display, starts the user's login
//! shell on it and hands the PTY to a background loop. The UI thread then
//! talks to the shell only through the session handle:
//!
//! - [`Session::submit_command`] stages a command for the loop to send,
//! - [`Session::poll_output`] takes the latest shell output, with the echo
//!   of the last command removed,
//! - [`Session::request_interrupt`] interrupts whatever the shell is running.

mod controller;
#[cfg(test)]
mod fake;
mod staging;

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use thiserror::Error;

use crate::interrupt::InterruptHandle;
use crate::pty::{
    select_shell, Backend, CellSize, Pid, PtyError, PtySize, ShellCommand, ShellExit, ShellPty,
    DEFAULT_TERM,
};
use controller::{Controller, Shared};

pub use staging::SubmitError;

/// Parameters for starting a session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOptions {
    /// Shell path; `$SHELL` when unset
    pub shell: Option<String>,
    pub term: String,
    pub cell: CellSize,
    /// Longest command accepted by `submit_command`
    pub max_command_len: usize,
    /// Most bytes taken from the PTY per read
    pub read_buffer_size: usize,
    pub poll_timeout: Duration,
    /// Pause between loop iterations, outside the lock
    pub idle_sleep: Duration,
    /// Shortest post-echo remainder that counts as real output
    pub echo_min_remainder: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            shell: None,
            term: DEFAULT_TERM.to_string(),
            cell: CellSize::default(),
            max_command_len: 1024,
            read_buffer_size: 4096,
            poll_timeout: Duration::from_millis(10),
            idle_sleep: Duration::from_micros(100),
            echo_min_remainder: 3,
        }
    }
}

/// Errors that prevent a session from starting.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Pty(#[from] PtyError),
    #[error("failed to start session thread: {0}")]
    Thread(#[source] std::io::Error),
}

/// Handle to the running shell session.
pub struct Session {
    shared: Arc<Shared>,
    pid: Pid,
    geometry: PtySize,
    max_command_len: usize,
    _thread: JoinHandle<()>,
}

impl Session {
    /// Start the user's shell on a PTY sized for a `width_px` x `height_px`
    /// display and launch the session loop.
    #[cfg(unix)]
    pub fn prepare(options: &SessionOptions, width_px: u32, height_px: u32) -> Result<Self, SessionError> {
        Self::prepare_with(crate::pty::UnixBackend, options, width_px, height_px)
    }

    /// Like [`Session::prepare`], with an explicit platform backend.
    pub fn prepare_with<B: Backend>(
        backend: B,
        options: &SessionOptions,
        width_px: u32,
        height_px: u32,
    ) -> Result<Self, SessionError> {
        let geometry = PtySize::from_pixels(width_px, height_px, options.cell)?;
        let shell = select_shell(options.shell.as_deref()).ok_or(PtyError::MissingShell)?;
        let command = ShellCommand::login(shell, options.term.clone());

        let pty = backend.spawn_shell(&command, geometry)?;
        let pid = pty.pid();

        let shared = Arc::new(Shared::default());
        let controller = Controller::new(backend, pty, Arc::clone(&shared), options);
        let thread = thread::Builder::new()
            .name("pty-session".to_string())
            .spawn(move || controller.run())
            .map_err(SessionError::Thread)?;

        log::info!(
            "Session started: {} (pid {}), {}x{} cells",
            command.program,
            pid,
            geometry.cols,
            geometry.rows
        );

        Ok(Self {
            shared,
            pid,
            geometry,
            max_command_len: options.max_command_len,
            _thread: thread,
        })
    }

    /// Stage a command to be written to the shell.
    ///
    /// Only one command can wait at a time: while the previous one has not
    /// been sent yet, the new one is rejected with [`SubmitError::Pending`]
    /// and the pending one is left untouched. The text is sent as-is, so it
    /// should end with the byte the Enter key produces (`\r`).
    pub fn submit_command(&self, text: &[u8]) -> Result<(), SubmitError> {
        self.shared
            .staging
            .lock()
            .submit(text, self.max_command_len)
    }

    /// Interrupt the foreground command within one loop iteration.
    pub fn request_interrupt(&self) {
        self.shared.interrupt.request();
    }

    /// A handle that can request interrupts from another thread.
    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.shared.interrupt.clone()
    }

    /// Take new shell output, if any.
    ///
    /// Returns `Some` once per chunk; the loop reads nothing further from the
    /// shell until the chunk has been taken.
    pub fn poll_output(&self) -> Option<Vec<u8>> {
        self.shared.staging.lock().output.take()
    }

    /// Process id of the shell.
    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// Terminal size the shell was started with.
    pub fn geometry(&self) -> PtySize {
        self.geometry
    }

    /// How the shell ended, once it has.
    pub fn exit_status(&self) -> Option<ShellExit> {
        self.shared.staging.lock().exit.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::fake::{FakeBackend, FAKE_SHELL_PID};
    use std::time::Instant;

    fn options() -> SessionOptions {
        SessionOptions {
            shell: Some("/bin/fake-sh".to_string()),
            idle_sleep: Duration::from_millis(1),
            ..SessionOptions::default()
        }
    }

    fn wait_for<F: FnMut() -> bool>(mut condition: F) -> bool {
        let start = Instant::now();
        while start.elapsed() < Duration::from_secs(2) {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(2));
        }
        false
    }

    #[test]
    fn test_prepare_sizes_pty_from_pixels() {
        let backend = FakeBackend::default();
        let session = Session::prepare_with(backend.clone(), &options(), 256, 512).expect("Should start");

        assert_eq!(session.geometry().cols, 32);
        assert_eq!(session.geometry().rows, 32);
        assert_eq!(session.pid(), FAKE_SHELL_PID);

        let (command, size) = backend.state.lock().spawned.clone().expect("Should spawn");
        assert_eq!(command, ShellCommand::login("/bin/fake-sh", "xterm"));
        assert_eq!((size.cols, size.rows), (32, 32));
    }

    #[test]
    fn test_prepare_rejects_tiny_display() {
        let backend = FakeBackend::default();
        let result = Session::prepare_with(backend.clone(), &options(), 4, 4);
        assert!(matches!(
            result,
            Err(SessionError::Pty(PtyError::GeometryTooSmall { .. }))
        ));
        assert!(backend.state.lock().spawned.is_none());
    }

    #[test]
    fn test_prepare_reports_spawn_failure() {
        let backend = FakeBackend::default();
        backend.state.lock().fail_spawn = true;
        let result = Session::prepare_with(backend, &options(), 640, 480);
        assert!(matches!(result, Err(SessionError::Pty(PtyError::SpawnFailed(_)))));
    }

    #[test]
    fn test_round_trip_through_loop() {
        let backend = FakeBackend::default();
        let session = Session::prepare_with(backend.clone(), &options(), 640, 480).unwrap();

        session.submit_command(b"whoami\r").expect("Should accept");
        assert!(wait_for(|| backend.written() == b"whoami\r"));

        backend.push_read(b"whoami\r\nroot\r\n# ");
        let mut output = None;
        assert!(wait_for(|| {
            output = session.poll_output();
            output.is_some()
        }));
        assert_eq!(output.unwrap(), b"\nroot\r\n# ");
        assert_eq!(session.poll_output(), None);
    }

    #[test]
    fn test_rapid_second_submit_is_rejected() {
        let backend = FakeBackend::default();
        // Nothing is ever accepted, so the first command stays pending
        backend.state.lock().write_limit = Some(0);
        let session = Session::prepare_with(backend.clone(), &options(), 640, 480).unwrap();

        session.submit_command(b"first\r").unwrap();
        assert_eq!(session.submit_command(b"second\r"), Err(SubmitError::Pending));

        backend.state.lock().write_limit = None;
        assert!(wait_for(|| backend.written() == b"first\r"));
        assert!(wait_for(|| session.submit_command(b"second\r").is_ok()));
        assert!(wait_for(|| backend.written() == b"first\rsecond\r"));
    }

    #[test]
    fn test_interrupt_through_handle() {
        let backend = FakeBackend::default();
        backend.state.lock().children = vec![900];
        let session = Session::prepare_with(backend.clone(), &options(), 640, 480).unwrap();

        session.interrupt_handle().request();
        assert!(wait_for(|| backend.signals() == vec![900, FAKE_SHELL_PID]));
    }

    #[test]
    fn test_exit_status_recorded() {
        let backend = FakeBackend::default();
        let session = Session::prepare_with(backend.clone(), &options(), 640, 480).unwrap();
        assert_eq!(session.exit_status(), None);

        {
            let mut state = backend.state.lock();
            state.hangup = true;
            state.exit = Some(ShellExit::Exited(0));
        }
        assert!(wait_for(|| session.exit_status() == Some(ShellExit::Exited(0))));
    }
}
