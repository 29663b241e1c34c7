//! Scripted backend for driving the session loop in tests.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use crate::pty::{
    Backend, Pid, PtyError, PtySize, Readiness, ShellCommand, ShellExit, ShellPty,
};

pub(crate) const FAKE_SHELL_PID: Pid = 4242;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Event {
    Read(Vec<u8>),
    Write(Vec<u8>),
    Signal(Pid),
}

#[derive(Debug, Default)]
pub(crate) struct FakeState {
    /// Chunks the shell "prints", one per read call
    pub reads: VecDeque<Vec<u8>>,
    pub written: Vec<u8>,
    /// Accept at most this many bytes per write call
    pub write_limit: Option<usize>,
    pub children: Vec<Pid>,
    /// Pids whose signal delivery fails
    pub dead_pids: Vec<Pid>,
    pub events: Vec<Event>,
    pub hangup: bool,
    pub exit: Option<ShellExit>,
    pub spawned: Option<(ShellCommand, PtySize)>,
    pub fail_spawn: bool,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct FakeBackend {
    pub state: Arc<Mutex<FakeState>>,
}

pub(crate) struct FakePty {
    state: Arc<Mutex<FakeState>>,
}

impl FakeBackend {
    pub fn pty(&self) -> FakePty {
        FakePty {
            state: self.state.clone(),
        }
    }

    pub fn push_read(&self, data: &[u8]) {
        self.state.lock().reads.push_back(data.to_vec());
    }

    pub fn written(&self) -> Vec<u8> {
        self.state.lock().written.clone()
    }

    pub fn signals(&self) -> Vec<Pid> {
        self.state
            .lock()
            .events
            .iter()
            .filter_map(|e| match e {
                Event::Signal(pid) => Some(*pid),
                _ => None,
            })
            .collect()
    }

    pub fn events(&self) -> Vec<Event> {
        self.state.lock().events.clone()
    }
}

impl Backend for FakeBackend {
    type Pty = FakePty;

    fn spawn_shell(&self, command: &ShellCommand, size: PtySize) -> Result<FakePty, PtyError> {
        let mut state = self.state.lock();
        if state.fail_spawn {
            return Err(PtyError::SpawnFailed("no PTY devices left".into()));
        }
        state.spawned = Some((command.clone(), size));
        Ok(self.pty())
    }

    fn children(&self, _pid: Pid) -> io::Result<Vec<Pid>> {
        Ok(self.state.lock().children.clone())
    }

    fn interrupt(&self, pid: Pid) -> io::Result<()> {
        let mut state = self.state.lock();
        if state.dead_pids.contains(&pid) {
            return Err(io::Error::from_raw_os_error(3));
        }
        state.events.push(Event::Signal(pid));
        Ok(())
    }
}

impl ShellPty for FakePty {
    fn pid(&self) -> Pid {
        FAKE_SHELL_PID
    }

    fn poll(&mut self, _timeout: Duration) -> io::Result<Readiness> {
        let state = self.state.lock();
        Ok(Readiness {
            readable: !state.reads.is_empty(),
            writable: true,
            hangup: state.hangup,
        })
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.state.lock();
        let Some(mut chunk) = state.reads.pop_front() else {
            return Err(io::Error::from_raw_os_error(5));
        };
        let n = chunk.len().min(buf.len());
        buf[..n].copy_from_slice(&chunk[..n]);
        if n < chunk.len() {
            let rest = chunk.split_off(n);
            state.reads.push_front(rest);
        }
        state.events.push(Event::Read(chunk));
        Ok(n)
    }

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let mut state = self.state.lock();
        let n = state.write_limit.map_or(data.len(), |limit| limit.min(data.len()));
        state.written.extend_from_slice(&data[..n]);
        state.events.push(Event::Write(data[..n].to_vec()));
        Ok(n)
    }

    fn try_wait(&mut self) -> io::Result<Option<ShellExit>> {
        Ok(self.state.lock().exit.clone())
    }
}
