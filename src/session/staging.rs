//! Buffers shared between the UI thread and the session loop.
//!
//! Everything here lives behind the session's single lock.

use thiserror::Error;

use crate::pty::ShellExit;

/// Why a command was not accepted for sending.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    /// The previous command has not been written to the shell yet
    #[error("a command is already waiting to be sent")]
    Pending,
    #[error("command is {len} bytes, the limit is {max}")]
    TooLong { len: usize, max: usize },
    #[error("command is empty")]
    Empty,
}

/// A command waiting to be written to the PTY.
#[derive(Debug)]
pub(crate) struct CommandRequest {
    text: Vec<u8>,
    /// Bytes of `text` already accepted by the PTY
    cursor: usize,
}

impl CommandRequest {
    fn new(text: &[u8]) -> Self {
        Self {
            text: text.to_vec(),
            cursor: 0,
        }
    }

    /// The part still to be written.
    pub(crate) fn unsent(&self) -> &[u8] {
        &self.text[self.cursor..]
    }

    pub(crate) fn advance(&mut self, written: usize) {
        self.cursor = (self.cursor + written).min(self.text.len());
    }

    pub(crate) fn is_sent(&self) -> bool {
        self.cursor == self.text.len()
    }

    pub(crate) fn into_text(self) -> Vec<u8> {
        self.text
    }
}

/// Latest chunk of shell output and whether the UI still has to show it.
#[derive(Debug, Default)]
pub(crate) struct OutputBuffer {
    data: Vec<u8>,
    needs_update: bool,
}

impl OutputBuffer {
    /// Replace the contents and flag them for the UI.
    pub(crate) fn publish(&mut self, data: &[u8]) {
        self.data.clear();
        self.data.extend_from_slice(data);
        self.needs_update = true;
    }

    pub(crate) fn needs_update(&self) -> bool {
        self.needs_update
    }

    /// Hand the pending output to the consumer and clear the flag.
    pub(crate) fn take(&mut self) -> Option<Vec<u8>> {
        if !self.needs_update {
            return None;
        }
        self.needs_update = false;
        Some(std::mem::take(&mut self.data))
    }
}

/// All state guarded by the session lock.
#[derive(Debug, Default)]
pub(crate) struct Staging {
    pub(crate) command: Option<CommandRequest>,
    pub(crate) output: OutputBuffer,
    /// Text of the last command sent, kept until the next read cycle
    pub(crate) echo: Option<Vec<u8>>,
    pub(crate) exit: Option<ShellExit>,
}

impl Staging {
    /// Stage `text` for sending. A command that is still pending is never
    /// overwritten; the new one is rejected instead.
    pub(crate) fn submit(&mut self, text: &[u8], max_len: usize) -> Result<(), SubmitError> {
        if self.command.is_some() {
            return Err(SubmitError::Pending);
        }
        if text.is_empty() {
            return Err(SubmitError::Empty);
        }
        if text.len() > max_len {
            return Err(SubmitError::TooLong {
                len: text.len(),
                max: max_len,
            });
        }

        self.command = Some(CommandRequest::new(text));
        Ok(())
    }
}
