//! Display-side helpers - console takeover and the output transcript.

#[cfg(target_os = "linux")]
mod console;
mod transcript;

#[cfg(target_os = "linux")]
pub use console::{ConsoleError, ConsoleModeGuard};
pub use transcript::{Appended, Transcript, DEFAULT_MAX_TRANSCRIPT_LEN};
