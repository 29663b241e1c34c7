//! PTY error types

use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Error type for PTY setup operations
#[derive(Debug, Error)]
pub enum PtyError {
    /// The pixel dimensions do not fit a single character cell
    #[error("display of {width_px}x{height_px} px is too small for a {cell_width}x{cell_height} cell")]
    GeometryTooSmall {
        width_px: u32,
        height_px: u32,
        cell_width: u32,
        cell_height: u32,
    },
    /// No shell path in the configuration or the environment
    #[error("no shell configured and $SHELL is not set")]
    MissingShell,
    /// Failed to create PTY pair
    #[error("Failed to create PTY: {0}")]
    PtyCreationFailed(#[source] BoxError),
    /// Failed to spawn shell
    #[error("Failed to spawn shell: {0}")]
    SpawnFailed(#[source] BoxError),
    /// Failed to get reader from PTY
    #[error("Failed to get PTY reader: {0}")]
    ReaderFailed(#[source] BoxError),
    /// Failed to get writer from PTY
    #[error("Failed to get PTY writer: {0}")]
    WriterFailed(#[source] BoxError),
    /// PTY I/O error
    #[error("PTY I/O error: {0}")]
    Io(#[from] std::io::Error),
}
