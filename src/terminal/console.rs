//! Linux virtual console mode switching with panic- and signal-safe restore.
//!
//! While the on-screen keyboard owns the display, the console must neither
//! draw its own text over the framebuffer nor turn key presses into input.
//! [`ConsoleModeGuard`] switches the console to graphics mode with the
//! keyboard off and puts both back when dropped, when the process panics,
//! or when it is told to terminate (SIGTERM, SIGHUP).

use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::io::{AsRawFd, RawFd};
use std::panic;
use std::path::{Path, PathBuf};
use std::ptr;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

// From <linux/kd.h>
const KDSETMODE: libc::c_ulong = 0x4B3A;
const KDGETMODE: libc::c_ulong = 0x4B3B;
const KDGKBMODE: libc::c_ulong = 0x4B44;
const KDSKBMODE: libc::c_ulong = 0x4B45;
const KD_GRAPHICS: libc::c_ulong = 0x01;
const K_OFF: libc::c_ulong = 0x04;

/// Console modes to put back, shared with the panic hook and the
/// termination handler.
static SAVED_CONSOLE: Mutex<Option<SavedModes>> = parking_lot::const_mutex(None);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SavedModes {
    fd: RawFd,
    keyboard: Option<libc::c_int>,
    display: Option<libc::c_int>,
}

#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error("failed to open console {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{op} failed on {}: {source}", .path.display())]
    Ioctl {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Guard that keeps the console in graphics mode with the keyboard off.
pub struct ConsoleModeGuard {
    /// Keeps the descriptor in `saved` open
    _file: File,
    saved: SavedModes,
}

impl ConsoleModeGuard {
    /// Save the current modes of the console at `path` and take it over.
    ///
    /// If a later step fails, whatever was already changed is put back
    /// before the error is returned.
    pub fn enter(path: &Path) -> Result<Self, ConsoleError> {
        install_panic_hook();
        if let Err(e) = install_termination_handler() {
            log::warn!("Console will not be restored on SIGTERM/SIGHUP: {}", e);
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|source| ConsoleError::Open {
                path: path.to_path_buf(),
                source,
            })?;
        let fd = file.as_raw_fd();
        let ioctl_err = |op: &'static str| ConsoleError::Ioctl {
            op,
            path: path.to_path_buf(),
            source: io::Error::last_os_error(),
        };

        let mut guard = Self {
            _file: file,
            saved: SavedModes {
                fd,
                keyboard: None,
                display: None,
            },
        };

        let keyboard = get_mode(fd, KDGKBMODE).ok_or_else(|| ioctl_err("KDGKBMODE"))?;
        set_mode(fd, KDSKBMODE, K_OFF).ok_or_else(|| ioctl_err("KDSKBMODE"))?;
        guard.saved.keyboard = Some(keyboard);
        guard.publish();

        let display = get_mode(fd, KDGETMODE).ok_or_else(|| ioctl_err("KDGETMODE"))?;
        set_mode(fd, KDSETMODE, KD_GRAPHICS).ok_or_else(|| ioctl_err("KDSETMODE"))?;
        guard.saved.display = Some(display);
        guard.publish();

        log::info!("Console {} switched to graphics mode", path.display());
        Ok(guard)
    }

    /// Put the saved modes back now. Dropping afterwards does nothing.
    pub fn restore(&mut self) {
        let mut slot = SAVED_CONSOLE.lock();
        if *slot == Some(self.saved) {
            *slot = None;
        }
        drop(slot);

        if let Err(e) = restore_modes(self.saved) {
            log::warn!("Failed to restore console mode: {}", e);
        }
        self.saved.keyboard = None;
        self.saved.display = None;
    }

    fn publish(&self) {
        *SAVED_CONSOLE.lock() = Some(self.saved);
    }
}

impl Drop for ConsoleModeGuard {
    fn drop(&mut self) {
        self.restore();
    }
}

fn get_mode(fd: RawFd, request: libc::c_ulong) -> Option<libc::c_int> {
    let mut mode: libc::c_int = 0;
    let ret = unsafe { libc::ioctl(fd, request as _, &mut mode as *mut libc::c_int) };
    (ret == 0).then_some(mode)
}

fn set_mode(fd: RawFd, request: libc::c_ulong, mode: libc::c_ulong) -> Option<()> {
    let ret = unsafe { libc::ioctl(fd, request as _, mode) };
    (ret == 0).then_some(())
}

/// Display mode first, so the console text reappears before keys work again.
/// Both modes are attempted; the first failure is returned.
///
/// Only ioctls, so this is safe to call from a signal handler.
fn restore_modes(saved: SavedModes) -> io::Result<()> {
    let mut result = Ok(());
    if let Some(display) = saved.display {
        if set_mode(saved.fd, KDSETMODE, display as libc::c_ulong).is_none() {
            result = Err(io::Error::last_os_error());
        }
    }
    if let Some(keyboard) = saved.keyboard {
        if set_mode(saved.fd, KDSKBMODE, keyboard as libc::c_ulong).is_none() && result.is_ok() {
            result = Err(io::Error::last_os_error());
        }
    }
    result
}

/// Put back the modes a live guard saved, if any. Never blocks and never
/// logs, so it can run from a signal handler. Returns whether anything
/// was restored.
fn restore_saved_console() -> bool {
    let Some(mut slot) = SAVED_CONSOLE.try_lock() else {
        return false;
    };
    let Some(saved) = slot.take() else {
        return false;
    };
    drop(slot);

    let _ = restore_modes(saved);
    true
}

extern "C" fn termination_handler(signal: libc::c_int) {
    restore_saved_console();
    // SAFETY: _exit is async-signal-safe and skips atexit handlers
    unsafe { libc::_exit(128 + signal) };
}

/// Restore the console and exit when SIGTERM or SIGHUP arrives, instead of
/// dying with the console still taken over.
pub(crate) fn install_termination_handler() -> io::Result<()> {
    static HANDLER_INSTALLED: AtomicBool = AtomicBool::new(false);

    if HANDLER_INSTALLED.swap(true, Ordering::SeqCst) {
        return Ok(());
    }

    // SAFETY: a zeroed sigaction is a valid "no flags, empty mask" value
    let mut action: libc::sigaction = unsafe { std::mem::zeroed() };
    action.sa_sigaction = termination_handler as extern "C" fn(libc::c_int) as libc::sighandler_t;
    // SAFETY: sa_mask is a valid sigset_t owned by `action`
    unsafe { libc::sigemptyset(&mut action.sa_mask) };

    for signal in [libc::SIGTERM, libc::SIGHUP] {
        // SAFETY: action is fully initialised; the old action is not needed
        if unsafe { libc::sigaction(signal, &action, ptr::null_mut()) } == -1 {
            HANDLER_INSTALLED.store(false, Ordering::SeqCst);
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}

/// Install a panic hook that restores the console before the panic message
/// is printed, so the message is visible.
pub(crate) fn install_panic_hook() {
    static HOOK_INSTALLED: AtomicBool = AtomicBool::new(false);

    if HOOK_INSTALLED.swap(true, Ordering::SeqCst) {
        return;
    }

    let original_hook = panic::take_hook();

    panic::set_hook(Box::new(move |panic_info| {
        restore_saved_console();
        original_hook(panic_info);
    }));
}
