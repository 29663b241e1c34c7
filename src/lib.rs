//! touchterm library crate.
//!
//! A PTY-backed shell session meant to sit behind an on-screen keyboard:
//! the UI submits whole commands, polls for output with the command echo
//! removed, and can interrupt whatever the shell is running.

pub mod cli;
pub mod config;
pub mod escape;
pub mod interrupt;
pub mod pty;
pub mod session;
pub mod terminal;
