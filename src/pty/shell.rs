//! Shell selection utilities

/// Terminal type advertised to the shell unless configured otherwise.
pub const DEFAULT_TERM: &str = "xterm";

/// Select the shell to run, by priority:
/// 1. Configured path (CLI argument or config file)
/// 2. $SHELL environment variable
///
/// There is no built-in fallback: without either, no session can start.
pub fn select_shell(configured: Option<&str>) -> Option<String> {
    select_shell_from(configured, std::env::var("SHELL").ok())
}

fn select_shell_from(configured: Option<&str>, env_shell: Option<String>) -> Option<String> {
    if let Some(shell) = configured.filter(|s| !s.trim().is_empty()) {
        return Some(shell.to_string());
    }

    env_shell.filter(|s| !s.trim().is_empty())
}

/// The program image the PTY child is replaced with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellCommand {
    pub program: String,
    pub args: Vec<String>,
    /// Value exported as `TERM` in the child
    pub term: String,
}

impl ShellCommand {
    /// A login, interactive invocation of `shell`.
    pub fn login(shell: impl Into<String>, term: impl Into<String>) -> Self {
        Self {
            program: shell.into(),
            args: vec!["-l".to_string(), "-i".to_string()],
            term: term.into(),
        }
    }
}
