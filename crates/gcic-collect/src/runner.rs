//! External command execution with timeout and outcome classification
//!
//! Classification is what lets collectors degrade to "N/A" instead of
//! crash-looping: a missing binary is not the same failure as a hung one.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

/// How a command invocation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Exited zero
    Ok,
    /// Binary not installed; nothing was spawned
    Missing,
    /// Deadline exceeded; child killed, partial output discarded
    Timeout,
    /// Exited non-zero
    NonZero,
    /// Spawn or wait failed at the OS level
    IoError,
}

/// Captured output of one command invocation
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub outcome: CommandOutcome,
}

impl CommandOutput {
    pub fn ok(&self) -> bool {
        self.outcome == CommandOutcome::Ok
    }

    /// Usable stdout: the command succeeded and printed something
    pub fn usable(&self) -> bool {
        self.ok() && !self.stdout.trim().is_empty()
    }

    fn failed(outcome: CommandOutcome, stderr: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            exit_code: None,
            outcome,
        }
    }
}

/// Runs external programs without a shell
#[derive(Debug, Clone, Default)]
pub struct CommandRunner;

impl CommandRunner {
    pub fn new() -> Self {
        Self
    }

    /// Run `argv` with a deadline. The binary is resolved up front; an
    /// absent one returns `Missing` without spawning anything. Output is
    /// captured as UTF-8 with lossy replacement.
    pub async fn run(&self, argv: &[&str], deadline: Duration) -> CommandOutput {
        let program = match argv.first() {
            Some(p) => *p,
            None => return CommandOutput::failed(CommandOutcome::IoError, "empty argv"),
        };

        if !binary_available(program) {
            debug!("Binary not found: {}", program);
            return CommandOutput::failed(
                CommandOutcome::Missing,
                format!("{}: not found", program),
            );
        }

        let mut cmd = Command::new(program);
        cmd.args(&argv[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                return CommandOutput::failed(CommandOutcome::IoError, e.to_string());
            }
        };

        // Dropping the wait future on timeout kills the child tree via
        // kill_on_drop, so partial output is discarded with it.
        match timeout(deadline, child.wait_with_output()).await {
            Ok(Ok(output)) => {
                let exit_code = output.status.code();
                let outcome = if output.status.success() {
                    CommandOutcome::Ok
                } else {
                    CommandOutcome::NonZero
                };
                CommandOutput {
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                    exit_code,
                    outcome,
                }
            }
            Ok(Err(e)) => CommandOutput::failed(CommandOutcome::IoError, e.to_string()),
            Err(_) => CommandOutput::failed(
                CommandOutcome::Timeout,
                format!("{}: timed out after {:?}", program, deadline),
            ),
        }
    }
}

/// Check binary presence without invoking a shell: absolute/relative paths
/// directly, bare names through `which`.
fn binary_available(program: &str) -> bool {
    if program.contains('/') {
        Path::new(program).exists()
    } else {
        which::which(program).is_ok()
    }
}
