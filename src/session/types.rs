//! Core session types and the command runner abstraction.

use std::ffi::OsString;
use std::io::Write;
use std::process::{Command, Stdio};
use std::thread;

use super::SessionError;
use super::stream::forward_lines;

/// Result of running an external command.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CommandOutput {
    /// Exit code reported by the process, if available.
    pub code: Option<i32>,
    /// Captured standard output. Kept as raw bytes so file contents survive.
    pub stdout: Vec<u8>,
    /// Captured standard error.
    pub stderr: String,
}

impl CommandOutput {
    /// Returns `true` when the exit code equals zero.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.code, Some(0))
    }

    /// Standard output decoded lossily as UTF-8.
    #[must_use]
    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }
}

/// A single command to execute.
#[derive(Clone, Copy, Debug)]
pub struct Invocation<'a> {
    /// Program to spawn.
    pub program: &'a str,
    /// Arguments passed verbatim.
    pub args: &'a [OsString],
    /// Bytes written to the child's standard input; `None` closes it.
    pub stdin: Option<&'a [u8]>,
    /// Label used to forward output lines to the local terminal while
    /// capturing; `None` captures silently.
    pub echo: Option<&'a str>,
}

impl<'a> Invocation<'a> {
    /// Builds a silent invocation without standard input.
    #[must_use]
    pub const fn new(program: &'a str, args: &'a [OsString]) -> Self {
        Self {
            program,
            args,
            stdin: None,
            echo: None,
        }
    }

    /// Attaches bytes to feed through standard input.
    #[must_use]
    pub const fn with_stdin(mut self, stdin: &'a [u8]) -> Self {
        self.stdin = Some(stdin);
        self
    }

    /// Forwards output lines under `label` while capturing.
    #[must_use]
    pub const fn with_echo(mut self, label: &'a str) -> Self {
        self.echo = Some(label);
        self
    }
}

/// Abstraction over command execution to support fakes in tests.
pub trait CommandRunner {
    /// Runs the invocation, capturing stdout and stderr.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Spawn`] if the command cannot be started or
    /// its pipes cannot be serviced.
    fn run(&self, invocation: &Invocation<'_>) -> Result<CommandOutput, SessionError>;
}

/// Real command runner that shells out to the host operating system.
#[derive(Clone, Debug, Default)]
pub struct ProcessCommandRunner;

impl CommandRunner for ProcessCommandRunner {
    fn run(&self, invocation: &Invocation<'_>) -> Result<CommandOutput, SessionError> {
        let spawn_error = |message: String| SessionError::Spawn {
            program: invocation.program.to_owned(),
            message,
        };

        let mut child = Command::new(invocation.program)
            .args(invocation.args)
            .stdin(if invocation.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| spawn_error(err.to_string()))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| spawn_error(String::from("stdout pipe unavailable")))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| spawn_error(String::from("stderr pipe unavailable")))?;

        let out_label = invocation.echo.map(|label| format!("[{label}] out: "));
        let err_label = invocation.echo.map(|label| format!("[{label}] err: "));
        let out_thread = thread::spawn(move || forward_lines(stdout, out_label.as_deref(), false));
        let err_thread = thread::spawn(move || forward_lines(stderr, err_label.as_deref(), true));

        if let Some(input) = invocation.stdin
            && let Some(mut pipe) = child.stdin.take()
            && let Err(err) = pipe.write_all(input)
        {
            // A child that exits early closes its end; its status tells the story.
            tracing::debug!(program = invocation.program, %err, "stdin closed early");
        }

        let status = child.wait().map_err(|err| spawn_error(err.to_string()))?;
        let stdout_bytes = out_thread
            .join()
            .map_err(|_| spawn_error(String::from("stdout reader panicked")))?
            .map_err(|err| spawn_error(err.to_string()))?;
        let stderr_bytes = err_thread
            .join()
            .map_err(|_| spawn_error(String::from("stderr reader panicked")))?
            .map_err(|err| spawn_error(err.to_string()))?;

        Ok(CommandOutput {
            code: status.code(),
            stdout: stdout_bytes,
            stderr: String::from_utf8_lossy(&stderr_bytes).into_owned(),
        })
    }
}

/// Output captured from a remote command executed over SSH.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RemoteCommandOutput {
    /// Exit code reported by the remote command, if any.
    pub exit_code: Option<i32>,
    /// Captured standard output stream, trimmed of surrounding whitespace.
    pub stdout: String,
    /// Captured standard error stream.
    pub stderr: String,
    /// Whether the command failed; only observable under warn-only policy.
    pub failed: bool,
}

impl RemoteCommandOutput {
    /// Returns `true` when the command reported exit code zero.
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        !self.failed
    }
}
