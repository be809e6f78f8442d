//! Errors surfaced by remote sessions.

use camino::Utf8PathBuf;
use thiserror::Error;

use crate::host::HostParseError;

/// Errors surfaced while executing remote commands or transferring files.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum SessionError {
    /// Raised when configuration is missing required values. The message
    /// names both the environment variable and the configuration key.
    #[error("missing {field}: set RFSUTIL_{env_suffix} or add {field} to rfsutil.toml", env_suffix = .field.to_uppercase())]
    InvalidConfig {
        /// Configuration field that failed validation.
        field: String,
    },
    /// Raised when an operation is attempted without a target host.
    #[error("no host given: pass --host or set RFSUTIL_HOST")]
    MissingHost,
    /// Raised when a host string cannot be parsed.
    #[error(transparent)]
    InvalidHost(#[from] HostParseError),
    /// Raised when a command cannot be spawned.
    #[error("failed to spawn {program}: {message}")]
    Spawn {
        /// Command that failed to start.
        program: String,
        /// Operating system error string.
        message: String,
    },
    /// Raised when the SSH client itself fails (exit status 255).
    #[error("could not reach {host}: {stderr}")]
    Connection {
        /// Host that could not be reached.
        host: String,
        /// Stderr captured from the SSH client.
        stderr: String,
    },
    /// Raised when a remote command completes with a non-zero exit code and
    /// failures abort.
    #[error("{program} exited with status {status_text} while executing '{command}': {stderr}")]
    CommandFailure {
        /// Operation that ran the command (`run`, `sudo`, `put`, ...).
        program: String,
        /// Command as requested by the caller.
        command: String,
        /// Exit status as reported by the remote side.
        status: Option<i32>,
        /// Human readable representation of the exit status.
        status_text: String,
        /// Stderr captured from the process.
        stderr: String,
    },
    /// Raised when a local path is unusable for a transfer.
    #[error("local path {path}: {message}")]
    Local {
        /// Offending local path.
        path: Utf8PathBuf,
        /// Human-readable error message.
        message: String,
    },
}

impl SessionError {
    pub(crate) fn local(path: impl Into<Utf8PathBuf>, err: &impl std::fmt::Display) -> Self {
        Self::Local {
            path: path.into(),
            message: err.to_string(),
        }
    }
}
