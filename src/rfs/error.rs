//! Errors surfaced by remote filesystem operations.

use std::fmt;
use std::io;

use camino::Utf8PathBuf;
use thiserror::Error;

use crate::session::{CommandOutput, SessionError};

/// Filesystem operation that produced an error.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum FsOp {
    /// `stat`, following symlinks.
    Stat,
    /// `lstat`, describing symlinks themselves.
    Lstat,
    /// Directory listing.
    Listdir,
    /// Directory creation.
    Mkdir,
    /// Empty directory removal.
    Rmdir,
    /// File removal.
    Remove,
    /// Rename or move.
    Rename,
    /// Opening a file.
    Open,
    /// Writing file contents.
    Write,
    /// Copying with metadata.
    Copy2,
    /// Working directory lookup.
    Getcwd,
    /// Symlink test performed before removing a tree.
    IsSymlink,
}

impl FsOp {
    /// Lowercase operation name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Stat => "stat",
            Self::Lstat => "lstat",
            Self::Listdir => "listdir",
            Self::Mkdir => "mkdir",
            Self::Rmdir => "rmdir",
            Self::Remove => "remove",
            Self::Rename => "rename",
            Self::Open => "open",
            Self::Write => "write",
            Self::Copy2 => "copy2",
            Self::Getcwd => "getcwd",
            Self::IsSymlink => "islink",
        }
    }
}

impl fmt::Display for FsOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Classified cause of a failed filesystem operation.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum FsErrorKind {
    /// The path does not exist.
    NotFound,
    /// The path exists where it must not.
    AlreadyExists,
    /// A directory was required.
    NotADirectory,
    /// A non-directory was required.
    IsADirectory,
    /// The directory still has entries.
    DirectoryNotEmpty,
    /// The remote user lacks permission.
    PermissionDenied,
}

impl FsErrorKind {
    /// Maps an errno-style exit status from an internal script.
    #[must_use]
    pub(crate) const fn from_exit_code(code: i32) -> Option<Self> {
        match code {
            2 => Some(Self::NotFound),
            13 => Some(Self::PermissionDenied),
            17 => Some(Self::AlreadyExists),
            20 => Some(Self::NotADirectory),
            21 => Some(Self::IsADirectory),
            39 => Some(Self::DirectoryNotEmpty),
            _ => None,
        }
    }

    /// Human-readable description matching the usual OS wording.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::NotFound => "No such file or directory",
            Self::AlreadyExists => "File exists",
            Self::NotADirectory => "Not a directory",
            Self::IsADirectory => "Is a directory",
            Self::DirectoryNotEmpty => "Directory not empty",
            Self::PermissionDenied => "Permission denied",
        }
    }

    /// Nearest standard I/O error kind.
    #[must_use]
    pub const fn io_kind(self) -> io::ErrorKind {
        match self {
            Self::NotFound => io::ErrorKind::NotFound,
            Self::AlreadyExists => io::ErrorKind::AlreadyExists,
            Self::NotADirectory => io::ErrorKind::NotADirectory,
            Self::IsADirectory => io::ErrorKind::IsADirectory,
            Self::DirectoryNotEmpty => io::ErrorKind::DirectoryNotEmpty,
            Self::PermissionDenied => io::ErrorKind::PermissionDenied,
        }
    }
}

/// One file that failed during a tree copy.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CopyFailure {
    /// Source path.
    pub src: String,
    /// Destination path.
    pub dst: String,
    /// Why the copy failed.
    pub reason: String,
}

/// Aggregate of every per-file failure in a tree copy.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CopyTreeError {
    /// Failures in traversal order.
    pub failures: Vec<CopyFailure>,
}

impl fmt::Display for CopyTreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} entries failed to copy", self.failures.len())?;
        for failure in &self.failures {
            write!(f, "\n  {} -> {}: {}", failure.src, failure.dst, failure.reason)?;
        }
        Ok(())
    }
}

/// Errors raised by [`RemoteFs`](super::RemoteFs) operations.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum FsError {
    /// The remote side reported a classified OS error.
    #[error("{op} '{path}': {}", .kind.description())]
    Os {
        /// Operation that failed.
        op: FsOp,
        /// Path the operation targeted.
        path: String,
        /// Classified cause.
        kind: FsErrorKind,
    },
    /// The remote script failed for an unclassified reason.
    #[error("{op} '{path}' failed with status {status_text}: {stderr}")]
    Failed {
        /// Operation that failed.
        op: FsOp,
        /// Path the operation targeted.
        path: String,
        /// Human readable exit status.
        status_text: String,
        /// Stderr captured from the remote side.
        stderr: String,
    },
    /// The SSH transport or session failed.
    #[error(transparent)]
    Session(#[from] SessionError),
    /// Remote output could not be interpreted.
    #[error("unexpected {op} output for '{path}': {output}")]
    Parse {
        /// Operation whose output was malformed.
        op: FsOp,
        /// Path the operation targeted.
        path: String,
        /// Offending output.
        output: String,
    },
    /// The open mode string is not supported.
    #[error("unsupported open mode '{mode}'")]
    UnsupportedMode {
        /// Mode as given.
        mode: String,
    },
    /// `rmtree` was pointed at a symbolic link.
    #[error("cannot call rmtree on a symbolic link: '{path}'")]
    SymlinkTree {
        /// Offending path.
        path: String,
    },
    /// A glob pattern could not be compiled.
    #[error("invalid pattern '{pattern}': {message}")]
    Pattern {
        /// Pattern as given.
        pattern: String,
        /// Compiler message.
        message: String,
    },
    /// A local path could not be read or written.
    #[error("local path {path}: {message}")]
    Local {
        /// Offending local path.
        path: Utf8PathBuf,
        /// Human-readable error message.
        message: String,
    },
    /// One or more entries of a tree copy failed.
    #[error("{0}")]
    CopyTree(CopyTreeError),
}

impl FsError {
    /// Returns the classified kind for OS-level errors.
    #[must_use]
    pub const fn kind(&self) -> Option<FsErrorKind> {
        match *self {
            Self::Os { kind, .. } => Some(kind),
            _ => None,
        }
    }

    /// Returns `true` when the error reports a missing path.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self.kind(), Some(FsErrorKind::NotFound))
    }

    pub(crate) fn os(op: FsOp, path: &str, kind: FsErrorKind) -> Self {
        Self::Os {
            op,
            path: path.to_owned(),
            kind,
        }
    }

    pub(crate) fn local(path: impl Into<Utf8PathBuf>, err: &impl fmt::Display) -> Self {
        Self::Local {
            path: path.into(),
            message: err.to_string(),
        }
    }

    /// Classifies a failed script result.
    ///
    /// Errno-style exit codes map directly; otherwise a `Permission denied`
    /// message on stderr is recognised, and anything else stays
    /// unclassified.
    pub(crate) fn from_output(op: FsOp, path: &str, output: &CommandOutput) -> Self {
        if let Some(kind) = output.code.and_then(FsErrorKind::from_exit_code) {
            return Self::os(op, path, kind);
        }
        if output.stderr.contains("Permission denied") {
            return Self::os(op, path, FsErrorKind::PermissionDenied);
        }
        Self::Failed {
            op,
            path: path.to_owned(),
            status_text: output
                .code
                .map_or_else(|| String::from("unknown"), |code| code.to_string()),
            stderr: output.stderr.trim().to_owned(),
        }
    }
}

impl From<FsError> for io::Error {
    fn from(err: FsError) -> Self {
        let kind = err.kind().map_or(io::ErrorKind::Other, FsErrorKind::io_kind);
        Self::new(kind, err)
    }
}
