//! Remote filesystem operations modelled on the local `os` and `shutil`
//! vocabulary.
//!
//! [`RemoteFs`] is a thin view over a [`Session`]: each operation runs a
//! small POSIX script over SSH and turns its errno-valued exit status into
//! a classified [`FsError`]. Paths starting with `~` resolve against the
//! remote working directory of a fresh login.
//!
//! Unlike [`Session::run`], filesystem operations always return their
//! errors; the warn-only failure policy does not apply to them.

use crate::session::{CommandOutput, CommandRunner, Session};

mod error;
mod file;
mod path;
mod rmtree;
mod script;
mod stat;
mod tree;

pub use error::{CopyFailure, CopyTreeError, FsError, FsErrorKind, FsOp};
pub use file::{OpenMode, RemoteFile};
pub use rmtree::{ErrorHandler, OnError};
pub use stat::{FileKind, RemoteStat};
pub use tree::{IgnoreFn, allow_patterns, ignore_patterns};

/// Default mode for directories created by [`RemoteFs::mkdir`] and
/// [`RemoteFs::makedirs`], before the remote umask applies.
pub const DEFAULT_DIR_MODE: u32 = 0o777;

/// Filesystem view over a remote session.
#[derive(Debug)]
pub struct RemoteFs<'s, R: CommandRunner> {
    session: &'s Session<R>,
}

impl<R: CommandRunner> Clone for RemoteFs<'_, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R: CommandRunner> Copy for RemoteFs<'_, R> {}

impl<'s, R: CommandRunner> RemoteFs<'s, R> {
    pub(crate) const fn new(session: &'s Session<R>) -> Self {
        Self { session }
    }

    /// Session the operations run through.
    #[must_use]
    pub const fn session(&self) -> &'s Session<R> {
        self.session
    }

    /// Converts `path` to remote form and resolves a leading `~`.
    ///
    /// # Errors
    ///
    /// Returns [`FsError::Session`] when the remote working directory is
    /// needed and cannot be determined.
    pub fn normalize(&self, path: &str) -> Result<String, FsError> {
        let unix = path::unixpath(path);
        Ok(self.session.expand_remote_tilde(&unix)?)
    }

    /// Remote working directory of a fresh login, cached per session.
    ///
    /// # Errors
    ///
    /// Returns [`FsError::Session`] when `pwd` cannot be run.
    pub fn getcwd(&self) -> Result<String, FsError> {
        Ok(self.session.remote_cwd()?)
    }

    /// Attributes of `path`, following symlinks.
    ///
    /// # Errors
    ///
    /// Returns [`FsErrorKind::NotFound`] for missing paths and dangling
    /// links, or a transport error.
    pub fn stat(&self, path: &str) -> Result<RemoteStat, FsError> {
        self.stat_at(&self.normalize(path)?, true)
    }

    /// Attributes of `path` itself, without following a final symlink.
    ///
    /// # Errors
    ///
    /// Returns [`FsErrorKind::NotFound`] for missing paths, or a transport
    /// error.
    pub fn lstat(&self, path: &str) -> Result<RemoteStat, FsError> {
        self.stat_at(&self.normalize(path)?, false)
    }

    /// Whether `path` exists. Dangling symlinks do not.
    ///
    /// # Errors
    ///
    /// Returns errors other than a missing path, such as transport failures.
    pub fn exists(&self, path: &str) -> Result<bool, FsError> {
        self.exists_at(&self.normalize(path)?)
    }

    /// Whether `path` is a directory, following symlinks.
    ///
    /// # Errors
    ///
    /// Returns errors other than a missing path.
    pub fn is_dir(&self, path: &str) -> Result<bool, FsError> {
        self.is_dir_at(&self.normalize(path)?)
    }

    /// Whether `path` is a regular file, following symlinks.
    ///
    /// # Errors
    ///
    /// Returns errors other than a missing path.
    pub fn is_file(&self, path: &str) -> Result<bool, FsError> {
        let target = self.normalize(path)?;
        not_found_as_false(self.stat_at(&target, true).map(|st| st.is_file()))
    }

    /// Whether `path` is a symbolic link.
    ///
    /// # Errors
    ///
    /// Returns errors other than a missing path.
    pub fn is_symlink(&self, path: &str) -> Result<bool, FsError> {
        self.is_symlink_at(&self.normalize(path)?)
    }

    /// Names of the entries in directory `path`, sorted, without `.` and
    /// `..`.
    ///
    /// # Errors
    ///
    /// Returns [`FsErrorKind::NotFound`] or [`FsErrorKind::NotADirectory`]
    /// when `path` is not a listable directory.
    pub fn listdir(&self, path: &str) -> Result<Vec<String>, FsError> {
        self.listdir_at(&self.normalize(path)?)
    }

    /// Creates directory `path` with `mode` (masked by the remote umask).
    ///
    /// # Errors
    ///
    /// Returns [`FsErrorKind::AlreadyExists`] when `path` exists, or
    /// [`FsErrorKind::NotFound`] when its parent is missing.
    pub fn mkdir(&self, path: &str, mode: u32) -> Result<(), FsError> {
        self.mkdir_at(&self.normalize(path)?, mode)
    }

    /// Creates directory `path` and any missing ancestors.
    ///
    /// # Errors
    ///
    /// Returns [`FsErrorKind::AlreadyExists`] when the leaf already exists,
    /// or the first error raised while creating an ancestor.
    pub fn makedirs(&self, path: &str, mode: u32) -> Result<(), FsError> {
        self.makedirs_at(&self.normalize(path)?, mode)
    }

    /// Removes the non-directory `path`.
    ///
    /// # Errors
    ///
    /// Returns [`FsErrorKind::NotFound`], or [`FsErrorKind::IsADirectory`]
    /// when `path` is a directory.
    pub fn remove(&self, path: &str) -> Result<(), FsError> {
        self.remove_at(&self.normalize(path)?)
    }

    /// Removes the empty directory `path`.
    ///
    /// # Errors
    ///
    /// Returns [`FsErrorKind::NotFound`], [`FsErrorKind::NotADirectory`],
    /// or [`FsErrorKind::DirectoryNotEmpty`].
    pub fn rmdir(&self, path: &str) -> Result<(), FsError> {
        self.rmdir_at(&self.normalize(path)?)
    }

    /// Renames `old` to `new`, replacing a file or empty directory at `new`.
    ///
    /// # Errors
    ///
    /// Returns [`FsErrorKind::NotFound`] when `old` is missing, or the
    /// classified conflict when `new` cannot be replaced.
    pub fn rename(&self, old: &str, new: &str) -> Result<(), FsError> {
        let source = self.normalize(old)?;
        let target = self.normalize(new)?;
        self.run(FsOp::Rename, &source, &script::rename(&source, &target))
            .map(drop)
    }

    /// Copies file contents from `src` to `dst` through this machine.
    /// Returns the number of bytes copied.
    ///
    /// # Errors
    ///
    /// Returns the error from opening, reading or writing either file.
    pub fn copy(&self, src: &str, dst: &str) -> Result<u64, FsError> {
        let contents = self.read_all(&self.normalize(src)?)?;
        let target = self.normalize(dst)?;
        self.run(FsOp::Open, &target, &script::create(&target, true))?;
        self.append_at(&target, &contents)?;
        Ok(u64::try_from(contents.len()).unwrap_or(u64::MAX))
    }

    /// Copies `src` to `dst` on the remote host, preserving mode and
    /// timestamps.
    ///
    /// # Errors
    ///
    /// Returns [`FsErrorKind::NotFound`] when `src` is missing or
    /// [`FsErrorKind::IsADirectory`] when it is a directory.
    pub fn copy2(&self, src: &str, dst: &str) -> Result<(), FsError> {
        self.copy2_at(&self.normalize(src)?, &self.normalize(dst)?)
    }

    /// Opens remote file `name`.
    ///
    /// `mode` follows `fopen` conventions: `r`, `w` or `a`, optionally with
    /// `b` or `t`. Reads fetch the whole file up front. Writes are sent on
    /// every call when `buffered` is false, otherwise on flush, close or
    /// drop.
    ///
    /// # Errors
    ///
    /// Returns [`FsError::UnsupportedMode`] for unknown or update modes,
    /// [`FsErrorKind::NotFound`] when reading a missing file, or
    /// [`FsErrorKind::IsADirectory`] when `name` is a directory.
    pub fn open(&self, name: &str, mode: &str, buffered: bool) -> Result<RemoteFile<'s, R>, FsError> {
        let open_mode: OpenMode = mode.parse()?;
        let target = self.normalize(name)?;
        match open_mode {
            OpenMode::Read => {
                let contents = self.read_all(&target)?;
                Ok(RemoteFile::reader(*self, target, contents))
            }
            OpenMode::Write | OpenMode::Append => {
                let truncate = open_mode == OpenMode::Write;
                self.run(FsOp::Open, &target, &script::create(&target, truncate))?;
                Ok(RemoteFile::writer(*self, target, open_mode, buffered))
            }
        }
    }

    pub(crate) fn stat_at(&self, path: &str, follow: bool) -> Result<RemoteStat, FsError> {
        let op = if follow { FsOp::Stat } else { FsOp::Lstat };
        let output = self.run(op, path, &script::stat(path, follow))?;
        RemoteStat::parse(op, path, &output.stdout_text())
    }

    pub(crate) fn exists_at(&self, path: &str) -> Result<bool, FsError> {
        not_found_as_false(self.stat_at(path, true).map(|_| true))
    }

    pub(crate) fn is_dir_at(&self, path: &str) -> Result<bool, FsError> {
        not_found_as_false(self.stat_at(path, true).map(|st| st.is_dir()))
    }

    pub(crate) fn is_symlink_at(&self, path: &str) -> Result<bool, FsError> {
        not_found_as_false(self.stat_at(path, false).map(|st| st.is_symlink()))
    }

    pub(crate) fn listdir_at(&self, path: &str) -> Result<Vec<String>, FsError> {
        let output = self.run(FsOp::Listdir, path, &script::listdir(path))?;
        // Names must round-trip exactly; undecodable ones are an error.
        let mut names = output
            .stdout
            .split(|byte| *byte == 0)
            .filter(|entry| !entry.is_empty())
            .map(|entry| {
                let name = entry.strip_prefix(b"./").unwrap_or(entry);
                String::from_utf8(name.to_vec()).map_err(|_| FsError::Parse {
                    op: FsOp::Listdir,
                    path: path.to_owned(),
                    output: String::from_utf8_lossy(name).into_owned(),
                })
            })
            .collect::<Result<Vec<String>, FsError>>()?;
        names.sort();
        Ok(names)
    }

    pub(crate) fn mkdir_at(&self, path: &str, mode: u32) -> Result<(), FsError> {
        self.run(FsOp::Mkdir, path, &script::mkdir(path, mode))
            .map(drop)
    }

    pub(crate) fn makedirs_at(&self, path: &str, mode: u32) -> Result<(), FsError> {
        let (mut head, mut tail) = path::split(path);
        if tail.is_empty() {
            (head, tail) = path::split(&head);
        }
        if !head.is_empty() && !tail.is_empty() && !self.exists_at(&head)? {
            match self.makedirs_at(&head, mode) {
                Ok(()) => {}
                Err(err) if err.kind() == Some(FsErrorKind::AlreadyExists) => {}
                Err(err) => return Err(err),
            }
            if tail == "." {
                return Ok(());
            }
        }
        self.mkdir_at(path, mode)
    }

    pub(crate) fn remove_at(&self, path: &str) -> Result<(), FsError> {
        self.run(FsOp::Remove, path, &script::remove(path)).map(drop)
    }

    pub(crate) fn rmdir_at(&self, path: &str) -> Result<(), FsError> {
        self.run(FsOp::Rmdir, path, &script::rmdir(path)).map(drop)
    }

    pub(crate) fn copy2_at(&self, src: &str, dst: &str) -> Result<(), FsError> {
        self.run(FsOp::Copy2, src, &script::copy2(src, dst))
            .map(drop)
    }

    pub(crate) fn read_all(&self, path: &str) -> Result<Vec<u8>, FsError> {
        Ok(self.run(FsOp::Open, path, &script::read(path))?.stdout)
    }

    pub(crate) fn append_at(&self, path: &str, contents: &[u8]) -> Result<(), FsError> {
        let output = self
            .session
            .run_script_with_input(&script::append(path), contents)?;
        if output.is_success() {
            Ok(())
        } else {
            Err(FsError::from_output(FsOp::Write, path, &output))
        }
    }

    fn run(&self, op: FsOp, path: &str, script: &str) -> Result<CommandOutput, FsError> {
        let output = self.session.run_script(script)?;
        if output.is_success() {
            Ok(output)
        } else {
            Err(FsError::from_output(op, path, &output))
        }
    }
}

fn not_found_as_false(result: Result<bool, FsError>) -> Result<bool, FsError> {
    match result {
        Err(err) if err.is_not_found() => Ok(false),
        other => other,
    }
}
