//! Recursive tree copies: remote to remote, local to remote, and remote to
//! local.
//!
//! A copy never stops at the first bad entry. Per-file failures are
//! collected, including those from nested directories, and reported
//! together as one [`FsError::CopyTree`] once the walk is done.

use std::collections::BTreeSet;

use camino::Utf8Path;
use globset::{Glob, GlobMatcher};
use tracing::debug;

use super::error::{CopyFailure, CopyTreeError, FsError, FsErrorKind};
use super::{DEFAULT_DIR_MODE, RemoteFs, path};
use crate::local;
use crate::session::CommandRunner;

/// Chooses entries to skip: called with a directory and its entry names,
/// returns the names to leave out.
pub type IgnoreFn = dyn Fn(&str, &[String]) -> BTreeSet<String> + Send + Sync;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Side {
    Local,
    Remote,
}

impl<R: CommandRunner> RemoteFs<'_, R> {
    /// Recursively copies remote directory `src` to remote `dst`, creating
    /// `dst` and its parents as needed. Files are copied with `cp -p`.
    ///
    /// # Errors
    ///
    /// Returns the listing error for `src`, the error creating `dst`, or
    /// [`FsError::CopyTree`] listing every entry that failed.
    pub fn copytree(&self, src: &str, dst: &str, ignore: Option<&IgnoreFn>) -> Result<(), FsError> {
        let source = self.normalize(src)?;
        let target = self.normalize(dst)?;
        self.copy_tree(&source, &target, ignore, Side::Remote, Side::Remote)
    }

    /// Recursively uploads local directory `src` to remote `dst`.
    ///
    /// # Errors
    ///
    /// Same as [`RemoteFs::copytree`], with local read errors reported as
    /// failures.
    pub fn put_copytree(
        &self,
        src: &str,
        dst: &str,
        ignore: Option<&IgnoreFn>,
    ) -> Result<(), FsError> {
        let target = self.normalize(dst)?;
        self.copy_tree(src, &target, ignore, Side::Local, Side::Remote)
    }

    /// Recursively downloads remote directory `src` into local `dst`.
    ///
    /// # Errors
    ///
    /// Same as [`RemoteFs::copytree`], with local write errors reported as
    /// failures.
    pub fn get_copytree(
        &self,
        src: &str,
        dst: &str,
        ignore: Option<&IgnoreFn>,
    ) -> Result<(), FsError> {
        let source = self.normalize(src)?;
        self.copy_tree(&source, dst, ignore, Side::Remote, Side::Local)
    }

    fn copy_tree(
        &self,
        src: &str,
        dst: &str,
        ignore: Option<&IgnoreFn>,
        from: Side,
        to: Side,
    ) -> Result<(), FsError> {
        let names = match from {
            Side::Local => local::list_dir(Utf8Path::new(src))
                .map_err(|err| FsError::local(src, &err))?,
            Side::Remote => self.listdir_at(src)?,
        };
        let ignored = ignore.map(|choose| choose(src, &names)).unwrap_or_default();

        match to {
            Side::Local => local::create_dir_all(Utf8Path::new(dst))
                .map_err(|err| FsError::local(dst, &err))?,
            Side::Remote => self.ensure_remote_dir(dst)?,
        }

        let mut failures = Vec::new();
        for name in names.iter().filter(|name| !ignored.contains(*name)) {
            let src_name = join(from, src, name);
            let dst_name = join(to, dst, name);
            match self.copy_entry(&src_name, &dst_name, ignore, from, to) {
                Ok(()) => {}
                Err(FsError::CopyTree(nested)) => failures.extend(nested.failures),
                Err(err) => failures.push(CopyFailure {
                    src: src_name,
                    dst: dst_name,
                    reason: err.to_string(),
                }),
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(FsError::CopyTree(CopyTreeError { failures }))
        }
    }

    fn copy_entry(
        &self,
        src: &str,
        dst: &str,
        ignore: Option<&IgnoreFn>,
        from: Side,
        to: Side,
    ) -> Result<(), FsError> {
        let is_dir = match from {
            Side::Local => local::is_dir(Utf8Path::new(src)),
            Side::Remote => self.is_dir_at(src)?,
        };
        if is_dir {
            return self.copy_tree(src, dst, ignore, from, to);
        }
        debug!(src, dst, "copying file");
        match (from, to) {
            (Side::Local, _) => Ok(self
                .session()
                .upload_file(Utf8Path::new(src), dst, None)?),
            (Side::Remote, Side::Local) => Ok(self
                .session()
                .download_file(src, Utf8Path::new(dst))?),
            (Side::Remote, Side::Remote) => self.copy2_at(src, dst),
        }
    }

    fn ensure_remote_dir(&self, path: &str) -> Result<(), FsError> {
        match self.makedirs_at(path, DEFAULT_DIR_MODE) {
            Err(err) if err.kind() == Some(FsErrorKind::AlreadyExists) => {
                if self.is_dir_at(path)? { Ok(()) } else { Err(err) }
            }
            other => other,
        }
    }
}

fn join(side: Side, base: &str, name: &str) -> String {
    match side {
        Side::Local => Utf8Path::new(base).join(name).into_string(),
        Side::Remote => path::join(base, &path::unixpath(name)),
    }
}

fn compile(patterns: &[&str]) -> Result<Vec<GlobMatcher>, FsError> {
    patterns
        .iter()
        .map(|pattern| {
            Glob::new(pattern)
                .map(|glob| glob.compile_matcher())
                .map_err(|err| FsError::Pattern {
                    pattern: (*pattern).to_owned(),
                    message: err.to_string(),
                })
        })
        .collect()
}

/// Builds an ignore function that skips names matching any of `patterns`.
///
/// # Errors
///
/// Returns [`FsError::Pattern`] when a pattern is not a valid glob.
pub fn ignore_patterns(patterns: &[&str]) -> Result<Box<IgnoreFn>, FsError> {
    let matchers = compile(patterns)?;
    Ok(Box::new(move |_dir: &str, names: &[String]| {
        names
            .iter()
            .filter(|name| matchers.iter().any(|matcher| matcher.is_match(name.as_str())))
            .cloned()
            .collect::<BTreeSet<String>>()
    }))
}

/// Builds an ignore function that skips names failing any of `patterns`,
/// so only names matching every pattern are copied.
///
/// # Errors
///
/// Returns [`FsError::Pattern`] when a pattern is not a valid glob.
pub fn allow_patterns(patterns: &[&str]) -> Result<Box<IgnoreFn>, FsError> {
    let matchers = compile(patterns)?;
    Ok(Box::new(move |_dir: &str, names: &[String]| {
        names
            .iter()
            .filter(|name| !matchers.iter().all(|matcher| matcher.is_match(name.as_str())))
            .cloned()
            .collect::<BTreeSet<String>>()
    }))
}
