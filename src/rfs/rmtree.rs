//! Recursive removal.

use std::fmt;

use super::error::{FsError, FsOp};
use super::{RemoteFs, path};
use crate::session::CommandRunner;

/// Handler invoked with the failing operation, the path, and the error.
/// Returning an error stops the removal.
pub type ErrorHandler<'h> = &'h mut dyn FnMut(FsOp, &str, &FsError) -> Result<(), FsError>;

/// What [`RemoteFs::rmtree`] does when a step fails.
pub enum OnError<'h> {
    /// Stop and return the error.
    Raise,
    /// Skip the failing step and carry on.
    Ignore,
    /// Ask the handler.
    Handler(ErrorHandler<'h>),
}

impl fmt::Debug for OnError<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Raise => f.write_str("Raise"),
            Self::Ignore => f.write_str("Ignore"),
            Self::Handler(_) => f.write_str("Handler(..)"),
        }
    }
}

impl OnError<'_> {
    fn handle(&mut self, op: FsOp, path: &str, err: FsError) -> Result<(), FsError> {
        match *self {
            Self::Raise => Err(err),
            Self::Ignore => Ok(()),
            Self::Handler(ref mut handler) => (*handler)(op, path, &err),
        }
    }
}

impl<R: CommandRunner> RemoteFs<'_, R> {
    /// Removes the directory tree at `path`.
    ///
    /// Symbolic links inside the tree are removed, never followed. A symlink
    /// at `path` itself is refused. Each failed step goes to `on_error`.
    ///
    /// # Errors
    ///
    /// Returns the first error `on_error` does not absorb.
    pub fn rmtree(&self, path: &str, mut on_error: OnError<'_>) -> Result<(), FsError> {
        let target = self.normalize(path)?;
        self.rmtree_at(&target, &mut on_error)
    }

    fn rmtree_at(&self, root: &str, on_error: &mut OnError<'_>) -> Result<(), FsError> {
        match self.is_symlink_at(root) {
            Ok(false) => {}
            Ok(true) => {
                let err = FsError::SymlinkTree {
                    path: root.to_owned(),
                };
                return on_error.handle(FsOp::IsSymlink, root, err);
            }
            Err(err) => return on_error.handle(FsOp::IsSymlink, root, err),
        }

        let names = match self.listdir_at(root) {
            Ok(names) => names,
            Err(err) => {
                on_error.handle(FsOp::Listdir, root, err)?;
                Vec::new()
            }
        };

        for name in names {
            let full = path::join(root, &name);
            let is_dir = self
                .stat_at(&full, false)
                .is_ok_and(|st| st.is_dir());
            if is_dir {
                self.rmtree_at(&full, on_error)?;
            } else if let Err(err) = self.remove_at(&full) {
                on_error.handle(FsOp::Remove, &full, err)?;
            }
        }

        if let Err(err) = self.rmdir_at(root) {
            on_error.handle(FsOp::Rmdir, root, err)?;
        }
        Ok(())
    }
}
