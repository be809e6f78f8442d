//! Remote `stat` results.

use super::error::{FsError, FsOp};

const S_IFMT: u32 = 0o170_000;
const S_IFDIR: u32 = 0o040_000;
const S_IFREG: u32 = 0o100_000;
const S_IFLNK: u32 = 0o120_000;

/// `stat` format string: raw mode in hex, size, owner, group, access and
/// modification times.
pub(crate) const STAT_FORMAT: &str = "%f %s %u %g %X %Y";

/// Kind of a remote filesystem entry.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum FileKind {
    /// Directory.
    Directory,
    /// Regular file.
    File,
    /// Symbolic link (only reported by `lstat`).
    Symlink,
    /// Device, socket, or FIFO.
    Other,
}

impl FileKind {
    /// Lowercase kind name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Directory => "directory",
            Self::File => "file",
            Self::Symlink => "symlink",
            Self::Other => "other",
        }
    }
}

/// Attributes of a remote path.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RemoteStat {
    /// Raw `st_mode`, file type bits included.
    pub mode: u32,
    /// Size in bytes.
    pub size: u64,
    /// Owner user id.
    pub uid: u32,
    /// Owner group id.
    pub gid: u32,
    /// Last access time, seconds since the epoch.
    pub atime: i64,
    /// Last modification time, seconds since the epoch.
    pub mtime: i64,
}

impl RemoteStat {
    /// Entry kind decoded from the mode bits.
    #[must_use]
    pub const fn kind(&self) -> FileKind {
        match self.mode & S_IFMT {
            S_IFDIR => FileKind::Directory,
            S_IFREG => FileKind::File,
            S_IFLNK => FileKind::Symlink,
            _ => FileKind::Other,
        }
    }

    /// Returns `true` for directories.
    #[must_use]
    pub const fn is_dir(&self) -> bool {
        matches!(self.kind(), FileKind::Directory)
    }

    /// Returns `true` for regular files.
    #[must_use]
    pub const fn is_file(&self) -> bool {
        matches!(self.kind(), FileKind::File)
    }

    /// Returns `true` for symbolic links.
    #[must_use]
    pub const fn is_symlink(&self) -> bool {
        matches!(self.kind(), FileKind::Symlink)
    }

    /// Permission bits, including setuid, setgid and sticky.
    #[must_use]
    pub const fn permissions(&self) -> u32 {
        self.mode & 0o7777
    }

    pub(crate) fn parse(op: FsOp, path: &str, output: &str) -> Result<Self, FsError> {
        let malformed = || FsError::Parse {
            op,
            path: path.to_owned(),
            output: output.trim().to_owned(),
        };
        let mut fields = output.split_whitespace();
        let mut next = || fields.next().ok_or_else(malformed);

        let mode = u32::from_str_radix(next()?, 16).map_err(|_| malformed())?;
        let size = next()?.parse().map_err(|_| malformed())?;
        let uid = next()?.parse().map_err(|_| malformed())?;
        let gid = next()?.parse().map_err(|_| malformed())?;
        let atime = next()?.parse().map_err(|_| malformed())?;
        let mtime = next()?.parse().map_err(|_| malformed())?;

        Ok(Self {
            mode,
            size,
            uid,
            gid,
            atime,
            mtime,
        })
    }
}
