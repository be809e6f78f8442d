//! File handles for remote files.

use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};
use std::str::FromStr;

use tracing::warn;

use super::RemoteFs;
use super::error::FsError;
use crate::session::CommandRunner;

/// How a remote file is opened.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum OpenMode {
    /// `r`: read an existing file.
    Read,
    /// `w`: create or truncate, then write.
    Write,
    /// `a`: create if missing, then append.
    Append,
}

impl FromStr for OpenMode {
    type Err = FsError;

    fn from_str(mode: &str) -> Result<Self, Self::Err> {
        let base: String = mode.chars().filter(|ch| !matches!(ch, 'b' | 't')).collect();
        match base.as_str() {
            "r" => Ok(Self::Read),
            "w" => Ok(Self::Write),
            "a" => Ok(Self::Append),
            _ => Err(FsError::UnsupportedMode {
                mode: mode.to_owned(),
            }),
        }
    }
}

/// An open remote file.
///
/// Read handles hold the whole file in memory and support seeking. Write
/// handles collect bytes locally and append them remotely on each write when
/// unbuffered, or on [`Write::flush`], [`RemoteFile::close`] or drop when
/// buffered. Errors during drop are logged, so call `close` to observe them.
#[derive(Debug)]
pub struct RemoteFile<'s, R: CommandRunner> {
    fs: RemoteFs<'s, R>,
    path: String,
    mode: OpenMode,
    buffered: bool,
    contents: Cursor<Vec<u8>>,
    pending: Vec<u8>,
    closed: bool,
}

impl<'s, R: CommandRunner> RemoteFile<'s, R> {
    pub(crate) fn reader(fs: RemoteFs<'s, R>, path: String, contents: Vec<u8>) -> Self {
        Self {
            fs,
            path,
            mode: OpenMode::Read,
            buffered: true,
            contents: Cursor::new(contents),
            pending: Vec::new(),
            closed: false,
        }
    }

    pub(crate) fn writer(
        fs: RemoteFs<'s, R>,
        path: String,
        mode: OpenMode,
        buffered: bool,
    ) -> Self {
        Self {
            fs,
            path,
            mode,
            buffered,
            contents: Cursor::new(Vec::new()),
            pending: Vec::new(),
            closed: false,
        }
    }

    /// Remote path of the file.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Mode the file was opened with.
    #[must_use]
    pub const fn mode(&self) -> OpenMode {
        self.mode
    }

    /// Sends outstanding writes and closes the handle.
    ///
    /// # Errors
    ///
    /// Returns the error raised while sending buffered bytes.
    pub fn close(mut self) -> Result<(), FsError> {
        self.closed = true;
        self.send_pending()
    }

    fn send_pending(&mut self) -> Result<(), FsError> {
        if self.pending.is_empty() {
            return Ok(());
        }
        self.fs.append_at(&self.path, &self.pending)?;
        self.pending.clear();
        Ok(())
    }

    fn require(&self, wanted_read: bool) -> io::Result<()> {
        let readable = self.mode == OpenMode::Read;
        if readable == wanted_read {
            Ok(())
        } else {
            let action = if wanted_read { "reading" } else { "writing" };
            Err(io::Error::new(
                io::ErrorKind::Unsupported,
                format!("{} is not open for {action}", self.path),
            ))
        }
    }
}

impl<R: CommandRunner> Read for RemoteFile<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.require(true)?;
        self.contents.read(buf)
    }
}

impl<R: CommandRunner> Seek for RemoteFile<'_, R> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.require(true)?;
        self.contents.seek(pos)
    }
}

impl<R: CommandRunner> Write for RemoteFile<'_, R> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.require(false)?;
        self.pending.extend_from_slice(buf);
        if !self.buffered {
            self.send_pending()?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.mode == OpenMode::Read {
            return Ok(());
        }
        Ok(self.send_pending()?)
    }
}

impl<R: CommandRunner> Drop for RemoteFile<'_, R> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(err) = self.send_pending() {
            warn!(path = %self.path, "discarding unsent writes: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("r", OpenMode::Read)]
    #[case("rb", OpenMode::Read)]
    #[case("rt", OpenMode::Read)]
    #[case("w", OpenMode::Write)]
    #[case("wb", OpenMode::Write)]
    #[case("a", OpenMode::Append)]
    #[case("ab", OpenMode::Append)]
    fn parses_supported_modes(#[case] input: &str, #[case] expected: OpenMode) {
        assert_eq!(input.parse::<OpenMode>().expect("mode should parse"), expected);
    }

    #[rstest]
    #[case("r+")]
    #[case("w+b")]
    #[case("x")]
    #[case("")]
    #[case("rw")]
    fn rejects_unsupported_modes(#[case] input: &str) {
        let err = input.parse::<OpenMode>().expect_err("mode should be rejected");
        assert_eq!(
            err,
            FsError::UnsupportedMode {
                mode: input.to_owned()
            }
        );
    }
}
