//! Shared scratch workspace for behavioural tests.
//!
//! Integration tests are compiled as separate crates (one per top-level file in
//! `tests/`). Placing shared helpers under `tests/common/` avoids creating an
//! additional integration test binary while still allowing reuse via:
//!
//! ```rust
//! #[path = "common/workspace.rs"]
//! mod workspace;
//! ```

use std::fs::{create_dir_all, write};

use camino::{Utf8Path, Utf8PathBuf};
use rfsutil::session::Session;
use rfsutil::test_support::LocalShellRunner;
use tempfile::TempDir;

/// A local directory tree and a "remote" home directory, both temporary.
pub struct Workspace {
    pub local_root: Utf8PathBuf,
    pub remote_root: Utf8PathBuf,
    _local_tmp: TempDir,
    _remote_tmp: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        let local_tmp = temp_dir("create local workspace temp directory");
        let remote_tmp = temp_dir("create remote workspace temp directory");
        let local_root = utf8_path(&local_tmp, "local path should be valid UTF-8");
        let remote_root = utf8_path(&remote_tmp, "remote path should be valid UTF-8");
        Self {
            local_root,
            remote_root,
            _local_tmp: local_tmp,
            _remote_tmp: remote_tmp,
        }
    }

    /// Session whose commands run locally with `remote_root` as home.
    pub fn session(&self) -> Session<LocalShellRunner> {
        Session::new(
            LocalShellRunner::config(),
            None,
            LocalShellRunner::new(self.remote_root.clone()),
        )
        .unwrap_or_else(|err| panic!("session should build: {err}"))
    }

    pub fn remote(&self, relative: &str) -> Utf8PathBuf {
        self.remote_root.join(relative)
    }

    pub fn local(&self, relative: &str) -> Utf8PathBuf {
        self.local_root.join(relative)
    }
}

pub fn write_file(path: &Utf8Path, contents: &str) {
    if let Some(parent) = path.parent() {
        create_dir_all(parent)
            .unwrap_or_else(|err| panic!("create parent directories for {path}: {err}"));
    }
    write(path, contents)
        .unwrap_or_else(|err| panic!("write {path} content for test fixture: {err}"));
}

fn temp_dir(label: &str) -> TempDir {
    TempDir::new().unwrap_or_else(|err| panic!("{label}: {err}"))
}

fn utf8_path(tmp: &TempDir, label: &str) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(tmp.path().to_path_buf())
        .unwrap_or_else(|path| panic!("{label}: {}", path.display()))
}
