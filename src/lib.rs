//! Core library for the rfsutil remote filesystem tool.
//!
//! The crate drives a remote host through the system `ssh` client. A
//! [`Session`] runs commands (`run`, `sudo`) and moves single files (`put`,
//! `get`); its [`RemoteFs`] view mirrors local filesystem primitives (stat,
//! listing, directory creation and removal, renames, copies, file handles)
//! and adds recursive tree copies between local and remote directories and
//! recursive removal.

pub mod config;
pub mod host;
mod local;
pub mod rfs;
pub mod session;
pub mod test_support;

pub use config::{ConfigLoadError, RemoteConfig};
pub use host::{HostParseError, HostString};
pub use rfs::{FsError, FsErrorKind, OnError, RemoteFile, RemoteFs, RemoteStat};
pub use session::{
    CommandOutput, CommandRunner, ProcessCommandRunner, RemoteCommandOutput, Session,
    SessionError,
};
