//! Unit tests for the session module.
//!
//! Split across focused submodules: SSH argument construction, remote
//! command execution and the failure policy, and file transfer.

mod transfer;
