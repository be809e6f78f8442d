//! Command-line interface definitions for the `rfsutil` binary.
//!
//! This module centralises the clap parser structures so both the main binary
//! and the build script can reuse them when generating the manual page.

use clap::{ArgAction, Args, Parser, Subcommand};

/// Top-level CLI for the `rfsutil` binary.
#[derive(Debug, Parser)]
#[command(
    name = "rfsutil",
    about = "Manipulate files on remote hosts over SSH",
    arg_required_else_help = true
)]
pub(crate) struct Cli {
    /// Target host as `[user@]host[:port]`; repeat to act on several hosts.
    /// Defaults to the configured host.
    #[arg(long = "host", short = 'H', value_name = "HOST", global = true)]
    pub(crate) hosts: Vec<String>,
    /// Log more detail; repeat for trace output.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub(crate) verbose: u8,
    /// Only log warnings and errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub(crate) quiet: bool,
    /// Operation to perform.
    #[command(subcommand)]
    pub(crate) command: Command,
}

/// Remote operations exposed as subcommands.
#[derive(Clone, Debug, Subcommand)]
pub(crate) enum Command {
    /// Print the remote login directory.
    Pwd,
    /// Print the attributes of a remote path.
    Stat {
        /// Describe a symbolic link itself rather than its target.
        #[arg(long)]
        no_follow: bool,
        /// Remote path.
        path: String,
    },
    /// Print whether a remote path exists.
    Exists(ExistsArgs),
    /// List the entries of a remote directory.
    Ls {
        /// Remote directory.
        #[arg(default_value = "~")]
        path: String,
    },
    /// Create a remote directory.
    Mkdir {
        /// Create missing parent directories too.
        #[arg(short, long)]
        parents: bool,
        /// Octal permission bits, masked by the remote umask.
        #[arg(long, default_value = "777", value_parser = parse_mode)]
        mode: u32,
        /// Remote directory.
        path: String,
    },
    /// Remove a remote file.
    Rm {
        /// Remote path.
        path: String,
    },
    /// Remove an empty remote directory.
    Rmdir {
        /// Remote directory.
        path: String,
    },
    /// Remove a remote directory tree.
    Rmtree {
        /// Carry on past entries that cannot be removed.
        #[arg(long)]
        ignore_errors: bool,
        /// Remote directory.
        path: String,
    },
    /// Rename a remote file or directory.
    Mv {
        /// Existing remote path.
        old: String,
        /// New remote path.
        new: String,
    },
    /// Copy a remote file to another remote path.
    Cp {
        /// Preserve mode, ownership and timestamps.
        #[arg(long)]
        preserve: bool,
        /// Remote source file.
        src: String,
        /// Remote destination file.
        dst: String,
    },
    /// Print the contents of a remote file.
    Cat {
        /// Remote file.
        path: String,
    },
    /// Upload local files; the local path may end in a glob.
    Put {
        /// Octal permission bits for the remote files.
        #[arg(long, value_parser = parse_mode)]
        mode: Option<u32>,
        /// Local file or glob.
        local: String,
        /// Remote file or directory.
        remote: String,
    },
    /// Download a remote file.
    Get {
        /// Remote file.
        remote: String,
        /// Local destination; gains a `.HOST` suffix when several hosts are
        /// targeted.
        local: String,
    },
    /// Upload a local directory tree.
    PutTree(TreeArgs),
    /// Download a remote directory tree.
    GetTree(TreeArgs),
    /// Copy a remote directory tree to another remote path.
    Copytree(TreeArgs),
    /// Run a shell command on the remote host.
    Run {
        /// Command to execute (use -- to separate flags). A single argument
        /// is passed to the remote shell as written.
        #[arg(required = true, trailing_var_arg = true)]
        command: Vec<String>,
    },
    /// Run a shell command on the remote host through sudo.
    Sudo {
        /// Run as this user (name or numeric uid) instead of root.
        #[arg(long, short)]
        user: Option<String>,
        /// Command to execute (use -- to separate flags).
        #[arg(required = true, trailing_var_arg = true)]
        command: Vec<String>,
    },
}

/// Arguments for `rfsutil exists`.
#[derive(Clone, Debug, Args)]
pub(crate) struct ExistsArgs {
    /// Require a directory.
    #[arg(long, conflicts_with_all = ["file", "symlink"])]
    pub(crate) dir: bool,
    /// Require a regular file.
    #[arg(long, conflicts_with = "symlink")]
    pub(crate) file: bool,
    /// Require a symbolic link (which need not resolve).
    #[arg(long)]
    pub(crate) symlink: bool,
    /// Remote path.
    pub(crate) path: String,
}

/// Source, destination and ignore patterns for the tree commands.
#[derive(Clone, Debug, Args)]
pub(crate) struct TreeArgs {
    /// Glob of entry names to skip; repeatable.
    #[arg(long, value_name = "PATTERN")]
    pub(crate) ignore: Vec<String>,
    /// Source directory.
    pub(crate) src: String,
    /// Destination directory.
    pub(crate) dst: String,
}

fn parse_mode(value: &str) -> Result<u32, String> {
    let digits = value.strip_prefix("0o").unwrap_or(value);
    match u32::from_str_radix(digits, 8) {
        Ok(mode) if mode <= 0o7777 => Ok(mode),
        _ => Err(format!("'{value}' is not an octal mode between 0 and 7777")),
    }
}
