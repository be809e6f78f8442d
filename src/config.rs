//! Connection and behaviour settings loaded via `ortho-config`.
//!
//! [`RemoteConfig`] merges defaults, configuration files (`rfsutil.toml`,
//! `.rfsutil.toml`) and `RFSUTIL_*` environment variables. Validation keeps
//! the error messages actionable by naming both the environment variable and
//! the configuration key that supplies each value.

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

use crate::host::{HostParseError, HostString};
use crate::session::SessionError;

/// Default interpreter used to wrap commands passed to `run` and `sudo`.
pub const DEFAULT_SHELL: &str = "/bin/bash -l -c";

/// Prompt passed to `sudo -p` so password prompts are recognisable.
pub const DEFAULT_SUDO_PROMPT: &str = "sudo password:";

/// Port used when neither the host string nor configuration name one.
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Remote access settings loaded via `ortho-config`.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(
    prefix = "RFSUTIL",
    discovery(
        app_name = "rfsutil",
        env_var = "RFSUTIL_CONFIG_PATH",
        config_file_name = "rfsutil.toml",
        dotfile_name = ".rfsutil.toml",
        project_file_name = "rfsutil.toml"
    )
)]
#[expect(
    clippy::struct_excessive_bools,
    reason = "configuration struct with user-facing toggle settings that are naturally expressed as booleans"
)]
pub struct RemoteConfig {
    /// Path to the `ssh` executable.
    #[ortho_config(default = "ssh".to_owned())]
    pub ssh_bin: String,
    /// Default host string used when none is given on the command line.
    pub host: Option<String>,
    /// Default login user for hosts that do not name one.
    pub user: Option<String>,
    /// Default SSH port for hosts that do not name one.
    #[ortho_config(default = DEFAULT_SSH_PORT)]
    pub port: u16,
    /// Whether to force batch mode for SSH to avoid password prompts.
    #[ortho_config(default = true)]
    pub ssh_batch_mode: bool,
    /// Whether to reject unknown host keys. Unknown keys are accepted by
    /// default.
    #[ortho_config(default = false)]
    pub ssh_strict_host_key_checking: bool,
    /// Known hosts file override; empty keeps the SSH client's default.
    #[ortho_config(default = String::new())]
    pub ssh_known_hosts_file: String,
    /// Path to the SSH private key file. Supports tilde expansion.
    pub ssh_identity_file: Option<String>,
    /// Control socket path enabling SSH connection multiplexing, so repeated
    /// operations against one host share a single connection.
    pub ssh_control_path: Option<String>,
    /// Interpreter wrapping commands run through `run` and `sudo`.
    #[ortho_config(default = DEFAULT_SHELL.to_owned())]
    pub shell: String,
    /// Prompt string handed to `sudo -p`.
    #[ortho_config(default = DEFAULT_SUDO_PROMPT.to_owned())]
    pub sudo_prompt: String,
    /// Password piped to `sudo -S`, when configured.
    pub password: Option<String>,
    /// Whether failed remote commands abort (error) rather than warn.
    #[ortho_config(default = true)]
    pub abort_on_failure: bool,
    /// Whether to echo `[host] run: <command>` lines and stream output.
    #[ortho_config(default = true)]
    pub show_running: bool,
}

/// Errors raised when loading configuration from layered sources.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigLoadError {
    /// Indicates that parsing or merging configuration layers failed.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            ssh_bin: String::from("ssh"),
            host: None,
            user: None,
            port: DEFAULT_SSH_PORT,
            ssh_batch_mode: true,
            ssh_strict_host_key_checking: false,
            ssh_known_hosts_file: String::new(),
            ssh_identity_file: None,
            ssh_control_path: None,
            shell: DEFAULT_SHELL.to_owned(),
            sudo_prompt: DEFAULT_SUDO_PROMPT.to_owned(),
            password: None,
            abort_on_failure: true,
            show_running: true,
        }
    }
}

impl RemoteConfig {
    /// Ensures configuration values are present after trimming whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidConfig`] when a required field is
    /// empty, or an optional field is configured but blank.
    pub fn validate(&self) -> Result<(), SessionError> {
        Self::require_value(&self.ssh_bin, "ssh_bin")?;
        Self::require_value(&self.shell, "shell")?;
        Self::require_value(&self.sudo_prompt, "sudo_prompt")?;
        Self::require_optional_value(self.host.as_deref(), "host")?;
        Self::require_optional_value(self.user.as_deref(), "user")?;
        Self::require_optional_value(self.ssh_identity_file.as_deref(), "ssh_identity_file")?;
        Self::require_optional_value(self.ssh_control_path.as_deref(), "ssh_control_path")?;
        if self.port == 0 {
            return Err(SessionError::InvalidConfig {
                field: String::from("port"),
            });
        }
        Ok(())
    }

    /// Parses the configured default host, if any.
    ///
    /// # Errors
    ///
    /// Returns [`HostParseError`] when the configured host string is
    /// malformed.
    pub fn default_host(&self) -> Result<Option<HostString>, HostParseError> {
        self.host.as_deref().map(str::parse).transpose()
    }

    /// Loads configuration using defaults, configuration files, and
    /// environment variables without parsing CLI arguments.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigLoadError::Parse`] when merging sources fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigLoadError> {
        Self::load_from_iter([std::ffi::OsString::from("rfsutil")])
            .map_err(|err| ConfigLoadError::Parse(err.to_string()))
    }

    fn require_optional_value(value: Option<&str>, field: &str) -> Result<(), SessionError> {
        match value {
            None => Ok(()),
            Some(v) if !v.trim().is_empty() => Ok(()),
            Some(_) => Err(SessionError::InvalidConfig {
                field: field.to_owned(),
            }),
        }
    }

    fn require_value(value: &str, field: &str) -> Result<(), SessionError> {
        Self::require_optional_value(Some(value), field)
    }
}
