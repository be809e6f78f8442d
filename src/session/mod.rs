//! SSH sessions: remote command execution and single-file transfer.
//!
//! A [`Session`] binds a validated [`RemoteConfig`] to one target host and a
//! [`CommandRunner`]. Every remote interaction goes through the system `ssh`
//! client, so the runner seam is the only place processes are spawned and
//! tests can substitute scripted fakes.

use std::cell::OnceCell;
use std::ffi::OsString;

use tracing::{debug, info, warn};

use crate::config::RemoteConfig;
use crate::host::HostString;
use crate::rfs::RemoteFs;

mod error;
mod remote_command;
mod stream;
mod transfer;
mod types;
mod util;

pub use error::SessionError;
pub use types::{CommandOutput, CommandRunner, Invocation, ProcessCommandRunner, RemoteCommandOutput};
pub use util::expand_tilde;

pub(crate) use remote_command::{quote_path, sh_script};

/// Exit status the OpenSSH client reserves for its own failures.
const SSH_ERROR_STATUS: i32 = 255;

/// Remote command execution bound to one host.
#[derive(Clone, Debug)]
pub struct Session<R: CommandRunner> {
    config: RemoteConfig,
    host: HostString,
    runner: R,
    cwd: OnceCell<String>,
}

impl Session<ProcessCommandRunner> {
    /// Convenience constructor that wires the real process runner.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidConfig`] when validation fails or
    /// [`SessionError::MissingHost`] when no host is available.
    pub fn with_process_runner(
        config: RemoteConfig,
        host: Option<HostString>,
    ) -> Result<Self, SessionError> {
        Self::new(config, host, ProcessCommandRunner)
    }
}

impl<R: CommandRunner> Session<R> {
    /// Creates a session for `host`, falling back to the configured host.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidConfig`] when configuration validation
    /// fails, [`SessionError::InvalidHost`] when the configured host string
    /// is malformed, or [`SessionError::MissingHost`] when neither source
    /// names a host.
    pub fn new(
        config: RemoteConfig,
        host: Option<HostString>,
        runner: R,
    ) -> Result<Self, SessionError> {
        config.validate()?;
        let target = match host {
            Some(explicit) => explicit,
            None => config.default_host()?.ok_or(SessionError::MissingHost)?,
        };
        let host = target.with_default_user(config.user.as_deref());
        Ok(Self {
            config,
            host,
            runner,
            cwd: OnceCell::new(),
        })
    }

    /// Returns a reference to the underlying configuration.
    #[must_use]
    pub const fn config(&self) -> &RemoteConfig {
        &self.config
    }

    /// Returns the target host.
    #[must_use]
    pub const fn host(&self) -> &HostString {
        &self.host
    }

    /// Returns a remote filesystem view over this session.
    #[must_use]
    pub const fn fs(&self) -> RemoteFs<'_, R> {
        RemoteFs::new(self)
    }

    /// Returns a copy of this session whose failed commands warn instead of
    /// aborting.
    #[must_use]
    pub fn warnings_only(&self) -> Self
    where
        R: Clone,
    {
        let mut copy = self.clone();
        copy.config.abort_on_failure = false;
        copy
    }

    /// Returns a copy of this session that neither echoes commands nor
    /// streams their output.
    #[must_use]
    pub fn hide_running(&self) -> Self
    where
        R: Clone,
    {
        let mut copy = self.clone();
        copy.config.show_running = false;
        copy
    }

    /// Runs a shell command on the remote host.
    ///
    /// The command is wrapped in the configured interpreter (by default
    /// `/bin/bash -l -c`) and its standard output is returned trimmed.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::CommandFailure`] when the command fails and
    /// failures abort, [`SessionError::Connection`] when the host cannot be
    /// reached, or [`SessionError::Spawn`] when `ssh` cannot be started.
    pub fn run(&self, command: &str) -> Result<RemoteCommandOutput, SessionError> {
        if self.config.show_running {
            info!(host = %self.host, "run: {command}");
        }
        let wrapped = remote_command::wrap_in_shell(&self.config.shell, command);
        let output = self.execute(&wrapped, None, self.config.show_running)?;
        self.finish("run", command, output)
    }

    /// Runs a shell command on the remote host with superuser privileges,
    /// optionally as `user` (a name or numeric uid).
    ///
    /// The configured password, if any, is piped to `sudo -S`.
    ///
    /// # Errors
    ///
    /// Same as [`Session::run`].
    pub fn sudo(
        &self,
        command: &str,
        user: Option<&str>,
    ) -> Result<RemoteCommandOutput, SessionError> {
        if self.config.show_running {
            info!(host = %self.host, "sudo: {command}");
        }
        let full = remote_command::sudo_command(&self.config, command, user);
        let password = self.config.password.as_ref().map(|pw| format!("{pw}\n"));
        let output = self.execute(
            &full,
            password.as_deref().map(str::as_bytes),
            self.config.show_running,
        )?;
        self.finish("sudo", command, output)
    }

    /// Returns the remote working directory, querying it once per session.
    ///
    /// # Errors
    ///
    /// Returns any transport error, or [`SessionError::CommandFailure`] when
    /// `pwd` fails.
    pub fn remote_cwd(&self) -> Result<String, SessionError> {
        if let Some(cached) = self.cwd.get() {
            return Ok(cached.clone());
        }
        let output = self.run_script("pwd")?;
        if !output.is_success() {
            return Err(failure("getcwd", "pwd", &output));
        }
        let cwd = output.stdout_text().trim_end_matches(['\r', '\n']).to_owned();
        self.cwd.set(cwd.clone()).ok();
        Ok(cwd)
    }

    /// Runs an internal POSIX script without echoing it.
    pub(crate) fn run_script(&self, script: &str) -> Result<CommandOutput, SessionError> {
        debug!(host = %self.host, script, "remote script");
        self.execute(&sh_script(script), None, false)
    }

    /// Runs an internal POSIX script feeding `input` to its standard input.
    pub(crate) fn run_script_with_input(
        &self,
        script: &str,
        input: &[u8],
    ) -> Result<CommandOutput, SessionError> {
        debug!(host = %self.host, script, bytes = input.len(), "remote script with input");
        self.execute(&sh_script(script), Some(input), false)
    }

    fn execute(
        &self,
        remote_command: &str,
        stdin: Option<&[u8]>,
        echo: bool,
    ) -> Result<CommandOutput, SessionError> {
        let args = self.build_ssh_args(remote_command);
        let label = self.host.host.clone();
        let mut invocation = Invocation::new(&self.config.ssh_bin, &args);
        if let Some(input) = stdin {
            invocation = invocation.with_stdin(input);
        }
        if echo {
            invocation = invocation.with_echo(&label);
        }
        let output = self.runner.run(&invocation)?;
        if output.code == Some(SSH_ERROR_STATUS) {
            return Err(SessionError::Connection {
                host: self.host.to_string(),
                stderr: output.stderr.trim().to_owned(),
            });
        }
        Ok(output)
    }

    /// Applies the failure policy to a finished user command.
    fn finish(
        &self,
        program: &str,
        command: &str,
        output: CommandOutput,
    ) -> Result<RemoteCommandOutput, SessionError> {
        let failed = !output.is_success();
        if failed {
            self.handle_failure(failure(program, command, &output))?;
        }
        Ok(RemoteCommandOutput {
            exit_code: output.code,
            stdout: output.stdout_text().trim().to_owned(),
            stderr: output.stderr,
            failed,
        })
    }

    /// Aborts with `err` or logs it, depending on the failure policy.
    fn handle_failure(&self, err: SessionError) -> Result<(), SessionError> {
        if self.config.abort_on_failure {
            return Err(err);
        }
        warn!(host = %self.host, "{err}");
        Ok(())
    }

    fn build_ssh_args(&self, remote_command: &str) -> Vec<OsString> {
        let mut args = self.common_ssh_options();
        args.push(OsString::from(self.host.destination()));
        args.push(OsString::from(remote_command));
        args
    }

    fn common_ssh_options(&self) -> Vec<OsString> {
        let port = self.host.port_or(self.config.port);
        let mut args = vec![OsString::from("-p"), OsString::from(port.to_string())];

        if let Some(ref identity_file) = self.config.ssh_identity_file {
            args.push(OsString::from("-i"));
            args.push(OsString::from(expand_tilde(identity_file)));
        }

        if self.config.ssh_batch_mode {
            push_option(&mut args, "BatchMode=yes");
        }

        if !self.config.ssh_strict_host_key_checking {
            push_option(&mut args, "StrictHostKeyChecking=no");
        }

        if !self.config.ssh_known_hosts_file.trim().is_empty() {
            push_option(
                &mut args,
                &format!("UserKnownHostsFile={}", self.config.ssh_known_hosts_file),
            );
        }

        if let Some(ref control_path) = self.config.ssh_control_path {
            push_option(&mut args, "ControlMaster=auto");
            push_option(
                &mut args,
                &format!("ControlPath={}", expand_tilde(control_path)),
            );
            push_option(&mut args, "ControlPersist=60");
        }

        args
    }
}

fn push_option(args: &mut Vec<OsString>, option: &str) {
    args.push(OsString::from("-o"));
    args.push(OsString::from(option));
}

pub(crate) fn failure(program: &str, command: &str, output: &CommandOutput) -> SessionError {
    let status_text = output
        .code
        .map_or_else(|| String::from("unknown"), |code| code.to_string());
    SessionError::CommandFailure {
        program: program.to_owned(),
        command: command.to_owned(),
        status: output.code,
        status_text,
        stderr: output.stderr.trim().to_owned(),
    }
}

#[cfg(test)]
mod tests;
