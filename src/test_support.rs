//! Test support utilities shared across unit and integration tests.

use std::cell::RefCell;
use std::collections::{BTreeSet, VecDeque};
use std::env;
use std::ffi::OsString;
use std::rc::Rc;

use camino::Utf8PathBuf;
use shell_escape::unix::escape;
use tokio::sync::{Mutex, MutexGuard};

use crate::config::RemoteConfig;
use crate::session::{CommandOutput, CommandRunner, Invocation, ProcessCommandRunner, SessionError};

/// Scripted command runner that returns pre-seeded outputs in FIFO order.
///
/// Used to drive deterministic command outcomes without spawning processes.
#[derive(Clone, Debug, Default)]
pub struct ScriptedRunner {
    responses: Rc<RefCell<VecDeque<CommandOutput>>>,
    invocations: Rc<RefCell<Vec<CommandInvocation>>>,
}

/// Records a single invocation made through [`ScriptedRunner`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandInvocation {
    /// Program name as passed to the runner.
    pub program: String,
    /// Arguments passed to the program.
    pub args: Vec<OsString>,
    /// Bytes supplied on standard input, if any.
    pub stdin: Option<Vec<u8>>,
    /// Whether output was forwarded to the terminal.
    pub echoed: bool,
}

impl CommandInvocation {
    /// Returns a shell-like command string for assertions.
    #[must_use]
    pub fn command_string(&self) -> String {
        let mut parts = Vec::with_capacity(self.args.len() + 1);
        parts.push(self.program.clone());
        parts.extend(
            self.args
                .iter()
                .map(|arg| arg.to_string_lossy().into_owned()),
        );
        parts.join(" ")
    }

    /// Returns the command string handed to the remote side, which is the
    /// final `ssh` argument.
    #[must_use]
    pub fn remote_command(&self) -> String {
        self.args
            .last()
            .map(|arg| arg.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

impl ScriptedRunner {
    /// Creates a new runner with no queued responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all invocations recorded so far.
    #[must_use]
    pub fn invocations(&self) -> Vec<CommandInvocation> {
        self.invocations.borrow().clone()
    }

    /// Pushes a successful exit status.
    pub fn push_success(&self) {
        self.push_output(Some(0), Vec::<u8>::new(), "");
    }

    /// Pushes a successful exit status with standard output.
    pub fn push_stdout(&self, stdout: impl Into<Vec<u8>>) {
        self.push_output(Some(0), stdout, "");
    }

    /// Pushes a specific exit code.
    pub fn push_exit_code(&self, code: i32) {
        self.push_output(Some(code), Vec::<u8>::new(), "");
    }

    /// Pushes a failing exit code with stderr text.
    pub fn push_failure(&self, code: i32) {
        self.push_output(Some(code), Vec::<u8>::new(), "simulated failure");
    }

    /// Pushes a response with no exit code to simulate abnormal termination.
    pub fn push_missing_exit_code(&self) {
        self.push_output(None, Vec::<u8>::new(), "");
    }

    /// Pushes an explicit command output response.
    pub fn push_output(
        &self,
        code: Option<i32>,
        stdout: impl Into<Vec<u8>>,
        stderr: impl Into<String>,
    ) {
        self.responses.borrow_mut().push_back(CommandOutput {
            code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        });
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, invocation: &Invocation<'_>) -> Result<CommandOutput, SessionError> {
        self.invocations.borrow_mut().push(CommandInvocation {
            program: invocation.program.to_owned(),
            args: invocation.args.to_vec(),
            stdin: invocation.stdin.map(<[u8]>::to_vec),
            echoed: invocation.echo.is_some(),
        });
        self.responses
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| SessionError::Spawn {
                program: invocation.program.to_owned(),
                message: String::from("no scripted response available"),
            })
    }
}

/// Runner that executes the remote command on the local machine instead of
/// over SSH, starting in `home` so `~` resolves to a scratch directory.
///
/// The final `ssh` argument is handed to `sh -c`, which is what the remote
/// login shell does with it.
#[derive(Clone, Debug)]
pub struct LocalShellRunner {
    home: Utf8PathBuf,
}

impl LocalShellRunner {
    /// Creates a runner whose remote working directory is `home`.
    #[must_use]
    pub fn new(home: impl Into<Utf8PathBuf>) -> Self {
        Self { home: home.into() }
    }

    /// Returns a configuration suited to local execution: plain `sh` as the
    /// command interpreter and a placeholder host.
    #[must_use]
    pub fn config() -> RemoteConfig {
        RemoteConfig {
            host: Some(String::from("tester@localhost")),
            shell: String::from("sh -c"),
            show_running: false,
            ..RemoteConfig::default()
        }
    }
}

impl CommandRunner for LocalShellRunner {
    fn run(&self, invocation: &Invocation<'_>) -> Result<CommandOutput, SessionError> {
        let remote = invocation
            .args
            .last()
            .map(|arg| arg.to_string_lossy().into_owned())
            .unwrap_or_default();
        let home = escape(self.home.as_str().into());
        let args = [
            OsString::from("-c"),
            OsString::from(format!("cd {home} && {remote}")),
        ];
        let local = Invocation {
            program: "sh",
            args: &args,
            stdin: invocation.stdin,
            echo: invocation.echo,
        };
        ProcessCommandRunner.run(&local)
    }
}

/// Global mutex used to serialise environment mutation in tests.
pub static ENV_LOCK: Mutex<()> = Mutex::const_new(());

/// Guard that holds the env mutex and cleans up variables on drop.
pub struct EnvGuard {
    previous: Vec<(String, Option<OsString>)>,
    _guard: MutexGuard<'static, ()>,
}

impl EnvGuard {
    /// Sets multiple environment variables while holding a global mutex.
    pub async fn set_vars(pairs: &[(&str, &str)]) -> Self {
        debug_assert!(
            {
                let mut seen = BTreeSet::new();
                pairs.iter().all(|(key, _)| seen.insert(*key))
            },
            "duplicate environment variable keys passed to EnvGuard::set_vars"
        );

        let guard = ENV_LOCK.lock().await;
        let mut previous = Vec::with_capacity(pairs.len());
        for (key, value) in pairs {
            let old = env::var_os(key);
            // SAFETY: Environment mutation is serialised by `ENV_LOCK`, preventing races.
            unsafe { env::set_var(key, value) };
            previous.push(((*key).to_owned(), old));
        }

        Self {
            previous,
            _guard: guard,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, old) in &self.previous {
            // SAFETY: Environment mutation is serialised by holding `_guard`.
            unsafe {
                match old {
                    Some(val) => env::set_var(key, val),
                    None => env::remove_var(key),
                }
            }
        }
    }
}
