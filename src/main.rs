//! Binary entry point for the rfsutil CLI.

use std::fmt::Display;
use std::io::{self, Read, Write};
use std::process;

use clap::Parser;
use shell_escape::unix::escape;
use thiserror::Error;
use tokio::task;
use tracing::Level;

use rfsutil::rfs::{IgnoreFn, ignore_patterns};
use rfsutil::{
    ConfigLoadError, FsError, HostParseError, HostString, OnError, ProcessCommandRunner,
    RemoteCommandOutput, RemoteConfig, RemoteStat, Session, SessionError,
};

mod cli;

use cli::{Cli, Command, ExistsArgs, TreeArgs};

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigLoadError),
    #[error(transparent)]
    Host(#[from] HostParseError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Fs(#[from] FsError),
    #[error("read failed: {0}")]
    Io(#[from] io::Error),
    #[error("remote command terminated without an exit status")]
    MissingExitCode,
    #[error("invalid command argument: {0}")]
    InvalidCommand(String),
    #[error("host task failed: {0}")]
    Task(String),
}

impl CliError {
    /// Process exit status for this error: the remote status of a failed
    /// `run` or `sudo`, otherwise 1.
    fn exit_code(&self) -> i32 {
        match *self {
            Self::Session(SessionError::CommandFailure {
                ref program,
                status: Some(code),
                ..
            }) if code != 0 && matches!(program.as_str(), "run" | "sudo") => code,
            _ => 1,
        }
    }
}

/// What one host produced: captured standard output and an exit status.
#[derive(Debug, Default)]
struct Outcome {
    stdout: Vec<u8>,
    code: i32,
}

#[derive(Debug)]
struct Report {
    label: String,
    result: Result<Outcome, CliError>,
}

type Fs<'s> = rfsutil::RemoteFs<'s, ProcessCommandRunner>;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);
    let exit_code = match dispatch(cli).await {
        Ok(code) => code,
        Err(err) => {
            report_error(&err);
            err.exit_code()
        }
    };

    process::exit(exit_code);
}

fn init_tracing(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => Level::WARN,
        (false, 0) => Level::INFO,
        (false, 1) => Level::DEBUG,
        (false, _) => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .without_time()
        .with_writer(io::stderr)
        .init();
}

async fn dispatch(cli: Cli) -> Result<i32, CliError> {
    if let Command::Run { ref command } | Command::Sudo { ref command, .. } = cli.command {
        validate_command_args(command)?;
    }
    let config = RemoteConfig::load_without_cli_args()?;
    let targets = parse_hosts(&cli.hosts)?;
    let several = targets.len() > 1;

    let mut handles = Vec::with_capacity(targets.len());
    for target in targets {
        let label = target.as_ref().map_or_else(
            || config.host.clone().unwrap_or_default(),
            ToString::to_string,
        );
        let task_config = config.clone();
        let command = cli.command.clone();
        let handle =
            task::spawn_blocking(move || execute(task_config, target, &command, several));
        handles.push((label, handle));
    }

    let mut reports = Vec::with_capacity(handles.len());
    for (label, handle) in handles {
        let result = handle
            .await
            .unwrap_or_else(|err| Err(CliError::Task(err.to_string())));
        reports.push(Report { label, result });
    }

    Ok(summarise(&reports, io::stdout(), io::stderr()))
}

/// Parses `--host` values; with none given, a single `None` target selects
/// the configured host.
fn parse_hosts(hosts: &[String]) -> Result<Vec<Option<HostString>>, CliError> {
    if hosts.is_empty() {
        return Ok(vec![None]);
    }
    hosts
        .iter()
        .map(|raw| {
            raw.parse::<HostString>()
                .map(Some)
                .map_err(CliError::from)
        })
        .collect()
}

/// Writes every report and returns the process exit status.
fn summarise(reports: &[Report], mut out: impl Write, mut err: impl Write) -> i32 {
    let several = reports.len() > 1;
    let mut status = 0;
    for report in reports {
        let label = several.then_some(report.label.as_str());
        let code = match report.result {
            Ok(ref outcome) => {
                write_output(&mut out, label, &outcome.stdout);
                outcome.code
            }
            Err(ref failure) => {
                write_labelled_error(&mut err, label, failure);
                failure.exit_code()
            }
        };
        if several {
            if code != 0 {
                status = 1;
            }
        } else {
            status = code;
        }
    }
    status
}

fn execute(
    config: RemoteConfig,
    host: Option<HostString>,
    command: &Command,
    several: bool,
) -> Result<Outcome, CliError> {
    let session = Session::with_process_runner(config, host)?;
    let fs = session.fs();
    let mut outcome = Outcome::default();
    let out = &mut outcome.stdout;

    match *command {
        Command::Pwd => line(out, fs.getcwd()?),
        Command::Stat {
            no_follow,
            ref path,
        } => {
            let stat = if no_follow {
                fs.lstat(path)?
            } else {
                fs.stat(path)?
            };
            write_stat(out, &stat);
        }
        Command::Exists(ref args) => line(out, check_exists(fs, args)?),
        Command::Ls { ref path } => {
            for name in fs.listdir(path)? {
                line(out, name);
            }
        }
        Command::Mkdir {
            parents,
            mode,
            ref path,
        } => {
            if parents {
                fs.makedirs(path, mode)?;
            } else {
                fs.mkdir(path, mode)?;
            }
        }
        Command::Rm { ref path } => fs.remove(path)?,
        Command::Rmdir { ref path } => fs.rmdir(path)?,
        Command::Rmtree {
            ignore_errors,
            ref path,
        } => {
            let on_error = if ignore_errors {
                OnError::Ignore
            } else {
                OnError::Raise
            };
            fs.rmtree(path, on_error)?;
        }
        Command::Mv { ref old, ref new } => fs.rename(old, new)?,
        Command::Cp {
            preserve,
            ref src,
            ref dst,
        } => {
            if preserve {
                fs.copy2(src, dst)?;
            } else {
                fs.copy(src, dst)?;
            }
        }
        Command::Cat { ref path } => {
            let mut file = fs.open(path, "rb", true)?;
            file.read_to_end(out)?;
        }
        Command::Put {
            mode,
            ref local,
            ref remote,
        } => {
            for written in session.put(local, remote, mode)? {
                line(out, written);
            }
        }
        Command::Get {
            ref remote,
            ref local,
        } => session.get(remote, &local_target(local, &session, several))?,
        Command::PutTree(ref args) => {
            let ignore = ignore_fn(args)?;
            fs.put_copytree(&args.src, &args.dst, ignore.as_deref())?;
        }
        Command::GetTree(ref args) => {
            let ignore = ignore_fn(args)?;
            let target = local_target(&args.dst, &session, several);
            fs.get_copytree(&args.src, &target, ignore.as_deref())?;
        }
        Command::Copytree(ref args) => {
            let ignore = ignore_fn(args)?;
            fs.copytree(&args.src, &args.dst, ignore.as_deref())?;
        }
        Command::Run { ref command } => {
            let output = session.run(&render_remote_command(command))?;
            outcome.code = finish_remote(out, &session, &output)?;
        }
        Command::Sudo {
            ref user,
            ref command,
        } => {
            let output = session.sudo(&render_remote_command(command), user.as_deref())?;
            outcome.code = finish_remote(out, &session, &output)?;
        }
    }

    Ok(outcome)
}

fn check_exists(fs: Fs<'_>, args: &ExistsArgs) -> Result<bool, FsError> {
    if args.dir {
        fs.is_dir(&args.path)
    } else if args.file {
        fs.is_file(&args.path)
    } else if args.symlink {
        fs.is_symlink(&args.path)
    } else {
        fs.exists(&args.path)
    }
}

fn ignore_fn(args: &TreeArgs) -> Result<Option<Box<IgnoreFn>>, FsError> {
    if args.ignore.is_empty() {
        return Ok(None);
    }
    let patterns: Vec<&str> = args.ignore.iter().map(String::as_str).collect();
    ignore_patterns(&patterns).map(Some)
}

/// Local download target; several hosts each get a `.host` suffix.
fn local_target(local: &str, session: &Session<ProcessCommandRunner>, several: bool) -> String {
    if several {
        format!("{local}.{}", session.host().host)
    } else {
        local.to_owned()
    }
}

/// Captures remote output unless it was already streamed, and returns the
/// remote exit status.
fn finish_remote(
    out: &mut Vec<u8>,
    session: &Session<ProcessCommandRunner>,
    output: &RemoteCommandOutput,
) -> Result<i32, CliError> {
    if !session.config().show_running && !output.stdout.is_empty() {
        line(out, &output.stdout);
    }
    output.exit_code.ok_or(CliError::MissingExitCode)
}

fn write_stat(out: &mut Vec<u8>, stat: &RemoteStat) {
    line(out, format_args!("kind: {}", stat.kind().name()));
    line(out, format_args!("mode: {:04o}", stat.permissions()));
    line(out, format_args!("size: {}", stat.size));
    line(out, format_args!("uid: {}", stat.uid));
    line(out, format_args!("gid: {}", stat.gid));
    line(out, format_args!("atime: {}", stat.atime));
    line(out, format_args!("mtime: {}", stat.mtime));
}

fn line(out: &mut Vec<u8>, text: impl Display) {
    writeln!(out, "{text}").ok();
}

/// A single argument is a command line for the remote shell; several are
/// quoted individually.
fn render_remote_command(args: &[String]) -> String {
    if let [single] = args {
        return single.clone();
    }

    let mut result = String::new();
    let mut first = true;

    for arg in args {
        if first {
            first = false;
        } else {
            result.push(' ');
        }

        let escaped = escape(arg.as_str().into());
        result.push_str(escaped.as_ref());
    }

    result
}

fn validate_command_args(args: &[String]) -> Result<(), CliError> {
    for arg in args {
        if arg
            .chars()
            .any(|ch| matches!(ch, '\n' | '\r' | '\u{0000}'..='\u{001F}' | '\u{007F}'))
        {
            return Err(CliError::InvalidCommand(String::from(concat!(
                "command arguments must not contain control characters (ASCII ",
                "0x00-0x1F or 0x7F, e.g. newline, carriage return, tab, NUL)"
            ))));
        }
    }
    Ok(())
}

fn write_output(mut target: impl Write, label: Option<&str>, bytes: &[u8]) {
    let Some(host) = label else {
        target.write_all(bytes).ok();
        return;
    };
    for chunk in bytes.split_inclusive(|byte| *byte == b'\n') {
        let text = String::from_utf8_lossy(chunk);
        writeln!(target, "[{host}] {}", text.trim_end_matches(['\r', '\n'])).ok();
    }
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "{err}").ok();
}

fn write_labelled_error(mut target: impl Write, label: Option<&str>, err: &CliError) {
    let Some(host) = label else {
        write_error(target, err);
        return;
    };
    writeln!(target, "[{host}] {err}").ok();
}
