//! Remote command string building.
//!
//! SSH hands its command argument to the remote login shell, so every string
//! built here must survive one round of shell parsing. User commands are
//! wrapped in the configured interpreter, `sudo` invocations gain their
//! prompt and user flags, and internal scripts always run under `sh -c` so
//! they behave the same whatever the remote login shell is.

use shell_escape::unix::escape;

use crate::config::RemoteConfig;

/// Wraps `command` in the configured shell interpreter, for example
/// `/bin/bash -l -c 'ls /var/www'`.
pub(crate) fn wrap_in_shell(shell: &str, command: &str) -> String {
    let escaped = escape(command.into());
    format!("{shell} {escaped}")
}

/// Builds the `sudo` prefix for an optional target user.
///
/// Numeric users are rendered as `#uid`, which `sudo` interprets as a user
/// id rather than a name.
pub(crate) fn sudo_prefix(config: &RemoteConfig, user: Option<&str>) -> String {
    let prompt = escape(config.sudo_prompt.as_str().into());
    match user {
        Some(name) => {
            let target = if !name.is_empty() && name.chars().all(|ch| ch.is_ascii_digit()) {
                format!("#{name}")
            } else {
                name.to_owned()
            };
            let escaped_user = escape(target.into());
            format!("sudo -S -p {prompt} -u {escaped_user}")
        }
        None => format!("sudo -S -p {prompt}"),
    }
}

/// Builds a full `sudo` command line running `command` through the shell.
pub(crate) fn sudo_command(config: &RemoteConfig, command: &str, user: Option<&str>) -> String {
    let prefix = sudo_prefix(config, user);
    let wrapped = wrap_in_shell(&config.shell, command);
    format!("{prefix} {wrapped}")
}

/// Wraps an internal POSIX script in `sh -c`.
pub(crate) fn sh_script(script: &str) -> String {
    wrap_in_shell("sh -c", script)
}

/// Quotes a remote path for use as a single script word.
///
/// Paths beginning with `-` gain a `./` prefix so no utility can mistake
/// them for an option.
pub(crate) fn quote_path(path: &str) -> String {
    if path.starts_with('-') {
        escape(format!("./{path}").into()).into_owned()
    } else {
        escape(path.into()).into_owned()
    }
}
