//! POSIX path helpers for remote paths.
//!
//! Remote paths are always `/`-separated whatever the local platform, so
//! these work on plain strings rather than `std::path`.

/// Splits `path` into directory and final component, the way POSIX
/// `dirname`/`basename` pairs do: trailing separators on the head are
/// dropped unless the head is only separators.
pub(crate) fn split(path: &str) -> (String, String) {
    match path.rsplit_once('/') {
        None => (String::new(), path.to_owned()),
        Some((head, tail)) => {
            let with_sep = format!("{head}/");
            let trimmed = with_sep.trim_end_matches('/');
            let dir = if trimmed.is_empty() {
                with_sep.clone()
            } else {
                trimmed.to_owned()
            };
            (dir, tail.to_owned())
        }
    }
}

/// Joins `name` onto `base`. An absolute `name` replaces `base`.
pub(crate) fn join(base: &str, name: &str) -> String {
    if name.starts_with('/') || base.is_empty() {
        name.to_owned()
    } else if base.ends_with('/') {
        format!("{base}{name}")
    } else {
        format!("{base}/{name}")
    }
}

/// Directory that contains `path`, `.` for a bare name.
pub(crate) fn parent(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return String::from("/");
    }
    let (head, _) = split(trimmed);
    if head.is_empty() {
        String::from(".")
    } else {
        head
    }
}

/// Converts locally derived path fragments to remote form.
#[cfg(windows)]
pub(crate) fn unixpath(path: &str) -> String {
    from_windows(path)
}

#[cfg(any(windows, test))]
fn from_windows(path: &str) -> String {
    strip_drive(path).replace('\\', "/")
}

/// Drops a leading drive letter or `\\server\share` prefix.
#[cfg(any(windows, test))]
fn strip_drive(path: &str) -> &str {
    let is_sep = |c: char| c == '\\' || c == '/';
    let mut chars = path.chars();
    match (chars.next(), chars.next()) {
        (Some(letter), Some(':')) if letter.is_ascii_alphabetic() => chars.as_str(),
        (Some(first), Some(second)) if is_sep(first) && is_sep(second) => {
            let Some((server, after_server)) = chars.as_str().split_once(is_sep) else {
                return path;
            };
            if server.is_empty() || after_server.is_empty() || after_server.starts_with(is_sep) {
                return path;
            }
            after_server
                .find(is_sep)
                .and_then(|index| after_server.get(index..))
                .unwrap_or_default()
        }
        _ => path,
    }
}

/// Converts locally derived path fragments to remote form.
#[cfg(not(windows))]
pub(crate) fn unixpath(path: &str) -> String {
    path.to_owned()
}
