//! POSIX scripts backing each filesystem operation.
//!
//! Every script reports failures through errno-valued exit statuses so the
//! caller can classify them without parsing localised messages. Scripts are
//! plain `sh` and rely only on utilities found on any POSIX host plus GNU or
//! BusyBox `stat -c`.

use super::path;
use super::stat::STAT_FORMAT;
use crate::session::quote_path;

const ENOENT: i32 = 2;
const EEXIST: i32 = 17;
const ENOTDIR: i32 = 20;
const EISDIR: i32 = 21;
const ENOTEMPTY: i32 = 39;

const PERMISSION_BITS: u32 = 0o7777;

/// Prints the attributes of `path`, following symlinks when `follow`.
pub(crate) fn stat(path: &str, follow: bool) -> String {
    let p = quote_path(path);
    if follow {
        format!("[ -e {p} ] || exit {ENOENT}\nexec stat -L -c '{STAT_FORMAT}' {p}")
    } else {
        format!("[ -e {p} ] || [ -L {p} ] || exit {ENOENT}\nexec stat -c '{STAT_FORMAT}' {p}")
    }
}

/// Lists entry names NUL-separated, each prefixed with `./`.
pub(crate) fn listdir(path: &str) -> String {
    let p = quote_path(path);
    format!(
        "[ -e {p} ] || exit {ENOENT}\n[ -d {p} ] || exit {ENOTDIR}\ncd {p} || exit 1\nexec find . -mindepth 1 -maxdepth 1 -print0"
    )
}

/// Creates one directory, honouring the remote umask. File-type bits in
/// `mode` are dropped.
pub(crate) fn mkdir(path: &str, mode: u32) -> String {
    let p = quote_path(path);
    let parent = quote_path(&path::parent(path));
    let bits = mode & PERMISSION_BITS;
    format!(
        "{{ [ -e {p} ] || [ -L {p} ]; }} && exit {EEXIST}\n[ -e {parent} ] || exit {ENOENT}\n[ -d {parent} ] || exit {ENOTDIR}\nexec mkdir -m \"$(printf '%o' $(( 0{bits:o} & ~0$(umask) )))\" {p}"
    )
}

/// Removes an empty directory.
pub(crate) fn rmdir(path: &str) -> String {
    let p = quote_path(path);
    format!(
        "[ -e {p} ] || [ -L {p} ] || exit {ENOENT}\nif [ ! -d {p} ] || [ -L {p} ]; then exit {ENOTDIR}; fi\n[ -z \"$(ls -A {p})\" ] || exit {ENOTEMPTY}\nexec rmdir {p}"
    )
}

/// Removes a non-directory.
pub(crate) fn remove(path: &str) -> String {
    let p = quote_path(path);
    format!(
        "[ -e {p} ] || [ -L {p} ] || exit {ENOENT}\nif [ -d {p} ] && [ ! -L {p} ]; then exit {EISDIR}; fi\nexec rm -f {p}"
    )
}

/// Renames `old` to `new`, replacing a file or empty directory at `new` the
/// way `rename(2)` does.
pub(crate) fn rename(old: &str, new: &str) -> String {
    let o = quote_path(old);
    let n = quote_path(new);
    [
        format!("[ -e {o} ] || [ -L {o} ] || exit {ENOENT}"),
        format!("if [ -d {n} ] && [ ! -L {n} ]; then"),
        format!("  if [ ! -d {o} ] || [ -L {o} ]; then exit {EISDIR}; fi"),
        format!("  [ -z \"$(ls -A {n})\" ] || exit {ENOTEMPTY}"),
        format!("  rmdir {n} || exit 1"),
        format!("elif [ -d {o} ] && [ ! -L {o} ] && {{ [ -e {n} ] || [ -L {n} ]; }}; then"),
        format!("  exit {ENOTDIR}"),
        format!("elif [ -L {n} ]; then"),
        format!("  rm -f {n} || exit 1"),
        String::from("fi"),
        format!("exec mv -f {o} {n}"),
    ]
    .join("\n")
}

/// Copies a file with its mode and timestamps.
pub(crate) fn copy2(src: &str, dst: &str) -> String {
    let s = quote_path(src);
    let d = quote_path(dst);
    format!(
        "[ -e {s} ] || exit {ENOENT}\nif [ -d {s} ]; then exit {EISDIR}; fi\nexec cp -p {s} {d}"
    )
}

/// Prints the contents of a file.
pub(crate) fn read(path: &str) -> String {
    let p = quote_path(path);
    format!("[ -e {p} ] || exit {ENOENT}\nif [ -d {p} ]; then exit {EISDIR}; fi\nexec cat {p}")
}

/// Creates `path` or truncates it when `truncate`, otherwise leaves existing
/// contents alone.
pub(crate) fn create(path: &str, truncate: bool) -> String {
    let p = quote_path(path);
    let parent = quote_path(&path::parent(path));
    let redirect = if truncate { ">" } else { ">>" };
    format!(
        "if [ -d {p} ]; then exit {EISDIR}; fi\n[ -e {parent} ] || exit {ENOENT}\n[ -d {parent} ] || exit {ENOTDIR}\n: {redirect} {p}"
    )
}

/// Appends standard input to `path`.
pub(crate) fn append(path: &str) -> String {
    format!("cat >> {}", quote_path(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mkdir_applies_umask_to_requested_mode() {
        let script = mkdir("/srv/app", 0o755);
        assert!(script.contains("[ -d /srv ] || exit 20"), "{script}");
        assert!(
            script.ends_with("mkdir -m \"$(printf '%o' $(( 0755 & ~0$(umask) )))\" /srv/app"),
            "{script}"
        );
    }

    #[test]
    fn mkdir_drops_file_type_bits() {
        let script = mkdir("/srv/app", 0o040_755);
        assert!(script.contains("$(( 0755 & ~0$(umask) ))"), "{script}");
    }

    #[test]
    fn paths_are_quoted_and_guarded() {
        let script = remove("-odd name");
        assert!(script.contains("'./-odd name'"), "{script}");
    }

    #[test]
    fn stat_follows_links_only_when_asked() {
        assert!(stat("/p", true).contains("stat -L -c"));
        assert!(!stat("/p", false).contains("-L -c"));
        assert!(stat("/p", false).contains("[ -L /p ]"));
    }
}
