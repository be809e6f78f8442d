//! Local filesystem access for transfers and tree copies.
//!
//! Paths are opened through `cap-std` directory handles. Each helper first
//! resolves symlinks with camino, then opens the real parent directory with
//! ambient authority and works on the final component relative to it, so a
//! link pointing anywhere on the local filesystem behaves like its target.

use std::io;

use cap_std::{
    ambient_authority,
    fs_utf8::{Dir, Metadata},
};
use camino::{Utf8Path, Utf8PathBuf};
use globset::Glob;

const GLOB_CHARS: [char; 4] = ['*', '?', '[', '{'];

fn parent_of(path: &Utf8Path) -> &Utf8Path {
    match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    }
}

fn file_name_of(path: &Utf8Path) -> io::Result<&str> {
    path.file_name().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{path} has no file name"),
        )
    })
}

fn open_parent(path: &Utf8Path) -> io::Result<Dir> {
    Dir::open_ambient_dir(parent_of(path), ambient_authority())
}

/// Resolves an existing path, or the parent of a path still to be created.
fn resolve_for_write(path: &Utf8Path) -> io::Result<Utf8PathBuf> {
    match path.canonicalize_utf8() {
        Ok(real) => Ok(real),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            let name = file_name_of(path)?;
            Ok(parent_of(path).canonicalize_utf8()?.join(name))
        }
        Err(err) => Err(err),
    }
}

fn metadata(path: &Utf8Path) -> io::Result<Metadata> {
    let real = path.canonicalize_utf8()?;
    match real.file_name() {
        Some(name) => open_parent(&real)?.metadata(name),
        None => Dir::open_ambient_dir(&real, ambient_authority())?.dir_metadata(),
    }
}

/// Reads the whole file at `path`.
pub(crate) fn read_file(path: &Utf8Path) -> io::Result<Vec<u8>> {
    let real = path.canonicalize_utf8()?;
    open_parent(&real)?.read(file_name_of(&real)?)
}

/// Writes `contents` to `path`, creating or truncating the file. The parent
/// directory must exist.
pub(crate) fn write_file(path: &Utf8Path, contents: &[u8]) -> io::Result<()> {
    let real = resolve_for_write(path)?;
    open_parent(&real)?.write(file_name_of(&real)?, contents)
}

/// Creates `path` and any missing parents.
pub(crate) fn create_dir_all(path: &Utf8Path) -> io::Result<()> {
    Dir::create_ambient_dir_all(path, ambient_authority())
}

/// Returns whether `path` names an existing directory.
pub(crate) fn is_dir(path: &Utf8Path) -> bool {
    metadata(path).is_ok_and(|meta| meta.is_dir())
}

/// Lists the entry names of the directory at `path`, sorted.
pub(crate) fn list_dir(path: &Utf8Path) -> io::Result<Vec<String>> {
    let dir = Dir::open_ambient_dir(path, ambient_authority())?;
    let mut names = dir
        .entries()?
        .map(|entry| entry.and_then(|e| e.file_name()))
        .collect::<io::Result<Vec<_>>>()?;
    names.sort();
    Ok(names)
}

/// Returns the permission bits of the local file at `path`.
#[cfg(unix)]
pub(crate) fn file_mode(path: &Utf8Path) -> io::Result<Option<u32>> {
    use std::os::unix::fs::PermissionsExt;

    let metadata = std::fs::metadata(path)?;
    Ok(Some(metadata.permissions().mode() & 0o7777))
}

/// Returns the permission bits of the local file at `path`.
#[cfg(not(unix))]
pub(crate) fn file_mode(_path: &Utf8Path) -> io::Result<Option<u32>> {
    Ok(None)
}

/// Expands a glob in the final component of `pattern`.
///
/// A pattern without glob characters yields itself when it exists. Matches
/// are sorted and hidden entries only match patterns that start with a dot.
pub(crate) fn expand_glob(pattern: &str) -> io::Result<Vec<Utf8PathBuf>> {
    let path = Utf8Path::new(pattern);
    let Some(name_pattern) = path.file_name() else {
        return Ok(existing(path));
    };
    if !name_pattern.contains(GLOB_CHARS) {
        return Ok(existing(path));
    }

    let matcher = Glob::new(name_pattern)
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err.to_string()))?
        .compile_matcher();
    let parent = path.parent().unwrap_or_else(|| Utf8Path::new(""));
    let listing_dir = parent_of(path);
    let names = match list_dir(listing_dir) {
        Ok(names) => names,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err),
    };
    Ok(names
        .into_iter()
        .filter(|name| name_pattern.starts_with('.') || !name.starts_with('.'))
        .filter(|name| matcher.is_match(name))
        .map(|name| parent.join(name))
        .collect())
}

fn existing(path: &Utf8Path) -> Vec<Utf8PathBuf> {
    if metadata(path).is_ok() {
        vec![path.to_path_buf()]
    } else {
        Vec::new()
    }
}
