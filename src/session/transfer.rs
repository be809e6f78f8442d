//! Single-file upload and download over the SSH channel.
//!
//! Files travel through `cat` on the remote side: uploads pipe the local
//! bytes into `cat > path`, downloads capture the output of `cat path`.

use camino::{Utf8Path, Utf8PathBuf};
use tracing::info;

use super::remote_command::quote_path;
use super::{CommandRunner, Session, SessionError, expand_tilde, failure};
use crate::local;

impl<R: CommandRunner> Session<R> {
    /// Uploads local files to the remote host.
    ///
    /// `local_path` may start with `~` and may carry a glob in its final
    /// component. When `remote_path` is an existing remote directory each
    /// file lands inside it under its own name. The remote file receives
    /// `mode` when given, otherwise the local file's permission bits.
    ///
    /// Returns the remote paths written.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Local`] when nothing matches `local_path` or
    /// a local file cannot be read, and [`SessionError::CommandFailure`]
    /// for a failed upload when failures abort.
    pub fn put(
        &self,
        local_path: &str,
        remote_path: &str,
        mode: Option<u32>,
    ) -> Result<Vec<String>, SessionError> {
        let pattern = expand_tilde(local_path);
        let sources = local::expand_glob(&pattern)
            .map_err(|err| SessionError::local(pattern.as_str(), &err))?;
        if sources.is_empty() {
            return Err(SessionError::local(
                pattern,
                &"is not a valid local path or glob",
            ));
        }

        let remote = self.expand_remote_tilde(remote_path)?;
        let into_dir = self.remote_is_dir(&remote)?;
        let mut written = Vec::with_capacity(sources.len());
        for source in sources {
            let destination = match (into_dir, source.file_name()) {
                (true, Some(name)) => join_remote(&remote, name),
                _ => remote.clone(),
            };
            if self.config.show_running {
                info!(host = %self.host, "put: {source} -> {destination}");
            }
            match self.upload_file(&source, &destination, mode) {
                Ok(()) => written.push(destination),
                Err(err) => self.handle_failure(err)?,
            }
        }
        Ok(written)
    }

    /// Downloads `remote_path` into the local file `local_path`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::CommandFailure`] when the remote file cannot
    /// be read, or [`SessionError::Local`] when the local file cannot be
    /// written, in both cases only when failures abort.
    pub fn get(&self, remote_path: &str, local_path: &str) -> Result<(), SessionError> {
        let remote = self.expand_remote_tilde(remote_path)?;
        let local_target = Utf8PathBuf::from(expand_tilde(local_path));
        if self.config.show_running {
            info!(host = %self.host, "get: {remote} -> {local_target}");
        }
        match self.download_file(&remote, &local_target) {
            Ok(()) => Ok(()),
            Err(err) => self.handle_failure(err),
        }
    }

    /// Uploads one local file, ignoring the failure policy.
    pub(crate) fn upload_file(
        &self,
        source: &Utf8Path,
        destination: &str,
        mode: Option<u32>,
    ) -> Result<(), SessionError> {
        let contents = local::read_file(source).map_err(|err| SessionError::local(source, &err))?;
        let permissions = match mode {
            Some(bits) => Some(bits),
            None => local::file_mode(source).map_err(|err| SessionError::local(source, &err))?,
        };
        let quoted = quote_path(destination);
        let script = match permissions {
            Some(bits) => format!("cat > {quoted} && chmod {bits:o} {quoted}"),
            None => format!("cat > {quoted}"),
        };
        let output = self.run_script_with_input(&script, &contents)?;
        if output.is_success() {
            Ok(())
        } else {
            Err(failure("put", &format!("{source} -> {destination}"), &output))
        }
    }

    /// Downloads one remote file, ignoring the failure policy.
    pub(crate) fn download_file(
        &self,
        source: &str,
        destination: &Utf8Path,
    ) -> Result<(), SessionError> {
        let output = self.run_script(&format!("cat {}", quote_path(source)))?;
        if !output.is_success() {
            return Err(failure("get", &format!("{source} -> {destination}"), &output));
        }
        local::write_file(destination, &output.stdout)
            .map_err(|err| SessionError::local(destination, &err))
    }

    /// Replaces a leading `~` in a remote path with the remote working
    /// directory.
    pub(crate) fn expand_remote_tilde(&self, path: &str) -> Result<String, SessionError> {
        if path == "~" {
            return self.remote_cwd();
        }
        match path.strip_prefix("~/") {
            Some(rest) => Ok(join_remote(&self.remote_cwd()?, rest)),
            None => Ok(path.to_owned()),
        }
    }

    fn remote_is_dir(&self, path: &str) -> Result<bool, SessionError> {
        let output = self.run_script(&format!("[ -d {} ]", quote_path(path)))?;
        Ok(output.is_success())
    }
}

fn join_remote(base: &str, name: &str) -> String {
    if base.is_empty() || base.ends_with('/') {
        format!("{base}{name}")
    } else {
        format!("{base}/{name}")
    }
}
