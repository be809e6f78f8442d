//! Tests for single-file upload and download.

use super::super::*;
use camino::Utf8PathBuf;
use rstest::rstest;
use tempfile::TempDir;

use super::fixtures::{base_config, session_with};

fn local_dir() -> (TempDir, Utf8PathBuf) {
    let tmp = TempDir::new().expect("temp dir");
    let root = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).expect("utf8 path");
    (tmp, root)
}

#[rstest]
fn put_uploads_bytes_with_explicit_mode(base_config: RemoteConfig) {
    let (_tmp, root) = local_dir();
    let source = root.join("app.conf");
    std::fs::write(&source, b"listen 80;\n").expect("write source");
    let (session, runner) = session_with(base_config, |r| {
        r.push_exit_code(1);
        r.push_success();
    });

    let written = session
        .put(source.as_str(), "/etc/app.conf", Some(0o640))
        .expect("put should succeed");

    assert_eq!(written, vec![String::from("/etc/app.conf")]);
    let invocations = runner.invocations();
    let upload = invocations.get(1).expect("upload invocation");
    assert_eq!(
        upload.remote_command(),
        "sh -c 'cat > /etc/app.conf && chmod 640 /etc/app.conf'"
    );
    assert_eq!(upload.stdin.as_deref(), Some(b"listen 80;\n".as_slice()));
}

#[rstest]
fn put_into_remote_directory_keeps_file_names(base_config: RemoteConfig) {
    let (_tmp, root) = local_dir();
    for name in ["a.txt", "b.txt", "c.log"] {
        std::fs::write(root.join(name), name).expect("write source");
    }
    let (session, runner) = session_with(base_config, |r| {
        r.push_success();
        r.push_success();
        r.push_success();
    });

    let written = session
        .put(root.join("*.txt").as_str(), "/srv/drop/", Some(0o600))
        .expect("put should succeed");

    assert_eq!(written, vec!["/srv/drop/a.txt", "/srv/drop/b.txt"]);
    assert_eq!(runner.invocations().len(), 3);
}

#[rstest]
fn put_resolves_remote_tilde(base_config: RemoteConfig) {
    let (_tmp, root) = local_dir();
    let source = root.join("notes.txt");
    std::fs::write(&source, b"hi").expect("write source");
    let (session, _) = session_with(base_config, |r| {
        r.push_stdout("/home/deploy\n");
        r.push_success();
        r.push_success();
    });

    let written = session
        .put(source.as_str(), "~", Some(0o644))
        .expect("put should succeed");

    assert_eq!(written, vec!["/home/deploy/notes.txt"]);
}

#[rstest]
fn put_without_local_match_fails_before_connecting(base_config: RemoteConfig) {
    let (_tmp, root) = local_dir();
    let (session, runner) = session_with(base_config, |_| {});

    let err = session
        .put(root.join("*.missing").as_str(), "/tmp", None)
        .expect_err("no local match");

    assert!(matches!(err, SessionError::Local { .. }), "{err:?}");
    assert!(runner.invocations().is_empty());
}

#[rstest]
fn put_failure_warns_when_failures_do_not_abort(base_config: RemoteConfig) {
    let (_tmp, root) = local_dir();
    let source = root.join("f");
    std::fs::write(&source, b"x").expect("write source");
    let (session, _) = session_with(base_config, |r| {
        r.push_exit_code(1);
        r.push_failure(1);
    });

    let written = session
        .warnings_only()
        .put(source.as_str(), "/root/f", Some(0o644))
        .expect("warn-only put should not abort");

    assert!(written.is_empty());
}

#[rstest]
fn get_writes_remote_bytes_locally(base_config: RemoteConfig) {
    let (_tmp, root) = local_dir();
    let target = root.join("hosts");
    let (session, runner) = session_with(base_config, |r| r.push_stdout(b"127.0.0.1 localhost\n".to_vec()));

    session
        .get("/etc/hosts", target.as_str())
        .expect("get should succeed");

    assert_eq!(
        std::fs::read(&target).expect("read target"),
        b"127.0.0.1 localhost\n"
    );
    let invocations = runner.invocations();
    let call = invocations.first().expect("one invocation");
    assert_eq!(call.remote_command(), "sh -c 'cat /etc/hosts'");
}

#[rstest]
fn get_failure_aborts_by_default(base_config: RemoteConfig) {
    let (_tmp, root) = local_dir();
    let (session, _) = session_with(base_config, |r| r.push_failure(1));

    let err = session
        .get("/missing", root.join("out").as_str())
        .expect_err("missing remote file");

    assert!(
        matches!(err, SessionError::CommandFailure { ref program, .. } if program == "get"),
        "{err:?}"
    );
}
