//! Behavioural coverage for remote filesystem operations and transfers.
//!
//! Commands run through a local `sh` in a scratch "remote" home directory,
//! so the real scripts are exercised end to end without an SSH server.

#[path = "common/workspace.rs"]
mod workspace;

use std::collections::BTreeSet;
use std::fs::{read, read_to_string};
use std::io::{Read, Write};
#[cfg(unix)]
use std::os::unix::fs::{PermissionsExt, symlink};

use rfsutil::rfs::{DEFAULT_DIR_MODE, FsError, FsErrorKind, FsOp, OnError, ignore_patterns};
use rstest::{fixture, rstest};
use workspace::{Workspace, write_file};

#[fixture]
fn ws() -> Workspace {
    Workspace::new()
}

fn kind_of(err: &FsError) -> Option<FsErrorKind> {
    err.kind()
}

#[rstest]
fn getcwd_and_tilde_resolve_to_remote_home(ws: Workspace) {
    let session = ws.session();
    let fs = session.fs();

    assert_eq!(fs.getcwd().expect("getcwd"), ws.remote_root.as_str());
    fs.mkdir("~/made", DEFAULT_DIR_MODE).expect("mkdir under ~");
    assert!(ws.remote("made").is_dir());
    assert!(fs.is_dir("~").expect("is_dir ~"));
}

#[rstest]
fn stat_reports_size_and_kind(ws: Workspace) {
    write_file(&ws.remote("data.txt"), "twelve bytes");
    let session = ws.session();
    let fs = session.fs();

    let stat = fs.stat("~/data.txt").expect("stat");
    assert!(stat.is_file());
    assert_eq!(stat.size, 12);

    let missing = fs.stat("~/missing").expect_err("missing path");
    assert_eq!(kind_of(&missing), Some(FsErrorKind::NotFound));
}

#[cfg(unix)]
#[rstest]
fn symlinks_are_followed_by_stat_but_not_lstat(ws: Workspace) {
    write_file(&ws.remote("target.txt"), "x");
    symlink(ws.remote("target.txt"), ws.remote("link")).expect("create symlink");
    symlink(ws.remote("gone"), ws.remote("dangling")).expect("create dangling symlink");
    let session = ws.session();
    let fs = session.fs();

    assert!(fs.stat("~/link").expect("stat link").is_file());
    assert!(fs.lstat("~/link").expect("lstat link").is_symlink());
    assert!(fs.is_symlink("~/link").expect("is_symlink"));
    assert!(fs.is_file("~/link").expect("is_file"));
    assert!(fs.is_symlink("~/dangling").expect("dangling is a link"));
    assert!(!fs.exists("~/dangling").expect("dangling does not exist"));
    assert!(!fs.is_symlink("~/target.txt").expect("plain file"));
}

#[rstest]
fn exists_is_dir_and_is_file_report_false_for_missing(ws: Workspace) {
    let session = ws.session();
    let fs = session.fs();

    assert!(!fs.exists("~/nothing").expect("exists"));
    assert!(!fs.is_dir("~/nothing").expect("is_dir"));
    assert!(!fs.is_file("~/nothing").expect("is_file"));
    assert!(!fs.is_symlink("~/nothing").expect("is_symlink"));
}

#[rstest]
fn listdir_returns_every_entry_name(ws: Workspace) {
    for name in ["b.txt", "a.txt", ".hidden", "with space", "-dash"] {
        write_file(&ws.remote(&format!("dir/{name}")), "x");
    }
    let session = ws.session();
    let fs = session.fs();

    let names = fs.listdir("~/dir").expect("listdir");
    assert_eq!(names, vec!["-dash", ".hidden", "a.txt", "b.txt", "with space"]);

    let err = fs.listdir("~/dir/a.txt").expect_err("file is not a directory");
    assert_eq!(kind_of(&err), Some(FsErrorKind::NotADirectory));
    let err = fs.listdir("~/none").expect_err("missing directory");
    assert_eq!(kind_of(&err), Some(FsErrorKind::NotFound));
}

#[rstest]
fn mkdir_and_makedirs_follow_os_semantics(ws: Workspace) {
    let session = ws.session();
    let fs = session.fs();

    let err = fs.mkdir("~/a/b", DEFAULT_DIR_MODE).expect_err("parent missing");
    assert_eq!(kind_of(&err), Some(FsErrorKind::NotFound));

    fs.makedirs("~/a/b/c", DEFAULT_DIR_MODE).expect("makedirs");
    assert!(ws.remote("a/b/c").is_dir());

    let err = fs.makedirs("~/a/b/c", DEFAULT_DIR_MODE).expect_err("leaf exists");
    assert_eq!(kind_of(&err), Some(FsErrorKind::AlreadyExists));
    let err = fs.mkdir("~/a", DEFAULT_DIR_MODE).expect_err("exists");
    assert_eq!(kind_of(&err), Some(FsErrorKind::AlreadyExists));

    fs.makedirs("~/x/y/", DEFAULT_DIR_MODE).expect("trailing slash");
    assert!(ws.remote("x/y").is_dir());
}

#[cfg(unix)]
#[rstest]
fn mkdir_mode_is_masked_by_umask(ws: Workspace) {
    let session = ws.session();
    session
        .fs()
        .mkdir("~/private", 0o700)
        .expect("mkdir with mode");

    let mode = std::fs::metadata(ws.remote("private"))
        .expect("metadata")
        .permissions()
        .mode();
    assert_eq!(mode & 0o777, 0o700);
}

#[rstest]
fn remove_rmdir_and_rename_report_conflicts(ws: Workspace) {
    write_file(&ws.remote("d/file"), "x");
    write_file(&ws.remote("other"), "y");
    let session = ws.session();
    let fs = session.fs();

    let err = fs.remove("~/d").expect_err("remove directory");
    assert_eq!(kind_of(&err), Some(FsErrorKind::IsADirectory));
    let err = fs.rmdir("~/d").expect_err("rmdir non-empty");
    assert_eq!(kind_of(&err), Some(FsErrorKind::DirectoryNotEmpty));
    let err = fs.rmdir("~/other").expect_err("rmdir file");
    assert_eq!(kind_of(&err), Some(FsErrorKind::NotADirectory));
    let err = fs.remove("~/none").expect_err("remove missing");
    assert_eq!(kind_of(&err), Some(FsErrorKind::NotFound));

    fs.rename("~/other", "~/d/file").expect("rename over file");
    assert_eq!(read_to_string(ws.remote("d/file")).expect("read"), "y");
    assert!(!ws.remote("other").exists());

    let err = fs.rename("~/d/file", "~/d").expect_err("file onto directory");
    assert_eq!(kind_of(&err), Some(FsErrorKind::IsADirectory));

    fs.remove("~/d/file").expect("remove file");
    fs.rmdir("~/d").expect("rmdir empty");
    assert!(!ws.remote("d").exists());
}

#[rstest]
fn rename_moves_directories_like_rename_syscall(ws: Workspace) {
    write_file(&ws.remote("src_dir/inner.txt"), "moved");
    write_file(&ws.remote("full/occupant"), "stay");
    write_file(&ws.remote("plain"), "file");
    std::fs::create_dir(ws.remote("empty")).expect("mkdir");
    let session = ws.session();
    let fs = session.fs();

    let err = fs.rename("~/src_dir", "~/full").expect_err("directory onto non-empty directory");
    assert_eq!(kind_of(&err), Some(FsErrorKind::DirectoryNotEmpty));
    let err = fs.rename("~/src_dir", "~/plain").expect_err("directory onto file");
    assert_eq!(kind_of(&err), Some(FsErrorKind::NotADirectory));
    let err = fs.rename("~/absent", "~/anywhere").expect_err("missing source");
    assert_eq!(kind_of(&err), Some(FsErrorKind::NotFound));
    assert!(!ws.remote("anywhere").exists());

    fs.rename("~/src_dir", "~/empty").expect("directory onto empty directory");
    assert_eq!(read_to_string(ws.remote("empty/inner.txt")).expect("read"), "moved");
    assert!(!ws.remote("src_dir").exists());
    assert_eq!(read_to_string(ws.remote("full/occupant")).expect("read"), "stay");
    assert_eq!(read_to_string(ws.remote("plain")).expect("read"), "file");
}

#[cfg(unix)]
#[rstest]
fn rename_replaces_a_symlink_rather_than_its_target(ws: Workspace) {
    write_file(&ws.remote("target_dir/kept.txt"), "kept");
    write_file(&ws.remote("new.txt"), "fresh");
    symlink(ws.remote("target_dir"), ws.remote("link")).expect("symlink");
    let session = ws.session();

    session.fs().rename("~/new.txt", "~/link").expect("rename over symlink");

    let meta = std::fs::symlink_metadata(ws.remote("link")).expect("lstat");
    assert!(meta.is_file());
    assert_eq!(read_to_string(ws.remote("link")).expect("read"), "fresh");
    assert!(!ws.remote("target_dir/new.txt").exists());
    assert_eq!(
        read_to_string(ws.remote("target_dir/kept.txt")).expect("read"),
        "kept"
    );
}

#[rstest]
fn copy_and_copy2_duplicate_contents(ws: Workspace) {
    write_file(&ws.remote("src.bin"), "payload");
    let session = ws.session();
    let fs = session.fs();

    assert_eq!(fs.copy("~/src.bin", "~/copy.bin").expect("copy"), 7);
    fs.copy2("~/src.bin", "~/copy2.bin").expect("copy2");

    assert_eq!(read(ws.remote("copy.bin")).expect("read"), b"payload");
    assert_eq!(read(ws.remote("copy2.bin")).expect("read"), b"payload");

    let err = fs.copy2("~/missing", "~/x").expect_err("missing source");
    assert_eq!(err, FsError::Os {
        op: FsOp::Copy2,
        path: ws.remote("missing").into_string(),
        kind: FsErrorKind::NotFound,
    });
}

#[rstest]
fn open_reads_writes_and_appends(ws: Workspace) {
    let session = ws.session();
    let fs = session.fs();

    let mut file = fs.open("~/notes.txt", "w", true).expect("open for write");
    file.write_all(b"alpha\n").expect("write");
    file.close().expect("close");

    let mut file = fs.open("~/notes.txt", "a", false).expect("open for append");
    file.write_all(b"beta\n").expect("append");
    drop(file);

    let mut file = fs.open("~/notes.txt", "r", true).expect("open for read");
    let mut text = String::new();
    file.read_to_string(&mut text).expect("read");
    assert_eq!(text, "alpha\nbeta\n");

    let Err(err) = fs.open("~/absent", "r", true) else {
        panic!("reading a missing file should fail");
    };
    assert_eq!(kind_of(&err), Some(FsErrorKind::NotFound));
    let Err(err) = fs.open("~", "w", true) else {
        panic!("writing a directory should fail");
    };
    assert_eq!(kind_of(&err), Some(FsErrorKind::IsADirectory));
}

#[rstest]
fn binary_content_survives_the_round_trip(ws: Workspace) {
    let bytes: Vec<u8> = (0..=255).collect();
    let session = ws.session();
    let fs = session.fs();

    let mut file = fs.open("~/blob", "wb", true).expect("open");
    file.write_all(&bytes).expect("write");
    file.close().expect("close");

    assert_eq!(read(ws.remote("blob")).expect("read"), bytes);
}

#[rstest]
fn rmtree_removes_nested_trees(ws: Workspace) {
    write_file(&ws.remote("tree/a/b/file"), "x");
    write_file(&ws.remote("tree/top"), "y");
    let session = ws.session();

    session
        .fs()
        .rmtree("~/tree", OnError::Raise)
        .expect("rmtree");

    assert!(!ws.remote("tree").exists());
}

#[cfg(unix)]
#[rstest]
fn rmtree_removes_links_without_following_them(ws: Workspace) {
    write_file(&ws.remote("keep/precious"), "x");
    write_file(&ws.remote("tree/file"), "y");
    symlink(ws.remote("keep"), ws.remote("tree/link")).expect("symlink");
    let session = ws.session();

    session
        .fs()
        .rmtree("~/tree", OnError::Raise)
        .expect("rmtree");

    assert!(!ws.remote("tree").exists());
    assert!(ws.remote("keep/precious").exists());
}

#[cfg(target_os = "linux")]
#[rstest]
fn rmtree_leaves_trees_with_undecodable_names_alone(ws: Workspace) {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    write_file(&ws.remote("victim/ok.txt"), "ok");
    let odd = ws.remote("victim").into_std_path_buf().join(OsStr::from_bytes(b"bad\xff"));
    std::fs::write(&odd, "odd").expect("write non-UTF-8 name");
    let session = ws.session();

    let err = session
        .fs()
        .rmtree("~/victim", OnError::Raise)
        .expect_err("listing should refuse the name");

    assert!(matches!(err, FsError::Parse { op: FsOp::Listdir, .. }), "{err:?}");
    assert!(ws.remote("victim/ok.txt").exists());
    assert!(odd.exists());
}

#[rstest]
fn rmtree_on_missing_path_raises_or_is_ignored(ws: Workspace) {
    let session = ws.session();
    let fs = session.fs();

    let err = fs.rmtree("~/none", OnError::Raise).expect_err("missing tree");
    assert_eq!(kind_of(&err), Some(FsErrorKind::NotFound));
    fs.rmtree("~/none", OnError::Ignore).expect("ignored");
}

#[rstest]
fn copytree_copies_remote_trees_with_ignore(ws: Workspace) {
    write_file(&ws.remote("src/keep.py"), "print()");
    write_file(&ws.remote("src/skip.pyc"), "bytecode");
    write_file(&ws.remote("src/pkg/mod.py"), "x = 1");
    let session = ws.session();
    let ignore = ignore_patterns(&["*.pyc"]).expect("patterns");

    session
        .fs()
        .copytree("~/src", "~/deep/dst", Some(&*ignore))
        .expect("copytree");

    assert_eq!(read_to_string(ws.remote("deep/dst/keep.py")).expect("read"), "print()");
    assert_eq!(read_to_string(ws.remote("deep/dst/pkg/mod.py")).expect("read"), "x = 1");
    assert!(!ws.remote("deep/dst/skip.pyc").exists());
}

#[rstest]
fn put_and_get_copytree_round_trip_a_tree(ws: Workspace) {
    write_file(&ws.local("site/index.html"), "<h1>hi</h1>");
    write_file(&ws.local("site/css/main.css"), "body {}");
    let session = ws.session();
    let fs = session.fs();

    fs.put_copytree(ws.local("site").as_str(), "~/www", None)
        .expect("put_copytree");
    assert_eq!(
        read_to_string(ws.remote("www/css/main.css")).expect("read"),
        "body {}"
    );

    fs.get_copytree("~/www", ws.local("back").as_str(), None)
        .expect("get_copytree");
    assert_eq!(
        read_to_string(ws.local("back/index.html")).expect("read"),
        "<h1>hi</h1>"
    );
    assert_eq!(
        read_to_string(ws.local("back/css/main.css")).expect("read"),
        "body {}"
    );
}

fn failed_sources(err: FsError) -> BTreeSet<String> {
    let FsError::CopyTree(tree) = err else {
        panic!("expected CopyTree, got {err:?}");
    };
    tree.failures.into_iter().map(|failure| failure.src).collect()
}

#[rstest]
fn put_copytree_collects_every_failure_and_keeps_going(ws: Workspace) {
    write_file(&ws.local("src/blocked.txt"), "top");
    write_file(&ws.local("src/ok.txt"), "fine");
    write_file(&ws.local("src/sub/also.txt"), "nested");
    write_file(&ws.local("src/sub/sibling.txt"), "nested fine");
    // Non-empty directories where files should land make those uploads fail.
    write_file(&ws.remote("dst/blocked.txt/keep"), "occupied");
    write_file(&ws.remote("dst/sub/also.txt/keep"), "occupied");
    let session = ws.session();

    let err = session
        .fs()
        .put_copytree(ws.local("src").as_str(), "~/dst", None)
        .expect_err("occupied destinations should fail");

    assert_eq!(
        failed_sources(err),
        BTreeSet::from([
            ws.local("src/blocked.txt").into_string(),
            ws.local("src/sub/also.txt").into_string(),
        ])
    );
    assert_eq!(read_to_string(ws.remote("dst/ok.txt")).expect("read"), "fine");
    assert_eq!(
        read_to_string(ws.remote("dst/sub/sibling.txt")).expect("read"),
        "nested fine"
    );
    assert!(ws.remote("dst/blocked.txt/keep").is_file());
}

#[rstest]
fn get_copytree_collects_every_failure_and_keeps_going(ws: Workspace) {
    write_file(&ws.remote("tree/blocked.txt"), "top");
    write_file(&ws.remote("tree/ok.txt"), "fine");
    write_file(&ws.remote("tree/sub/also.txt"), "nested");
    write_file(&ws.remote("tree/sub/sibling.txt"), "nested fine");
    write_file(&ws.local("copy/blocked.txt/keep"), "occupied");
    write_file(&ws.local("copy/sub/also.txt/keep"), "occupied");
    let session = ws.session();

    let err = session
        .fs()
        .get_copytree("~/tree", ws.local("copy").as_str(), None)
        .expect_err("occupied destinations should fail");

    assert_eq!(
        failed_sources(err),
        BTreeSet::from([
            ws.remote("tree/blocked.txt").into_string(),
            ws.remote("tree/sub/also.txt").into_string(),
        ])
    );
    assert_eq!(read_to_string(ws.local("copy/ok.txt")).expect("read"), "fine");
    assert_eq!(
        read_to_string(ws.local("copy/sub/sibling.txt")).expect("read"),
        "nested fine"
    );
}

#[cfg(unix)]
#[rstest]
fn put_follows_symlinks_that_leave_their_directory(ws: Workspace) {
    let elsewhere = tempfile::TempDir::new().expect("tempdir");
    let target = camino::Utf8Path::from_path(elsewhere.path()).expect("UTF-8 temp dir");
    write_file(&target.join("real.conf"), "setting=1");
    write_file(&target.join("shared/inner.txt"), "inner");
    write_file(&ws.local("tree/plain.txt"), "plain");
    symlink(target.join("real.conf"), ws.local("tree/link.conf")).expect("symlink file");
    symlink(target.join("shared"), ws.local("tree/shared")).expect("symlink dir");
    let session = ws.session();

    session
        .put(ws.local("tree/link.conf").as_str(), "~/single.conf", None)
        .expect("put through a symlink");
    assert_eq!(
        read_to_string(ws.remote("single.conf")).expect("read"),
        "setting=1"
    );

    session
        .fs()
        .put_copytree(ws.local("tree").as_str(), "~/tree", None)
        .expect("put_copytree through symlinks");
    assert_eq!(
        read_to_string(ws.remote("tree/link.conf")).expect("read"),
        "setting=1"
    );
    assert_eq!(
        read_to_string(ws.remote("tree/shared/inner.txt")).expect("read"),
        "inner"
    );
    assert_eq!(read_to_string(ws.remote("tree/plain.txt")).expect("read"), "plain");
}

#[rstest]
fn put_and_get_transfer_single_files(ws: Workspace) {
    write_file(&ws.local("one.txt"), "1");
    write_file(&ws.local("two.txt"), "2");
    write_file(&ws.local("skip.log"), "x");
    std::fs::create_dir_all(ws.remote("inbox")).expect("mkdir inbox");
    let session = ws.session();

    let written = session
        .put(ws.local("*.txt").as_str(), "~/inbox", None)
        .expect("put glob");
    assert_eq!(written.len(), 2);
    assert_eq!(read_to_string(ws.remote("inbox/two.txt")).expect("read"), "2");
    assert!(!ws.remote("inbox/skip.log").exists());

    session
        .get("~/inbox/one.txt", ws.local("fetched.txt").as_str())
        .expect("get");
    assert_eq!(read_to_string(ws.local("fetched.txt")).expect("read"), "1");
}

#[cfg(unix)]
#[rstest]
fn put_preserves_local_mode_unless_overridden(ws: Workspace) {
    write_file(&ws.local("run.sh"), "#!/bin/sh\n");
    std::fs::set_permissions(ws.local("run.sh"), std::fs::Permissions::from_mode(0o751))
        .expect("chmod");
    let session = ws.session();

    session
        .put(ws.local("run.sh").as_str(), "~/run.sh", None)
        .expect("put");
    session
        .put(ws.local("run.sh").as_str(), "~/run-600.sh", Some(0o600))
        .expect("put with mode");

    let mode_of = |name: &str| {
        std::fs::metadata(ws.remote(name))
            .expect("metadata")
            .permissions()
            .mode()
            & 0o7777
    };
    assert_eq!(mode_of("run.sh"), 0o751);
    assert_eq!(mode_of("run-600.sh"), 0o600);
}

#[rstest]
fn run_and_sudo_style_commands_execute(ws: Workspace) {
    let session = ws.session();

    let output = session.run("echo hello && pwd").expect("run");
    assert_eq!(output.stdout, format!("hello\n{}", ws.remote_root));

    let err = session.run("exit 3").expect_err("failure aborts");
    assert!(err.to_string().contains("status 3"), "{err}");

    let warned = session.warnings_only().run("exit 4").expect("warn only");
    assert!(warned.failed);
    assert_eq!(warned.exit_code, Some(4));
}
