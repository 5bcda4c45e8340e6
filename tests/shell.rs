//! End-to-end command behavior against a temporary application root.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use vfsh_core::{CommandOutput, Flow, Limits, Shell, ShellConfig};

struct Session {
    root: TempDir,
    shell: Shell,
}

impl Session {
    fn open() -> Self {
        let root = tempfile::tempdir().unwrap();
        Self::open_with(root, |config| config)
    }

    fn open_with(root: TempDir, tweak: impl FnOnce(ShellConfig) -> ShellConfig) -> Self {
        let config = tweak(ShellConfig::new(root.path()));
        let mut shell = Shell::open(config).unwrap();
        shell.take_output();
        Self { root, shell }
    }

    fn run(&mut self, line: &str) -> CommandOutput {
        self.shell.feed(line);
        self.shell.take_output()
    }

    fn out(&mut self, line: &str) -> String {
        let output = self.run(line);
        assert_eq!(output.stderr_text(), "", "unexpected error from {line:?}");
        output.stdout_text()
    }

    fn err(&mut self, line: &str) -> String {
        self.run(line).stderr_text()
    }

    fn home_on_disk(&self) -> PathBuf {
        self.root.path().join("data/USERS/guest")
    }

    fn reopen(self) -> Self {
        let Self { root, shell } = self;
        drop(shell);
        Self::open_with(root, |config| config)
    }
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap()
}

#[test]
fn fresh_root_is_seeded_and_mirrored() {
    let mut s = Session::open();
    assert_eq!(s.out("PWD"), "vfs:/USERS/guest");
    let listing = s.out("DIR");
    for folder in ["Documents", "Projects", "Desktop", "README.txt"] {
        assert!(listing.contains(folder), "{folder} missing from:\n{listing}");
    }
    assert!(s.home_on_disk().join("Documents").is_dir());
    assert!(s.root.path().join("data/USERS/admin/README.txt").is_file());
}

#[test]
fn mkdir_cd_and_back() {
    let mut s = Session::open();
    s.out("MKDIR work");
    s.out("CD work");
    assert_eq!(s.out("PWD"), "vfs:/USERS/guest/work");
    s.out("CD ..");
    assert_eq!(s.out("PWD"), "vfs:/USERS/guest");
    s.out("CD ..");
    s.out("CD ..");
    s.out("CD ..");
    assert_eq!(s.out("PWD"), "vfs:/");
    s.out("CD ~");
    assert_eq!(s.out("PWD"), "vfs:/USERS/guest");
    assert!(s.home_on_disk().join("work").is_dir());
    assert!(s.err("CD missing").contains("not found"));
}

#[test]
fn write_type_and_append() {
    let mut s = Session::open();
    s.out(r#"WRITE todo.txt "buy milk""#);
    assert_eq!(s.out("TYPE todo.txt"), "buy milk");
    s.out(r#"APPEND todo.txt " and eggs""#);
    assert_eq!(s.out("CAT TODO.TXT"), "buy milk and eggs");
    assert_eq!(read(&s.home_on_disk().join("todo.txt")), "buy milk and eggs");

    s.out("WRITE todo.txt done");
    assert_eq!(s.out("TYPE todo.txt"), "done");
    assert!(s.err("TYPE Documents").contains("is a directory"));
    assert!(s.err("TYPE nothing.txt").contains("not found"));
}

#[test]
fn names_collide_case_insensitively() {
    let mut s = Session::open();
    s.out("TOUCH a.txt");
    assert!(s.err("TOUCH A.TXT").contains("already exists"));
    assert!(s.err("MKDIR A.txt").contains("already exists"));
    assert!(s.err("MKDIR documents").contains("already exists"));
    assert!(s.err("MKDIR bad|name").contains("invalid name"));
}

#[test]
fn capacity_ceiling_is_reported_and_leaves_tree_alone() {
    let root = tempfile::tempdir().unwrap();
    let mut s = Session::open_with(root, |config| {
        config.with_limits(Limits {
            max_files: 2,
            ..Limits::default()
        })
    });
    s.out("MKDIR box");
    s.out("CD box");
    s.out("TOUCH one");
    s.out("TOUCH two");
    assert!(s.err("TOUCH three").contains("limit reached"));
    let listing = s.out("DIR");
    assert!(!listing.contains("three"));
    assert!(!s.home_on_disk().join("box/three").exists());
}

#[test]
fn sync_is_additive_and_idempotent() {
    let mut s = Session::open();
    s.out("WRITE mine.txt virtual");
    fs::write(s.home_on_disk().join("mine.txt"), "edited on disk").unwrap();
    fs::write(s.home_on_disk().join("new.txt"), "from disk").unwrap();
    fs::create_dir(s.home_on_disk().join("dropped")).unwrap();

    let first = s.out("SYNC");
    assert_eq!(first, "Synced vfs:/USERS/guest: 1 directory and 1 file(s) added.");
    assert_eq!(s.out("TYPE new.txt"), "from disk");
    assert_eq!(s.out("TYPE mine.txt"), "virtual");

    let second = s.out("SYNC");
    assert_eq!(second, "Synced vfs:/USERS/guest: 0 directories and 0 file(s) added.");
}

#[test]
fn deletes_reach_the_disk() {
    let mut s = Session::open();
    s.out("WRITE gone.txt bye");
    s.out("MKDIR old");
    s.out("CD old");
    s.out("TOUCH inner.txt");
    s.out("CD ..");

    s.out("DEL GONE.TXT");
    assert!(!s.home_on_disk().join("gone.txt").exists());
    assert!(s.err("DEL old").contains("is a directory"));

    s.out("RMDIR old");
    assert!(!s.home_on_disk().join("old").exists());
    assert!(s.err("RMDIR old").contains("not found"));
}

#[test]
fn softdel_and_restore_round_trip() {
    let mut s = Session::open();
    s.out("WRITE draft.txt first");
    assert_eq!(s.out("SOFTDEL draft.txt"), "Moved draft.txt to trash.");
    assert!(!s.home_on_disk().join("draft.txt").exists());
    assert!(s.out("TRASH").contains("draft.txt"));

    s.out("WRITE draft.txt second");
    s.out("SOFTDEL draft.txt");

    s.out("CD Documents");
    s.out("RESTORE DRAFT.TXT");
    assert_eq!(s.out("TYPE draft.txt"), "second");
    assert_eq!(read(&s.home_on_disk().join("Documents/draft.txt")), "second");
    assert!(s.err("RESTORE draft.txt").contains("already exists"));
    assert!(s.out("TRASH").contains("draft.txt"));

    s.out("CD ..");
    s.out("RESTORE draft.txt");
    assert_eq!(s.out("TYPE draft.txt"), "first");
    assert_eq!(s.out("TRASH"), "Trash is empty.");
    assert!(s.err("RESTORE draft.txt").contains("not found"));
}

#[test]
fn softdel_directories_need_the_switch() {
    let mut s = Session::open();
    s.out("MKDIR site");
    s.out("CD site");
    s.out("WRITE index.html hello");
    s.out("MKDIR css");
    s.out("CD ..");

    assert!(s.err("SOFTDEL site").contains("/S"));
    s.out("SOFTDEL /S site");
    assert!(!s.home_on_disk().join("site").exists());
    assert!(s.out("TRASH").contains("dir"));

    s.out("CD Desktop");
    s.out("RESTORE site");
    s.out("CD site");
    assert_eq!(s.out("TYPE index.html"), "hello");
    s.out("CD css");
    assert_eq!(read(&s.home_on_disk().join("Desktop/site/index.html")), "hello");
    assert!(s.home_on_disk().join("Desktop/site/css").is_dir());

    s.out("CD ~");
    s.out("MKDIR empty");
    s.out("SOFTDEL empty");
    assert!(s.out("TRASH").contains("empty"));
}

#[test]
fn emptytrash_is_idempotent() {
    let mut s = Session::open();
    s.out("TOUCH a");
    s.out("TOUCH b");
    s.out("SOFTDEL a");
    s.out("SOFTDEL b");
    assert_eq!(s.out("EMPTYTRASH"), "Trash emptied (2 item(s) removed).");
    assert_eq!(s.out("EMPTYTRASH"), "Trash emptied (0 item(s) removed).");
    assert!(s.err("RESTORE a").contains("not found"));
}

#[test]
fn snapshot_survives_restart_and_virtual_wins() {
    let mut s = Session::open();
    s.out("MKDIR keep");
    s.out("CD keep");
    s.out(r#"WRITE note.txt "line|with\pipe""#);
    assert_eq!(s.shell.feed("EXIT"), Flow::Terminate);
    assert!(s.root.path().join("data/filesystem.dat").is_file());

    let on_disk = s.home_on_disk().join("keep/note.txt");
    fs::write(&on_disk, "changed behind our back").unwrap();

    let mut s = s.reopen();
    s.out("CD keep");
    assert_eq!(s.out("TYPE note.txt"), r"line|with\pipe");
    assert_eq!(read(&on_disk), r"line|with\pipe");
}

#[test]
fn snapshot_file_name_is_off_limits_at_the_root() {
    let mut s = Session::open();
    s.out("CD ..");
    s.out("CD ..");
    assert_eq!(s.out("PWD"), "vfs:/");
    assert!(s.err("TOUCH filesystem.dat").contains("reserved"));
    assert!(s.err("WRITE FileSystem.dat oops").contains("reserved"));
    assert!(s.err("MKDIR filesystem.dat").contains("reserved"));
    assert!(s.err("EDIT filesystem.dat").contains("reserved"));

    assert_eq!(s.shell.feed("EXIT"), Flow::Terminate);
    let snapshot = s.root.path().join("data/filesystem.dat");
    let saved = read(&snapshot);
    assert!(saved.contains("USERS"));

    let mut s = s.reopen();
    assert_eq!(read(&snapshot), saved);
    s.out("CD USERS");
    s.out("TOUCH filesystem.dat");
}

#[test]
fn savefs_stays_inside_the_app_root() {
    let mut s = Session::open();
    let outside = tempfile::tempdir().unwrap();
    let target = outside.path().join("elsewhere.dat");
    assert!(s.err(&format!("SAVEFS {}", target.display())).contains("access denied"));
    assert!(!target.exists());
    assert!(s.err("SAVEFS ../escape.dat").contains("access denied"));

    assert!(s.out("SAVEFS backup.dat").starts_with("Snapshot written to"));
    assert!(read(&s.root.path().join("backup.dat")).contains("USERS"));
}

#[test]
fn corrupt_snapshot_falls_back_to_seed() {
    let root = tempfile::tempdir().unwrap();
    fs::create_dir_all(root.path().join("data")).unwrap();
    fs::write(root.path().join("data/filesystem.dat"), "FILE:orphan.txt|x\n").unwrap();

    let mut shell = Shell::open(ShellConfig::new(root.path())).unwrap();
    let startup = shell.take_output();
    assert!(startup.stderr_text().starts_with("warning: snapshot ignored"));
    assert_eq!(shell.cwd_path(), "vfs:/USERS/guest");
}

#[test]
fn echo_and_clear() {
    let mut s = Session::open();
    assert_eq!(s.out("ECHO  hello   world "), "hello   world");
    let cleared = s.run("CLS");
    assert!(cleared.clear_screen);
    assert!(cleared.lines.is_empty());
}
