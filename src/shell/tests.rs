use super::*;
use crate::external::ToolOutput;
use crate::session::hash_password;
use chrono::TimeDelta;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

struct ManualClock(Mutex<DateTime<Utc>>);

impl ManualClock {
    fn new() -> Self {
        Self(Mutex::new(Utc::now()))
    }

    fn advance(&self, secs: i64) {
        let mut now = self.0.lock().unwrap();
        *now += TimeDelta::seconds(secs);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

#[derive(Default)]
struct FakeRunner {
    calls: Mutex<Vec<(String, Vec<String>, PathBuf)>>,
    status: Option<i32>,
    /// File the fake tool drops into its working directory.
    creates: Option<(&'static str, &'static str)>,
}

impl FakeRunner {
    fn succeeding() -> Self {
        Self {
            status: Some(0),
            ..Self::default()
        }
    }

    fn calls(&self) -> Vec<(String, Vec<String>, PathBuf)> {
        self.calls.lock().unwrap().clone()
    }
}

impl ToolRunner for FakeRunner {
    fn run(&self, program: &str, args: &[String], cwd: &Path) -> crate::Result<ToolOutput> {
        self.calls
            .lock()
            .unwrap()
            .push((program.to_string(), args.to_vec(), cwd.to_path_buf()));
        if let Some((name, content)) = self.creates {
            std::fs::write(cwd.join(name), content).unwrap();
        }
        Ok(ToolOutput {
            status: self.status,
            stdout: format!("ran {program}\n"),
            stderr: String::new(),
        })
    }

    fn spawn_detached(&self, program: &str, args: &[String], cwd: &Path) -> crate::Result<u32> {
        self.calls
            .lock()
            .unwrap()
            .push((program.to_string(), args.to_vec(), cwd.to_path_buf()));
        Ok(4242)
    }

    fn is_available(&self, _program: &str) -> bool {
        true
    }
}

struct Harness {
    _root: tempfile::TempDir,
    shell: Shell,
    clock: Arc<ManualClock>,
    runner: Arc<FakeRunner>,
}

impl Harness {
    fn new(runner: FakeRunner) -> Self {
        let root = tempfile::tempdir().unwrap();
        let config = ShellConfig::new(root.path())
            .with_admin_password_hash(hash_password("secret").unwrap())
            .with_session_timeout(Duration::from_secs(300));
        let clock = Arc::new(ManualClock::new());
        let runner = Arc::new(runner);
        let mut shell = Shell::with_backends(
            config,
            Arc::new(RealFileSystem),
            clock.clone(),
            runner.clone(),
        )
        .unwrap();
        shell.take_output();
        Self {
            _root: root,
            shell,
            clock,
            runner,
        }
    }

    fn run(&mut self, line: &str) -> CommandOutput {
        self.shell.feed(line);
        self.shell.take_output()
    }

    fn data_dir(&self) -> PathBuf {
        self.shell.config().data_dir()
    }
}

#[test]
fn unknown_commands_are_reported_verbatim() {
    let mut h = Harness::new(FakeRunner::succeeding());
    let output = h.run("frobnicate now");
    assert_eq!(
        output.stderr_text(),
        "'frobnicate' is not recognized as an internal or external command."
    );
    assert!(h.run("   ").is_empty());
}

#[test]
fn commands_are_case_insensitive() {
    let mut h = Harness::new(FakeRunner::succeeding());
    assert_eq!(h.run("pwd").stdout_text(), "vfs:/USERS/guest");
    assert_eq!(h.run("Cd Documents").stderr_text(), "");
    assert_eq!(h.run("PWD").stdout_text(), "vfs:/USERS/guest/Documents");
}

#[test]
fn admin_commands_are_gated() {
    let mut h = Harness::new(FakeRunner::succeeding());
    let output = h.run("ADDUSER mallory");
    assert_eq!(output.stderr_text(), "access denied: ADDUSER requires the admin account");
    assert!(seed::home_of(h.shell.tree(), "mallory").is_none());

    h.run("USER admin");
    assert_eq!(h.run("ADDUSER carol").stdout_text(), "User carol created.");
    assert!(h.data_dir().join("USERS/carol/README.txt").is_file());
}

#[test]
fn maintenance_needs_login_and_expires() {
    let mut h = Harness::new(FakeRunner::succeeding());
    h.run("USER admin");
    assert!(h.run("MAINT").stderr_text().contains("LOGIN"));

    assert!(h.run("LOGIN wrong").stderr_text().contains("wrong password"));
    assert!(h.run("LOGIN secret").stdout_text().starts_with("Authenticated"));
    h.run("MAINT");
    assert!(h.shell.session().in_maintenance());
    assert!(h.shell.prompt().starts_with("[maint] "));

    let data = h.data_dir();
    assert_eq!(h.run("PWD").stdout_text(), data.display().to_string());
    assert!(h.run("DIR").stdout_text().contains("USERS"));
    assert!(h.run("WRITE x y").stderr_text().contains("not recognized"));

    h.run("CD ..");
    assert_eq!(
        h.run("PWD").stdout_text(),
        h.shell.config().app_root.display().to_string()
    );
    assert!(h.run("CD ..").stderr_text().contains("access denied"));
    assert!(h.run("CD ../..").stderr_text().contains("access denied"));

    h.clock.advance(301);
    let output = h.run("DIR");
    assert!(output.stderr_text().contains("expired"));
    assert!(output.stdout_text().is_empty());
    assert!(!h.shell.session().in_maintenance());
    assert!(h.run("MAINT").stderr_text().contains("LOGIN"));
}

#[test]
fn maintenance_reads_and_creates_on_disk() {
    let mut h = Harness::new(FakeRunner::succeeding());
    h.run("USER admin");
    h.run("LOGIN secret");
    h.run("MAINT");

    h.run("MKDIR scratch");
    assert!(h.data_dir().join("scratch").is_dir());
    assert!(h.run("MKDIR scratch").stderr_text().contains("already exists"));

    h.run("CD USERS/admin");
    assert!(h.run("TYPE README.txt").stdout_text().contains("Welcome"));
    h.run("NORMAL");
    assert_eq!(h.shell.cwd_path(), "vfs:/USERS/admin");

    // The virtual root only learns about the new directory through a pull.
    h.run("CD ..");
    h.run("CD ..");
    assert!(h.shell.tree().find_child(h.shell.tree().root(), "scratch").is_none());
    h.run("SYNC");
    assert!(h.shell.tree().find_child(h.shell.tree().root(), "scratch").is_some());
}

#[test]
fn edit_saves_and_cancels() {
    let mut h = Harness::new(FakeRunner::succeeding());
    assert!(h.run("EDIT notes.txt").stdout_text().starts_with("Editing notes.txt"));
    assert!(h.shell.prompt().starts_with("notes.txt:1| "));
    h.run("first line");
    h.run("");
    h.run("third line");
    assert!(h.run(":w").stdout_text().starts_with("Saved notes.txt"));
    assert!(!h.shell.session().is_editing());

    let home = h.shell.session().cwd;
    let saved = h.shell.tree().find_file(home, "notes.txt").unwrap();
    assert_eq!(saved.content(), "first line\n\nthird line");
    let on_disk = std::fs::read_to_string(h.data_dir().join("USERS/guest/notes.txt")).unwrap();
    assert_eq!(on_disk, "first line\n\nthird line");

    h.run("EDIT NOTES.TXT");
    h.run("DEL notes.txt");
    h.run("\u{1b}");
    let kept = h.shell.tree().find_file(home, "notes.txt").unwrap();
    assert_eq!(kept.content(), "first line\n\nthird line");

    h.run("EDIT notes.txt");
    h.run("fourth\u{13}");
    let extended = h.shell.tree().find_file(home, "notes.txt").unwrap();
    assert_eq!(extended.content(), "first line\n\nthird line\nfourth");
}

#[test]
fn saving_an_untouched_buffer_keeps_the_bytes() {
    let mut h = Harness::new(FakeRunner::succeeding());
    let on_disk = h.data_dir().join("USERS/guest/crlf.txt");
    std::fs::write(&on_disk, "one\r\ntwo\r\n").unwrap();
    h.run("SYNC");

    h.run("EDIT crlf.txt");
    assert!(h.run(":w").stdout_text().starts_with("Saved crlf.txt (10 bytes)"));
    assert_eq!(std::fs::read(&on_disk).unwrap(), b"one\r\ntwo\r\n");

    h.run("EDIT crlf.txt");
    h.run("three");
    h.run(":w");
    assert_eq!(std::fs::read_to_string(&on_disk).unwrap(), "one\r\ntwo\r\nthree\r\n");
}

#[test]
fn failed_save_keeps_the_buffer() {
    let mut h = Harness::new(FakeRunner::succeeding());
    h.run("MKDIR full");
    h.run("CD full");
    for i in 0..h.shell.tree().limits().max_files {
        h.run(&format!("TOUCH f{i}"));
    }

    h.run("EDIT extra.txt");
    h.run("keep me");
    let output = h.run(":w");
    assert!(output.stderr_text().contains("limit reached"));
    assert!(output.stderr_text().contains("still editing"));
    assert!(h.shell.session().is_editing());
    assert_eq!(h.shell.prompt(), "extra.txt:2| ");

    assert!(h.run(":q").stdout_text().contains("cancelled"));
    assert!(!h.shell.session().is_editing());
    assert!(h.shell.tree().find_file(h.shell.session().cwd, "extra.txt").is_none());
}

#[test]
fn dispatch_refuses_while_editing() {
    let mut h = Harness::new(FakeRunner::succeeding());
    h.run("EDIT draft.txt");
    h.shell.dispatch("MKDIR nope");
    assert!(h.shell.take_output().stderr_text().contains("finish editing"));
    h.run(":q");
    assert!(h.shell.tree().find_child(h.shell.session().cwd, "nope").is_none());
    assert!(h.shell.tree().find_file(h.shell.session().cwd, "draft.txt").is_none());
}

#[test]
fn exec_runs_in_the_real_directory_and_pulls_results() {
    let mut h = Harness::new(FakeRunner {
        status: Some(0),
        creates: Some(("generated.txt", "made by tool")),
        ..FakeRunner::default()
    });
    h.run("CD Projects");
    h.run("WRITE input.txt data");
    let output = h.run(r#"EXEC tool --flag "two words""#);

    let calls = h.runner.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "tool");
    assert_eq!(calls[0].1, vec!["--flag", "two words"]);
    assert_eq!(calls[0].2, h.data_dir().join("USERS/guest/Projects"));
    assert!(output.stdout_text().contains("ran tool"));

    let cwd = h.shell.session().cwd;
    let generated = h.shell.tree().find_file(cwd, "generated.txt").unwrap();
    assert_eq!(generated.content(), "made by tool");
}

#[test]
fn tool_runs_push_past_entries_the_disk_refuses() {
    let mut h = Harness::new(FakeRunner::succeeding());
    let home = h.data_dir().join("USERS/guest");
    std::fs::remove_file(home.join("README.txt")).unwrap();
    std::fs::create_dir(home.join("README.txt")).unwrap();
    std::fs::remove_dir(home.join("Documents")).unwrap();

    let output = h.run("EXEC tool");
    let warnings = output.stderr_text();
    assert!(warnings.contains("disk sync failed"), "{warnings}");
    assert!(warnings.contains("README.txt"), "{warnings}");
    assert!(home.join("Documents").is_dir());
    assert_eq!(h.runner.calls().len(), 1);
}

#[test]
fn failing_tools_report_their_exit_code() {
    let mut h = Harness::new(FakeRunner {
        status: Some(2),
        ..FakeRunner::default()
    });
    let output = h.run("GIT status");
    assert_eq!(output.stderr_text(), "git exited with code 2");
    assert!(h.run("GIT").stderr_text().contains("usage"));
}

#[test]
fn build_picks_the_project_kind() {
    let mut h = Harness::new(FakeRunner::succeeding());
    h.run("CD Projects");
    assert!(h.run("BUILD").stderr_text().contains("no Cargo.toml"));

    h.run("WRITE main.c int main(void) { return 0; }");
    h.run("BUILD");
    let (program, args, _) = h.runner.calls().pop().unwrap();
    assert_eq!(program, "cc");
    assert!(args[0].ends_with("main.c"));
    assert_eq!(&args[1..], ["-o", "main"]);

    h.run("TOUCH Cargo.toml");
    h.run("BUILD");
    let (program, args, _) = h.runner.calls().pop().unwrap();
    assert_eq!(program, "cargo");
    assert_eq!(args, vec!["build"]);
}

#[test]
fn serve_starts_without_waiting() {
    let mut h = Harness::new(FakeRunner::succeeding());
    let output = h.run("SERVE python3 -m http.server");
    assert!(output.stdout_text().starts_with("Started python3 (pid 4242)"));
    assert_eq!(h.runner.calls()[0].1, vec!["-m", "http.server"]);
}

#[test]
fn homes_cannot_be_removed_from_under_the_session() {
    let mut h = Harness::new(FakeRunner::succeeding());
    h.run("CD ..");
    assert!(h.run("RMDIR guest").stderr_text().contains("home"));
    assert!(h.run("SOFTDEL /S guest").stderr_text().contains("home"));

    h.run("RMDIR admin");
    assert!(seed::home_of(h.shell.tree(), "admin").is_none());
    assert!(!h.data_dir().join("USERS/admin").exists());
}

#[test]
fn whoami_shows_authentication_window() {
    let mut h = Harness::new(FakeRunner::succeeding());
    assert_eq!(h.run("WHOAMI").stdout_text(), "guest");
    h.run("USER admin");
    h.run("LOGIN secret");
    h.clock.advance(60);
    assert_eq!(h.run("WHOAMI").stdout_text(), "admin\nauthenticated, 4m 00s left");
    h.run("USER guest");
    h.run("USER admin");
    assert_eq!(h.run("WHOAMI").stdout_text(), "admin");
}

#[test]
fn exit_saves_the_snapshot() {
    let mut h = Harness::new(FakeRunner::succeeding());
    h.run("WRITE keep.txt \"a|b\"");
    assert_eq!(h.shell.feed("EXIT"), Flow::Terminate);
    let snapshot = std::fs::read_to_string(h.shell.config().snapshot_path()).unwrap();
    assert!(snapshot.contains("FILE:keep.txt|a\\|b"));
}
