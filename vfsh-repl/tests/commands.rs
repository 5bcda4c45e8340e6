use vfsh_core::{Shell, ShellConfig};

#[test]
fn command_lists_run_then_save() {
    let root = tempfile::tempdir().unwrap();
    let mut shell = Shell::open(ShellConfig::new(root.path())).unwrap();

    let clean = vfsh_repl::run_commands(&mut shell, ["MKDIR notes", "CD notes", "WRITE a.txt hi"]).unwrap();
    assert!(clean);

    let data = root.path().join("data");
    assert_eq!(
        std::fs::read_to_string(data.join("USERS/guest/notes/a.txt")).unwrap(),
        "hi"
    );
    let snapshot = std::fs::read_to_string(data.join("filesystem.dat")).unwrap();
    assert!(snapshot.contains("DIR:vfs:/USERS/guest/notes"));
}

#[test]
fn failing_commands_make_the_run_unclean() {
    let root = tempfile::tempdir().unwrap();
    let mut shell = Shell::open(ShellConfig::new(root.path())).unwrap();

    let clean = vfsh_repl::run_commands(&mut shell, ["CD nowhere", "EXIT", "MKDIR late"]).unwrap();
    assert!(!clean);
    assert!(!root.path().join("data/USERS/guest/late").exists());
}
