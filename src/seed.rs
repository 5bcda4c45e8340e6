//! Fresh-tree layout and per-user home directories.

use crate::config::{ShellConfig, DEFAULT_HOME_FOLDERS, README_FILE_NAME, USERS_DIR};
use crate::errors::CoreError;
use crate::tree::{DirId, Tree};

const README_TEXT: &str = "Welcome to vfsh.\r\n\
Type HELP for the command list.\r\n\
Everything under your home folder is mirrored to disk.\r\n";

/// The `/USERS` directory, if present.
pub fn users_dir(tree: &Tree) -> Option<DirId> {
    tree.find_child(tree.root(), USERS_DIR)
}

/// Home directory of `user`, if present.
pub fn home_of(tree: &Tree, user: &str) -> Option<DirId> {
    users_dir(tree).and_then(|users| tree.find_child(users, user))
}

/// Returns `/USERS`, creating it when missing.
pub fn ensure_users_dir(tree: &mut Tree) -> crate::Result<DirId> {
    match users_dir(tree) {
        Some(users) => Ok(users),
        None => tree.add_directory(tree.root(), USERS_DIR),
    }
}

/// Creates `/USERS/<user>` with the default folders and a README.
pub fn create_home(tree: &mut Tree, user: &str) -> crate::Result<DirId> {
    let users = ensure_users_dir(tree)?;
    if tree.name_taken(users, user) {
        return Err(CoreError::exists(user));
    }
    let home = tree.add_directory(users, user)?;
    for folder in DEFAULT_HOME_FOLDERS {
        tree.add_directory(home, folder)?;
    }
    tree.add_file(home, README_FILE_NAME, README_TEXT)?;
    Ok(home)
}

/// The tree used when no snapshot exists.
pub fn seed_tree(config: &ShellConfig) -> crate::Result<Tree> {
    let mut tree = Tree::new(config.limits);
    ensure_users_dir(&mut tree)?;
    for user in &config.users {
        create_home(&mut tree, user)?;
    }
    Ok(tree)
}
