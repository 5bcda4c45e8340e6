//! Handlers for the normal (virtual tree) command table.

use super::{maintenance, table, Shell};
use crate::errors::CoreError;
use crate::helpers::{format_duration, format_timestamp, print_size, split_first_word, strip_quotes};
use crate::models::{Flow, Privilege};
use crate::path;
use crate::seed;
use crate::session::verify_password;
use crate::trash::{TrashItem, TrashKind};
use crate::tree::{DirId, Tree};

/// The whole argument as one name, surrounding quotes removed.
fn name_arg<'a>(arg: &'a str, usage: &str) -> crate::Result<&'a str> {
    let name = strip_quotes(arg.trim());
    if name.is_empty() {
        return Err(CoreError::invalid_input(format!("usage: {usage}")));
    }
    Ok(name)
}

/// `<file> <text>` split, with one layer of quotes removed from each part.
fn file_and_text<'a>(arg: &'a str, usage: &str) -> crate::Result<(&'a str, &'a str)> {
    let (file, text) = split_first_word(arg);
    let file = strip_quotes(file);
    if file.is_empty() {
        return Err(CoreError::invalid_input(format!("usage: {usage}")));
    }
    Ok((file, strip_quotes(text.trim_start())))
}

fn not_a_file(tree: &Tree, dir: DirId, name: &str) -> CoreError {
    if tree.find_child(dir, name).is_some() {
        CoreError::invalid_input(format!("{name} is a directory"))
    } else {
        CoreError::not_found(name)
    }
}

fn not_a_dir(tree: &Tree, dir: DirId, name: &str) -> CoreError {
    if tree.find_file(dir, name).is_some() {
        CoreError::invalid_input(format!("{name} is a file"))
    } else {
        CoreError::not_found(name)
    }
}

pub(super) fn list(shell: &mut Shell, _arg: &str) -> crate::Result<Flow> {
    let cwd = shell.session.cwd;
    let tree = &shell.tree;
    let mut lines = vec![format!(" Directory of {}", path::render(tree, cwd)), String::new()];
    for child in tree.children(cwd) {
        lines.push(format!("{:<12}{:>10}  {}", "<DIR>", "", tree.name(*child)));
    }
    let mut total = 0u64;
    for file in tree.files(cwd) {
        total += file.len() as u64;
        lines.push(format!("{:<12}{:>10}  {}", "", file.len(), file.name()));
    }
    lines.push(format!(
        "{:>8} Dir(s) {:>8} File(s) {:>10}",
        tree.children(cwd).len(),
        tree.files(cwd).len(),
        print_size(total)
    ));

    for line in lines {
        shell.output.out(line);
    }
    Ok(Flow::Continue)
}

fn tree_lines(tree: &Tree, dir: DirId, depth: usize, lines: &mut Vec<String>) {
    let indent = "  ".repeat(depth);
    for child in tree.children(dir) {
        lines.push(format!("{indent}{}/", tree.name(*child)));
        tree_lines(tree, *child, depth + 1, lines);
    }
    for file in tree.files(dir) {
        lines.push(format!("{indent}{} ({})", file.name(), print_size(file.len() as u64)));
    }
}

pub(super) fn tree(shell: &mut Shell, _arg: &str) -> crate::Result<Flow> {
    let cwd = shell.session.cwd;
    let mut lines = vec![path::render(&shell.tree, cwd)];
    tree_lines(&shell.tree, cwd, 1, &mut lines);
    for line in lines {
        shell.output.out(line);
    }
    Ok(Flow::Continue)
}

pub(super) fn type_file(shell: &mut Shell, arg: &str) -> crate::Result<Flow> {
    let name = name_arg(arg, "TYPE <file>")?;
    let cwd = shell.session.cwd;
    let file = shell
        .tree
        .find_file(cwd, name)
        .ok_or_else(|| not_a_file(&shell.tree, cwd, name))?;
    shell.output.out_block(file.content());
    Ok(Flow::Continue)
}

pub(super) fn pwd(shell: &mut Shell, _arg: &str) -> crate::Result<Flow> {
    let cwd = shell.cwd_path();
    shell.output.out(cwd);
    Ok(Flow::Continue)
}

pub(super) fn echo(shell: &mut Shell, arg: &str) -> crate::Result<Flow> {
    shell.output.out(arg);
    Ok(Flow::Continue)
}

pub(super) fn whoami(shell: &mut Shell, _arg: &str) -> crate::Result<Flow> {
    let now = shell.now();
    let remaining = shell
        .session
        .auth_remaining(now, shell.config.session_timeout);
    shell.output.out(shell.session.user.clone());
    if let Some(left) = remaining {
        shell
            .output
            .out(format!("authenticated, {} left", format_duration(left)));
    }
    Ok(Flow::Continue)
}

pub(super) fn list_trash(shell: &mut Shell, _arg: &str) -> crate::Result<Flow> {
    if shell.trash.is_empty() {
        shell.output.out("Trash is empty.");
        return Ok(Flow::Continue);
    }
    let lines: Vec<String> = shell
        .trash
        .list()
        .map(|item| {
            let size = match item.kind() {
                TrashKind::File => print_size(item.size_hint() as u64),
                TrashKind::Directory => format!("{} entries", item.size_hint()),
            };
            format!(
                "{}  {:<4}  {:>10}  {}  (from {})",
                format_timestamp(item.deleted_at),
                item.kind(),
                size,
                item.name,
                item.origin
            )
        })
        .collect();
    for line in lines {
        shell.output.out(line);
    }
    Ok(Flow::Continue)
}

pub(super) fn help(shell: &mut Shell, _arg: &str) -> crate::Result<Flow> {
    let maintenance = shell.session.in_maintenance();
    for spec in table::commands(maintenance) {
        let aliases = spec.names[1..].join(", ");
        let mut line = format!("{:<26}{}", spec.usage, spec.summary);
        if !aliases.is_empty() {
            line.push_str(&format!(" (also {aliases})"));
        }
        if spec.privilege == Privilege::Admin {
            line.push_str(" [admin]");
        }
        shell.output.out(line);
    }
    Ok(Flow::Continue)
}

pub(super) fn mkdir(shell: &mut Shell, arg: &str) -> crate::Result<Flow> {
    let name = name_arg(arg, "MKDIR <name>")?;
    let dir = shell.tree.add_directory(shell.session.cwd, name)?;
    let pushed = shell.mirror.push_dir(&shell.tree, dir);
    shell.report_push(pushed);
    Ok(Flow::Continue)
}

pub(super) fn rmdir(shell: &mut Shell, arg: &str) -> crate::Result<Flow> {
    let name = name_arg(arg, "RMDIR <name>")?;
    let cwd = shell.session.cwd;
    let child = shell
        .tree
        .find_child(cwd, name)
        .ok_or_else(|| not_a_dir(&shell.tree, cwd, name))?;
    if shell.holds_home(child) {
        return Err(CoreError::denied(format!("{name} holds the current home directory")));
    }
    let stored = shell.tree.name(child).to_string();
    shell.tree.remove_child(cwd, &stored);
    let removed = shell.mirror.remove_dir(&shell.tree, cwd, &stored);
    shell.report_sync(removed);
    Ok(Flow::Continue)
}

pub(super) fn touch(shell: &mut Shell, arg: &str) -> crate::Result<Flow> {
    let name = name_arg(arg, "TOUCH <name>")?;
    let cwd = shell.session.cwd;
    shell.tree.add_file(cwd, name, "")?;
    let pushed = shell.mirror.push_file(&shell.tree, cwd, name);
    shell.report_sync(pushed);
    Ok(Flow::Continue)
}

pub(super) fn del(shell: &mut Shell, arg: &str) -> crate::Result<Flow> {
    let name = name_arg(arg, "DEL <name>")?;
    let cwd = shell.session.cwd;
    let file = match shell.tree.remove_file(cwd, name) {
        Some(file) => file,
        None => return Err(not_a_file(&shell.tree, cwd, name)),
    };
    let removed = shell.mirror.remove_file(&shell.tree, cwd, file.name());
    shell.report_sync(removed);
    Ok(Flow::Continue)
}

pub(super) fn softdel(shell: &mut Shell, arg: &str) -> crate::Result<Flow> {
    const USAGE: &str = "SOFTDEL [/S] <name>";
    let (first, rest) = split_first_word(arg);
    let (recursive, target) = if first.eq_ignore_ascii_case("/S") {
        (true, rest)
    } else {
        (false, arg)
    };
    let name = name_arg(target, USAGE)?;
    let cwd = shell.session.cwd;
    let origin = path::render(&shell.tree, cwd);
    let now = shell.now();

    let (stored, removed) = if let Some(file) = shell.tree.remove_file(cwd, name) {
        let stored = file.name().to_string();
        shell.trash.soft_delete(TrashItem::file(origin, file, now));
        let removed = shell.mirror.remove_file(&shell.tree, cwd, &stored);
        (stored, removed)
    } else if let Some(child) = shell.tree.find_child(cwd, name) {
        if shell.holds_home(child) {
            return Err(CoreError::denied(format!("{name} holds the current home directory")));
        }
        let is_empty = shell.tree.get(child).map_or(true, |dir| dir.is_empty());
        if !is_empty && !recursive {
            return Err(CoreError::precondition(format!(
                "{name} is not empty; use SOFTDEL /S {name}"
            )));
        }
        let stored = shell.tree.name(child).to_string();
        let Some(image) = shell.tree.remove_child(cwd, &stored) else {
            return Err(CoreError::not_found(name));
        };
        shell.trash.soft_delete(TrashItem::directory(origin, image, now));
        let removed = shell.mirror.remove_dir(&shell.tree, cwd, &stored);
        (stored, removed)
    } else {
        return Err(CoreError::not_found(name));
    };

    shell.report_sync(removed);
    shell.output.out(format!("Moved {stored} to trash."));
    Ok(Flow::Continue)
}

pub(super) fn restore(shell: &mut Shell, arg: &str) -> crate::Result<Flow> {
    let name = name_arg(arg, "RESTORE <name>")?;
    let cwd = shell.session.cwd;
    let restored = shell.trash.restore(name, &mut shell.tree, cwd)?;

    match restored.dir {
        Some(dir) => {
            let pushed = shell.mirror.push_dir(&shell.tree, dir);
            shell.report_push(pushed);
        }
        None => {
            let pushed = shell.mirror.push_file(&shell.tree, cwd, &restored.name);
            shell.report_sync(pushed);
        }
    }
    if restored.truncated {
        shell.output.err(format!(
            "warning: {} truncated to {} bytes",
            restored.name,
            shell.tree.limits().max_content
        ));
    }
    shell.output.out(format!(
        "Restored {} {} to {}.",
        restored.kind,
        restored.name,
        path::render(&shell.tree, cwd)
    ));
    Ok(Flow::Continue)
}

pub(super) fn empty_trash(shell: &mut Shell, _arg: &str) -> crate::Result<Flow> {
    let purged = shell.trash.purge();
    tracing::info!(purged, "trash emptied");
    shell
        .output
        .out(format!("Trash emptied ({purged} item(s) removed)."));
    Ok(Flow::Continue)
}

/// Replaces or extends `file` in `dir`, creating it when missing, then pushes it.
pub(super) fn store_text(
    shell: &mut Shell,
    dir: DirId,
    file: &str,
    text: &str,
    append: bool,
) -> crate::Result<()> {
    let limit = shell.tree.limits().max_content;
    let truncated = match shell.tree.find_file_mut(dir, file) {
        Some(existing) if append => existing.append(text, limit),
        Some(existing) => existing.set_content(text, limit),
        None => {
            if shell.tree.find_child(dir, file).is_some() {
                return Err(CoreError::invalid_input(format!("{file} is a directory")));
            }
            shell.tree.add_file(dir, file, text)?
        }
    };
    if truncated {
        shell
            .output
            .err(format!("warning: {file} truncated to {limit} bytes"));
    }
    let pushed = shell.mirror.push_file(&shell.tree, dir, file);
    shell.report_sync(pushed);
    Ok(())
}

pub(super) fn write(shell: &mut Shell, arg: &str) -> crate::Result<Flow> {
    let (file, text) = file_and_text(arg, "WRITE <file> <text>")?;
    let cwd = shell.session.cwd;
    store_text(shell, cwd, file, text, false)?;
    Ok(Flow::Continue)
}

pub(super) fn append(shell: &mut Shell, arg: &str) -> crate::Result<Flow> {
    let (file, text) = file_and_text(arg, "APPEND <file> <text>")?;
    let cwd = shell.session.cwd;
    store_text(shell, cwd, file, text, true)?;
    Ok(Flow::Continue)
}

pub(super) fn sync(shell: &mut Shell, _arg: &str) -> crate::Result<Flow> {
    let cwd = shell.session.cwd;
    let report = shell.mirror.pull(&mut shell.tree, cwd, false)?;
    for skipped in &report.skipped {
        shell.output.err(format!("skipped {skipped}"));
    }
    shell.output.out(format!(
        "Synced {}: {} director{} and {} file(s) added.",
        path::render(&shell.tree, cwd),
        report.dirs_added,
        if report.dirs_added == 1 { "y" } else { "ies" },
        report.files_added
    ));
    Ok(Flow::Continue)
}

pub(super) fn save_fs(shell: &mut Shell, arg: &str) -> crate::Result<Flow> {
    let target = match strip_quotes(arg.trim()) {
        "" => shell.config.snapshot_path(),
        given => maintenance::within_app_root(shell, &shell.config.app_root, given)?,
    };
    shell.save_snapshot_to(&target)?;
    shell
        .output
        .out(format!("Snapshot written to {}.", target.display()));
    Ok(Flow::Continue)
}

pub(super) fn add_user(shell: &mut Shell, arg: &str) -> crate::Result<Flow> {
    let name = name_arg(arg, "ADDUSER <name>")?;
    path::validate_name(name, shell.tree.limits())?;
    let home = seed::create_home(&mut shell.tree, name)?;
    let pushed = shell.mirror.push_dir(&shell.tree, home);
    shell.report_push(pushed);
    tracing::info!(user = name, "user added");
    shell.output.out(format!("User {name} created."));
    Ok(Flow::Continue)
}

pub(super) fn cd(shell: &mut Shell, arg: &str) -> crate::Result<Flow> {
    let token = strip_quotes(arg.trim());
    let target = path::resolve(&shell.tree, shell.session.cwd, shell.session.home, token)
        .map_err(|_| not_a_dir(&shell.tree, shell.session.cwd, token))?;
    shell.session.cwd = target;
    Ok(Flow::Continue)
}

pub(super) fn switch_user(shell: &mut Shell, arg: &str) -> crate::Result<Flow> {
    let name = name_arg(arg, "USER <name>")?;
    let home = seed::home_of(&shell.tree, name)
        .ok_or_else(|| CoreError::not_found(format!("user {name}")))?;
    let user = shell.tree.name(home).to_string();
    tracing::info!(from = %shell.session.user, to = %user, "user switched");
    shell.session.switch_user(user.clone(), home);
    shell.output.out(format!("Now working as {user}."));
    Ok(Flow::Continue)
}

pub(super) fn login(shell: &mut Shell, arg: &str) -> crate::Result<Flow> {
    let password = strip_quotes(arg.trim());
    if password.is_empty() {
        return Err(CoreError::invalid_input("usage: LOGIN <password>"));
    }
    if !shell.is_admin() {
        return Err(CoreError::denied(format!(
            "no credentials are kept for {}",
            shell.session.user
        )));
    }
    let hash = shell
        .config
        .admin_password_hash
        .clone()
        .ok_or_else(|| CoreError::precondition("no admin password is configured"))?;

    if !verify_password(&hash, password)? {
        shell.session.clear_authentication();
        tracing::warn!(user = %shell.session.user, "failed login");
        return Err(CoreError::denied("wrong password"));
    }
    let now = shell.now();
    shell.session.authenticate(now);
    tracing::info!(user = %shell.session.user, "authenticated");
    shell.output.out(format!(
        "Authenticated for {}.",
        format_duration(shell.config.session_timeout)
    ));
    Ok(Flow::Continue)
}

pub(super) fn clear(shell: &mut Shell, _arg: &str) -> crate::Result<Flow> {
    shell.output.lines.clear();
    shell.output.clear_screen = true;
    Ok(Flow::Continue)
}

pub(super) fn exit(shell: &mut Shell, _arg: &str) -> crate::Result<Flow> {
    let target = shell.config.snapshot_path();
    let saved = shell.save_snapshot_to(&target);
    shell.report_sync(saved);
    Ok(Flow::Terminate)
}
