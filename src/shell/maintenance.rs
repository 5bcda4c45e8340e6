//! Maintenance mode: a small command set acting on the real disk below the
//! application root, open to an authenticated admin only.

use super::Shell;
use crate::errors::CoreError;
use crate::helpers::{format_duration, print_size, strip_quotes};
use crate::models::Flow;
use crate::path;
use crate::session::{MaintenanceState, Mode};
use std::path::{Component, Path, PathBuf};

/// Lexically folds `.` and `..` out of `path`.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if out.file_name().is_some() {
                    out.pop();
                } else if !out.has_root() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

fn cursor(shell: &Shell) -> crate::Result<PathBuf> {
    match &shell.session.mode {
        Mode::Maintenance(state) => Ok(state.cursor.clone()),
        _ => Err(CoreError::precondition("not in maintenance mode")),
    }
}

/// Resolves `token` against `base`, refusing anything outside the app root.
pub(super) fn within_app_root(shell: &Shell, base: &Path, token: &str) -> crate::Result<PathBuf> {
    let root = normalize(&shell.config.app_root);
    let target = normalize(&base.join(token));
    if !target.starts_with(&root) {
        return Err(CoreError::denied(format!(
            "{} is outside {}",
            target.display(),
            root.display()
        )));
    }
    Ok(target)
}

fn confine(shell: &Shell, token: &str) -> crate::Result<PathBuf> {
    within_app_root(shell, &cursor(shell)?, token)
}

pub(super) fn enter(shell: &mut Shell, _arg: &str) -> crate::Result<Flow> {
    let now = shell.now();
    let Some(left) = shell
        .session
        .auth_remaining(now, shell.config.session_timeout)
    else {
        return Err(CoreError::denied("authenticate with LOGIN first"));
    };

    let start = normalize(&shell.config.data_dir());
    tracing::info!(user = %shell.session.user, cursor = %start.display(), "entering maintenance mode");
    shell.output.out(format!(
        "Maintenance mode on {} ({} left). NORMAL returns.",
        shell.config.app_root.display(),
        format_duration(left)
    ));
    shell.session.mode = Mode::Maintenance(MaintenanceState { cursor: start });
    Ok(Flow::Continue)
}

/// Drops back to normal mode once the authentication window has closed.
pub(super) fn session_still_valid(shell: &mut Shell) -> bool {
    let now = shell.now();
    if shell
        .session
        .is_authenticated(now, shell.config.session_timeout)
    {
        return true;
    }
    shell.session.mode = Mode::Normal;
    shell.session.clear_authentication();
    tracing::info!(user = %shell.session.user, "maintenance session expired");
    shell
        .output
        .err("maintenance session expired; LOGIN again to continue");
    false
}

pub(super) fn leave(shell: &mut Shell, _arg: &str) -> crate::Result<Flow> {
    shell.session.mode = Mode::Normal;
    shell
        .output
        .out(format!("Back to normal mode at {}.", shell.cwd_path()));
    Ok(Flow::Continue)
}

pub(super) fn pwd(shell: &mut Shell, _arg: &str) -> crate::Result<Flow> {
    let cursor = cursor(shell)?;
    shell.output.out(cursor.display().to_string());
    Ok(Flow::Continue)
}

pub(super) fn cd(shell: &mut Shell, arg: &str) -> crate::Result<Flow> {
    let token = strip_quotes(arg.trim());
    let target = if token.is_empty() {
        normalize(&shell.config.data_dir())
    } else {
        confine(shell, token)?
    };
    if !shell.mirror.fs().is_dir(&target) {
        return Err(CoreError::not_found(target.display().to_string()));
    }
    shell.session.mode = Mode::Maintenance(MaintenanceState { cursor: target });
    Ok(Flow::Continue)
}

pub(super) fn list(shell: &mut Shell, _arg: &str) -> crate::Result<Flow> {
    let cursor = cursor(shell)?;
    let fs = shell.mirror.fs();
    let mut lines = vec![format!(" Directory of {}", cursor.display()), String::new()];
    for entry in fs.list_dir(&cursor)? {
        let name = entry
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        if fs.is_dir(&entry) {
            lines.push(format!("{:<12}{:>10}  {name}", "<DIR>", ""));
        } else {
            let size = fs.metadata(&entry).map(|meta| meta.len()).unwrap_or(0);
            lines.push(format!("{:<12}{:>10}  {name}", "", print_size(size)));
        }
    }
    for line in lines {
        shell.output.out(line);
    }
    Ok(Flow::Continue)
}

pub(super) fn type_file(shell: &mut Shell, arg: &str) -> crate::Result<Flow> {
    let name = strip_quotes(arg.trim());
    if name.is_empty() {
        return Err(CoreError::invalid_input("usage: TYPE <file>"));
    }
    let target = confine(shell, name)?;
    let fs = shell.mirror.fs();
    if fs.is_dir(&target) {
        return Err(CoreError::invalid_input(format!("{name} is a directory")));
    }
    let limit = shell.config.limits.max_content;
    let content = fs.read_bounded(&target, limit)?;
    let full_size = fs.metadata(&target).map(|meta| meta.len()).unwrap_or(0);
    shell.output.out_block(&content);
    if full_size > limit as u64 {
        shell.output.err(format!(
            "(showing the first {limit} of {full_size} bytes)"
        ));
    }
    Ok(Flow::Continue)
}

pub(super) fn mkdir(shell: &mut Shell, arg: &str) -> crate::Result<Flow> {
    let name = strip_quotes(arg.trim());
    path::validate_name(name, &shell.config.limits)?;
    let target = confine(shell, name)?;
    if shell.mirror.fs().exists(&target) {
        return Err(CoreError::exists(name));
    }
    shell.mirror.fs().create_dir_all(&target)?;
    tracing::info!(path = %target.display(), "maintenance mkdir");
    Ok(Flow::Continue)
}
