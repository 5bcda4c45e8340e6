//! Line-by-line `EDIT` mode.
//!
//! Every line fed while editing is appended to the buffer. A line holding
//! Ctrl-S (`0x13`) or `:w` saves, Esc (`0x1b`) or `:q` throws the buffer away.

use super::{commands, Shell};
use crate::errors::CoreError;
use crate::helpers::strip_quotes;
use crate::models::Flow;
use crate::session::{EditState, Mode};

const SAVE_KEY: char = '\u{13}';
const CANCEL_KEY: char = '\u{1b}';

enum Action<'a> {
    Line(&'a str),
    Save(&'a str),
    Cancel,
}

fn classify(line: &str) -> Action<'_> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.contains(CANCEL_KEY) {
        return Action::Cancel;
    }
    if let Some(idx) = line.find(SAVE_KEY) {
        return Action::Save(&line[..idx]);
    }
    match line.trim() {
        ":w" | ":W" => Action::Save(""),
        ":q" | ":Q" => Action::Cancel,
        _ => Action::Line(line),
    }
}

pub(super) fn start(shell: &mut Shell, arg: &str) -> crate::Result<Flow> {
    let name = strip_quotes(arg.trim());
    if name.is_empty() {
        return Err(CoreError::invalid_input("usage: EDIT <file>"));
    }
    let cwd = shell.session.cwd;
    if shell.tree.find_child(cwd, name).is_some() {
        return Err(CoreError::invalid_input(format!("{name} is a directory")));
    }

    let state = match shell.tree.find_file(cwd, name) {
        Some(file) => EditState::new(cwd, file.name(), file.content()),
        None => {
            shell.tree.check_new_name(cwd, name)?;
            EditState::new(cwd, name, "")
        }
    };
    let kept = state.line_count();
    shell.output.out(format!(
        "Editing {} ({kept} line(s)). Ctrl-S or :w saves, Esc or :q cancels.",
        state.file
    ));
    shell.session.mode = Mode::Editing(state);
    Ok(Flow::Continue)
}

pub(super) fn handle_line(shell: &mut Shell, line: &str) {
    let Mode::Editing(state) = &mut shell.session.mode else {
        return;
    };
    match classify(line) {
        Action::Line(text) => state.push_line(text),
        Action::Save(tail) => {
            if !tail.is_empty() {
                state.push_line(tail);
            }
            save(shell);
        }
        Action::Cancel => {
            let file = state.file.clone();
            shell.session.mode = Mode::Normal;
            shell.output.out(format!("Edit of {file} cancelled."));
        }
    }
}

fn save(shell: &mut Shell) {
    let Mode::Editing(state) = std::mem::take(&mut shell.session.mode) else {
        return;
    };
    if !shell.tree.contains(state.dir) {
        shell
            .output
            .err(format!("{} was not saved: its directory is gone", state.file));
        return;
    }

    let text = state.text();
    match commands::store_text(shell, state.dir, &state.file, &text, false) {
        Ok(()) => {
            let size = shell
                .tree
                .find_file(state.dir, &state.file)
                .map_or(0, |file| file.len());
            tracing::debug!(file = %state.file, bytes = size, "edit saved");
            shell
                .output
                .out(format!("Saved {} ({size} bytes).", state.file));
        }
        Err(err) => {
            shell.output.err(format!(
                "{} was not saved: {}; still editing (:w retries, :q cancels)",
                state.file,
                err.to_user_message()
            ));
            shell.session.mode = Mode::Editing(state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_keys_and_commands_are_recognized() {
        assert!(matches!(classify("hello"), Action::Line("hello")));
        assert!(matches!(classify("  indented\r\n"), Action::Line("  indented")));
        assert!(matches!(classify(":w"), Action::Save("")));
        assert!(matches!(classify("last line\u{13}"), Action::Save("last line")));
        assert!(matches!(classify("\u{1b}"), Action::Cancel));
        assert!(matches!(classify(" :q "), Action::Cancel));
        assert!(matches!(classify(""), Action::Line("")));
    }
}
