//! Terminal loop around [`vfsh_core::Shell`].
//!
//! - Prompt and command history via rustyline
//! - `-c` style one-shot command lists
//! - `CLS` mapped to an ANSI clear

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::Editor;
use vfsh_core::{CommandOutput, Flow, Shell, Stream};

/// History file kept next to the data directory, outside the mirrored tree.
pub const HISTORY_FILE_NAME: &str = ".vfsh_history";

const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

/// Writes one batch of shell output to the terminal streams.
pub fn emit(output: &CommandOutput, out: &mut impl Write, err: &mut impl Write) -> io::Result<()> {
    if output.clear_screen {
        out.write_all(CLEAR_SCREEN.as_bytes())?;
    }
    for line in &output.lines {
        match line.stream {
            Stream::Out => writeln!(out, "{}", line.text)?,
            Stream::Err => writeln!(err, "{}", line.text)?,
        }
    }
    out.flush()?;
    err.flush()
}

fn emit_to_terminal(output: &CommandOutput) -> Result<()> {
    emit(output, &mut io::stdout().lock(), &mut io::stderr().lock())
        .context("failed to write to the terminal")
}

/// Runs `commands` in order, then `EXIT` unless one of them already ended the
/// session. Returns false when any command reported an error.
pub fn run_commands<I, S>(shell: &mut Shell, commands: I) -> Result<bool>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    emit_to_terminal(&shell.take_output())?;
    let mut clean = true;
    let mut terminated = false;
    for command in commands {
        let flow = shell.feed(command.as_ref());
        let output = shell.take_output();
        clean &= !output.lines.iter().any(|line| line.stream == Stream::Err);
        emit_to_terminal(&output)?;
        if flow == Flow::Terminate {
            terminated = true;
            break;
        }
    }
    if !terminated {
        shell.feed("EXIT");
        let output = shell.take_output();
        clean &= output.lines.is_empty();
        emit_to_terminal(&output)?;
    }
    Ok(clean)
}

fn save_history(rl: &mut Editor<(), DefaultHistory>, history_path: &Path) {
    if let Err(e) = rl.save_history(history_path) {
        tracing::warn!("Failed to save history: {}", e);
    }
}

/// Interactive prompt loop. Returns when the shell terminates or input ends.
pub fn run(shell: &mut Shell) -> Result<()> {
    let mut rl: Editor<(), DefaultHistory> =
        Editor::new().context("Failed to create editor")?;

    let history_path: PathBuf = shell.config().app_root.join(HISTORY_FILE_NAME);
    if let Err(e) = rl.load_history(&history_path) {
        let is_not_found = matches!(&e, ReadlineError::Io(io_err) if io_err.kind() == io::ErrorKind::NotFound);
        if !is_not_found {
            tracing::warn!("Failed to load history: {}", e);
        }
    }

    println!(
        "vfsh {} - type HELP for commands, EXIT to save and leave.",
        env!("CARGO_PKG_VERSION")
    );
    emit_to_terminal(&shell.take_output())?;

    loop {
        let prompt = shell.prompt();
        match rl.readline(&prompt) {
            Ok(line) => {
                // Edit buffers are content, not commands worth recalling.
                if !shell.session().is_editing() && !line.trim().is_empty() {
                    if let Err(e) = rl.add_history_entry(line.as_str()) {
                        tracing::warn!("Failed to add history entry: {}", e);
                    }
                }
                let flow = shell.feed(&line);
                emit_to_terminal(&shell.take_output())?;
                if flow == Flow::Terminate {
                    break;
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
            }
            Err(ReadlineError::Eof) => {
                shell.feed("EXIT");
                emit_to_terminal(&shell.take_output())?;
                break;
            }
            Err(e) => {
                save_history(&mut rl, &history_path);
                return Err(e).context("Failed to read input");
            }
        }
    }

    save_history(&mut rl, &history_path);
    Ok(())
}
