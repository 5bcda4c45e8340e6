//! Command dispatcher: one input line in, output lines and a [`Flow`] out.
//!
//! ```text
//! feed(line) ──▶ Editing? ──yes──▶ edit buffer / save / cancel
//!                   │no
//!                   ▼
//!              dispatch(line) ──▶ tokenize ──▶ table lookup ──▶ privilege gate ──▶ handler
//!                                                (normal or maintenance table)
//! ```
//!
//! Handlers mutate the tree and then push the affected part to disk. Every
//! error becomes one output line; nothing here ends the process except
//! `EXIT`/`QUIT`.

mod commands;
mod edit;
mod maintenance;
mod passthrough;
mod table;

use crate::config::ShellConfig;
use crate::external::{ProcessRunner, ToolRunner};
use crate::fs::{FileSystem, RealFileSystem};
use crate::helpers::split_first_word;
use crate::mirror::{BootSource, DiskMirror, PushReport};
use crate::models::{CommandOutput, Flow, Privilege};
use crate::path;
use crate::seed;
use crate::session::{Clock, Mode, Session, SystemClock};
use crate::trash::TrashLedger;
use crate::tree::{DirId, Tree};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Interactive shell over the virtual filesystem.
pub struct Shell {
    config: ShellConfig,
    tree: Tree,
    trash: TrashLedger,
    mirror: DiskMirror,
    session: Session,
    clock: Arc<dyn Clock>,
    runner: Arc<dyn ToolRunner>,
    output: CommandOutput,
}

impl Shell {
    /// Boots a shell against the real disk, the system clock and real processes.
    pub fn open(config: ShellConfig) -> crate::Result<Self> {
        Self::with_backends(
            config,
            Arc::new(RealFileSystem),
            Arc::new(SystemClock),
            Arc::new(ProcessRunner::new()),
        )
    }

    /// Boots a shell with explicit backends.
    pub fn with_backends(
        config: ShellConfig,
        fs: Arc<dyn FileSystem>,
        clock: Arc<dyn Clock>,
        runner: Arc<dyn ToolRunner>,
    ) -> crate::Result<Self> {
        let mirror = DiskMirror::new(fs, config.data_dir());
        let boot = mirror.bootstrap(&config)?;
        let mut tree = boot.tree;
        let mut output = CommandOutput::default();
        for note in &boot.notes {
            output.err(format!("warning: {note}"));
        }

        let home = match seed::home_of(&tree, &config.start_user) {
            Some(home) => home,
            None => match seed::create_home(&mut tree, &config.start_user) {
                Ok(home) => {
                    for failure in mirror.push_dir(&tree, home).failed {
                        output.err(format!("warning: disk sync failed: {failure}"));
                    }
                    home
                }
                Err(err) => {
                    output.err(format!("warning: no home for {}: {}", config.start_user, err.to_user_message()));
                    tree.root()
                }
            },
        };
        if boot.source == BootSource::Snapshot {
            tracing::info!(path = %config.snapshot_path().display(), "restored tree from snapshot");
        }

        let session = Session::new(config.start_user.clone(), home);
        Ok(Self {
            config,
            tree,
            trash: TrashLedger::new(),
            mirror,
            session,
            clock,
            runner,
            output,
        })
    }

    pub fn config(&self) -> &ShellConfig {
        &self.config
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn trash(&self) -> &TrashLedger {
        &self.trash
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn mirror(&self) -> &DiskMirror {
        &self.mirror
    }

    /// Rendered path of the current directory.
    pub fn cwd_path(&self) -> String {
        path::render(&self.tree, self.session.cwd)
    }

    pub fn prompt(&self) -> String {
        match &self.session.mode {
            Mode::Normal => format!("{}> ", self.cwd_path()),
            Mode::Editing(edit) => format!("{}:{}| ", edit.file, edit.line_count() + 1),
            Mode::Maintenance(state) => format!("[maint] {}# ", state.cursor.display()),
        }
    }

    /// Output produced since the last call.
    pub fn take_output(&mut self) -> CommandOutput {
        std::mem::take(&mut self.output)
    }

    /// Entry point for the prompt loop: edit input while editing, commands otherwise.
    pub fn feed(&mut self, line: &str) -> Flow {
        if self.session.is_editing() {
            edit::handle_line(self, line);
            return Flow::Continue;
        }
        self.dispatch(line)
    }

    /// Runs one command line.
    pub fn dispatch(&mut self, line: &str) -> Flow {
        if self.session.is_editing() {
            self.output
                .err("finish editing first (Ctrl-S or :w saves, Esc or :q cancels)");
            return Flow::Continue;
        }
        let line = line.trim();
        if line.is_empty() {
            return Flow::Continue;
        }
        self.repair_session();

        let (token, rest) = split_first_word(line);
        let command = token.to_uppercase();
        let in_maintenance = self.session.in_maintenance();
        if in_maintenance && !maintenance::session_still_valid(self) {
            return Flow::Continue;
        }

        let Some(spec) = table::lookup(in_maintenance, &command) else {
            self.output
                .err(format!("'{token}' is not recognized as an internal or external command."));
            return Flow::Continue;
        };
        if spec.privilege == Privilege::Admin && !self.is_admin() {
            self.output.err(format!(
                "access denied: {command} requires the {} account",
                self.config.admin_user
            ));
            return Flow::Continue;
        }

        tracing::debug!(command = %command, class = %spec.class, user = %self.session.user, "dispatch");
        match (spec.handler)(self, rest.trim()) {
            Ok(flow) => flow,
            Err(err) => {
                self.output.err(err.to_user_message());
                Flow::Continue
            }
        }
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    fn is_admin(&self) -> bool {
        path::names_match(&self.session.user, &self.config.admin_user)
    }

    /// Points `home`/`cwd` back at live directories after removals.
    fn repair_session(&mut self) {
        if !self.tree.contains(self.session.home) {
            self.session.home =
                seed::home_of(&self.tree, &self.session.user).unwrap_or_else(|| self.tree.root());
        }
        if !self.tree.contains(self.session.cwd) {
            self.session.cwd = self.session.home;
        }
    }

    /// True when `dir` is the current home or one of its ancestors.
    fn holds_home(&self, dir: DirId) -> bool {
        let mut current = Some(self.session.home);
        while let Some(id) = current {
            if id == dir {
                return true;
            }
            current = self.tree.parent(id);
        }
        false
    }

    /// Reports a failed disk write without undoing the virtual change.
    fn report_sync<T>(&mut self, result: crate::Result<T>) {
        if let Err(err) = result {
            tracing::warn!(error = %err, "disk sync failed");
            self.output
                .err(format!("warning: disk sync failed: {}", err.to_user_message()));
        }
    }

    /// One warning line per entry a push could not write.
    fn report_push(&mut self, report: PushReport) {
        for failure in report.failed {
            self.output.err(format!("warning: disk sync failed: {failure}"));
        }
    }

    fn save_snapshot_to(&mut self, target: &std::path::Path) -> crate::Result<()> {
        self.mirror.save_snapshot(&self.tree, target)
    }
}

#[cfg(test)]
mod tests;
