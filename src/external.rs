//! External tools: blocking runs with captured output, and detached spawns.

use crate::errors::CoreError;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::{Mutex, PoisonError};

/// Captured result of a finished tool run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code; `None` when the process was killed by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Boundary between the dispatcher and real processes.
pub trait ToolRunner: Send + Sync {
    /// Runs `program` to completion in `cwd`, capturing its output.
    fn run(&self, program: &str, args: &[String], cwd: &Path) -> crate::Result<ToolOutput>;

    /// Starts `program` in `cwd` without waiting for it. Returns its pid.
    fn spawn_detached(&self, program: &str, args: &[String], cwd: &Path) -> crate::Result<u32>;

    /// Whether `program` can be found on the search path.
    fn is_available(&self, program: &str) -> bool {
        which::which(program).is_ok()
    }
}

/// Default runner backed by `std::process`.
///
/// Detached children are kept until they exit so they can be waited on.
#[derive(Debug, Default)]
pub struct ProcessRunner {
    detached: Mutex<Vec<Child>>,
}

impl ProcessRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits on detached children that have exited. Returns how many are
    /// still running.
    pub fn reap(&self) -> usize {
        let mut children = self.detached.lock().unwrap_or_else(PoisonError::into_inner);
        children.retain_mut(|child| match child.try_wait() {
            Ok(Some(status)) => {
                tracing::debug!(pid = child.id(), %status, "detached process exited");
                false
            }
            Ok(None) => true,
            Err(err) => {
                tracing::warn!(pid = child.id(), error = %err, "cannot wait on detached process");
                false
            }
        });
        children.len()
    }
}

impl ToolRunner for ProcessRunner {
    fn run(&self, program: &str, args: &[String], cwd: &Path) -> crate::Result<ToolOutput> {
        self.reap();
        tracing::debug!(program, ?args, cwd = %cwd.display(), "running external tool");
        let output = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| CoreError::External {
                program: program.to_string(),
                source,
            })?;

        Ok(ToolOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    fn spawn_detached(&self, program: &str, args: &[String], cwd: &Path) -> crate::Result<u32> {
        let child = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| CoreError::External {
                program: program.to_string(),
                source,
            })?;
        let pid = child.id();
        tracing::info!(program, pid, "started detached process");
        let running = self.reap() + 1;
        self.detached
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(child);
        tracing::debug!(running, "detached processes");
        Ok(pid)
    }
}

/// Splits a command remainder into arguments, honoring double quotes.
pub fn split_args(input: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut has_token = false;

    for ch in input.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                has_token = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if has_token {
                    args.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            c => {
                current.push(c);
                has_token = true;
            }
        }
    }
    if has_token {
        args.push(current);
    }
    args
}
