//! Disk mirror: keeps a tree and a real directory loosely in step.
//!
//! The virtual root maps onto the data directory and every virtual directory
//! onto a same-named real subdirectory. The mapping is recomputed from the
//! tree on each call.
//!
//! * **pull** (disk to tree) only adds; whatever exists virtually wins.
//! * **push** (tree to disk) creates directories and overwrites whole files,
//!   so pushing the same tree twice leaves the same disk state.

use crate::config::{ShellConfig, SNAPSHOT_FILE_NAME};
use crate::errors::CoreError;
use crate::fs::{is_io_kind, FileSystem};
use crate::path::{self, validate_name};
use crate::seed;
use crate::snapshot;
use crate::tree::{DirId, Tree};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// What a pull added, and what it had to leave out.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PullReport {
    pub dirs_added: usize,
    pub files_added: usize,
    /// One line per entry that could not be brought in.
    pub skipped: Vec<String>,
}

impl PullReport {
    pub fn is_noop(&self) -> bool {
        self.dirs_added == 0 && self.files_added == 0
    }

    fn absorb(&mut self, other: PullReport) {
        self.dirs_added += other.dirs_added;
        self.files_added += other.files_added;
        self.skipped.extend(other.skipped);
    }
}

/// What a push wrote. A failing entry is recorded and the walk goes on.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PushReport {
    pub dirs: usize,
    pub files: usize,
    /// One line per directory or file that could not be written.
    pub failed: Vec<String>,
}

impl PushReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Where the startup tree came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootSource {
    Snapshot,
    Seed,
}

#[derive(Debug)]
pub struct Bootstrap {
    pub tree: Tree,
    pub source: BootSource,
    pub pulled: PullReport,
    /// Problems met on the way that did not stop startup.
    pub notes: Vec<String>,
}

#[derive(Clone)]
pub struct DiskMirror {
    fs: Arc<dyn FileSystem>,
    data_dir: PathBuf,
}

impl std::fmt::Debug for DiskMirror {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiskMirror").field("data_dir", &self.data_dir).finish()
    }
}

impl DiskMirror {
    pub fn new(fs: Arc<dyn FileSystem>, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn fs(&self) -> &dyn FileSystem {
        self.fs.as_ref()
    }

    /// Real directory a virtual directory maps to.
    pub fn real_path(&self, tree: &Tree, dir: DirId) -> PathBuf {
        path::segments(tree, dir)
            .iter()
            .fold(self.data_dir.clone(), |acc, segment| acc.join(segment))
    }

    /// Real path of the entry `name` inside a virtual directory.
    pub fn real_entry_path(&self, tree: &Tree, dir: DirId, name: &str) -> PathBuf {
        self.real_path(tree, dir).join(name)
    }

    fn is_snapshot_file(&self, entry: &Path) -> bool {
        entry == self.data_dir.join(SNAPSHOT_FILE_NAME)
    }

    /// Brings real entries missing from `dir` into the tree.
    ///
    /// New directories arrive empty unless `recursive` is set, in which case
    /// every real subdirectory is walked as well.
    pub fn pull(&self, tree: &mut Tree, dir: DirId, recursive: bool) -> crate::Result<PullReport> {
        let real = self.real_path(tree, dir);
        let mut report = PullReport::default();
        if !self.fs.is_dir(&real) {
            tracing::debug!(path = %real.display(), "nothing to pull");
            return Ok(report);
        }

        for entry in self.fs.list_dir(&real)? {
            if self.is_snapshot_file(&entry) {
                continue;
            }
            let Some(name) = entry.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
                report.skipped.push(format!("{}: name is not valid UTF-8", entry.display()));
                continue;
            };
            if let Err(err) = validate_name(&name, tree.limits()) {
                report.skipped.push(format!("{}: {}", entry.display(), err));
                continue;
            }

            if self.fs.is_dir(&entry) {
                let child = match tree.find_child(dir, &name) {
                    Some(child) => Some(child),
                    None if tree.find_file(dir, &name).is_some() => None,
                    None => match tree.add_directory(dir, &name) {
                        Ok(child) => {
                            report.dirs_added += 1;
                            Some(child)
                        }
                        Err(err) => {
                            tracing::warn!(path = %entry.display(), error = %err, "pull skipped directory");
                            report.skipped.push(format!("{}: {}", entry.display(), err));
                            None
                        }
                    },
                };
                if let (true, Some(child)) = (recursive, child) {
                    match self.pull(tree, child, true) {
                        Ok(sub) => report.absorb(sub),
                        Err(err) => {
                            tracing::warn!(path = %entry.display(), error = %err, "pull skipped subtree");
                            report.skipped.push(format!("{}: {}", entry.display(), err.to_user_message()));
                        }
                    }
                }
            } else if !tree.name_taken(dir, &name) {
                let limit = tree.limits().max_content;
                let added = self
                    .fs
                    .read_bounded(&entry, limit)
                    .and_then(|content| tree.add_file(dir, &name, &content));
                match added {
                    Ok(_) => report.files_added += 1,
                    Err(err) => {
                        tracing::warn!(path = %entry.display(), error = %err, "pull skipped file");
                        report.skipped.push(format!("{}: {}", entry.display(), err));
                    }
                }
            }
        }

        tracing::debug!(
            path = %real.display(),
            dirs = report.dirs_added,
            files = report.files_added,
            "pulled"
        );
        Ok(report)
    }

    /// Writes `dir` and everything below it to disk.
    ///
    /// Entries that cannot be written land in [`PushReport::failed`]; their
    /// siblings and the rest of the walk are still written.
    pub fn push_dir(&self, tree: &Tree, dir: DirId) -> PushReport {
        let mut report = PushReport::default();
        for id in tree.walk(dir) {
            let real = self.real_path(tree, id);
            if let Err(err) = self.fs.create_dir_all(&real) {
                tracing::warn!(path = %real.display(), error = %err, "push skipped directory");
                report.failed.push(err.to_user_message());
                continue;
            }
            report.dirs += 1;
            for file in tree.files(id) {
                let target = real.join(file.name());
                match self.fs.write_to_string(&target, file.content()) {
                    Ok(()) => report.files += 1,
                    Err(err) => {
                        tracing::warn!(path = %target.display(), error = %err, "push skipped file");
                        report.failed.push(err.to_user_message());
                    }
                }
            }
        }
        tracing::debug!(
            dirs = report.dirs,
            files = report.files,
            failed = report.failed.len(),
            "pushed {}",
            path::render(tree, dir)
        );
        report
    }

    /// Writes one file, creating its directory chain first.
    pub fn push_file(&self, tree: &Tree, dir: DirId, name: &str) -> crate::Result<()> {
        let file = tree
            .find_file(dir, name)
            .ok_or_else(|| CoreError::not_found(path::render_child(tree, dir, name)))?;
        let real = self.real_path(tree, dir);
        self.fs.create_dir_all(&real)?;
        let target = real.join(file.name());
        self.fs.write_to_string(&target, file.content())?;
        tracing::debug!(path = %target.display(), bytes = file.len(), "pushed file");
        Ok(())
    }

    /// Deletes the real counterpart of a removed file. Already gone is fine.
    pub fn remove_file(&self, tree: &Tree, dir: DirId, name: &str) -> crate::Result<()> {
        let target = self.real_entry_path(tree, dir, name);
        ignore_missing(self.fs.remove_file(&target))
    }

    /// Deletes the real counterpart of a removed directory. Already gone is fine.
    pub fn remove_dir(&self, tree: &Tree, dir: DirId, name: &str) -> crate::Result<()> {
        let target = self.real_entry_path(tree, dir, name);
        ignore_missing(self.fs.remove_dir_all(&target))
    }

    /// Writes the snapshot file for `tree`.
    pub fn save_snapshot(&self, tree: &Tree, target: &Path) -> crate::Result<()> {
        snapshot::save(self.fs.as_ref(), target, tree)
    }

    /// Startup: snapshot or seed, then a recursive pull of `/USERS`, then a
    /// full push so the disk holds everything the tree does.
    pub fn bootstrap(&self, config: &ShellConfig) -> crate::Result<Bootstrap> {
        let mut notes = Vec::new();
        let snapshot_path = config.snapshot_path();

        let loaded = match snapshot::load(self.fs.as_ref(), &snapshot_path, config.limits) {
            Ok(loaded) => loaded,
            Err(err) => {
                tracing::warn!(error = %err, "snapshot unreadable, starting from seed");
                notes.push(format!("snapshot ignored: {}", err.to_user_message()));
                None
            }
        };
        let (mut tree, source) = match loaded {
            Some(tree) => (tree, BootSource::Snapshot),
            None => (seed::seed_tree(config)?, BootSource::Seed),
        };

        let users = seed::ensure_users_dir(&mut tree)?;
        let pulled = match self.pull(&mut tree, users, true) {
            Ok(report) => report,
            Err(err) => {
                tracing::warn!(error = %err, "initial pull failed");
                notes.push(format!("initial sync failed: {}", err.to_user_message()));
                PullReport::default()
            }
        };
        notes.extend(pulled.skipped.iter().cloned());

        let pushed = self.push_dir(&tree, tree.root());
        notes.extend(pushed.failed.iter().map(|failure| format!("initial push failed: {failure}")));

        tracing::info!(
            ?source,
            dirs_pulled = pulled.dirs_added,
            files_pulled = pulled.files_added,
            "virtual filesystem ready"
        );
        Ok(Bootstrap {
            tree,
            source,
            pulled,
            notes,
        })
    }
}

fn ignore_missing(result: crate::Result<()>) -> crate::Result<()> {
    match result {
        Err(err) if is_io_kind(&err, io::ErrorKind::NotFound) => Ok(()),
        other => other,
    }
}
