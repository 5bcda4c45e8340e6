//! Trash ledger: soft-deleted entries awaiting restore or purge.

use crate::errors::CoreError;
use crate::path::names_match;
use crate::tree::{DirId, DirImage, File, Tree};
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::fmt;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum TrashKind {
    File,
    Directory,
}

impl TrashKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Directory => "dir",
        }
    }
}

impl fmt::Display for TrashKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What was captured at deletion time.
#[derive(Debug, Clone)]
pub enum TrashPayload {
    File(File),
    /// The whole subtree, files and sub-directories included.
    Directory(DirImage),
}

#[derive(Debug, Clone)]
pub struct TrashItem {
    pub name: String,
    /// Rendered path of the directory the entry was deleted from.
    pub origin: String,
    pub payload: TrashPayload,
    pub deleted_at: DateTime<Utc>,
}

impl TrashItem {
    pub fn file(origin: impl Into<String>, file: File, deleted_at: DateTime<Utc>) -> Self {
        Self {
            name: file.name().to_string(),
            origin: origin.into(),
            payload: TrashPayload::File(file),
            deleted_at,
        }
    }

    pub fn directory(origin: impl Into<String>, image: DirImage, deleted_at: DateTime<Utc>) -> Self {
        Self {
            name: image.name.clone(),
            origin: origin.into(),
            payload: TrashPayload::Directory(image),
            deleted_at,
        }
    }

    pub fn kind(&self) -> TrashKind {
        match self.payload {
            TrashPayload::File(_) => TrashKind::File,
            TrashPayload::Directory(_) => TrashKind::Directory,
        }
    }

    /// Bytes for files, number of contained entries for directories.
    pub fn size_hint(&self) -> usize {
        match &self.payload {
            TrashPayload::File(file) => file.len(),
            TrashPayload::Directory(image) => image.entry_count(),
        }
    }
}

/// Result of a successful restore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Restored {
    pub name: String,
    pub kind: TrashKind,
    /// Set when a directory was restored.
    pub dir: Option<DirId>,
    /// File content had to be truncated to fit the current limit.
    pub truncated: bool,
}

/// Most-recent-first collection of soft-deleted entries.
#[derive(Debug, Default)]
pub struct TrashLedger {
    items: VecDeque<TrashItem>,
}

impl TrashLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn soft_delete(&mut self, item: TrashItem) {
        tracing::debug!(name = %item.name, kind = %item.kind(), origin = %item.origin, "moved to trash");
        self.items.push_front(item);
    }

    /// Most recently deleted entry called `name`.
    pub fn find(&self, name: &str) -> Option<&TrashItem> {
        self.items.iter().find(|item| names_match(&item.name, name))
    }

    /// Re-creates the most recent entry called `name` under `target`.
    ///
    /// The entry leaves the ledger only once it is back in the tree; on a name
    /// collision or a full directory it stays put.
    pub fn restore(&mut self, name: &str, tree: &mut Tree, target: DirId) -> crate::Result<Restored> {
        let index = self
            .items
            .iter()
            .position(|item| names_match(&item.name, name))
            .ok_or_else(|| CoreError::not_found(format!("{name} (trash)")))?;
        let item = &self.items[index];

        if tree.name_taken(target, &item.name) {
            return Err(CoreError::exists(item.name.clone()));
        }
        let restored = match &item.payload {
            TrashPayload::File(file) => {
                let truncated = tree.insert_file(target, file.clone())?;
                Restored {
                    name: item.name.clone(),
                    kind: TrashKind::File,
                    dir: None,
                    truncated,
                }
            }
            TrashPayload::Directory(image) => {
                let dir = tree.materialize(target, image)?;
                Restored {
                    name: item.name.clone(),
                    kind: TrashKind::Directory,
                    dir: Some(dir),
                    truncated: false,
                }
            }
        };

        self.items.remove(index);
        Ok(restored)
    }

    /// Entries, most recent first. Each call starts a fresh pass.
    pub fn list(&self) -> impl Iterator<Item = &TrashItem> + '_ {
        self.items.iter()
    }

    /// Drops every entry; returns how many there were.
    pub fn purge(&mut self) -> usize {
        let count = self.items.len();
        self.items.clear();
        count
    }
}
