//! Line-oriented snapshot of the whole tree.
//!
//! ```text
//! DIR:vfs:/USERS/guest
//! FILE:README.txt|Welcome\nto vfsh
//! ```
//!
//! Directories come before what they contain. A `FILE:` record belongs to the
//! directory named by the closest `DIR:` record above it.

use crate::config::Limits;
use crate::errors::CoreError;
use crate::fs::FileSystem;
use crate::path;
use crate::tree::{DirId, Tree};
use std::path::Path;

const DIR_PREFIX: &str = "DIR:";
const FILE_PREFIX: &str = "FILE:";

/// Escapes backslash, the record delimiter and line breaks.
pub fn escape(content: &str) -> String {
    let mut escaped = String::with_capacity(content.len());
    for ch in content.chars() {
        match ch {
            '\\' => escaped.push_str("\\\\"),
            '|' => escaped.push_str("\\|"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Inverse of [`escape`]. Unknown escapes are kept as written.
pub fn unescape(value: &str) -> String {
    let mut decoded = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            decoded.push(ch);
            continue;
        }
        match chars.next() {
            Some('\\') => decoded.push('\\'),
            Some('|') => decoded.push('|'),
            Some('n') => decoded.push('\n'),
            Some('r') => decoded.push('\r'),
            Some(other) => {
                decoded.push('\\');
                decoded.push(other);
            }
            None => decoded.push('\\'),
        }
    }
    decoded
}

/// Serializes the whole tree.
pub fn encode(tree: &Tree) -> String {
    let mut out = String::new();
    for dir in tree.walk(tree.root()) {
        out.push_str(DIR_PREFIX);
        out.push_str(&path::render(tree, dir));
        out.push('\n');
        for file in tree.files(dir) {
            out.push_str(FILE_PREFIX);
            out.push_str(file.name());
            out.push('|');
            out.push_str(&escape(file.content()));
            out.push('\n');
        }
    }
    out
}

/// Rebuilds a tree from snapshot text.
pub fn decode(text: &str, limits: Limits) -> crate::Result<Tree> {
    let mut tree = Tree::new(limits);
    let mut current: Option<DirId> = None;

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.strip_suffix('\r').unwrap_or(raw);
        let fail = |reason: String| CoreError::Snapshot {
            line: line_no,
            reason,
        };

        if line.trim().is_empty() {
            continue;
        }
        if let Some(rendered) = line.strip_prefix(DIR_PREFIX) {
            let segments = path::parse_rendered(rendered).map_err(|err| fail(err.to_string()))?;
            let mut dir = tree.root();
            for segment in segments {
                dir = match tree.find_child(dir, segment) {
                    Some(child) => child,
                    None => tree
                        .add_directory(dir, segment)
                        .map_err(|err| fail(err.to_string()))?,
                };
            }
            current = Some(dir);
        } else if let Some(record) = line.strip_prefix(FILE_PREFIX) {
            let dir = current.ok_or_else(|| fail("file record before any directory".to_string()))?;
            let (name, escaped) = record
                .split_once('|')
                .ok_or_else(|| fail("file record without delimiter".to_string()))?;
            let content = unescape(escaped);
            let max_content = tree.limits().max_content;
            match tree.find_file_mut(dir, name) {
                Some(file) => {
                    file.set_content(&content, max_content);
                }
                None => {
                    let truncated = tree
                        .add_file(dir, name, &content)
                        .map_err(|err| fail(err.to_string()))?;
                    if truncated {
                        tracing::warn!(line = line_no, file = name, "snapshot content truncated to {max_content} bytes");
                    }
                }
            }
        } else {
            return Err(fail(format!("unrecognized record {line:?}")));
        }
    }
    Ok(tree)
}

/// Writes the snapshot of `tree` to `path`, creating the parent directory.
pub fn save(fs: &dyn FileSystem, path: &Path, tree: &Tree) -> crate::Result<()> {
    if let Some(parent) = path.parent() {
        fs.create_dir_all(parent)?;
    }
    fs.write_to_string(path, &encode(tree))?;
    tracing::debug!(path = %path.display(), "snapshot saved");
    Ok(())
}

/// Loads the snapshot at `path`, or `None` when there is none.
pub fn load(fs: &dyn FileSystem, path: &Path, limits: Limits) -> crate::Result<Option<Tree>> {
    if !fs.exists(path) {
        return Ok(None);
    }
    let text = fs.read_to_string(path)?;
    decode(&text, limits).map(Some)
}
