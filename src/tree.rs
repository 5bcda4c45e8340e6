//! Tree store: the in-memory directory/file structure.
//!
//! Directories live in an arena and refer to each other by [`DirId`]. A
//! directory owns its child ids and its [`File`] values; the `parent` link is a
//! plain id and never owns anything. Freed slots are never reused, so a stale
//! id simply stops resolving instead of aliasing a newer directory.

use crate::config::{Limits, SNAPSHOT_FILE_NAME};
use crate::errors::CoreError;
use crate::helpers::truncate_at_boundary;
use crate::path::{self, names_match, validate_name};

/// Handle to a directory in a [`Tree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DirId(usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct File {
    name: String,
    content: String,
}

impl File {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: String::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Replaces the content, keeping at most `limit` bytes.
    ///
    /// Returns `true` when the text had to be truncated.
    pub fn set_content(&mut self, text: &str, limit: usize) -> bool {
        let kept = truncate_at_boundary(text, limit);
        self.content = kept.to_string();
        kept.len() < text.len()
    }

    /// Appends to the content, keeping the total at most `limit` bytes.
    pub fn append(&mut self, text: &str, limit: usize) -> bool {
        let room = limit.saturating_sub(self.content.len());
        let kept = truncate_at_boundary(text, room);
        self.content.push_str(kept);
        kept.len() < text.len()
    }
}

#[derive(Debug, Clone)]
pub struct Directory {
    name: String,
    parent: Option<DirId>,
    children: Vec<DirId>,
    files: Vec<File>,
}

impl Directory {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            children: Vec::new(),
            files: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<DirId> {
        self.parent
    }

    pub fn children(&self) -> &[DirId] {
        &self.children
    }

    pub fn files(&self) -> &[File] {
        &self.files
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty() && self.files.is_empty()
    }
}

/// Detached, owned copy of a directory subtree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirImage {
    pub name: String,
    pub files: Vec<File>,
    pub children: Vec<DirImage>,
}

impl DirImage {
    /// Number of files and directories below this one.
    pub fn entry_count(&self) -> usize {
        self.files.len()
            + self
                .children
                .iter()
                .map(|child| 1 + child.entry_count())
                .sum::<usize>()
    }
}

#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<Option<Directory>>,
    root: DirId,
    limits: Limits,
}

impl Tree {
    pub fn new(limits: Limits) -> Self {
        Self {
            nodes: vec![Some(Directory::new(""))],
            root: DirId(0),
            limits,
        }
    }

    pub fn root(&self) -> DirId {
        self.root
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    pub fn get(&self, id: DirId) -> Option<&Directory> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    fn get_mut(&mut self, id: DirId) -> Option<&mut Directory> {
        self.nodes.get_mut(id.0).and_then(Option::as_mut)
    }

    /// Whether `id` still refers to a live directory.
    pub fn contains(&self, id: DirId) -> bool {
        self.get(id).is_some()
    }

    pub fn name(&self, id: DirId) -> &str {
        self.get(id).map(Directory::name).unwrap_or_default()
    }

    pub fn parent(&self, id: DirId) -> Option<DirId> {
        self.get(id).and_then(Directory::parent)
    }

    pub fn children(&self, id: DirId) -> &[DirId] {
        self.get(id).map(Directory::children).unwrap_or_default()
    }

    pub fn files(&self, id: DirId) -> &[File] {
        self.get(id).map(Directory::files).unwrap_or_default()
    }

    /// Allocates a detached directory. Uniqueness is the caller's concern.
    pub fn create_directory(&mut self, name: impl Into<String>) -> DirId {
        self.nodes.push(Some(Directory::new(name)));
        DirId(self.nodes.len() - 1)
    }

    /// Allocates a detached, empty file.
    pub fn create_file(&self, name: impl Into<String>) -> File {
        File::new(name)
    }

    pub fn find_child(&self, dir: DirId, name: &str) -> Option<DirId> {
        self.children(dir)
            .iter()
            .copied()
            .find(|child| names_match(self.name(*child), name))
    }

    pub fn find_file(&self, dir: DirId, name: &str) -> Option<&File> {
        self.files(dir).iter().find(|file| names_match(file.name(), name))
    }

    pub fn find_file_mut(&mut self, dir: DirId, name: &str) -> Option<&mut File> {
        self.get_mut(dir)?
            .files
            .iter_mut()
            .find(|file| names_match(file.name(), name))
    }

    /// Whether a file or a directory called `name` already sits in `dir`.
    pub fn name_taken(&self, dir: DirId, name: &str) -> bool {
        self.find_child(dir, name).is_some() || self.find_file(dir, name).is_some()
    }

    fn capacity_error(&self, dir: DirId, what: &'static str, limit: usize) -> CoreError {
        CoreError::CapacityExceeded {
            dir: path::render(self, dir),
            what,
            limit,
        }
    }

    /// Appends a detached directory to `parent`.
    ///
    /// At the sibling limit the tree is left as it was, the detached node is
    /// dropped and `CapacityExceeded` is returned.
    pub fn insert_child(&mut self, parent: DirId, child: DirId) -> crate::Result<()> {
        let limit = self.limits.max_children;
        match self.get(child) {
            Some(node) if node.parent.is_none() && child != self.root => {}
            _ => return Err(CoreError::precondition("directory is not a detached node")),
        }
        let Some(parent_node) = self.get(parent) else {
            return Err(CoreError::not_found(path::render(self, parent)));
        };
        if parent_node.children.len() >= limit {
            let err = self.capacity_error(parent, "directory", limit);
            self.nodes[child.0] = None;
            return Err(err);
        }

        if let Some(node) = self.get_mut(child) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.get_mut(parent) {
            node.children.push(child);
        }
        Ok(())
    }

    /// The root maps onto the directory that also holds the snapshot file,
    /// so that name is unavailable there.
    fn check_reserved(&self, parent: DirId, name: &str) -> crate::Result<()> {
        if parent == self.root && names_match(name, SNAPSHOT_FILE_NAME) {
            return Err(CoreError::InvalidName {
                name: name.to_string(),
                reason: "name is reserved for the snapshot",
            });
        }
        Ok(())
    }

    /// Name rules plus the names reserved in `parent`. Does not check for
    /// collisions or capacity.
    pub fn check_new_name(&self, parent: DirId, name: &str) -> crate::Result<()> {
        validate_name(name, &self.limits)?;
        self.check_reserved(parent, name)
    }

    /// Appends a file to `parent`, truncating its content to the size limit.
    ///
    /// Returns `true` when the content was truncated.
    pub fn insert_file(&mut self, parent: DirId, mut file: File) -> crate::Result<bool> {
        self.check_reserved(parent, file.name())?;
        let limit = self.limits.max_files;
        let max_content = self.limits.max_content;
        let Some(parent_node) = self.get(parent) else {
            return Err(CoreError::not_found(path::render(self, parent)));
        };
        if parent_node.files.len() >= limit {
            return Err(self.capacity_error(parent, "file", limit));
        }

        let truncated = if file.content.len() > max_content {
            let text = std::mem::take(&mut file.content);
            file.set_content(&text, max_content)
        } else {
            false
        };
        if let Some(node) = self.get_mut(parent) {
            node.files.push(file);
        }
        Ok(truncated)
    }

    /// Validates `name`, checks it is free in `parent`, then creates and inserts.
    pub fn add_directory(&mut self, parent: DirId, name: &str) -> crate::Result<DirId> {
        self.check_new_name(parent, name)?;
        if self.name_taken(parent, name) {
            return Err(CoreError::exists(name));
        }
        let child = self.create_directory(name);
        self.insert_child(parent, child)?;
        Ok(child)
    }

    /// Validates `name`, checks it is free in `parent`, then creates and inserts.
    ///
    /// Returns `true` when `content` had to be truncated.
    pub fn add_file(&mut self, parent: DirId, name: &str, content: &str) -> crate::Result<bool> {
        self.check_new_name(parent, name)?;
        if self.name_taken(parent, name) {
            return Err(CoreError::exists(name));
        }
        let mut file = self.create_file(name);
        file.content = content.to_string();
        self.insert_file(parent, file)
    }

    /// Removes the child directory `name`, returning an image of its subtree.
    pub fn remove_child(&mut self, parent: DirId, name: &str) -> Option<DirImage> {
        let child = self.find_child(parent, name)?;
        let image = self.image(child);
        let doomed: Vec<DirId> = self.walk(child).collect();

        if let Some(node) = self.get_mut(parent) {
            node.children.retain(|id| *id != child);
        }
        for id in doomed {
            self.nodes[id.0] = None;
        }
        Some(image)
    }

    pub fn remove_file(&mut self, parent: DirId, name: &str) -> Option<File> {
        let node = self.get_mut(parent)?;
        let index = node.files.iter().position(|file| names_match(file.name(), name))?;
        Some(node.files.remove(index))
    }

    /// Owned copy of the subtree rooted at `dir`.
    pub fn image(&self, dir: DirId) -> DirImage {
        DirImage {
            name: self.name(dir).to_string(),
            files: self.files(dir).to_vec(),
            children: self.children(dir).iter().map(|child| self.image(*child)).collect(),
        }
    }

    /// Recreates `image` as a new child of `parent`. All or nothing: a
    /// failure anywhere below removes what was already created.
    pub fn materialize(&mut self, parent: DirId, image: &DirImage) -> crate::Result<DirId> {
        let dir = self.add_directory(parent, &image.name)?;
        if let Err(err) = self.fill(dir, image) {
            self.remove_child(parent, &image.name);
            return Err(err);
        }
        Ok(dir)
    }

    fn fill(&mut self, dir: DirId, image: &DirImage) -> crate::Result<()> {
        for file in &image.files {
            self.insert_file(dir, file.clone())?;
        }
        for child in &image.children {
            let sub = self.add_directory(dir, &child.name)?;
            self.fill(sub, child)?;
        }
        Ok(())
    }

    /// Pre-order iterator over `dir` and every directory below it.
    pub fn walk(&self, dir: DirId) -> Walk<'_> {
        let stack = if self.contains(dir) { vec![dir] } else { Vec::new() };
        Walk { tree: self, stack }
    }

    /// Every file below `dir` (inclusive) with the directory holding it.
    pub fn files_below(&self, dir: DirId) -> impl Iterator<Item = (DirId, &File)> + '_ {
        self.walk(dir)
            .flat_map(move |id| self.files(id).iter().map(move |file| (id, file)))
    }
}

/// Iterator returned by [`Tree::walk`].
pub struct Walk<'a> {
    tree: &'a Tree,
    stack: Vec<DirId>,
}

impl Iterator for Walk<'_> {
    type Item = DirId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        self.stack.extend(self.tree.children(id).iter().rev().copied());
        Some(id)
    }
}
