//! Per-level virtual filesystem
//!
//! A small in-memory tree built once from level data. No handles, no seek,
//! no real I/O: commands read whole files and list directories, nothing
//! else. Each terminal instance owns its tree exclusively.
//!
//! Paths are absolute, slash-delimited strings. `resolve_path` never fails:
//! `..` above the root clamps at the root instead of escaping or erroring.

use crate::level::LevelDescriptor;
use std::fmt;

/// A file or directory in the virtual tree.
///
/// Children keep insertion order: baseline entries first, then level
/// overlay entries in the order the level descriptor lists them.
#[derive(Debug, Clone)]
pub enum Node {
    Directory { children: Vec<(String, Node)> },
    File { content: String, perms: Option<String> },
}

impl Node {
    fn dir() -> Self {
        Node::Directory { children: Vec::new() }
    }

    fn file(content: impl Into<String>) -> Self {
        Node::File { content: content.into(), perms: None }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, Node::Directory { .. })
    }

    fn child(&self, name: &str) -> Option<&Node> {
        match self {
            Node::Directory { children } => {
                children.iter().find(|(n, _)| n == name).map(|(_, c)| c)
            }
            Node::File { .. } => None,
        }
    }

    fn child_mut(&mut self, name: &str) -> Option<&mut Node> {
        match self {
            Node::Directory { children } => {
                children.iter_mut().find(|(n, _)| n == name).map(|(_, c)| c)
            }
            Node::File { .. } => None,
        }
    }
}

/// Filesystem errors, all non-fatal and surfaced as one line of terminal
/// text by the command handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VfsError {
    NoSuchPath(String),
    NotADirectory(String),
    IsADirectory(String),
}

impl fmt::Display for VfsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSuchPath(p) => write!(f, "{}: No such file or directory", p),
            Self::NotADirectory(p) => write!(f, "{}: Not a directory", p),
            Self::IsADirectory(p) => write!(f, "{}: Is a directory", p),
        }
    }
}

impl std::error::Error for VfsError {}

/// A directory listing entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub is_dir: bool,
    pub perms: Option<String>,
    /// Content length for files, a conventional 4096 for directories
    pub size: usize,
}

/// Resolve a path against a working directory into an absolute path.
///
/// Supports `.`, `..` and relative segments. Never fails: `..` from the
/// root stays at the root, and the result is never empty (`/` at minimum).
pub fn resolve_path(cwd: &str, input: &str) -> String {
    let mut stack: Vec<&str> = Vec::new();

    if !input.starts_with('/') {
        for seg in cwd.split('/') {
            if !seg.is_empty() {
                stack.push(seg);
            }
        }
    }

    for seg in input.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                // Clamp at root rather than escaping above it
                stack.pop();
            }
            s => stack.push(s),
        }
    }

    if stack.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", stack.join("/"))
    }
}

/// The per-level virtual filesystem
pub struct Vfs {
    root: Node,
}

/// Baseline directories present in every level, before the overlay.
const BASELINE: &[&str] = &["/home/user", "/etc", "/var/log", "/tmp", "/usr/bin", "/usr/share"];

impl Vfs {
    /// An empty filesystem with only the root directory
    pub fn empty() -> Self {
        Self { root: Node::dir() }
    }

    /// Build the filesystem for a level: baseline tree, then every `files`
    /// entry overlaid, creating intermediate directories as needed.
    /// Re-creating an existing directory segment is a no-op.
    pub fn build_from_level(desc: &LevelDescriptor) -> Self {
        let mut fs = Self::empty();
        for dir in BASELINE {
            fs.mkdir_p(dir);
        }
        for (path, content) in &desc.files {
            fs.insert_file(path, content);
        }
        for (path, mode) in &desc.permissions {
            // Missing overlay paths are a level-authoring bug; skip quietly
            let _ = fs.set_permission(path, mode);
        }
        fs
    }

    /// Look up the node at an absolute path. The root is always present.
    pub fn lookup(&self, path: &str) -> Option<&Node> {
        let mut node = &self.root;
        for seg in path.split('/') {
            if seg.is_empty() {
                continue;
            }
            node = node.child(seg)?;
        }
        Some(node)
    }

    fn lookup_mut(&mut self, path: &str) -> Option<&mut Node> {
        let mut node = &mut self.root;
        for seg in path.split('/') {
            if seg.is_empty() {
                continue;
            }
            node = node.child_mut(seg)?;
        }
        Some(node)
    }

    /// List a directory in insertion order.
    pub fn list(&self, path: &str) -> Result<Vec<DirEntry>, VfsError> {
        match self.lookup(path) {
            None => Err(VfsError::NoSuchPath(path.to_string())),
            Some(Node::File { .. }) => Err(VfsError::NotADirectory(path.to_string())),
            Some(Node::Directory { children }) => Ok(children
                .iter()
                .map(|(name, node)| DirEntry {
                    name: name.clone(),
                    is_dir: node.is_dir(),
                    perms: match node {
                        Node::File { perms, .. } => perms.clone(),
                        Node::Directory { .. } => None,
                    },
                    size: match node {
                        Node::File { content, .. } => content.len(),
                        Node::Directory { .. } => 4096,
                    },
                })
                .collect()),
        }
    }

    /// Read a file's content.
    pub fn read(&self, path: &str) -> Result<&str, VfsError> {
        match self.lookup(path) {
            None => Err(VfsError::NoSuchPath(path.to_string())),
            Some(Node::Directory { .. }) => Err(VfsError::IsADirectory(path.to_string())),
            Some(Node::File { content, .. }) => Ok(content),
        }
    }

    /// The permission tag on a file, if the level attached one.
    pub fn permission(&self, path: &str) -> Option<&str> {
        match self.lookup(path) {
            Some(Node::File { perms, .. }) => perms.as_deref(),
            _ => None,
        }
    }

    /// Validate a directory change. On success returns the new cwd; the
    /// caller (dispatcher) is responsible for updating the session.
    pub fn change_directory(&self, path: &str) -> Result<String, VfsError> {
        match self.lookup(path) {
            None => Err(VfsError::NoSuchPath(path.to_string())),
            Some(Node::File { .. }) => Err(VfsError::NotADirectory(path.to_string())),
            Some(Node::Directory { .. }) => Ok(path.to_string()),
        }
    }

    /// Set the permission tag on a file. Directories do not carry
    /// permissions in this simulation; setting one is a no-op success.
    pub fn set_permission(&mut self, path: &str, mode: &str) -> Result<(), VfsError> {
        match self.lookup_mut(path) {
            None => Err(VfsError::NoSuchPath(path.to_string())),
            Some(Node::Directory { .. }) => Ok(()),
            Some(Node::File { perms, .. }) => {
                *perms = Some(mode.to_string());
                Ok(())
            }
        }
    }

    /// Create a directory chain, ignoring segments that already exist.
    fn mkdir_p(&mut self, path: &str) {
        let mut node = &mut self.root;
        for seg in path.split('/') {
            if seg.is_empty() {
                continue;
            }
            match node {
                Node::Directory { children } => {
                    let idx = match children.iter().position(|(n, _)| n == seg) {
                        Some(i) => i,
                        None => {
                            children.push((seg.to_string(), Node::dir()));
                            children.len() - 1
                        }
                    };
                    node = &mut children[idx].1;
                }
                // A file blocks the path; leave the overlay as-is
                Node::File { .. } => return,
            }
        }
    }

    /// Insert a file, creating parent directories as needed.
    fn insert_file(&mut self, path: &str, content: &str) {
        let path = resolve_path("/", path);
        let (parent, name) = match path.rfind('/') {
            Some(0) => ("/".to_string(), &path[1..]),
            Some(idx) => (path[..idx].to_string(), &path[idx + 1..]),
            None => return,
        };
        if name.is_empty() {
            return;
        }
        self.mkdir_p(&parent);
        if let Some(Node::Directory { children }) = self.lookup_mut(&parent) {
            if let Some(slot) = children.iter_mut().find(|(n, _)| n == name) {
                slot.1 = Node::file(content);
            } else {
                children.push((name.to_string(), Node::file(content)));
            }
        }
    }
}
