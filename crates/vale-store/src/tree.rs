use std::collections::BTreeMap;
use std::path::Path;

use bytes::Bytes;
use vale_types::{ContentHash, Value};
use walkdir::WalkDir;

use crate::error::{StoreError, StoreResult};

/// A tree of named blobs, as extracted from an archive or a directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FileTree {
    /// File contents.
    Blob(Bytes),
    /// Named children, sorted by name.
    Tree(Vec<(String, FileTree)>),
}

/// A blob found inside a tree, with the names leading to it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlobAtPath {
    pub path: Vec<String>,
    pub content: Bytes,
}

impl BlobAtPath {
    /// Path segments joined with `/`.
    pub fn path_string(&self) -> String {
        self.path.join("/")
    }
}

impl FileTree {
    pub fn blob(content: impl Into<Bytes>) -> Self {
        Self::Blob(content.into())
    }

    /// Build a tree node, sorting entries by name.
    pub fn sorted_tree(entries: impl IntoIterator<Item = (String, FileTree)>) -> Self {
        let mut entries: Vec<_> = entries.into_iter().collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Self::Tree(entries)
    }

    pub fn is_blob(&self) -> bool {
        matches!(self, Self::Blob(_))
    }

    /// Every blob in this tree, depth first in entry order. A bare blob is
    /// reported with an empty path.
    pub fn enumerate_blobs_transitive(&self) -> Vec<BlobAtPath> {
        let mut found = Vec::new();
        let mut stack: Vec<(Vec<String>, &FileTree)> = vec![(Vec::new(), self)];
        while let Some((path, node)) = stack.pop() {
            match node {
                Self::Blob(content) => found.push(BlobAtPath {
                    path,
                    content: content.clone(),
                }),
                Self::Tree(entries) => {
                    for (name, child) in entries.iter().rev() {
                        let mut child_path = path.clone();
                        child_path.push(name.clone());
                        stack.push((child_path, child));
                    }
                }
            }
        }
        found
    }

    /// Value form: a blob stays a blob; a tree becomes a list of
    /// `[name, child]` pairs with the name as a UTF-8 blob.
    pub fn to_value(&self) -> Value {
        let root = match self {
            Self::Blob(content) => return Value::blob(content.clone()),
            Self::Tree(entries) => entries,
        };
        // Post-order walk; the last frame is the directory being filled.
        let mut stack = vec![ValueFrame::new(root)];
        loop {
            let depth = stack.len() - 1;
            let frame = &mut stack[depth];
            let entries = frame.entries;
            let child = match entries.get(frame.pairs.len()) {
                Some((_, Self::Tree(children))) => {
                    stack.push(ValueFrame::new(children));
                    continue;
                }
                Some((_, Self::Blob(content))) => Value::blob(content.clone()),
                None if depth == 0 => return frame.finish(),
                None => {
                    let done = frame.finish();
                    stack.truncate(depth);
                    done
                }
            };
            let parent = stack.len() - 1;
            stack[parent].push_child(child);
        }
    }

    /// Hash-tree digest of [`FileTree::to_value`].
    pub fn hash(&self) -> ContentHash {
        self.to_value().hash()
    }

    /// Load a file as a blob or a directory as a tree. Symlinks are followed.
    pub fn load_from_path(path: &Path) -> StoreResult<Self> {
        if path.is_file() {
            return Ok(Self::Blob(Bytes::from(std::fs::read(path)?)));
        }

        let mut root = DirNode::default();
        for entry in WalkDir::new(path).follow_links(true).min_depth(1) {
            let entry = entry.map_err(|e| StoreError::Walk {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(path)
                .map_err(|e| StoreError::Walk {
                    path: entry.path().to_path_buf(),
                    reason: e.to_string(),
                })?;
            let segments = relative
                .components()
                .map(|c| {
                    c.as_os_str()
                        .to_str()
                        .map(str::to_owned)
                        .ok_or_else(|| StoreError::NonUtf8Path(entry.path().to_path_buf()))
                })
                .collect::<StoreResult<Vec<_>>>()?;
            let content = Bytes::from(std::fs::read(entry.path())?);
            root.insert(&segments, content);
        }
        Ok(root.into_tree())
    }
}

/// Directory whose value form is under construction.
struct ValueFrame<'a> {
    entries: &'a [(String, FileTree)],
    pairs: Vec<Value>,
}

impl<'a> ValueFrame<'a> {
    fn new(entries: &'a [(String, FileTree)]) -> Self {
        Self {
            entries,
            pairs: Vec::with_capacity(entries.len()),
        }
    }

    fn push_child(&mut self, child: Value) {
        let name = &self.entries[self.pairs.len()].0;
        self.pairs.push(Value::list(vec![Value::from_string(name), child]));
    }

    fn finish(&mut self) -> Value {
        Value::list(std::mem::take(&mut self.pairs))
    }
}

/// Directory being assembled while walking.
#[derive(Default)]
struct DirNode {
    files: BTreeMap<String, Bytes>,
    dirs: BTreeMap<String, DirNode>,
}

impl DirNode {
    fn insert(&mut self, segments: &[String], content: Bytes) {
        match segments {
            [] => {}
            [name] => {
                self.files.insert(name.clone(), content);
            }
            [dir, rest @ ..] => self.dirs.entry(dir.clone()).or_default().insert(rest, content),
        }
    }

    fn into_tree(self) -> FileTree {
        let files = self.files.into_iter().map(|(name, content)| (name, FileTree::Blob(content)));
        let dirs = self.dirs.into_iter().map(|(name, dir)| (name, dir.into_tree()));
        FileTree::sorted_tree(files.chain(dirs))
    }
}
