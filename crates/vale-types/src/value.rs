//! The recursive value type.
//!
//! A [`Value`] is either a blob of bytes or an ordered list of child values.
//! Values are immutable and reference counted: building a list from existing
//! values shares them instead of copying, so a single value may sit under many
//! parents and the whole structure is a DAG.
//!
//! Each node memoizes its hash-tree digest and its node count when it is
//! constructed. Equality and hashing read the memoized digest, which keeps
//! "have I seen an equal value" checks O(1) no matter how large the value is.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use bytes::Bytes;

use crate::hash::ContentHash;

/// The payload of a value node.
#[derive(Clone, Debug)]
pub enum Content {
    /// Raw bytes (possibly empty).
    Blob(Bytes),
    /// Ordered child values (possibly empty).
    List(Vec<Value>),
}

struct Node {
    content: Content,
    hash: ContentHash,
    nodes_count: u64,
    height: u64,
}

/// An immutable, structurally compared value.
///
/// Cloning a `Value` clones a handle, never the underlying data.
#[derive(Clone)]
pub struct Value(Arc<Node>);

impl Value {
    /// Construct a blob value.
    pub fn blob(bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        let hash = ContentHash::of_blob(&bytes);
        Self(Arc::new(Node {
            content: Content::Blob(bytes),
            hash,
            nodes_count: 1,
            height: 0,
        }))
    }

    /// Construct a list value from its elements in order.
    pub fn list(items: impl Into<Vec<Value>>) -> Self {
        let items = items.into();
        let hash = ContentHash::of_list(items.iter().map(|item| &item.0.hash));
        let nodes_count = items
            .iter()
            .fold(1u64, |acc, item| acc.saturating_add(item.0.nodes_count));
        let height = items.iter().map(|item| item.0.height + 1).max().unwrap_or(0);
        Self(Arc::new(Node {
            content: Content::List(items),
            hash,
            nodes_count,
            height,
        }))
    }

    /// The blob with no bytes.
    pub fn empty_blob() -> Self {
        Self::blob(Bytes::new())
    }

    /// The list with no elements.
    pub fn empty_list() -> Self {
        Self::list(Vec::new())
    }

    /// A blob holding the UTF-8 bytes of `s`.
    pub fn from_string(s: &str) -> Self {
        Self::blob(Bytes::copy_from_slice(s.as_bytes()))
    }

    /// The node payload.
    pub fn content(&self) -> &Content {
        &self.0.content
    }

    /// The bytes if this is a blob.
    pub fn as_blob(&self) -> Option<&Bytes> {
        match &self.0.content {
            Content::Blob(bytes) => Some(bytes),
            Content::List(_) => None,
        }
    }

    /// The elements if this is a list.
    pub fn as_list(&self) -> Option<&[Value]> {
        match &self.0.content {
            Content::Blob(_) => None,
            Content::List(items) => Some(items),
        }
    }

    pub fn is_blob(&self) -> bool {
        matches!(self.0.content, Content::Blob(_))
    }

    pub fn is_list(&self) -> bool {
        matches!(self.0.content, Content::List(_))
    }

    /// Hash-tree digest of this value. Memoized, so this is O(1).
    pub fn hash(&self) -> ContentHash {
        self.0.hash
    }

    /// Node count of the fully expanded tree rooted here, counting this node.
    ///
    /// A shared child contributes once per edge that reaches it. Saturates at
    /// `u64::MAX` for pathological sharing.
    pub fn nodes_count(&self) -> u64 {
        self.0.nodes_count
    }

    /// Length of the longest path from this node down to a leaf. Blobs and
    /// empty lists have height 0.
    pub fn height(&self) -> u64 {
        self.0.height
    }

    /// Ordering metric used by the encoder: byte length for a blob, node count
    /// for a list.
    pub fn size(&self) -> u64 {
        match &self.0.content {
            Content::Blob(bytes) => bytes.len() as u64,
            Content::List(_) => self.0.nodes_count,
        }
    }

    /// Returns `true` if both handles point at the same node.
    pub fn ptr_eq(&self, other: &Value) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        self.0.hash == other.0.hash
            && self.0.nodes_count == other.0.nodes_count
            && self.is_blob() == other.is_blob()
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write(self.0.hash.as_bytes());
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0.content {
            Content::Blob(bytes) => write!(f, "Blob({} bytes, {})", bytes.len(), self.0.hash.short_hex()),
            Content::List(items) => write!(f, "List({} items, {})", items.len(), self.0.hash.short_hex()),
        }
    }
}

impl From<Bytes> for Value {
    fn from(bytes: Bytes) -> Self {
        Self::blob(bytes)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::list(items)
    }
}

impl Drop for Node {
    // Unlink uniquely owned descendants onto a heap stack so that dropping a
    // deeply nested value does not recurse once per level.
    fn drop(&mut self) {
        let Content::List(items) = &mut self.content else {
            return;
        };
        let mut pending = std::mem::take(items);
        while let Some(value) = pending.pop() {
            if let Some(mut node) = Arc::into_inner(value.0) {
                if let Content::List(children) = &mut node.content {
                    pending.append(children);
                }
            }
        }
    }
}
