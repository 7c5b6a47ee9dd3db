// src/repository/mod.rs
// =============================================================================
// This module describes the content repository the scan reads from.
//
// The engine never talks to a concrete store directly. It needs two things:
//
// - DocumentSource: enumerate rich-text fields under a start path, and look
//   up any node by path (used to walk up from a field to its document handle)
// - NodeResolver: the "session" used by internal-link checks - find a named
//   child under a node, follow a reference, and refresh cached state
//
// A real deployment implements these over its repository client. We ship
// MemoryRepository, loaded from a JSON snapshot, for the CLI and for tests.
// =============================================================================

mod memory;

pub use memory::{MemoryRepository, SnapshotNode};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// What a node is, as far as link scanning is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Folder,
    /// The container that owns all variants of one document. Reports are
    /// written against the handle.
    Handle,
    /// One variant (draft, published, ...) of a document.
    Document,
    /// A rich-text field with HTML content.
    Field,
    /// A child of a field that stands for one internal link.
    Facet,
}

/// Enough about a node to walk the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeInfo {
    pub path: String,
    pub identifier: String,
    pub kind: NodeKind,
}

/// A rich-text field to extract links from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldNode {
    pub path: String,
    pub identifier: String,
    pub text: String,
}

/// A named child of a field, standing for an internal link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildNode {
    pub name: String,
    /// The internal reference property (target identifier), if present.
    pub reference: Option<String>,
}

pub trait DocumentSource {
    // Streams every field at or below `start_path`.
    //
    // A single item may fail (the node vanished, the content is unreadable)
    // without ending the stream.
    fn fields<'a>(&'a self, start_path: &str) -> Box<dyn Iterator<Item = Result<FieldNode>> + 'a>;

    /// Looks a node up by absolute path.
    fn node(&self, path: &str) -> Result<NodeInfo>;
}

pub trait NodeResolver {
    // Finds the child called `name` under the node with identifier `source`.
    //
    // Returns: Ok(None) when the source exists but has no such child,
    // Err(Error::NotFound) when the source node itself is gone.
    fn child(&self, source: &str, name: &str) -> Result<Option<ChildNode>>;

    /// Resolves a reference value to the node it points at.
    fn resolve_reference(&self, reference: &str) -> Result<NodeInfo>;

    /// Drops any transient state the session has accumulated.
    fn refresh(&mut self) -> Result<()>;
}

// Returns the parent path, or None for the root.
//
// Example:
//   parent_path("/content/docs/a") == Some("/content/docs")
//   parent_path("/content")        == Some("/")
//   parent_path("/")               == None
pub fn parent_path(path: &str) -> Option<&str> {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.rfind('/') {
        Some(0) => Some("/"),
        Some(i) => Some(&trimmed[..i]),
        None => None,
    }
}
