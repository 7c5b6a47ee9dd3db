// src/repository/memory.rs
// =============================================================================
// An in-memory content repository, loaded from a JSON snapshot.
//
// Snapshot format (one nested tree, the root has an empty name):
//
//   {
//     "name": "", "kind": "folder", "identifier": "root",
//     "children": [
//       { "name": "content", "kind": "folder", "identifier": "c1", "children": [
//         { "name": "news", "kind": "handle", "identifier": "h1", "children": [
//           { "name": "news", "kind": "document", "identifier": "d1", "children": [
//             { "name": "body", "kind": "field", "identifier": "f1",
//               "text": "<a href=\"logo.png\">logo</a>",
//               "children": [
//                 { "name": "logo.png", "kind": "facet", "identifier": "x1",
//                   "docbase": "img-1" }
//               ] }
//           ] }
//         ] }
//       ] }
//     ]
//   }
//
// Paths are built from names, so the field above lives at
// /content/news/news/body.
// =============================================================================

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{ChildNode, DocumentSource, FieldNode, NodeInfo, NodeKind, NodeResolver};
use crate::error::{Error, Result};

/// One node of a repository snapshot, as stored in JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotNode {
    pub name: String,
    pub kind: NodeKind,
    pub identifier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docbase: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SnapshotNode>,
}

impl SnapshotNode {
    pub fn new(name: &str, kind: NodeKind, identifier: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            identifier: identifier.to_string(),
            text: None,
            docbase: None,
            children: Vec::new(),
        }
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text = Some(text.to_string());
        self
    }

    pub fn with_docbase(mut self, docbase: &str) -> Self {
        self.docbase = Some(docbase.to_string());
        self
    }

    pub fn with_children(mut self, children: Vec<SnapshotNode>) -> Self {
        self.children = children;
        self
    }
}

#[derive(Debug, Clone)]
struct StoredNode {
    identifier: String,
    kind: NodeKind,
    text: Option<String>,
    docbase: Option<String>,
    // child name -> child path
    children: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryRepository {
    nodes: BTreeMap<String, StoredNode>,
    by_identifier: HashMap<String, String>,
    refreshes: usize,
}

impl MemoryRepository {
    pub fn from_snapshot(root: SnapshotNode) -> Self {
        let mut repo = Self::default();
        repo.insert("/".to_string(), root);
        repo
    }

    /// Reads a JSON snapshot from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let root: SnapshotNode = serde_json::from_str(&content)?;
        Ok(Self::from_snapshot(root))
    }

    fn insert(&mut self, path: String, node: SnapshotNode) {
        let mut children = BTreeMap::new();
        for child in node.children {
            let child_path = if path == "/" {
                format!("/{}", child.name)
            } else {
                format!("{path}/{}", child.name)
            };
            children.insert(child.name.clone(), child_path.clone());
            self.insert(child_path, child);
        }

        self.by_identifier.insert(node.identifier.clone(), path.clone());
        self.nodes.insert(
            path,
            StoredNode {
                identifier: node.identifier,
                kind: node.kind,
                text: node.text,
                docbase: node.docbase,
                children,
            },
        );
    }

    /// Removes a node and everything below it, as if deleted mid-scan.
    pub fn remove(&mut self, path: &str) {
        let prefix = format!("{}/", path.trim_end_matches('/'));
        let doomed: Vec<String> = self
            .nodes
            .keys()
            .filter(|p| p.as_str() == path || p.starts_with(&prefix))
            .cloned()
            .collect();
        for p in doomed {
            if let Some(node) = self.nodes.remove(&p) {
                self.by_identifier.remove(&node.identifier);
            }
        }
    }

    /// How many times the session has been refreshed.
    pub fn refresh_count(&self) -> usize {
        self.refreshes
    }

    fn info(path: &str, node: &StoredNode) -> NodeInfo {
        NodeInfo {
            path: path.to_string(),
            identifier: node.identifier.clone(),
            kind: node.kind,
        }
    }
}

impl DocumentSource for MemoryRepository {
    fn fields<'a>(&'a self, start_path: &str) -> Box<dyn Iterator<Item = Result<FieldNode>> + 'a> {
        let start = start_path.trim_end_matches('/').to_string();
        let prefix = format!("{start}/");
        let iter = self
            .nodes
            .iter()
            .filter(move |(path, node)| {
                node.kind == NodeKind::Field && (start.is_empty() || **path == start || path.starts_with(&prefix))
            })
            .map(|(path, node)| match &node.text {
                Some(text) => Ok(FieldNode {
                    path: path.clone(),
                    identifier: node.identifier.clone(),
                    text: text.clone(),
                }),
                None => Err(Error::Repository {
                    path: path.clone(),
                    reason: "field has no text content".to_string(),
                }),
            });
        Box::new(iter)
    }

    fn node(&self, path: &str) -> Result<NodeInfo> {
        self.nodes
            .get(path)
            .map(|node| Self::info(path, node))
            .ok_or_else(|| Error::NotFound(path.to_string()))
    }
}

impl NodeResolver for MemoryRepository {
    fn child(&self, source: &str, name: &str) -> Result<Option<ChildNode>> {
        let node = self
            .by_identifier
            .get(source)
            .and_then(|path| self.nodes.get(path))
            .ok_or_else(|| Error::NotFound(source.to_string()))?;

        Ok(node
            .children
            .get(name)
            .and_then(|child_path| self.nodes.get(child_path))
            .map(|child| ChildNode {
                name: name.to_string(),
                reference: child.docbase.clone(),
            }))
    }

    fn resolve_reference(&self, reference: &str) -> Result<NodeInfo> {
        self.by_identifier
            .get(reference)
            .and_then(|path| self.nodes.get(path).map(|node| Self::info(path, node)))
            .ok_or_else(|| Error::NotFound(reference.to_string()))
    }

    fn refresh(&mut self) -> Result<()> {
        self.refreshes += 1;
        Ok(())
    }
}
