// src/collect/collector.rs
// =============================================================================
// This module walks the repository and gathers every link to check.
//
// How it works:
// 1. Ask the DocumentSource for every field under the start path
// 2. Walk up from each field to the handle that owns it (the "document")
// 3. Extract links from the field's HTML
// 4. Drop links that match an exclusion glob
// 5. Put each link in two indexes:
//    - unique:      dedup key -> the one shared LinkRecord for that key
//    - by_document: handle id -> that document's records (keyed by dedup key,
//                   so a link repeated within one document appears once)
//
// The same Arc<LinkRecord> ends up in the unique index and in every document
// that references it, so a URL used on 500 pages is checked once and the
// result shows up on all 500.
//
// Nothing here talks to the network or writes to the repository. Any field
// that fails to load is logged and skipped.
// =============================================================================

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::checker::extract_links;
use crate::config::ExclusionConfig;
use crate::error::Result;
use crate::link::{dedup_key, LinkRecord};
use crate::repository::{parent_path, DocumentSource, FieldNode, NodeKind};

/// One document's links, keyed by dedup key.
pub type LinkSet = BTreeMap<String, Arc<LinkRecord>>;

/// Result of a collection pass.
#[derive(Debug, Default)]
pub struct CollectedLinks {
    /// Owning handle identifier -> links found in that document. Documents
    /// whose fields contained no links are present with an empty set.
    pub by_document: BTreeMap<String, LinkSet>,
    /// Dedup key -> the single shared record.
    pub unique: HashMap<String, Arc<LinkRecord>>,
    /// Fields that were read and scanned.
    pub fields: usize,
    /// Links dropped by an exclusion pattern.
    pub excluded: usize,
}

impl CollectedLinks {
    pub fn unique_links(&self) -> Vec<Arc<LinkRecord>> {
        self.unique.values().cloned().collect()
    }
}

// Collects links from every in-scope field of the repository.
//
// Parameters:
//   source: where fields come from
//   config: start path and exclusion patterns
//
// Returns: the two indexes described at the top of this file
pub fn collect<S: DocumentSource + ?Sized>(source: &S, config: &ExclusionConfig) -> CollectedLinks {
    let mut collected = CollectedLinks::default();

    for item in source.fields(config.start_path()) {
        let field = match item {
            Ok(field) => field,
            Err(e) => {
                warn!(error = %e, "skipping unreadable field");
                continue;
            }
        };

        if !config.in_scope(&field.path) {
            continue;
        }

        let document = match owning_document(source, &field.path) {
            Ok(Some(document)) => document,
            Ok(None) => {
                debug!(field = %field.path, "field has no owning document, skipping");
                continue;
            }
            Err(e) => {
                warn!(field = %field.path, error = %e, "failed to resolve owning document");
                continue;
            }
        };

        if let Err(e) = collect_field(&mut collected, &field, document, config) {
            error!(field = %field.path, error = %e, "link extraction failed");
        }
    }

    info!(
        documents = collected.by_document.len(),
        fields = collected.fields,
        unique_links = collected.unique.len(),
        excluded = collected.excluded,
        "collected links"
    );
    collected
}

fn collect_field(
    collected: &mut CollectedLinks,
    field: &FieldNode,
    document: String,
    config: &ExclusionConfig,
) -> Result<()> {
    let urls = extract_links(&field.text)?;
    collected.fields += 1;

    // Registered even without links, so an old report for it can be cleared.
    let links = collected.by_document.entry(document).or_default();

    for url in urls {
        if config.is_excluded(&url) {
            debug!(url = %url, "excluded");
            collected.excluded += 1;
            continue;
        }

        let key = dedup_key(&url, &field.identifier);
        let record = collected
            .unique
            .entry(key.clone())
            .or_insert_with(|| Arc::new(LinkRecord::new(url, field.identifier.clone())));
        links.insert(key, Arc::clone(record));
    }

    Ok(())
}

// Walks up from a field to the nearest handle.
//
// Returns: Ok(None) if the root is reached without finding one
pub fn owning_document<S: DocumentSource + ?Sized>(source: &S, field_path: &str) -> Result<Option<String>> {
    let mut current = parent_path(field_path);

    while let Some(path) = current {
        if path == "/" {
            break;
        }
        let node = source.node(path)?;
        if node.kind == NodeKind::Handle {
            return Ok(Some(node.identifier));
        }
        current = parent_path(path);
    }

    Ok(None)
}
