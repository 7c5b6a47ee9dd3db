// src/checker/internal.rs
// =============================================================================
// Checks links that point inside the repository.
//
// A bare link like `logo.png` in a rich-text field is stored alongside a
// child node of that field, named exactly `logo.png`, whose `docbase`
// property holds the identifier of the target node. A link is broken when:
//
// - the field has no child with that name, or
// - the child has no reference, or the reference is blank
//
// A reference that no longer resolves to a node is NOT reported. Only the
// missing-child and missing-reference cases above count as broken.
//
// Links we can't judge (no source field, or a path with '/') stay unchecked.
// =============================================================================

use chrono::Utc;
use tracing::debug;

use crate::link::{LinkRecord, BROKEN_INTERNAL_LINK_CODE};
use crate::repository::NodeResolver;

/// What happened to one internal link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InternalOutcome {
    Ok,
    Broken,
    /// The link could not be judged; the record was left untouched.
    Skipped,
}

/// True when this record is something the internal check can judge at all.
pub fn is_checkable(record: &LinkRecord) -> bool {
    !record.source_identifier().trim().is_empty() && !record.url().contains('/')
}

// Checks one internal link. The caller must hold the session lock for the
// whole call.
pub fn check_internal<R: NodeResolver + ?Sized>(session: &R, record: &LinkRecord) -> InternalOutcome {
    if !is_checkable(record) {
        return InternalOutcome::Skipped;
    }

    let child = match session.child(record.source_identifier(), record.url()) {
        Ok(child) => child,
        Err(e) => {
            debug!(url = record.url(), source = record.source_identifier(), error = %e, "source node unavailable");
            return InternalOutcome::Skipped;
        }
    };

    let reference = child
        .and_then(|c| c.reference)
        .filter(|r| !r.trim().is_empty());

    let now = Utc::now();
    match reference {
        None => {
            record.mark_broken(BROKEN_INTERNAL_LINK_CODE, Some("broken reference".to_string()), now);
            InternalOutcome::Broken
        }
        Some(reference) => {
            if let Err(e) = session.resolve_reference(&reference) {
                debug!(url = record.url(), reference = %reference, error = %e, "reference target not found, not reported");
            }
            record.mark_ok(now);
            InternalOutcome::Ok
        }
    }
}
