// src/collect/mod.rs
// =============================================================================
// This module gathers links from the repository before any checking starts.
//
// Collection is single-threaded: it builds the shared map of LinkRecords
// that the checker's workers later fill in. The map itself is never changed
// once checking begins; only the records inside it are.
// =============================================================================

mod collector;

// Re-export the main collection function and its output
pub use collector::{collect, owning_document, CollectedLinks, LinkSet};
