// src/lib.rs
// =============================================================================
// link-guardian: find broken links in a content repository.
//
// Data flow of one scan:
//
//   fields --collect--> unique LinkRecords --checker pool--> ok / broken
//          (extract,     + per-document sets                     |
//           exclude,                                             v
//           dedup)                              reconcile with stored reports
//
// Modules:
// - glob: exclusion globs -> regexes
// - link: LinkRecord and its dedup key
// - config: scan configuration from a flat attribute map
// - checker: link extraction, HTTP/internal checks, the worker pool
// - collect: walks the repository and builds the link indexes
// - repository: what the engine needs from a content repository
// - report: report entries, storage, and reconciliation
// - scan: the entry point tying it all together
// =============================================================================

pub mod checker;
pub mod collect;
pub mod config;
pub mod error;
pub mod glob;
pub mod link;
pub mod report;
pub mod repository;
pub mod scan;

pub use config::ExclusionConfig;
pub use error::{Error, Result};
pub use link::LinkRecord;
pub use scan::Scanner;
