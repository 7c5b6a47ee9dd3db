// src/report/mod.rs
// =============================================================================
// This module turns checked links into per-document broken-link reports.
//
// Submodules:
// - reconcile: merges a scan's results with the previous report, keeping the
//   original "broken since" date of links that are still broken
// - store: a JSON-file backed ReportStore
//
// A document "has a report" when its store entry exists. That presence is
// the broken-links marker: clearing a document removes it entirely.
// =============================================================================

mod reconcile;
mod store;

pub use reconcile::{apply, excerpt, reconcile, reconcile_all, ReconcileAction, ReconcileSummary};
pub use store::JsonReportStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One broken link, as written to a document's report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportEntry {
    pub url: String,
    pub code: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub broken_since: DateTime<Utc>,
    pub last_checked: DateTime<Utc>,
    /// An anchor wrapping the URL, for display.
    pub excerpt: String,
}

/// Where reports are persisted, one list of entries per owning document.
pub trait ReportStore {
    /// Entries written by the previous scan (empty if the document has none).
    fn previous_entries(&self, document: &str) -> Result<Vec<ReportEntry>>;

    /// Replaces the document's report, setting its broken-links marker.
    fn write(&mut self, document: &str, entries: Vec<ReportEntry>) -> Result<()>;

    /// Removes the document's report and marker. Clearing a document without
    /// a report is not an error.
    fn clear(&mut self, document: &str) -> Result<()>;
}
