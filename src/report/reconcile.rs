// src/report/reconcile.rs
// =============================================================================
// Merges one scan's results into the persisted reports.
//
// For each document the scan looked at:
// - no broken links now   -> clear its report (and marker)
// - some broken links now -> write a fresh report, but for every URL that
//                            was already reported, keep the old brokenSince
//
// So "broken since" is when the link was FIRST seen broken, not when the most
// recent scan ran. A link that got fixed simply isn't in the new report.
//
// This runs after every checker worker has joined: it reads final state.
// =============================================================================

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn, Level};

use super::{ReportEntry, ReportStore};
use crate::collect::LinkSet;
use crate::error::Result;
use crate::link::LinkRecord;

/// What happened to one document's report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileAction {
    Written(usize),
    Cleared,
}

/// Totals over all documents of a scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub written: usize,
    pub cleared: usize,
    pub failed: usize,
    pub broken_entries: usize,
}

/// The display snippet stored with each entry.
pub fn excerpt(url: &str) -> String {
    format!(r#"<a target="_blank" href="{url}">{url}</a>"#)
}

// Builds the new report for one document.
//
// Parameters:
//   previous: what the store held before this scan
//   broken: this scan's broken records for the document
//   now: fallback timestamp for a record with no broken_since/last_checked
pub fn reconcile(previous: &[ReportEntry], broken: &[Arc<LinkRecord>], now: DateTime<Utc>) -> Vec<ReportEntry> {
    let first_seen: HashMap<&str, DateTime<Utc>> = previous
        .iter()
        .map(|entry| (entry.url.as_str(), entry.broken_since))
        .collect();

    broken
        .iter()
        .map(|record| {
            let state = record.state();
            let broken_since = first_seen
                .get(record.url())
                .copied()
                .or(state.broken_since)
                .unwrap_or(now);
            ReportEntry {
                url: record.url().to_string(),
                code: state.result_code,
                message: state.result_message,
                broken_since,
                last_checked: state.last_checked.unwrap_or(now),
                excerpt: excerpt(record.url()),
            }
        })
        .collect()
}

// Applies one document's scan results to the store.
pub fn apply<S: ReportStore + ?Sized>(store: &mut S, document: &str, links: &LinkSet) -> Result<ReconcileAction> {
    let broken: Vec<Arc<LinkRecord>> = links
        .values()
        .filter(|record| record.is_broken())
        .cloned()
        .collect();

    if broken.is_empty() {
        store.clear(document)?;
        return Ok(ReconcileAction::Cleared);
    }

    let previous = store.previous_entries(document)?;
    let entries = reconcile(&previous, &broken, Utc::now());
    let count = entries.len();
    store.write(document, entries)?;
    Ok(ReconcileAction::Written(count))
}

// Applies every document's results. A failure on one document is logged and
// the rest still get their reports.
pub fn reconcile_all<'a, S, I>(store: &mut S, documents: I) -> ReconcileSummary
where
    S: ReportStore + ?Sized,
    I: IntoIterator<Item = (&'a String, &'a LinkSet)>,
{
    let mut summary = ReconcileSummary::default();

    for (document, links) in documents {
        match apply(store, document, links) {
            Ok(ReconcileAction::Written(count)) => {
                debug!(document = %document, broken = count, "report written");
                summary.written += 1;
                summary.broken_entries += count;
            }
            Ok(ReconcileAction::Cleared) => summary.cleared += 1,
            Err(e) => {
                summary.failed += 1;
                if tracing::enabled!(Level::DEBUG) {
                    warn!(document = %document, error = ?e, "failed to persist report");
                } else {
                    warn!(document = %document, "failed to persist report: {e}");
                }
            }
        }
    }

    info!(
        written = summary.written,
        cleared = summary.cleared,
        failed = summary.failed,
        broken = summary.broken_entries,
        "reports reconciled"
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::link::EXCEPTION_CODE;
    use chrono::Duration;
    use std::collections::BTreeMap;

    #[derive(Default)]
    struct MapStore {
        reports: BTreeMap<String, Vec<ReportEntry>>,
        fail_on: Option<String>,
    }

    impl ReportStore for MapStore {
        fn previous_entries(&self, document: &str) -> Result<Vec<ReportEntry>> {
            Ok(self.reports.get(document).cloned().unwrap_or_default())
        }

        fn write(&mut self, document: &str, entries: Vec<ReportEntry>) -> Result<()> {
            if self.fail_on.as_deref() == Some(document) {
                return Err(Error::Report {
                    document: document.to_string(),
                    reason: "disk full".to_string(),
                });
            }
            self.reports.insert(document.to_string(), entries);
            Ok(())
        }

        fn clear(&mut self, document: &str) -> Result<()> {
            self.reports.remove(document);
            Ok(())
        }
    }

    fn broken(url: &str, code: i32, at: DateTime<Utc>) -> Arc<LinkRecord> {
        let record = Arc::new(LinkRecord::new(url, "f"));
        record.mark_broken(code, None, at);
        record
    }

    fn set(records: &[Arc<LinkRecord>]) -> LinkSet {
        records.iter().map(|r| (r.key(), Arc::clone(r))).collect()
    }

    #[test]
    fn test_excerpt() {
        assert_eq!(excerpt("http://x.com"), r#"<a target="_blank" href="http://x.com">http://x.com</a>"#);
    }

    #[test]
    fn test_broken_since_is_carried_forward() {
        let t1 = Utc::now() - Duration::days(7);
        let t2 = Utc::now();
        let previous = reconcile(&[], &[broken("http://x.com", 404, t1)], t1);
        assert_eq!(previous[0].broken_since, t1);

        let current = reconcile(&previous, &[broken("http://x.com", 500, t2), broken("http://new.com", 404, t2)], t2);
        assert_eq!(current.len(), 2);
        assert_eq!(current[0].broken_since, t1);
        assert_eq!(current[0].code, 500);
        assert_eq!(current[0].last_checked, t2);
        assert_eq!(current[1].broken_since, t2);
    }

    #[test]
    fn test_fixed_links_clear_the_report() {
        let mut store = MapStore::default();
        let record = broken("http://x.com", 404, Utc::now());
        assert_eq!(apply(&mut store, "doc", &set(&[Arc::clone(&record)])).unwrap(), ReconcileAction::Written(1));
        assert!(store.reports.contains_key("doc"));

        let fixed = Arc::new(LinkRecord::new("http://x.com", "f"));
        fixed.mark_ok(Utc::now());
        assert_eq!(apply(&mut store, "doc", &set(&[fixed])).unwrap(), ReconcileAction::Cleared);
        assert!(!store.reports.contains_key("doc"));
    }

    #[test]
    fn test_only_broken_records_are_reported() {
        let mut store = MapStore::default();
        let ok = Arc::new(LinkRecord::new("http://ok.com", "f"));
        ok.mark_ok(Utc::now());
        let failing = Arc::new(LinkRecord::new("http://slow.com", "f"));
        failing.mark_broken(EXCEPTION_CODE, Some("Timeout".into()), Utc::now());

        apply(&mut store, "doc", &set(&[ok, failing])).unwrap();
        let entries = &store.reports["doc"];
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].url, "http://slow.com");
        assert_eq!(entries[0].message.as_deref(), Some("Timeout"));
    }

    #[test]
    fn test_one_failing_document_does_not_stop_the_rest() {
        let mut store = MapStore {
            fail_on: Some("bad".to_string()),
            ..MapStore::default()
        };
        let record = broken("http://x.com", 404, Utc::now());
        let mut docs = BTreeMap::new();
        docs.insert("bad".to_string(), set(&[Arc::clone(&record)]));
        docs.insert("good".to_string(), set(&[record]));

        let summary = reconcile_all(&mut store, &docs);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.written, 1);
        assert!(store.reports.contains_key("good"));
    }
}
