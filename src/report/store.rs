// src/report/store.rs
// =============================================================================
// A ReportStore that keeps all reports in one JSON file.
//
// File layout: an object mapping document identifier -> array of entries.
//
//   {
//     "h1": [
//       { "url": "http://x.com", "code": 404,
//         "brokenSince": "2026-10-01T08:00:00Z",
//         "lastChecked": "2026-10-19T08:00:00Z",
//         "excerpt": "<a target=\"_blank\" href=\"http://x.com\">http://x.com</a>" }
//     ]
//   }
//
// Changes are kept in memory until save() is called.
// =============================================================================

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::{ReportEntry, ReportStore};
use crate::error::{Error, Result};

#[derive(Debug, Default)]
pub struct JsonReportStore {
    path: Option<PathBuf>,
    reports: BTreeMap<String, Vec<ReportEntry>>,
}

impl JsonReportStore {
    /// A store that never touches the disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    // Opens the store at `path`. A missing file is an empty store; a file
    // that exists but can't be parsed is an error.
    pub fn open(path: &Path) -> Result<Self> {
        let reports = match std::fs::read_to_string(path) {
            Ok(content) if content.trim().is_empty() => BTreeMap::new(),
            Ok(content) => serde_json::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => {
                return Err(Error::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Ok(Self {
            path: Some(path.to_path_buf()),
            reports,
        })
    }

    /// Writes every report back to the file the store was opened from.
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let json = serde_json::to_string_pretty(&self.reports)?;
        std::fs::write(path, json).map_err(|source| Error::Io {
            path: path.clone(),
            source,
        })
    }

    pub fn reports(&self) -> &BTreeMap<String, Vec<ReportEntry>> {
        &self.reports
    }

    pub fn has_report(&self, document: &str) -> bool {
        self.reports.contains_key(document)
    }
}

impl ReportStore for JsonReportStore {
    fn previous_entries(&self, document: &str) -> Result<Vec<ReportEntry>> {
        Ok(self.reports.get(document).cloned().unwrap_or_default())
    }

    fn write(&mut self, document: &str, entries: Vec<ReportEntry>) -> Result<()> {
        self.reports.insert(document.to_string(), entries);
        Ok(())
    }

    fn clear(&mut self, document: &str) -> Result<()> {
        self.reports.remove(document);
        Ok(())
    }
}
