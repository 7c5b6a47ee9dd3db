// src/link.rs
// =============================================================================
// LinkRecord: one unique link found during a scan, and the outcome of
// checking it.
//
// A record is created by the collector, shared (through Arc) by every
// document that references the same link, written exactly once by the one
// checker worker that dequeues it, and read back by the reconciler.
//
// The identity of a record is its dedup key:
//   - links with a scheme (http://x.com, mailto:y) are keyed by the raw URL,
//     so every document pointing at http://x.com shares one record
//   - bare links (image.jpg, ../other) only mean something relative to the
//     field they were found in, so they are keyed by "<source id>/<url>"
// =============================================================================

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use regex::Regex;

/// Result code for an internal link whose target facet or reference is missing.
pub const BROKEN_INTERNAL_LINK_CODE: i32 = -1;

/// Result code for an external link whose check raised a transport error.
pub const EXCEPTION_CODE: i32 = -2;

// Matches "scheme:rest" and captures the scheme.
static SCHEME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^([A-Za-z]+):.*$").expect("scheme pattern is a valid regex")
});

/// How a link is validated, decided by its scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    /// http:// or https:// (any case) - probed over the network
    External,
    /// No scheme at all - resolved against the repository
    Internal,
    /// Some other scheme (mailto:, ftp:, javascript:) - never checked
    Unsupported,
}

/// Returns the scheme of a URL, if it has one.
pub fn scheme(url: &str) -> Option<&str> {
    SCHEME
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

pub fn classify(url: &str) -> LinkKind {
    match scheme(url) {
        Some(s) if s.eq_ignore_ascii_case("http") || s.eq_ignore_ascii_case("https") => {
            LinkKind::External
        }
        Some(_) => LinkKind::Unsupported,
        None => LinkKind::Internal,
    }
}

// Computes the key under which a link is deduplicated within one scan.
//
// Example:
//   dedup_key("http://x.com", "a1") == "http://x.com"
//   dedup_key("image.jpg", "a1")    == "a1/image.jpg"
pub fn dedup_key(url: &str, source_identifier: &str) -> String {
    if scheme(url).is_some() {
        url.to_string()
    } else {
        format!("{source_identifier}/{url}")
    }
}

/// Mutable outcome of checking a link.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkState {
    pub broken: bool,
    pub broken_since: Option<DateTime<Utc>>,
    pub last_checked: Option<DateTime<Utc>>,
    pub result_code: i32,
    pub result_message: Option<String>,
}

#[derive(Debug)]
pub struct LinkRecord {
    url: String,
    source_identifier: String,
    state: Mutex<LinkState>,
}

impl LinkRecord {
    pub fn new(url: impl Into<String>, source_identifier: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            source_identifier: source_identifier.into(),
            state: Mutex::new(LinkState::default()),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Identifier of the field node the link was found in.
    pub fn source_identifier(&self) -> &str {
        &self.source_identifier
    }

    pub fn key(&self) -> String {
        dedup_key(&self.url, &self.source_identifier)
    }

    pub fn kind(&self) -> LinkKind {
        classify(&self.url)
    }

    /// A copy of the current state. Cheap enough to call per report entry.
    pub fn state(&self) -> LinkState {
        self.state.lock().clone()
    }

    pub fn is_broken(&self) -> bool {
        self.state.lock().broken
    }

    /// True once a worker has recorded an outcome (ok or broken).
    pub fn is_checked(&self) -> bool {
        self.state.lock().last_checked.is_some()
    }

    pub fn mark_ok(&self, now: DateTime<Utc>) {
        let mut state = self.state.lock();
        state.broken = false;
        state.last_checked = Some(now);
    }

    // Records a broken outcome. The first time a record is seen broken keeps
    // its broken_since; later calls only refresh code, message and last_checked.
    pub fn mark_broken(&self, code: i32, message: Option<String>, now: DateTime<Utc>) {
        let mut state = self.state.lock();
        state.broken = true;
        state.broken_since.get_or_insert(now);
        state.last_checked = Some(now);
        state.result_code = code;
        state.result_message = message;
    }
}
