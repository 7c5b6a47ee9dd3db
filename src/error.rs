// src/error.rs
// =============================================================================
// The error type shared by every module of the link-validation engine.
//
// Most failures in a scan are per-item (one field unreadable, one link that
// times out) and are logged and skipped by the caller. This enum is what
// those callers receive, so each variant carries enough context to produce a
// useful log line on its own.
// =============================================================================

use std::path::PathBuf;

/// Convenience alias used throughout the library.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An exclusion glob produced an expression the regex engine rejected
    /// (for example an unterminated `[` character class).
    #[error("invalid glob pattern `{pattern}`: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Scan configuration that makes the scan impossible (e.g. blank start path).
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A repository node could not be found by path or identifier.
    #[error("repository item not found: {0}")]
    NotFound(String),

    /// A repository node exists but could not be read.
    #[error("failed to read repository item {path}: {reason}")]
    Repository { path: String, reason: String },

    /// The link scanner computed an offset that does not fall on a character
    /// boundary. This is a bug in the scanner, never a property of the input.
    #[error("link extraction defect at byte offset {offset}")]
    ExtractionDefect { offset: usize },

    /// The HTTP transport could not be built or used.
    #[error("http transport error: {0}")]
    Http(String),

    /// Writing or clearing a report for one document failed.
    #[error("failed to persist report for document {document}: {reason}")]
    Report { document: String, reason: String },

    /// A file on disk (repository snapshot, report store) could not be accessed.
    #[error("io error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}
