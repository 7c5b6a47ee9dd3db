// src/config.rs
// =============================================================================
// Scan configuration, built once per scan from a flat attribute map.
//
// Whoever triggers a scan (a scheduler, or our own CLI) passes a map of
// string keys to string values:
//
//   startPath          repository path prefix that limits which documents
//                      are scanned (required)
//   httpClientClass    name of the HTTP transport to use (optional)
//   nrHttpThreads      worker thread count            (default 10)
//   socketTimeout      read timeout in milliseconds   (default 10000)
//   connectionTimeout  connect timeout in milliseconds (default 10000)
//   urlExcludes        globs separated by , space tab or newline
//
// Bad numbers never fail the scan; they are logged and replaced by the
// default. A blank start path does fail, because there is nothing to scan.
// =============================================================================

use std::collections::HashMap;
use std::time::Duration;

use regex::Regex;
use tracing::warn;

use crate::error::{Error, Result};
use crate::glob;

pub const START_PATH: &str = "startPath";
pub const HTTP_CLIENT_CLASS: &str = "httpClientClass";
pub const NR_HTTP_THREADS: &str = "nrHttpThreads";
pub const SOCKET_TIMEOUT: &str = "socketTimeout";
pub const CONNECTION_TIMEOUT: &str = "connectionTimeout";
pub const URL_EXCLUDES: &str = "urlExcludes";

pub const DEFAULT_THREADS: usize = 10;
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Immutable configuration for one scan.
#[derive(Debug, Clone)]
pub struct ExclusionConfig {
    start_path: String,
    http_client: Option<String>,
    threads: usize,
    socket_timeout: Duration,
    connection_timeout: Duration,
    url_excludes: Vec<Regex>,
}

impl ExclusionConfig {
    // Builds the configuration from the scheduler's attribute map.
    //
    // Returns: Err(Error::Config) only when startPath is missing or blank
    pub fn from_attributes(attributes: &HashMap<String, String>) -> Result<Self> {
        let start_path = attributes
            .get(START_PATH)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::Config(format!("`{START_PATH}` is blank")))?;

        let http_client = attributes
            .get(HTTP_CLIENT_CLASS)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let threads = positive_or_default(attributes, NR_HTTP_THREADS, DEFAULT_THREADS as u64);
        let socket_ms = positive_or_default(attributes, SOCKET_TIMEOUT, DEFAULT_TIMEOUT_MS);
        let connect_ms = positive_or_default(attributes, CONNECTION_TIMEOUT, DEFAULT_TIMEOUT_MS);

        let url_excludes = attributes
            .get(URL_EXCLUDES)
            .map(|raw| compile_excludes(raw))
            .unwrap_or_default();

        Ok(Self {
            start_path: normalize_start_path(start_path),
            http_client,
            threads: usize::try_from(threads).unwrap_or(DEFAULT_THREADS),
            socket_timeout: Duration::from_millis(socket_ms),
            connection_timeout: Duration::from_millis(connect_ms),
            url_excludes,
        })
    }

    pub fn start_path(&self) -> &str {
        &self.start_path
    }

    pub fn http_client(&self) -> Option<&str> {
        self.http_client.as_deref()
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    pub fn socket_timeout(&self) -> Duration {
        self.socket_timeout
    }

    pub fn connection_timeout(&self) -> Duration {
        self.connection_timeout
    }

    pub fn url_excludes(&self) -> &[Regex] {
        &self.url_excludes
    }

    /// True when the URL fully matches any exclusion pattern.
    pub fn is_excluded(&self, url: &str) -> bool {
        self.url_excludes.iter().any(|re| re.is_match(url))
    }

    // True when `path` is the start path itself or lies below it.
    // "/content/docs" covers "/content/docs/a" but not "/content/docsx".
    pub fn in_scope(&self, path: &str) -> bool {
        if self.start_path == "/" {
            return path.starts_with('/');
        }
        match path.strip_prefix(self.start_path.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }
}

fn normalize_start_path(raw: &str) -> String {
    let trimmed = raw.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

fn positive_or_default(attributes: &HashMap<String, String>, key: &str, default: u64) -> u64 {
    let Some(raw) = attributes.get(key).map(|s| s.trim()).filter(|s| !s.is_empty()) else {
        return default;
    };
    match raw.parse::<u64>() {
        Ok(value) if value > 0 => value,
        _ => {
            warn!(key, value = raw, default, "invalid number in scan configuration, using default");
            default
        }
    }
}

// Splits the urlExcludes attribute and compiles each glob case-insensitively.
// A pattern that fails to compile is dropped with a warning; the rest still apply.
fn compile_excludes(raw: &str) -> Vec<Regex> {
    raw.split(|c: char| matches!(c, ',' | ' ' | '\t' | '\r' | '\n'))
        .filter(|token| !token.is_empty())
        .filter_map(|token| match glob::compile(token, true) {
            Ok(re) => Some(re),
            Err(e) => {
                warn!(pattern = token, error = %e, "skipping invalid url exclude");
                None
            }
        })
        .collect()
}
