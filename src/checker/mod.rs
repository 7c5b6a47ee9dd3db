// src/checker/mod.rs
// =============================================================================
// This module contains all link checking logic.
//
// Submodules:
// - html: Extracts href/src values from rich-text HTML
// - http: Probes external links over HTTP (HEAD, then GET on 405)
// - internal: Validates bare links against the repository
// - pool: Runs both kinds of checks on a bounded pool of worker threads
//
// This file (mod.rs) is the module root - it ties everything together and
// exports the public API that other parts of the crate can use.
// =============================================================================

mod html;
mod http;
mod internal;
mod pool;

// Re-export public items from submodules
// This lets users write `checker::extract_links()` instead of
// `checker::html::extract_links()`
pub use html::extract_links;
pub use http::{
    check_external, is_broken_status, probe, ClientFactory, HttpClient, HttpClientRegistry,
    HttpSettings, ProbeOutcome, ReqwestClient, TransportError, DEFAULT_CLIENT,
};
pub use internal::{check_internal, InternalOutcome};
pub use pool::{CheckStats, ConcurrentLinkChecker, REFRESH_EVERY};
