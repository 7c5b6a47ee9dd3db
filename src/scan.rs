// src/scan.rs
// =============================================================================
// The single entry point of the engine: run one full link scan.
//
// What happens in a scan:
// 1. Build an ExclusionConfig from the attribute map (blank start path = no-op)
// 2. Collect links from every field under the start path
// 3. Create a fresh HTTP client for this scan
// 4. Check every unique link on the worker pool
// 5. Shut the HTTP client down
// 6. Reconcile each document's broken links with its stored report
//
// Nothing is returned: results are visible in the report store and the logs.
// =============================================================================

use std::collections::HashMap;
use std::time::Instant;

use parking_lot::{Mutex, MutexGuard};
use tracing::{error, info, warn};

use crate::checker::{ConcurrentLinkChecker, HttpClientRegistry, HttpSettings};
use crate::collect::collect;
use crate::config::ExclusionConfig;
use crate::report::{reconcile_all, ReportStore};
use crate::repository::{DocumentSource, NodeResolver};

/// Owns the repository session shared by collection and internal checks.
pub struct Scanner<R> {
    session: Mutex<R>,
    registry: HttpClientRegistry,
}

impl<R> Scanner<R>
where
    R: DocumentSource + NodeResolver + Send,
{
    pub fn new(session: R) -> Self {
        Self {
            session: Mutex::new(session),
            registry: HttpClientRegistry::default(),
        }
    }

    /// Replaces the HTTP client registry (to add custom transports).
    pub fn with_registry(mut self, registry: HttpClientRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Locks and returns the session, e.g. to inspect it between scans.
    pub fn session(&self) -> MutexGuard<'_, R> {
        self.session.lock()
    }

    pub fn into_session(self) -> R {
        self.session.into_inner()
    }

    // Runs one scan.
    //
    // Parameters:
    //   attributes: flat configuration map (see config.rs for the keys)
    //   store: where per-document reports are read from and written to
    pub fn scan<S: ReportStore + ?Sized>(&self, attributes: &HashMap<String, String>, store: &mut S) {
        let config = match ExclusionConfig::from_attributes(attributes) {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %e, "link scan not run");
                return;
            }
        };

        let started = Instant::now();
        info!(
            start_path = config.start_path(),
            threads = config.threads(),
            excludes = config.url_excludes().len(),
            "starting link scan"
        );

        // The guard is dropped before the workers need the session.
        let collected = {
            let session = self.session.lock();
            collect(&*session, &config)
        };

        let settings = HttpSettings {
            socket_timeout: config.socket_timeout(),
            connection_timeout: config.connection_timeout(),
        };
        let client = match self.registry.create(config.http_client(), &settings) {
            Ok(client) => client,
            Err(e) => {
                // Without checks every link would look fine; leave reports alone.
                error!(error = %e, "no http client available, link scan aborted");
                return;
            }
        };

        let links = collected.unique_links();
        let stats = ConcurrentLinkChecker::new(&self.session, client.as_ref(), config.threads()).check_all(&links);
        client.shutdown();

        let summary = reconcile_all(store, &collected.by_document);

        info!(
            documents = collected.by_document.len(),
            unique_links = links.len(),
            external = stats.external,
            internal = stats.internal,
            skipped = stats.skipped,
            broken = stats.broken,
            reports_written = summary.written,
            reports_cleared = summary.cleared,
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "link scan finished"
        );
    }
}
