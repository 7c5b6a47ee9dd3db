// src/checker/pool.rs
// =============================================================================
// This module checks every unique link of a scan with a pool of OS threads.
//
// How it works:
// 1. Every unique LinkRecord goes into one shared queue (a crossbeam channel
//    whose sender is dropped right away, so the queue only drains)
// 2. We start min(number of links, configured threads) workers
// 3. Each worker takes one record at a time until the queue is empty:
//    - http/https          -> HEAD/GET probe with the shared HTTP client
//    - no scheme           -> internal check against the repository session
//    - any other scheme    -> left unchecked
// 4. We join every worker, then refresh the session one last time
//
// Guarantees:
// - A record is received by exactly one worker, so it is checked at most once
// - The repository session is only touched while holding its mutex; the HTTP
//   client is thread-safe and used without locking
// - Every REFRESH_EVERY internal checks (counted across all workers) the
//   session is refreshed so its transient state doesn't grow without bound
// - A worker that panics is logged; the others keep draining the queue
// =============================================================================

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::Receiver;
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use super::http::{check_external, HttpClient};
use super::internal::{check_internal, is_checkable, InternalOutcome};
use crate::link::{LinkKind, LinkRecord};
use crate::repository::NodeResolver;

/// Internal checks between two session refreshes.
pub const REFRESH_EVERY: usize = 50;

/// Counters for one run of the pool.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckStats {
    pub workers: usize,
    pub external: usize,
    pub internal: usize,
    pub skipped: usize,
    pub broken: usize,
    /// Workers that ended with a panic.
    pub crashed: usize,
}

// Shared, lock-free counters the workers bump.
#[derive(Default)]
struct Counters {
    external: AtomicUsize,
    internal: AtomicUsize,
    skipped: AtomicUsize,
}

pub struct ConcurrentLinkChecker<'a, R> {
    session: &'a Mutex<R>,
    client: &'a dyn HttpClient,
    threads: usize,
}

impl<'a, R> ConcurrentLinkChecker<'a, R>
where
    R: NodeResolver + Send,
{
    pub fn new(session: &'a Mutex<R>, client: &'a dyn HttpClient, threads: usize) -> Self {
        Self {
            session,
            client,
            threads: threads.max(1),
        }
    }

    // Checks every record once and returns what happened.
    //
    // Outcomes are written onto the records themselves; this only returns
    // counters for logging.
    pub fn check_all(&self, links: &[Arc<LinkRecord>]) -> CheckStats {
        if links.is_empty() {
            return CheckStats::default();
        }

        let (sender, queue) = crossbeam_channel::unbounded();
        for record in links {
            // The receiver is alive, so sending on an unbounded channel can't fail.
            let _ = sender.send(Arc::clone(record));
        }
        drop(sender);

        let worker_count = links.len().min(self.threads);
        let counters = Counters::default();
        info!(links = links.len(), workers = worker_count, "checking links");

        let mut stats = CheckStats::default();
        thread::scope(|scope| {
            let mut handles = Vec::with_capacity(worker_count);
            for id in 0..worker_count {
                let queue = queue.clone();
                let counters = &counters;
                let spawned = thread::Builder::new()
                    .name(format!("link-checker-{id}"))
                    .spawn_scoped(scope, move || self.work(&queue, counters));
                match spawned {
                    Ok(handle) => handles.push(handle),
                    Err(e) => error!(worker = id, error = %e, "failed to start link checker thread"),
                }
            }
            stats.workers = handles.len();

            for handle in handles {
                if handle.join().is_err() {
                    // The panic message was already printed by the default hook.
                    error!("link checker thread panicked");
                    stats.crashed += 1;
                }
            }
        });

        if let Err(e) = self.session.lock().refresh() {
            warn!(error = %e, "final session refresh failed");
        }

        stats.external = counters.external.load(Ordering::Relaxed);
        stats.internal = counters.internal.load(Ordering::Relaxed);
        stats.skipped = counters.skipped.load(Ordering::Relaxed);
        stats.broken = links.iter().filter(|l| l.is_broken()).count();
        stats
    }

    fn work(&self, queue: &Receiver<Arc<LinkRecord>>, counters: &Counters) {
        // recv() fails once the queue is empty: that's the normal way out
        while let Ok(record) = queue.recv() {
            match record.kind() {
                LinkKind::External => {
                    check_external(self.client, &record);
                    counters.external.fetch_add(1, Ordering::Relaxed);
                }
                LinkKind::Internal => self.check_internal(&record, counters),
                LinkKind::Unsupported => {
                    debug!(url = record.url(), "unsupported scheme, not checked");
                    counters.skipped.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
    }

    fn check_internal(&self, record: &LinkRecord, counters: &Counters) {
        if !is_checkable(record) {
            counters.skipped.fetch_add(1, Ordering::Relaxed);
            return;
        }

        let mut session = self.session.lock();
        if check_internal(&*session, record) == InternalOutcome::Skipped {
            counters.skipped.fetch_add(1, Ordering::Relaxed);
        }

        let checked = counters.internal.fetch_add(1, Ordering::Relaxed) + 1;
        if checked % REFRESH_EVERY == 0 {
            debug!(checked, "refreshing repository session");
            if let Err(e) = session.refresh() {
                warn!(error = %e, "session refresh failed");
            }
        }
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why OS threads instead of async?
//    - The repository session is a blocking API that must be locked around
//      each use; threads plus a mutex model that directly
//    - Each worker blocks on network I/O, bounded by the client's timeouts
//
// 2. What is thread::scope?
//    - Threads spawned inside a scope may borrow local data (the session,
//      the client, the counters) because the scope waits for all of them
//    - Joining a handle ourselves returns Err if that thread panicked,
//      which lets us log it instead of taking the whole scan down
//
// 3. Why is the counter increment inside the lock?
//    - fetch_add is atomic on its own; holding the lock as well means the
//      refresh that follows runs on the same session the check just used
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::http::TransportError;
    use crate::error::{Error, Result};
    use crate::repository::{ChildNode, NodeInfo, NodeKind};
    use std::collections::HashMap;

    // Counts requests per URL and answers 404 for anything containing "dead".
    #[derive(Default)]
    struct CountingClient {
        requests: Mutex<HashMap<String, usize>>,
    }

    impl HttpClient for CountingClient {
        fn head(&self, url: &str) -> std::result::Result<u16, TransportError> {
            *self.requests.lock().entry(url.to_string()).or_default() += 1;
            if url.contains("panic") {
                panic!("transport exploded");
            }
            Ok(if url.contains("dead") { 404 } else { 200 })
        }

        fn get(&self, url: &str) -> std::result::Result<u16, TransportError> {
            self.head(url)
        }

        fn shutdown(self: Box<Self>) {}
    }

    // Every child exists and references "t"; counts lookups and refreshes.
    #[derive(Default)]
    struct CountingSession {
        lookups: usize,
        refreshes: usize,
    }

    impl NodeResolver for CountingSession {
        fn child(&self, _source: &str, name: &str) -> Result<Option<ChildNode>> {
            Ok(Some(ChildNode {
                name: name.to_string(),
                reference: Some("t".to_string()),
            }))
        }

        fn resolve_reference(&self, reference: &str) -> Result<NodeInfo> {
            if reference == "t" {
                Ok(NodeInfo {
                    path: "/t".into(),
                    identifier: "t".into(),
                    kind: NodeKind::Document,
                })
            } else {
                Err(Error::NotFound(reference.into()))
            }
        }

        fn refresh(&mut self) -> Result<()> {
            self.refreshes += 1;
            self.lookups = 0;
            Ok(())
        }
    }

    fn records(urls: &[&str]) -> Vec<Arc<LinkRecord>> {
        urls.iter().map(|u| Arc::new(LinkRecord::new(*u, "field"))).collect()
    }

    #[test]
    fn test_each_record_is_checked_once() {
        let urls: Vec<String> = (0..200).map(|i| format!("http://host/{i}")).collect();
        let refs: Vec<&str> = urls.iter().map(String::as_str).collect();
        let links = records(&refs);

        let session = Mutex::new(CountingSession::default());
        let client = CountingClient::default();
        let stats = ConcurrentLinkChecker::new(&session, &client, 8).check_all(&links);

        assert_eq!(stats.workers, 8);
        assert_eq!(stats.external, 200);
        let requests = client.requests.lock();
        assert_eq!(requests.len(), 200);
        assert!(requests.values().all(|&n| n == 1));
        assert!(links.iter().all(|l| l.is_checked()));
    }

    #[test]
    fn test_worker_count_is_capped_by_link_count() {
        let links = records(&["http://a", "http://b"]);
        let session = Mutex::new(CountingSession::default());
        let client = CountingClient::default();
        let stats = ConcurrentLinkChecker::new(&session, &client, 10).check_all(&links);
        assert_eq!(stats.workers, 2);
    }

    #[test]
    fn test_no_links_starts_no_workers() {
        let session = Mutex::new(CountingSession::default());
        let client = CountingClient::default();
        let stats = ConcurrentLinkChecker::new(&session, &client, 10).check_all(&[]);
        assert_eq!(stats, CheckStats::default());
        assert_eq!(session.lock().refreshes, 0);
    }

    #[test]
    fn test_classification() {
        let links = records(&["http://ok", "https://dead", "mailto:a@b", "pic.png", "a/b.png"]);
        let session = Mutex::new(CountingSession::default());
        let client = CountingClient::default();
        let stats = ConcurrentLinkChecker::new(&session, &client, 3).check_all(&links);

        assert_eq!(stats.external, 2);
        assert_eq!(stats.internal, 1);
        assert_eq!(stats.skipped, 2);
        assert_eq!(stats.broken, 1);
        assert!(links[1].is_broken());
        assert!(!links[2].is_checked());
        assert!(links[3].is_checked());
        assert!(!links[4].is_checked());
    }

    #[test]
    fn test_session_refreshed_every_fifty_internal_checks_and_at_the_end() {
        let urls: Vec<String> = (0..120).map(|i| format!("img{i}.png")).collect();
        let refs: Vec<&str> = urls.iter().map(String::as_str).collect();
        let links = records(&refs);

        let session = Mutex::new(CountingSession::default());
        let client = CountingClient::default();
        let stats = ConcurrentLinkChecker::new(&session, &client, 4).check_all(&links);

        assert_eq!(stats.internal, 120);
        // after check 50 and 100, plus the final refresh
        assert_eq!(session.lock().refreshes, 3);
    }

    #[test]
    fn test_panicking_worker_does_not_hang_the_pool() {
        let mut urls: Vec<String> = (0..50).map(|i| format!("http://host/{i}")).collect();
        urls.push("http://host/panic".to_string());
        let refs: Vec<&str> = urls.iter().map(String::as_str).collect();
        let links = records(&refs);

        let session = Mutex::new(CountingSession::default());
        let client = CountingClient::default();
        let stats = ConcurrentLinkChecker::new(&session, &client, 4).check_all(&links);

        assert_eq!(stats.crashed, 1);
        // the surviving workers drained the rest of the queue
        assert_eq!(links.iter().filter(|l| l.is_checked()).count(), 50);
    }
}
