// src/checker/http.rs
// =============================================================================
// This module checks if external URLs are alive by making HTTP requests.
//
// Key functionality:
// - Makes HTTP HEAD requests (lightweight, no body download)
// - Retries once with GET when the server answers 405 Method Not Allowed
// - Decides broken/ok from the final status code
// - Hides the actual HTTP library behind a small trait so the transport can
//   be chosen by configuration (and faked in tests)
//
// Status policy:
//   301 Moved Permanently      -> broken (the link should be updated)
//   400 and above              -> broken
//   anything else              -> ok
//   transport failure          -> broken with EXCEPTION_CODE and the failure
//                                 category ("Timeout", "Connect", ...) as message
// =============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use reqwest::blocking::Client;
use reqwest::redirect::Policy;
use tracing::{debug, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::link::{LinkRecord, EXCEPTION_CODE};

/// Name of the built-in transport in the registry.
pub const DEFAULT_CLIENT: &str = "reqwest";

const METHOD_NOT_ALLOWED: u16 = 405;
const MOVED_PERMANENTLY: u16 = 301;

/// Why a request never produced a status code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError {
    /// Short category name, recorded as the link's result message.
    pub kind: String,
    /// Full description, only logged.
    pub detail: String,
}

impl TransportError {
    pub fn new(kind: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            detail: detail.into(),
        }
    }
}

/// Timeouts handed to every transport constructor.
#[derive(Debug, Clone, Copy)]
pub struct HttpSettings {
    pub socket_timeout: Duration,
    pub connection_timeout: Duration,
}

/// The capability the checker needs from an HTTP library.
///
/// Implementations must be usable from many worker threads at once.
pub trait HttpClient: Send + Sync {
    /// Sends a HEAD request and returns the status code.
    fn head(&self, url: &str) -> std::result::Result<u16, TransportError>;

    /// Sends a GET request and returns the status code (the body is discarded).
    fn get(&self, url: &str) -> std::result::Result<u16, TransportError>;

    /// Releases pooled connections. Called once, after all workers have joined.
    fn shutdown(self: Box<Self>);
}

/// Builds a transport from the scan's timeouts.
pub type ClientFactory = Arc<dyn Fn(&HttpSettings) -> Result<Box<dyn HttpClient>> + Send + Sync>;

// Maps transport names (the `httpClientClass` attribute) to constructors.
//
// The default registry only knows DEFAULT_CLIENT. Embedders register their
// own transports before starting a scan.
#[derive(Clone)]
pub struct HttpClientRegistry {
    factories: BTreeMap<String, ClientFactory>,
}

impl Default for HttpClientRegistry {
    fn default() -> Self {
        let mut registry = Self {
            factories: BTreeMap::new(),
        };
        registry.register(DEFAULT_CLIENT, ReqwestClient::boxed);
        registry
    }
}

impl HttpClientRegistry {
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&HttpSettings) -> Result<Box<dyn HttpClient>> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
    }

    // Creates the transport named in the configuration.
    //
    // Falls back to the default transport (with a warning) when the name is
    // unknown or its constructor fails. Only fails if the default itself can't
    // be built.
    pub fn create(&self, name: Option<&str>, settings: &HttpSettings) -> Result<Box<dyn HttpClient>> {
        if let Some(name) = name {
            match self.factories.get(name) {
                Some(factory) => match factory(settings) {
                    Ok(client) => {
                        debug!(client = name, "using configured http client");
                        return Ok(client);
                    }
                    Err(e) => warn!(client = name, error = %e, "http client failed to start, using default"),
                },
                None => warn!(client = name, "unknown http client, using default"),
            }
        }

        match self.factories.get(DEFAULT_CLIENT) {
            Some(factory) => factory(settings),
            None => ReqwestClient::boxed(settings),
        }
    }
}

/// The default transport: a pooled, blocking reqwest client.
pub struct ReqwestClient {
    client: Client,
}

impl ReqwestClient {
    pub fn new(settings: &HttpSettings) -> Result<Self> {
        // Redirects are not followed: a 301 must be visible to the status policy.
        let client = Client::builder()
            .connect_timeout(settings.connection_timeout)
            .timeout(settings.socket_timeout)
            .redirect(Policy::none())
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;
        Ok(Self { client })
    }

    fn boxed(settings: &HttpSettings) -> Result<Box<dyn HttpClient>> {
        Ok(Box::new(Self::new(settings)?))
    }
}

impl HttpClient for ReqwestClient {
    fn head(&self, url: &str) -> std::result::Result<u16, TransportError> {
        let parsed = parse_url(url)?;
        self.client
            .head(parsed)
            .send()
            .map(|response| response.status().as_u16())
            .map_err(categorize_error)
    }

    fn get(&self, url: &str) -> std::result::Result<u16, TransportError> {
        let parsed = parse_url(url)?;
        self.client
            .get(parsed)
            .send()
            .map(|response| response.status().as_u16())
            .map_err(categorize_error)
    }

    fn shutdown(self: Box<Self>) {
        // Dropping the blocking client tears down its runtime thread and pool.
        drop(self);
    }
}

fn parse_url(url: &str) -> std::result::Result<Url, TransportError> {
    Url::parse(url).map_err(|e| TransportError::new("InvalidUrl", e.to_string()))
}

// Categorizes different error types from reqwest
//
// reqwest errors can happen for many reasons:
// - Network timeout
// - Connection refused / DNS resolution failure
// - Redirect loop (not expected here since redirects are off)
// - Malformed request
fn categorize_error(error: reqwest::Error) -> TransportError {
    let kind = if error.is_timeout() {
        "Timeout"
    } else if error.is_connect() {
        "Connect"
    } else if error.is_redirect() {
        "Redirect"
    } else if error.is_builder() {
        "InvalidUrl"
    } else if error.is_body() || error.is_decode() {
        "Body"
    } else {
        "Request"
    };
    TransportError::new(kind, error.to_string())
}

/// Outcome of probing an external URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Ok(u16),
    Broken(u16),
    Failed(TransportError),
}

// Probes a URL: HEAD first, GET only if HEAD was answered with 405.
pub fn probe(client: &dyn HttpClient, url: &str) -> ProbeOutcome {
    let status = match client.head(url) {
        Ok(METHOD_NOT_ALLOWED) => client.get(url),
        other => other,
    };

    match status {
        Ok(code) if is_broken_status(code) => ProbeOutcome::Broken(code),
        Ok(code) => ProbeOutcome::Ok(code),
        Err(e) => ProbeOutcome::Failed(e),
    }
}

pub fn is_broken_status(code: u16) -> bool {
    code == MOVED_PERMANENTLY || code >= 400
}

// Checks one external link and writes the outcome onto the shared record.
pub fn check_external(client: &dyn HttpClient, record: &LinkRecord) {
    let now = Utc::now();
    match probe(client, record.url()) {
        ProbeOutcome::Ok(code) => {
            debug!(url = record.url(), code, "link ok");
            record.mark_ok(now);
        }
        ProbeOutcome::Broken(code) => {
            debug!(url = record.url(), code, "link broken");
            record.mark_broken(i32::from(code), None, now);
        }
        ProbeOutcome::Failed(e) => {
            debug!(url = record.url(), kind = %e.kind, detail = %e.detail, "link check failed");
            record.mark_broken(EXCEPTION_CODE, Some(e.kind), now);
        }
    }
}
