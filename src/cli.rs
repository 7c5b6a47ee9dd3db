// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// The engine itself is driven by a flat attribute map (startPath,
// nrHttpThreads, ...) so a scheduler can pass its job attributes straight
// through. The CLI's job is to turn flags into that same map.
// =============================================================================

use std::collections::HashMap;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use link_guardian::config::{
    CONNECTION_TIMEOUT, HTTP_CLIENT_CLASS, NR_HTTP_THREADS, SOCKET_TIMEOUT, START_PATH, URL_EXCLUDES,
};

#[derive(Parser, Debug)]
#[command(
    name = "link-guardian",
    version,
    about = "Scan a content repository for broken links",
    long_about = "link-guardian extracts links from every rich-text field under a start path, \
                  checks each unique link once on a pool of worker threads, and keeps a \
                  per-document report of broken links with the date each was first seen broken."
)]
pub struct Cli {
    /// Enable debug-level logging (RUST_LOG overrides this)
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one link scan and update the report file
    ///
    /// Example: link-guardian scan --repository repo.json --reports reports.json --start-path /content
    Scan(ScanArgs),

    /// Print the broken links recorded in a report file
    Report {
        /// Report file written by a previous scan
        #[arg(long)]
        reports: PathBuf,

        /// Output results in JSON format instead of a table
        #[arg(long)]
        json: bool,
    },
}

#[derive(clap::Args, Debug)]
pub struct ScanArgs {
    /// JSON snapshot of the content repository
    #[arg(long)]
    pub repository: PathBuf,

    /// Report file to read previous results from and write new ones to
    #[arg(long)]
    pub reports: PathBuf,

    /// Only fields at or below this repository path are scanned
    #[arg(long, default_value = "/content")]
    pub start_path: String,

    /// Number of worker threads
    #[arg(long)]
    pub threads: Option<u32>,

    /// Read timeout per request, in milliseconds
    #[arg(long)]
    pub socket_timeout: Option<u64>,

    /// Connect timeout per request, in milliseconds
    #[arg(long)]
    pub connection_timeout: Option<u64>,

    /// Glob of URLs to skip (repeatable), e.g. --exclude '*.pdf'
    #[arg(long = "exclude")]
    pub excludes: Vec<String>,

    /// Name of the HTTP client to use
    #[arg(long)]
    pub http_client: Option<String>,

    /// Output results in JSON format instead of a table
    #[arg(long)]
    pub json: bool,
}

impl ScanArgs {
    // Builds the attribute map the engine expects.
    pub fn attributes(&self) -> HashMap<String, String> {
        let mut attributes = HashMap::new();
        attributes.insert(START_PATH.to_string(), self.start_path.clone());

        if let Some(threads) = self.threads {
            attributes.insert(NR_HTTP_THREADS.to_string(), threads.to_string());
        }
        if let Some(ms) = self.socket_timeout {
            attributes.insert(SOCKET_TIMEOUT.to_string(), ms.to_string());
        }
        if let Some(ms) = self.connection_timeout {
            attributes.insert(CONNECTION_TIMEOUT.to_string(), ms.to_string());
        }
        if !self.excludes.is_empty() {
            attributes.insert(URL_EXCLUDES.to_string(), self.excludes.join("\n"));
        }
        if let Some(client) = &self.http_client {
            attributes.insert(HTTP_CLIENT_CLASS.to_string(), client.clone());
        }
        attributes
    }
}
