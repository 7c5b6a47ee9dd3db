// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Set up logging (tracing)
// 3. Dispatch to the appropriate subcommand handler
// 4. Print the broken-link report
// 5. Exit with proper code (0 = no broken links, 1 = broken links, 2 = error)
// =============================================================================

mod cli;

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cli::{Cli, Commands, ScanArgs};
use link_guardian::report::{JsonReportStore, ReportEntry};
use link_guardian::repository::MemoryRepository;
use link_guardian::Scanner;

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Run our application logic and capture the exit code
    let exit_code = match run(cli) {
        Ok(code) => code,
        Err(e) => {
            // If an unexpected error occurred, log it and exit with code 2
            tracing::error!("{e:#}");
            2
        }
    };

    std::process::exit(exit_code);
}

// Logs go to stderr so the table or JSON on stdout stays clean.
// RUST_LOG wins; otherwise info, or debug with --verbose.
fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if verbose { "debug" } else { "info" };
        EnvFilter::new(format!("{level},hyper=warn,reqwest=warn,rustls=warn"))
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

// Returns:
//   Ok(0) = no broken links
//   Ok(1) = broken links found
//   Err = unexpected error
fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Commands::Scan(args) => handle_scan(&args),
        Commands::Report { reports, json } => {
            let store = open_reports(&reports)?;
            print_results(store.reports(), json)?;
            Ok(exit_code(store.reports()))
        }
    }
}

// Handles the 'scan' subcommand
fn handle_scan(args: &ScanArgs) -> Result<i32> {
    let repository = MemoryRepository::load(&args.repository)
        .with_context(|| format!("failed to load repository {}", args.repository.display()))?;
    let mut store = open_reports(&args.reports)?;

    let scanner = Scanner::new(repository);
    scanner.scan(&args.attributes(), &mut store);

    store
        .save()
        .with_context(|| format!("failed to save reports to {}", args.reports.display()))?;

    print_results(store.reports(), args.json)?;
    Ok(exit_code(store.reports()))
}

fn open_reports(path: &Path) -> Result<JsonReportStore> {
    JsonReportStore::open(path).with_context(|| format!("failed to open reports {}", path.display()))
}

fn exit_code(reports: &BTreeMap<String, Vec<ReportEntry>>) -> i32 {
    if reports.is_empty() {
        0
    } else {
        1
    }
}

// Prints the reports either as a table or JSON
fn print_results(reports: &BTreeMap<String, Vec<ReportEntry>>, json: bool) -> Result<()> {
    if json {
        let json_output = serde_json::to_string_pretty(reports)?;
        println!("{json_output}");
    } else {
        print_table(reports);
    }
    Ok(())
}

// Prints reports as a human-readable table in the terminal
fn print_table(reports: &BTreeMap<String, Vec<ReportEntry>>) {
    if reports.is_empty() {
        println!("✅ No broken links");
        return;
    }

    for (document, entries) in reports {
        println!("📄 {document}");
        println!("   {:<60} {:<8} {:<22} {:<20}", "URL", "CODE", "BROKEN SINCE", "MESSAGE");
        println!("   {}", "=".repeat(112));

        for entry in entries {
            // Truncate URL if too long for display
            let url_display = if entry.url.chars().count() > 57 {
                format!("{}...", entry.url.chars().take(57).collect::<String>())
            } else {
                entry.url.clone()
            };
            let since = entry.broken_since.format("%Y-%m-%d %H:%M").to_string();
            let message = entry.message.as_deref().unwrap_or("");

            println!("   {url_display:<60} {:<8} {since:<22} {message:<20}", entry.code);
        }
        println!();
    }

    // Print summary
    let broken: usize = reports.values().map(Vec::len).sum();
    println!("📊 Summary:");
    println!("   ❌ Broken: {broken}");
    println!("   📋 Documents affected: {}", reports.len());
}
