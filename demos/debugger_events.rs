//! Typed commands and events against a live page.
//!
//! Demonstrates:
//! - Describing protocol commands with `Method` and events with `EventKind`
//! - Commands with no output returning `Empty`
//! - Several handlers subscribed to the same event
//!
//! Usage:
//!   cargo run --example debugger_events -- ws://127.0.0.1:9222/devtools/page/<id>
//!   cargo run --example debugger_events -- <endpoint> --debug
//!   cargo run --example debugger_events -- <endpoint> --no-wait

mod common;

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::Context;
use cdp_socket::{Connection, Empty, EventKind, Method};
use common::Args;
use serde::{Deserialize, Serialize};

// ============================================================================
// Debugger Domain
// ============================================================================

/// `Debugger.enable`
#[derive(Debug, Serialize)]
struct Enable;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnableReturns {
    #[serde(default)]
    debugger_id: Option<String>,
}

impl Method for Enable {
    const NAME: &'static str = "Debugger.enable";
    type Returns = EnableReturns;
}

/// `Debugger.setSkipAllPauses`
#[derive(Debug, Serialize)]
struct SetSkipAllPauses {
    skip: bool,
}

impl Method for SetSkipAllPauses {
    const NAME: &'static str = "Debugger.setSkipAllPauses";
    type Returns = Empty;
}

/// `Debugger.getScriptSource`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GetScriptSource {
    script_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetScriptSourceReturns {
    script_source: String,
}

impl Method for GetScriptSource {
    const NAME: &'static str = "Debugger.getScriptSource";
    type Returns = GetScriptSourceReturns;
}

/// `Debugger.scriptParsed`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScriptParsed {
    script_id: String,
    url: String,
    end_line: u32,
}

impl EventKind for ScriptParsed {
    const NAME: &'static str = "Debugger.scriptParsed";
}

/// `Debugger.paused`
#[derive(Debug, Deserialize)]
struct Paused {
    reason: String,
}

impl EventKind for Paused {
    const NAME: &'static str = "Debugger.paused";
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args = Args::parse();
    common::init_logging(args.debug);

    if let Err(e) = run(args).await {
        eprintln!("\n[ERROR] {e:#}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    println!("=== Debugger Events ===\n");

    // ========================================================================
    // Connect
    // ========================================================================

    println!("[1] Connecting to {}...", args.endpoint);
    let connection = Connection::builder()
        .command_timeout(Duration::from_secs(10))
        .connect(&args.endpoint)
        .await
        .with_context(|| format!("connecting to {}", args.endpoint))?;
    println!("    ✓ Connected\n");

    // ========================================================================
    // Subscribe
    // ========================================================================

    println!("[2] Subscribing to Debugger events...");
    let parsed = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&parsed);
    connection.on(move |_: ScriptParsed| {
        counter.fetch_add(1, Ordering::Relaxed);
    });
    connection.on(|e: ScriptParsed| {
        if !e.url.is_empty() {
            println!("    script {} {} ({} lines)", e.script_id, e.url, e.end_line + 1);
        }
    });
    connection.on(|e: Paused| println!("    paused: {}", e.reason));
    println!("    ✓ 3 handlers registered\n");

    // ========================================================================
    // Enable
    // ========================================================================

    println!("[3] Enabling debugger...");
    let enabled = connection
        .execute(Enable)
        .await
        .context("Debugger.enable")?;
    if let Some(id) = enabled.debugger_id {
        println!("    ✓ Debugger id: {id}");
    }
    connection
        .execute(SetSkipAllPauses { skip: true })
        .await?;
    println!("    ✓ Pauses skipped\n");

    // ========================================================================
    // Script Source
    // ========================================================================

    tokio::time::sleep(Duration::from_millis(500)).await;
    println!(
        "[4] {} scripts parsed so far",
        parsed.load(Ordering::Relaxed)
    );

    match connection
        .execute(GetScriptSource {
            script_id: "1".to_string(),
        })
        .await
    {
        Ok(source) => println!("    ✓ Script 1: {} bytes\n", source.script_source.len()),
        Err(e) if e.is_protocol_error() => println!("    ✗ Script 1 unavailable: {e}\n"),
        Err(e) => return Err(e.into()),
    }

    common::wait_for_exit(args.no_wait).await;
    connection.shutdown();

    println!("\n=== Done ===");
    Ok(())
}
