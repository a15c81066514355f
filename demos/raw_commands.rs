//! Untyped commands and raw events.
//!
//! Demonstrates:
//! - `send_command` with `serde_json::Value` parameters
//! - Peer-reported errors surfacing as `Error::Protocol`
//! - Per-call timeouts
//! - Raw event handlers
//!
//! Usage:
//!   cargo run --example raw_commands -- ws://127.0.0.1:9222/devtools/page/<id>
//!   cargo run --example raw_commands -- <endpoint> --debug

mod common;

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use anyhow::Context;
use cdp_socket::{Connection, Error, Event};
use common::Args;
use serde_json::json;

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
    println!("=== Raw Commands ===\n");

    let connection = Connection::builder()
        .connect(&args.endpoint)
        .await
        .with_context(|| format!("connecting to {}", args.endpoint))?;

    connection.add_raw_event_handler("HeapProfiler.reportHeapSnapshotProgress", |e: &Event| {
        println!("    progress: {}", e.params);
    });

    // ========================================================================
    // Plain command
    // ========================================================================

    println!("[1] HeapProfiler.enable");
    let result = connection
        .send_command("HeapProfiler.enable", json!({}))
        .await
        .context("HeapProfiler.enable")?;
    println!("    ✓ {result}\n");

    // ========================================================================
    // Command with parameters and a timeout
    // ========================================================================

    println!("[2] HeapProfiler.collectGarbage (5s timeout)");
    match connection
        .send_command_with_timeout("HeapProfiler.collectGarbage", json!({}), Duration::from_secs(5))
        .await
    {
        Ok(_) => println!("    ✓ Collected\n"),
        Err(e) if e.is_timeout() => println!("    ✗ {e}\n"),
        Err(e) => return Err(e.into()),
    }

    // ========================================================================
    // Unknown method
    // ========================================================================

    println!("[3] Nope.nothing");
    match connection.send_command("Nope.nothing", ()).await {
        Err(Error::Protocol { code, message, .. }) => println!("    ✓ Peer said {code}: {message}\n"),
        other => println!("    ? Unexpected: {other:?}\n"),
    }

    connection.send_command("HeapProfiler.disable", ()).await?;
    connection.shutdown();

    println!("=== Done ===");
    Ok(())
}
