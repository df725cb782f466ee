//! Relay Bot Demo
//!
//! Connects to the tracker stream and prints every notice as the chat
//! channel would see it. Reads operator commands from stdin:
//!
//! ```text
//! reconnect   drop the connection and connect again at once
//! status      show phase, attempts and the next retry delay
//! recent      dump recently received frames
//! cases       list the open cases on the board
//! quit        shut down
//! ```
//!
//! # Usage
//!
//! ```bash
//! RATRELAY_SOCKET__BEARER=... cargo run --package relay-bot -- --config ratrelay.toml
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use ratrelay::prelude::*;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

#[derive(Debug, Parser)]
#[command(version, about = "Relay tracker stream events to the console")]
struct Args {
    /// Configuration file; searched for in the usual places if omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Configuration profile (development, production, ...).
    #[arg(short, long)]
    profile: Option<String>,
}

fn print_status(runtime: &RelayRuntime) {
    match runtime.status() {
        Some(status) => println!(
            "phase={} live={} attempts={} next_delay={:?} connection={}",
            status.phase,
            status.live,
            status.attempts,
            status.current_delay,
            status.connection_id.as_deref().unwrap_or("-"),
        ),
        None => println!("not running"),
    }
}

fn print_recent(runtime: &RelayRuntime) {
    let recent = runtime.recent_messages();
    if recent.is_empty() {
        println!("no frames received yet");
    }
    for entry in recent {
        println!("{}", entry.text);
    }
}

fn print_cases(runtime: &RelayRuntime) {
    let cases = runtime.board().snapshot();
    if cases.is_empty() {
        println!("no open cases");
    }
    for case in cases {
        println!(
            "{} {} ({})",
            case.id.as_deref().unwrap_or("?"),
            case.client,
            case.system.as_deref().unwrap_or("unknown system"),
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut builder = RelayRuntime::builder();
    if let Some(path) = &args.config {
        builder = builder.config_file(path);
    }
    if let Some(profile) = &args.profile {
        builder = builder.profile(profile);
    }
    let runtime = builder.build().context("failed to build relay runtime")?;

    let (sink, mut notices) = ChannelSink::new();
    let printer = tokio::spawn(async move {
        while let Some(notice) = notices.recv().await {
            println!("{notice}");
        }
    });

    runtime.start(Arc::new(sink)).await?;
    info!("Relay started, type 'quit' to stop");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match line.trim() {
                    "" => {}
                    "reconnect" => {
                        runtime.reconnect();
                    }
                    "status" => print_status(&runtime),
                    "recent" => print_recent(&runtime),
                    "cases" => print_cases(&runtime),
                    "quit" | "exit" => break,
                    other => println!("unknown command: {other}"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C");
                break;
            }
        }
    }

    runtime.shutdown().await;
    printer.abort();
    Ok(())
}
