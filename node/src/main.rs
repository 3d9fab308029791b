// Copyright (c) 2026 PartLedger Contributors. MIT License.
// See LICENSE for details.

//! # PartLedger Demo Node
//!
//! Entry point for the `partledger-node` binary. Parses CLI arguments,
//! initializes logging, builds the demo aircraft-part network and prints
//! one part's ledger.
//!
//! - `run`     — build the network, announce every part, submit messages,
//!   print a ledger
//! - `version` — print build version information

mod cli;
mod logging;
mod topology;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tokio::signal;
use tracing::{info, warn};

use partledger_protocol::identity::Part;
use partledger_protocol::network::{BroadcastFabric, Node, NodeStatsSnapshot, NodeStatus};
use partledger_protocol::storage::{Block, Message};

use cli::{Commands, PartLedgerCli, RunArgs};

/// How long each validation loop gets to wind down after shutdown.
const STOP_GRACE: Duration = Duration::from_secs(1);

#[tokio::main]
async fn main() -> Result<()> {
    let cli = PartLedgerCli::parse();

    match cli.command {
        Commands::Run(args) => run_demo(args).await,
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// JSON shape of a printed ledger.
#[derive(Serialize)]
struct LedgerReport<'a> {
    part: &'a Part,
    priority: u8,
    status: NodeStatus,
    stats: NodeStatsSnapshot,
    blocks: Vec<Block>,
}

async fn run_demo(args: RunArgs) -> Result<()> {
    logging::init_logging(&args.log_level, args.log_format);

    let config = args.node_config();
    info!(
        parts = topology::DEMO_PARTS.len(),
        inbox_capacity = config.inbox_capacity,
        handoff_delay_ms = config.handoff_delay_ms,
        "starting partledger-node"
    );

    // --- Topology ---
    let fabric = Arc::new(BroadcastFabric::new());
    let nodes = topology::build(&fabric, &config)?;

    // Resolve every part name before any traffic flows.
    let dump_index = match &args.dump {
        Some(name) => topology::find(&nodes, name)
            .map(|(i, _)| i)
            .with_context(|| format!("unknown part {name:?}"))?,
        None => 0,
    };
    let submissions = args
        .messages
        .iter()
        .map(|spec| {
            topology::find(&nodes, &spec.part)
                .map(|(i, _)| (i, spec.message.clone()))
                .with_context(|| format!("unknown part {:?}", spec.part))
        })
        .collect::<Result<Vec<_>>>()?;

    // --- Validation loops ---
    let mut loops = Vec::with_capacity(nodes.len());
    for node in &nodes {
        let handle = node
            .start_validation()
            .with_context(|| format!("failed to start validation for {}", node.name()))?;
        loops.push(handle);
    }

    // --- Announcements ---
    for (i, node) in nodes.iter().enumerate() {
        let message = Message::attach(format!("The {} has joined the blockchain", node.name()));
        submit(&nodes, i, message).await?;
    }

    // --- Operator messages ---
    for (i, message) in submissions {
        submit(&nodes, i, message).await?;
    }

    tokio::select! {
        _ = tokio::time::sleep(Duration::from_millis(args.settle_ms)) => {}
        _ = shutdown_signal() => {
            info!("interrupt received, printing ledger early");
        }
    }

    print_ledger(&nodes[dump_index], args.json)?;

    // --- Shutdown ---
    for node in &nodes {
        node.shutdown();
    }
    for (node, handle) in nodes.iter().zip(loops) {
        match tokio::time::timeout(STOP_GRACE, handle).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(node = %node.name(), error = %e, "validation task failed"),
            Err(_) => warn!(node = %node.name(), "validation loop did not stop in time"),
        }
        let stats = node.stats();
        info!(
            node = %node.name(),
            blocks = node.len(),
            authored = stats.authored,
            accepted = stats.accepted,
            rejected = stats.rejected,
            forwarded = stats.forwarded,
            "node summary"
        );
    }

    info!("partledger-node stopped");
    Ok(())
}

/// Has node `origin` author `message` and hand it to the next part in the
/// ring.
async fn submit(nodes: &[Node], origin: usize, message: Message) -> Result<()> {
    let node = &nodes[origin];
    let peer = &nodes[topology::ring_peer(origin, nodes.len())];
    let block = node
        .transmit(peer, message)
        .await
        .with_context(|| format!("{} could not hand off to {}", node.name(), peer.name()))?;

    info!(
        from = %node.name(),
        to = %peer.name(),
        index = block.index,
        kind = %block.message.kind,
        "block submitted"
    );
    Ok(())
}

fn print_ledger(node: &Node, json: bool) -> Result<()> {
    if json {
        let report = LedgerReport {
            part: node.part(),
            priority: node.priority(),
            status: node.status(),
            stats: node.stats(),
            blocks: node.dump(),
        };
        let rendered =
            serde_json::to_string_pretty(&report).context("failed to serialize ledger")?;
        println!("{rendered}");
    } else {
        println!("============ Ledger of {} ============", node.name());
        print!("{}", node.render_ledger());
    }
    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("partledger-node {}", env!("CARGO_PKG_VERSION"));
    println!(
        "protocol        {}",
        partledger_protocol::config::PROTOCOL_VERSION
    );
}

/// Resolves on Ctrl+C. If the handler cannot be installed, never resolves.
async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        warn!(error = %e, "failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
}
