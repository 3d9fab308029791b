//! # CLI Interface
//!
//! Defines the command-line argument structure for `partledger-node` using
//! `clap` derive. Two subcommands: `run` and `version`.

use std::str::FromStr;

use clap::{Parser, Subcommand};
use partledger_protocol::config::{
    NodeConfig, EVENT_CHANNEL_CAPACITY, HANDOFF_DELAY, INBOX_CAPACITY,
};
use partledger_protocol::storage::{Message, MessageKind};

use crate::logging::LogFormat;

/// PartLedger demo node.
///
/// Builds the demo aircraft-part network in process, lets every part
/// announce itself, submits any operator messages and prints a ledger.
#[derive(Parser, Debug)]
#[command(
    name = "partledger-node",
    about = "PartLedger demo node",
    version,
    propagate_version = true
)]
pub struct PartLedgerCli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build the demo network, run it and print a ledger.
    Run(RunArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Message to submit after the announcements, as `part:severity:text`.
    ///
    /// The named part authors the block and hands it to the next part in
    /// the ring. Severity is `info`, `error` or `attach`; anything else is
    /// logged as an error. May be repeated.
    #[arg(long = "message", short = 'm', value_name = "PART:SEVERITY:TEXT")]
    pub messages: Vec<MessageSpec>,

    /// How long to let blocks propagate before printing, in milliseconds.
    #[arg(long, env = "PARTLEDGER_SETTLE_MS", default_value_t = 500)]
    pub settle_ms: u64,

    /// Part whose ledger is printed. Defaults to the first part.
    #[arg(long, env = "PARTLEDGER_DUMP")]
    pub dump: Option<String>,

    /// Print the ledger as JSON instead of block dumps.
    #[arg(long)]
    pub json: bool,

    /// Capacity of every node's inbound queue.
    #[arg(long, env = "PARTLEDGER_INBOX_CAPACITY", default_value_t = INBOX_CAPACITY)]
    pub inbox_capacity: usize,

    /// Pause after each hand-off, in milliseconds.
    #[arg(
        long,
        env = "PARTLEDGER_HANDOFF_DELAY_MS",
        default_value_t = HANDOFF_DELAY.as_millis() as u64
    )]
    pub handoff_delay_ms: u64,

    /// Log output format.
    #[arg(
        long,
        env = "PARTLEDGER_LOG_FORMAT",
        value_enum,
        default_value_t = LogFormat::Pretty
    )]
    pub log_format: LogFormat,

    /// Default log filter when `RUST_LOG` is unset.
    #[arg(
        long,
        env = "PARTLEDGER_LOG",
        default_value = "partledger_node=info,partledger_protocol=info"
    )]
    pub log_level: String,
}

impl RunArgs {
    pub fn node_config(&self) -> NodeConfig {
        NodeConfig {
            inbox_capacity: self.inbox_capacity,
            handoff_delay_ms: self.handoff_delay_ms,
            event_capacity: EVENT_CHANNEL_CAPACITY,
        }
    }
}

/// An operator message from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageSpec {
    pub part: String,
    pub message: Message,
}

impl FromStr for MessageSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut fields = s.splitn(3, ':');
        let (Some(part), Some(severity), Some(text)) = (fields.next(), fields.next(), fields.next())
        else {
            return Err(format!("expected PART:SEVERITY:TEXT, got {s:?}"));
        };

        let part = part.trim();
        if part.is_empty() {
            return Err("part name is empty".to_string());
        }

        Ok(Self {
            part: part.to_string(),
            message: Message::new(MessageKind::from_str_lossy(severity), text),
        })
    }
}
