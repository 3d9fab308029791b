// Copyright (c) 2026 PartLedger Contributors. MIT License.
// See LICENSE for details.

//! # PartLedger Protocol — Core Library
//!
//! A small permissioned ledger for hardware parts. Every part runs a node
//! with its own copy of the chain; nodes hand freshly written blocks to each
//! other, validate what they receive against their own head and pass
//! accepted blocks on to everyone else.
//!
//! There is no consensus protocol. Nodes converge as long as hand-offs do
//! not race, and divergence is a known limitation.
//!
//! ## Architecture
//!
//! - **crypto** — SHA-256 helpers and block signatures.
//! - **identity** — Parts and their 128-bit fingerprints.
//! - **storage** — Blocks and the in-memory append-only chain.
//! - **network** — Nodes, the broadcast fabric and validation loops.
//! - **config** — Protocol constants and node configuration.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use partledger_protocol::config::NodeConfig;
//! use partledger_protocol::network::{BroadcastFabric, Node};
//! use partledger_protocol::storage::Message;
//!
//! # async fn demo() -> Result<(), partledger_protocol::network::NodeError> {
//! let fabric = Arc::new(BroadcastFabric::new());
//! let rudder = Node::create("Rudder", "Sckzor Industries", "LBMR-HLXA-GQH5-6TQ7", "TY850",
//!     Arc::clone(&fabric), NodeConfig::default())?;
//! let wing = Node::create("Wing", "Sckzor Industries", "YYG4-3F7B-TNXW-ALQE", "CX410",
//!     Arc::clone(&fabric), NodeConfig::default())?;
//! rudder.start_validation()?;
//! wing.start_validation()?;
//!
//! rudder.transmit(&wing, Message::attach("The Rudder has joined the blockchain")).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod crypto;
pub mod identity;
pub mod network;
pub mod storage;
