//! # Storage Module
//!
//! In-memory ledger data structures. Nothing here touches disk.
//!
//! ```text
//! block.rs  — Block and Message, sealing, signature checks, dump rendering
//! chain.rs  — Append-only chain over a per-chain block arena
//! ```

pub mod block;
pub mod chain;

pub use block::{Block, Message, MessageKind};
pub use chain::{Chain, ChainIter};
