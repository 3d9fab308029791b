//! # Network Module
//!
//! Everything that moves blocks between nodes. There is no real transport:
//! nodes live in one process and talk over bounded tokio channels.
//!
//! ## Architecture
//!
//! ```text
//! fabric.rs      — Registry of every node's inbox, used for fan-out
//! node.rs        — Node lifecycle, transmit, events and read access
//! validation.rs  — Acceptance rule and the per-node validation loop
//! ```
//!
//! ## Design Decisions
//!
//! - Each chain is private to its node and guarded by a `parking_lot::RwLock`.
//!   Guards never live across an `.await`; blocks are cloned out before any
//!   send.
//! - Inboxes are bounded. Senders wait for capacity instead of dropping, so
//!   back-pressure can propagate from one slow node to its senders.
//! - Rejections are not errors. They are logged at `debug` and published as
//!   [`NodeEvent::Rejected`].

pub mod fabric;
pub mod node;
pub mod validation;

pub use fabric::{BroadcastFabric, FabricError, Inbox};
pub use node::{Node, NodeError, NodeEvent, NodeStats, NodeStatsSnapshot, NodeStatus};
pub use validation::{check_candidate, RejectReason, ValidationLoop};
