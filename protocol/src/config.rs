//! # Protocol Configuration & Constants
//!
//! Every tunable number in PartLedger lives here. Node runtimes take a
//! [`NodeConfig`] built from these defaults; the demo binary overrides the
//! fields from its command line.

use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Protocol Version
// ---------------------------------------------------------------------------

/// The full protocol version string.
pub const PROTOCOL_VERSION: &str = "0.1.0";

// ---------------------------------------------------------------------------
// Chain Parameters
// ---------------------------------------------------------------------------

/// Predecessor signature carried by the first block of every chain.
/// A single zero byte, never a valid SHA-256 output.
pub const GENESIS_PREVIOUS_SIGNATURE: [u8; 1] = [0x00];

/// Output length of the block signature digest (SHA-256).
pub const SIGNATURE_LENGTH: usize = 32;

/// Size of a part fingerprint in bits.
pub const FINGERPRINT_BITS: u32 = 128;

// ---------------------------------------------------------------------------
// Node Parameters
// ---------------------------------------------------------------------------

/// Capacity of every node's inbound block queue. Producers wait when full.
pub const INBOX_CAPACITY: usize = 16;

/// Pause after handing a freshly authored block to a peer, giving the
/// receiving validation loop a chance to run.
pub const HANDOFF_DELAY: Duration = Duration::from_millis(10);

/// Exclusive upper bound of the random node priority.
pub const MAX_PRIORITY: u8 = 128;

/// Capacity of the per-node event broadcast channel. Slow subscribers
/// lag and skip events rather than stalling the validation loop.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

// ---------------------------------------------------------------------------
// Node Configuration
// ---------------------------------------------------------------------------

/// Runtime knobs for a single node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Bounded capacity of the inbound block queue.
    pub inbox_capacity: usize,
    /// Delay after each `transmit`, in milliseconds.
    pub handoff_delay_ms: u64,
    /// Capacity of the node event channel.
    pub event_capacity: usize,
}

impl NodeConfig {
    /// Hand-off delay as a `Duration`.
    pub fn handoff_delay(&self) -> Duration {
        Duration::from_millis(self.handoff_delay_ms)
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            inbox_capacity: INBOX_CAPACITY,
            handoff_delay_ms: HANDOFF_DELAY.as_millis() as u64,
            event_capacity: EVENT_CHANNEL_CAPACITY,
        }
    }
}
