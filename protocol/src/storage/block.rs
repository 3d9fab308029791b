//! # Block Structure
//!
//! A block is one signed log entry written by a part. It starts life
//! unsealed (author and message only) and is sealed exactly once, when it is
//! appended to a chain.
//!
//! ## Block Layout
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  Preamble                                   │
//! │  ├── author: Fingerprint                    │
//! │  ├── timestamp: i64     (ns since epoch)    │
//! │  ├── index: u64         (0 = first block)   │
//! │  └── previous_signature (0x00 for index 0)  │
//! ├─────────────────────────────────────────────┤
//! │  Payload                                    │
//! │  └── message: Message { kind, text }        │
//! ├─────────────────────────────────────────────┤
//! │  Appendix                                   │
//! │  └── signature: SHA-256 over the preamble   │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! The payload is not covered by the signature.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::crypto::signatures::{sign_block, Signature};
use crate::identity::Fingerprint;

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// Severity of a logged message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    /// Routine status report.
    Info,
    /// Fault report.
    Error,
    /// A part joining the ledger.
    Attach,
}

impl MessageKind {
    /// Parses an operator-supplied severity ("info", "error", "attach").
    /// Case-insensitive; anything unrecognized is treated as `Error`.
    pub fn from_str_lossy(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "info" => MessageKind::Info,
            "attach" => MessageKind::Attach,
            _ => MessageKind::Error,
        }
    }

    /// Numeric code used in block dumps.
    pub fn code(&self) -> u8 {
        match self {
            MessageKind::Info => 0,
            MessageKind::Error => 1,
            MessageKind::Attach => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Info => "info",
            MessageKind::Error => "error",
            MessageKind::Attach => "attach",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The payload of a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub kind: MessageKind,
    pub text: String,
}

impl Message {
    pub fn new(kind: MessageKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self::new(MessageKind::Info, text)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(MessageKind::Error, text)
    }

    pub fn attach(text: impl Into<String>) -> Self {
        Self::new(MessageKind::Attach, text)
    }
}

// ---------------------------------------------------------------------------
// Block
// ---------------------------------------------------------------------------

/// A ledger entry.
///
/// `timestamp`, `previous_signature` and `signature` are `None` until the
/// block is sealed by [`Block::finalize`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Fingerprint of the authoring part.
    pub author: Fingerprint,
    /// Wall-clock time of the first append, in nanoseconds since the epoch.
    pub timestamp: Option<i64>,
    /// Position in the chain. 0 for the first block.
    pub index: u64,
    /// Signature of the predecessor, or the one-byte sentinel for index 0.
    pub previous_signature: Option<Signature>,
    pub message: Message,
    /// Digest of (author, timestamp, index, previous_signature).
    pub signature: Option<Signature>,
}

impl Block {
    /// Creates an unsealed block.
    pub fn new(author: Fingerprint, message: Message) -> Self {
        Self {
            author,
            timestamp: None,
            index: 0,
            previous_signature: None,
            message,
            signature: None,
        }
    }

    /// Seals the block on top of `predecessor` (or as a first block when
    /// `None`).
    ///
    /// The timestamp is only set if it is still unset, so sealing a block
    /// that already carries the right index and previous signature again
    /// reproduces the same signature.
    pub fn finalize(&mut self, predecessor: Option<&Block>) {
        let timestamp = *self.timestamp.get_or_insert_with(now_nanos);

        let (index, previous) = match predecessor {
            None => (0, Signature::genesis()),
            Some(parent) => (
                parent.index + 1,
                parent.signature.clone().unwrap_or_default(),
            ),
        };

        self.signature = Some(sign_block(
            self.author.as_u128(),
            timestamp,
            index,
            &previous,
        ));
        self.index = index;
        self.previous_signature = Some(previous);
    }

    /// Whether this block is a well-formed chain start: index 0 with the
    /// sentinel previous signature.
    pub fn is_genesis(&self) -> bool {
        self.index == 0
            && self
                .previous_signature
                .as_ref()
                .is_some_and(Signature::is_genesis)
    }

    /// Recomputes the signature from the stored preamble.
    ///
    /// Returns `None` for unsealed blocks.
    pub fn compute_signature(&self) -> Option<Signature> {
        let timestamp = self.timestamp?;
        let previous = self.previous_signature.as_ref()?;
        Some(sign_block(
            self.author.as_u128(),
            timestamp,
            self.index,
            previous,
        ))
    }

    /// Whether the stored signature matches the preamble.
    pub fn verify_signature(&self) -> bool {
        match (&self.signature, self.compute_signature()) {
            (Some(stored), Some(computed)) => *stored == computed,
            _ => false,
        }
    }

    /// Signature as hex, or an empty string for unsealed blocks.
    pub fn signature_hex(&self) -> String {
        self.signature
            .as_ref()
            .map(Signature::to_hex)
            .unwrap_or_default()
    }
}

/// Renders the block in the multi-line "Block Dump" layout.
impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "============== Block Dump ==============")?;
        writeln!(f, " Preamble")?;
        writeln!(f, "   - Author: {}", self.author)?;
        writeln!(f, "   - Timestamp: {}", self.timestamp.unwrap_or_default())?;
        writeln!(f, "   - Index: {}", self.index)?;
        match &self.previous_signature {
            Some(sig) => writeln!(f, "   - Previous Block's Signature: {}", sig)?,
            None => writeln!(f, "   - Previous Block's Signature: (unsealed)")?,
        }
        writeln!(f, " Payload")?;
        writeln!(
            f,
            "   - Message Payload Type: {} ({})",
            self.message.kind.code(),
            self.message.kind
        )?;
        writeln!(f, "   - Message Payload String: {}", self.message.text)?;
        writeln!(f, " Appendix")?;
        match &self.signature {
            Some(sig) => writeln!(f, "   - Message Signature: {}", sig)?,
            None => writeln!(f, "   - Message Signature: (unsealed)")?,
        }
        writeln!(f)
    }
}

fn now_nanos() -> i64 {
    let now = chrono::Utc::now();
    now.timestamp_nanos_opt()
        .unwrap_or_else(|| now.timestamp_micros().saturating_mul(1_000))
}
