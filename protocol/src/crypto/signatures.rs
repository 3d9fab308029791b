//! # Block Signatures
//!
//! A block signature is a SHA-256 digest over the block's preamble:
//!
//! ```text
//! author (16 bytes LE) || timestamp (8 bytes LE) || index (8 bytes LE) || previous signature
//! ```
//!
//! The three fixed-width fields come first so the variable-length previous
//! signature can never shift bytes across field boundaries. The payload is
//! not part of the preimage.
//!
//! Note that this is a content digest, not a proof of authorship: nothing
//! ties the author fingerprint to a secret key.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::GENESIS_PREVIOUS_SIGNATURE;
use crate::crypto::hash::sha256_multi;

/// Opaque signature bytes.
///
/// Usually a 32-byte digest, except for the one-byte sentinel that the first
/// block of a chain carries as its previous signature. Serialized as hex.
#[derive(Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Signature(Vec<u8>);

impl Signature {
    /// Wraps raw signature bytes.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// The sentinel previous signature of a chain's first block.
    pub fn genesis() -> Self {
        Self(GENESIS_PREVIOUS_SIGNATURE.to_vec())
    }

    /// Whether this is the genesis sentinel.
    pub fn is_genesis(&self) -> bool {
        self.0 == GENESIS_PREVIOUS_SIGNATURE
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Lowercase hex encoding.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Parses a hex string (with or without a `0x` prefix).
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        hex::decode(s).map(Self)
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", self.to_hex())
    }
}

impl From<Signature> for String {
    fn from(sig: Signature) -> Self {
        sig.to_hex()
    }
}

impl TryFrom<String> for Signature {
    type Error = hex::FromHexError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::from_hex(&s)
    }
}

impl AsRef<[u8]> for Signature {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Computes the signature of a block preamble.
///
/// Deterministic: identical inputs always produce identical output, and a
/// change to any one field changes the digest.
pub fn sign_block(author: u128, timestamp: i64, index: u64, previous: &Signature) -> Signature {
    let digest = sha256_multi(&[
        &author.to_le_bytes(),
        &timestamp.to_le_bytes(),
        &index.to_le_bytes(),
        previous.as_bytes(),
    ]);
    Signature(digest.to_vec())
}

/// Byte-for-byte signature comparison.
///
/// Two absent signatures are equal; an absent and a present one are not.
/// Signatures of different lengths are never equal, even when one is a
/// prefix of the other.
pub fn signatures_equal(a: Option<&[u8]>, b: Option<&[u8]>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x == y),
        _ => false,
    }
}
