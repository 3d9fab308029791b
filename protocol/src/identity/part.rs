//! # Parts — Hardware Identities
//!
//! Every node in PartLedger stands for one physical component (a rudder, a
//! landing gear, a propeller). The component is described by a [`Part`],
//! and identified on the ledger by its [`Fingerprint`]: 128 random bits drawn
//! once from the OS entropy source when the part is created.
//!
//! Fingerprints are opaque identity keys, not public keys. Nothing in the
//! ledger proves that a block claiming a fingerprint was really written by
//! that part.

use std::fmt;

use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::FINGERPRINT_BITS;
use crate::storage::block::{Block, Message};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur while minting an identity.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// The entropy source refused to produce bytes.
    #[error("entropy source failure: {0}")]
    Entropy(#[from] rand::Error),

    /// A fingerprint string could not be parsed.
    #[error("invalid fingerprint: {0}")]
    InvalidFingerprint(String),
}

// ---------------------------------------------------------------------------
// Fingerprint
// ---------------------------------------------------------------------------

/// A part's 128-bit identity key. Serialized as `0x`-prefixed hex.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Fingerprint(u128);

impl Fingerprint {
    /// Draws a fresh fingerprint from `rng`.
    ///
    /// The top bit is forced on so every fingerprint has the full 128-bit
    /// width.
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Result<Self, IdentityError> {
        let mut bytes = [0u8; (FINGERPRINT_BITS / 8) as usize];
        rng.try_fill_bytes(&mut bytes)?;
        Ok(Self(
            u128::from_be_bytes(bytes) | (1u128 << (FINGERPRINT_BITS - 1)),
        ))
    }

    pub const fn from_u128(value: u128) -> Self {
        Self(value)
    }

    pub const fn as_u128(&self) -> u128 {
        self.0
    }

    /// Short form for log lines: the last 8 hex digits.
    pub fn short(&self) -> String {
        format!("{:08x}", self.0 as u32)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:032x}", self.0)
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({:032x})", self.0)
    }
}

impl From<Fingerprint> for String {
    fn from(fp: Fingerprint) -> Self {
        fp.to_string()
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = IdentityError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        let digits = s.strip_prefix("0x").unwrap_or(&s);
        u128::from_str_radix(digits, 16)
            .map(Self)
            .map_err(|e| IdentityError::InvalidFingerprint(format!("{s}: {e}")))
    }
}

// ---------------------------------------------------------------------------
// Part
// ---------------------------------------------------------------------------

/// A hardware component taking part in the ledger.
///
/// Immutable once created. Owned by exactly one node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    /// Identity key, unique per part.
    pub fingerprint: Fingerprint,
    /// Human-readable component name ("Rudder").
    pub name: String,
    pub manufacturer: String,
    pub serial_number: String,
    pub model_number: String,
}

impl Part {
    /// Creates a part with a fingerprint drawn from the OS RNG.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::Entropy`] if the OS RNG fails. The part
    /// cannot exist without a fingerprint, so callers should treat this as
    /// fatal.
    pub fn create(
        name: impl Into<String>,
        manufacturer: impl Into<String>,
        serial_number: impl Into<String>,
        model_number: impl Into<String>,
    ) -> Result<Self, IdentityError> {
        Self::create_with_rng(&mut OsRng, name, manufacturer, serial_number, model_number)
    }

    /// Creates a part drawing its fingerprint from the given RNG.
    pub fn create_with_rng<R: RngCore + CryptoRng>(
        rng: &mut R,
        name: impl Into<String>,
        manufacturer: impl Into<String>,
        serial_number: impl Into<String>,
        model_number: impl Into<String>,
    ) -> Result<Self, IdentityError> {
        Ok(Self {
            fingerprint: Fingerprint::generate(rng)?,
            name: name.into(),
            manufacturer: manufacturer.into(),
            serial_number: serial_number.into(),
            model_number: model_number.into(),
        })
    }

    /// Starts a new, unsealed block authored by this part.
    ///
    /// Timestamp, index, linkage and signature are filled in when the block
    /// is appended to a chain.
    pub fn create_block(&self, message: Message) -> Block {
        Block::new(self.fingerprint, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// RNG that always fails, standing in for a broken entropy source.
    struct BrokenRng;

    impl RngCore for BrokenRng {
        fn next_u32(&mut self) -> u32 {
            0
        }
        fn next_u64(&mut self) -> u64 {
            0
        }
        fn fill_bytes(&mut self, _dest: &mut [u8]) {}
        fn try_fill_bytes(&mut self, _dest: &mut [u8]) -> Result<(), rand::Error> {
            Err(rand::Error::new("entropy pool drained"))
        }
    }

    impl CryptoRng for BrokenRng {}

    #[test]
    fn fingerprints_are_full_width_and_distinct() {
        let a = Part::create("Rudder", "Sckzor Industries", "LBMR-HLXA", "TY850").unwrap();
        let b = Part::create("Rudder", "Sckzor Industries", "LBMR-HLXA", "TY850").unwrap();

        assert_ne!(a.fingerprint, b.fingerprint);
        let top = FINGERPRINT_BITS - 1;
        assert_eq!(a.fingerprint.as_u128() >> top, 1);
        assert_eq!(b.fingerprint.as_u128() >> top, 1);
    }

    #[test]
    fn seeded_rng_is_reproducible() {
        let a = Part::create_with_rng(&mut StdRng::seed_from_u64(9), "Wing", "S", "1", "CX410")
            .unwrap();
        let b = Part::create_with_rng(&mut StdRng::seed_from_u64(9), "Wing", "S", "1", "CX410")
            .unwrap();
        assert_eq!(a.fingerprint, b.fingerprint);
    }

    #[test]
    fn entropy_failure_is_fatal() {
        let result = Part::create_with_rng(&mut BrokenRng, "Fuselage", "S", "1", "ZD020");
        assert!(matches!(result, Err(IdentityError::Entropy(_))));
    }

    #[test]
    fn fingerprint_hex_roundtrip() {
        let fp = Fingerprint::from_u128(0xdead_beef);
        let json = serde_json::to_string(&fp).unwrap();
        assert_eq!(json, "\"0x000000000000000000000000deadbeef\"");
        let back: Fingerprint = serde_json::from_str(&json).unwrap();
        assert_eq!(back, fp);
        assert_eq!(fp.short(), "deadbeef");
    }

    #[test]
    fn malformed_fingerprint_is_rejected() {
        let err = Fingerprint::try_from("0xnot-hex".to_string()).unwrap_err();
        assert!(matches!(err, IdentityError::InvalidFingerprint(_)));
    }

    #[test]
    fn created_block_is_unsealed() {
        let part = Part::create("Elevator", "Sckzor Industries", "PFEW-8XEJ", "UL100").unwrap();
        let block = part.create_block(Message::info("trim check"));
        assert_eq!(block.author, part.fingerprint);
        assert!(block.signature.is_none());
        assert!(block.timestamp.is_none());
    }
}
