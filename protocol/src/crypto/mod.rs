//! # Cryptographic Primitives
//!
//! SHA-256 hashing and the block signature scheme built on it.
//!
//! There is no key material anywhere in PartLedger. A "signature" is a
//! deterministic digest of a block's preamble; it detects tampering with the
//! linkage fields but does not prove who wrote the block.

pub mod hash;
pub mod signatures;

pub use hash::sha256_multi;
pub use signatures::{sign_block, signatures_equal, Signature};
