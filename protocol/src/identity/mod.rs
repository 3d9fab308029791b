//! # Identity Module
//!
//! Hardware identities for ledger participants. A [`Part`] describes the
//! physical component behind a node; its [`Fingerprint`] is the author key
//! stamped into every block the node writes.

pub mod part;

pub use part::{Fingerprint, IdentityError, Part};
