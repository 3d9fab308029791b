//! # Hashing
//!
//! SHA-256 is the only hash function in PartLedger. Block signatures hash a
//! preamble made of several fixed-width fields plus a variable-length tail,
//! so the one helper here feeds slices to the hasher in order instead of
//! concatenating them first.

use sha2::{Digest, Sha256};

/// SHA-256 over `parts` fed in sequence. Same digest as hashing
/// `parts.concat()`.
pub fn sha256_multi(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_parts_is_the_empty_string_digest() {
        let expected =
            hex::decode("e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855")
                .unwrap();
        assert_eq!(sha256_multi(&[]).to_vec(), expected);
    }

    #[test]
    fn split_input_matches_joined_input() {
        let joined = sha256_multi(&[b"landing gear"]);
        let split = sha256_multi(&[b"landing", b" ", b"gear"]);
        assert_eq!(joined, split);
    }

    #[test]
    fn boundaries_do_not_matter_but_order_does() {
        let ab = sha256_multi(&[b"rud", b"der"]);
        let ba = sha256_multi(&[b"der", b"rud"]);
        assert_ne!(ab, ba);
    }
}
