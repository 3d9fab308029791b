//! In-memory, append-only chain.
//!
//! Blocks live in a per-chain arena. Each entry records the arena slot of
//! its predecessor, so walking back from the head is a chain of index hops
//! rather than a chain of owned pointers. Blocks are never shared between
//! chains and never change once appended.

use super::block::Block;
use crate::crypto::Signature;

#[derive(Debug, Clone)]
struct Entry {
    block: Block,
    /// Arena slot of the predecessor. `None` for the first block.
    previous: Option<usize>,
}

/// A single linear history.
#[derive(Debug, Clone, Default)]
pub struct Chain {
    entries: Vec<Entry>,
    head: Option<usize>,
    head_signature: Option<Signature>,
}

impl Chain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seals `block` on top of the current head and makes it the new head.
    ///
    /// No validation happens here; callers decide whether the block belongs
    /// on this chain before appending. Returns a reference to the sealed
    /// block.
    pub fn append(&mut self, mut block: Block) -> &Block {
        let previous = self.head;
        block.finalize(self.head());

        let slot = self.entries.len();
        self.head_signature = block.signature.clone();
        self.entries.push(Entry { block, previous });
        self.head = Some(slot);

        &self.entries[slot].block
    }

    /// The latest block, if any.
    pub fn head(&self) -> Option<&Block> {
        self.head.map(|slot| &self.entries[slot].block)
    }

    /// Cached signature of the head block.
    pub fn head_signature(&self) -> Option<&Signature> {
        self.head_signature.as_ref()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Walks from the head back to the first block.
    pub fn iter(&self) -> ChainIter<'_> {
        ChainIter {
            chain: self,
            cursor: self.head,
        }
    }

    /// Blocks ordered most-recent-first.
    pub fn dump(&self) -> Vec<Block> {
        self.iter().cloned().collect()
    }
}

/// Iterator over a chain, head first. Follows predecessor links.
pub struct ChainIter<'a> {
    chain: &'a Chain,
    cursor: Option<usize>,
}

impl<'a> Iterator for ChainIter<'a> {
    type Item = &'a Block;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = &self.chain.entries[self.cursor?];
        self.cursor = entry.previous;
        Some(&entry.block)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self.cursor {
            Some(slot) => (0, Some(slot + 1)),
            None => (0, Some(0)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Fingerprint;
    use crate::storage::block::Message;

    fn block(n: u128, text: &str) -> Block {
        Block::new(Fingerprint::from_u128(n), Message::info(text))
    }

    #[test]
    fn empty_chain() {
        let chain = Chain::new();
        assert!(chain.is_empty());
        assert!(chain.head().is_none());
        assert!(chain.head_signature().is_none());
        assert!(chain.dump().is_empty());
    }

    #[test]
    fn append_tracks_head_and_signature() {
        let mut chain = Chain::new();
        let first_sig = chain.append(block(1, "a")).signature.clone();

        assert_eq!(chain.len(), 1);
        assert_eq!(chain.head_signature(), first_sig.as_ref());

        chain.append(block(2, "b"));
        let head = chain.head().unwrap();
        assert_eq!(head.index, 1);
        assert_eq!(head.previous_signature, first_sig);
        assert_eq!(chain.head_signature(), head.signature.as_ref());
    }

    #[test]
    fn dump_is_most_recent_first_and_ends_at_genesis() {
        let mut chain = Chain::new();
        for (i, text) in ["a", "b", "c", "d"].iter().enumerate() {
            chain.append(block(i as u128, text));
        }

        let dump = chain.dump();
        let indices: Vec<u64> = dump.iter().map(|b| b.index).collect();
        assert_eq!(indices, vec![3, 2, 1, 0]);
        assert!(dump.last().unwrap().is_genesis());

        for pair in dump.windows(2) {
            assert_eq!(pair[0].previous_signature, pair[1].signature);
        }
    }

    #[test]
    fn dump_is_restartable() {
        let mut chain = Chain::new();
        chain.append(block(1, "a"));
        chain.append(block(1, "b"));

        assert_eq!(chain.dump(), chain.dump());
        assert_eq!(chain.iter().count(), 2);
        assert_eq!(chain.len(), 2);
    }

    #[test]
    fn appending_a_correct_candidate_preserves_its_signature() {
        let mut origin = Chain::new();
        origin.append(block(1, "a"));
        let candidate = origin.append(block(1, "b")).clone();

        let mut replica = Chain::new();
        replica.append(origin.dump().pop().unwrap());
        let stored = replica.append(candidate.clone());
        assert_eq!(*stored, candidate);
    }
}
