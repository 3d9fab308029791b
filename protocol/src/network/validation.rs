//! # Validation Loop
//!
//! Each node runs one [`ValidationLoop`] on its own tokio task:
//!
//! ```text
//! Idle ──(candidate arrives)──▶ Validating ──(accept | discard)──▶ Idle
//! ```
//!
//! A candidate is accepted when it extends the node's current head:
//!
//! - on an empty chain, it must be a first block (index 0, sentinel
//!   previous signature);
//! - otherwise its index must be `head.index + 1` and its previous
//!   signature must equal the head's signature byte for byte.
//!
//! Anything else is dropped without telling the sender. An accepted block is
//! appended and the new head is forwarded to every other inbox in the
//! fabric. Forwarding waits for queue capacity, so one stalled node can hold
//! up every node that forwards to it.
//!
//! The author's identity is never checked, and neither is the candidate's
//! own signature; the linkage test above is the only gate.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, info, trace, warn};

use crate::crypto::signatures_equal;
use crate::identity::Fingerprint;
use crate::network::fabric::BroadcastFabric;
use crate::network::node::{NodeEvent, NodeStats, NodeStatus};
use crate::storage::{Block, Chain};

// ---------------------------------------------------------------------------
// Acceptance Rule
// ---------------------------------------------------------------------------

/// Why a candidate block was discarded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RejectReason {
    /// The chain is empty and the candidate is not a first block.
    NotGenesis { index: u64 },
    /// The candidate does not sit directly on top of the head.
    IndexMismatch { expected: u64, got: u64 },
    /// Right index, but it was built on a different head.
    PreviousSignatureMismatch { index: u64 },
}

/// Decides whether `candidate` extends a chain whose head is `head`.
pub fn check_candidate(head: Option<&Block>, candidate: &Block) -> Result<(), RejectReason> {
    let Some(head) = head else {
        return if candidate.is_genesis() {
            Ok(())
        } else {
            Err(RejectReason::NotGenesis {
                index: candidate.index,
            })
        };
    };

    let expected = head.index + 1;
    if candidate.index != expected {
        return Err(RejectReason::IndexMismatch {
            expected,
            got: candidate.index,
        });
    }

    let previous = candidate.previous_signature.as_ref().map(|s| s.as_bytes());
    let head_signature = head.signature.as_ref().map(|s| s.as_bytes());
    if !signatures_equal(previous, head_signature) {
        return Err(RejectReason::PreviousSignatureMismatch {
            index: candidate.index,
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// ValidationLoop
// ---------------------------------------------------------------------------

/// The receive/validate/forward loop of a single node.
///
/// Built by [`crate::network::Node::start_validation`]; consumes the
/// receiving half of the node's inbox.
pub struct ValidationLoop {
    pub(crate) name: String,
    pub(crate) fingerprint: Fingerprint,
    pub(crate) chain: Arc<RwLock<Chain>>,
    pub(crate) receiver: mpsc::Receiver<Block>,
    pub(crate) fabric: Arc<BroadcastFabric>,
    pub(crate) status: Arc<RwLock<NodeStatus>>,
    pub(crate) stats: Arc<NodeStats>,
    pub(crate) events: broadcast::Sender<NodeEvent>,
    pub(crate) shutdown: watch::Receiver<bool>,
}

impl ValidationLoop {
    /// Runs until the shutdown flag is raised or the inbox closes.
    ///
    /// The shutdown flag is checked at the top of every iteration and while
    /// idle; a candidate already being validated or forwarded is always
    /// finished first.
    pub async fn run(mut self) {
        info!(node = %self.name, "validation loop started");
        self.set_status(NodeStatus::Idle);

        loop {
            if *self.shutdown.borrow() {
                break;
            }

            let candidate = tokio::select! {
                biased;
                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        break;
                    }
                    continue;
                }
                received = self.receiver.recv() => match received {
                    Some(block) => block,
                    None => break,
                },
            };

            self.set_status(NodeStatus::Validating);
            if let Some(head) = self.validate(candidate) {
                self.fan_out(head).await;
            }
            self.set_status(NodeStatus::Idle);
        }

        self.set_status(NodeStatus::Stopped);
        info!(node = %self.name, "validation loop stopped");
    }

    /// Applies the acceptance rule and appends on success. Returns the new
    /// head when the candidate was accepted.
    fn validate(&self, candidate: Block) -> Option<Block> {
        let mut chain = self.chain.write();

        match check_candidate(chain.head(), &candidate) {
            Ok(()) => {
                let head = chain.append(candidate).clone();
                drop(chain);

                self.stats.record_accepted();
                debug!(
                    node = %self.name,
                    index = head.index,
                    author = %head.author.short(),
                    signature = %head.signature_hex(),
                    "candidate accepted"
                );
                let _ = self.events.send(NodeEvent::Accepted {
                    index: head.index,
                    author: head.author,
                    signature: head.signature.clone().unwrap_or_default(),
                });
                Some(head)
            }
            Err(reason) => {
                drop(chain);

                self.stats.record_rejected();
                debug!(node = %self.name, ?reason, "candidate discarded");
                let _ = self.events.send(NodeEvent::Rejected { reason });
                None
            }
        }
    }

    /// Sends the new head to every other inbox, one after another.
    async fn fan_out(&self, head: Block) {
        let peers = self.fabric.peers_of(self.fingerprint);
        for peer in peers {
            trace!(
                node = %self.name,
                to = %peer.owner().short(),
                index = head.index,
                free_slots = peer.available(),
                "forwarding head"
            );
            match peer.deliver(head.clone()).await {
                Ok(()) => self.stats.record_forwarded(),
                Err(e) => warn!(node = %self.name, error = %e, "skipping closed peer"),
            }
        }
    }

    fn set_status(&self, status: NodeStatus) {
        *self.status.write() = status;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Signature;
    use crate::storage::Message;

    fn fp(n: u128) -> Fingerprint {
        Fingerprint::from_u128(n)
    }

    fn sealed_chain(len: usize) -> Chain {
        sealed_chain_by(0, len)
    }

    fn sealed_chain_by(first_author: u128, len: usize) -> Chain {
        let mut chain = Chain::new();
        for i in 0..len {
            chain.append(Block::new(fp(first_author + i as u128), Message::info("x")));
        }
        chain
    }

    fn extend(chain: &Chain, author: u128) -> Block {
        let mut block = Block::new(fp(author), Message::info("next"));
        block.finalize(chain.head());
        block
    }

    #[test]
    fn empty_chain_accepts_a_first_block() {
        let candidate = extend(&Chain::new(), 1);
        assert_eq!(check_candidate(None, &candidate), Ok(()));
    }

    #[test]
    fn empty_chain_rejects_a_forged_index() {
        let mut forged = extend(&Chain::new(), 1);
        forged.index = 5;
        assert_eq!(
            check_candidate(None, &forged),
            Err(RejectReason::NotGenesis { index: 5 })
        );
    }

    #[test]
    fn empty_chain_rejects_an_unsealed_block() {
        let raw = Block::new(fp(1), Message::info("raw"));
        assert!(check_candidate(None, &raw).is_err());
    }

    #[test]
    fn accepts_the_next_block() {
        let chain = sealed_chain(3);
        let candidate = extend(&chain, 9);
        assert_eq!(check_candidate(chain.head(), &candidate), Ok(()));
    }

    #[test]
    fn rejects_wrong_index_even_with_right_previous_signature() {
        let chain = sealed_chain(3);
        let mut candidate = extend(&chain, 9);
        candidate.index = 7;
        assert_eq!(
            check_candidate(chain.head(), &candidate),
            Err(RejectReason::IndexMismatch {
                expected: 3,
                got: 7
            })
        );
    }

    #[test]
    fn rejects_stale_blocks() {
        let chain = sealed_chain(3);
        let stale = chain.dump()[1].clone();
        assert!(matches!(
            check_candidate(chain.head(), &stale),
            Err(RejectReason::IndexMismatch { .. })
        ));
    }

    #[test]
    fn rejects_a_fork() {
        let chain = sealed_chain(3);
        let other = sealed_chain_by(100, 3);
        let fork = extend(&other, 9);
        assert_eq!(
            check_candidate(chain.head(), &fork),
            Err(RejectReason::PreviousSignatureMismatch { index: 3 })
        );
    }

    #[test]
    fn rejects_a_truncated_previous_signature() {
        let chain = sealed_chain(2);
        let mut candidate = extend(&chain, 9);
        let full = candidate.previous_signature.clone().unwrap();
        candidate.previous_signature = Some(Signature::from_bytes(&full.as_bytes()[..8]));
        assert!(matches!(
            check_candidate(chain.head(), &candidate),
            Err(RejectReason::PreviousSignatureMismatch { .. })
        ));
    }
}
