//! # Broadcast Fabric
//!
//! The fabric is the registry of every node's inbound queue. A node that
//! accepts a block uses it to fan the new head out to everyone else; nobody
//! uses it to read another node's chain.
//!
//! Membership only grows. Registration takes the write lock, which in
//! practice only happens while the topology is being built; after that every
//! access is a read that copies out a snapshot of the inbox handles, so no
//! lock is ever held while a send is waiting for queue capacity.

use parking_lot::RwLock;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::debug;

use crate::identity::Fingerprint;
use crate::storage::Block;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FabricError {
    /// A node with this fingerprint already registered an inbox.
    #[error("node {0} is already registered")]
    DuplicateNode(Fingerprint),

    /// The receiving validation loop has shut down.
    #[error("inbox of node {0} is closed")]
    InboxClosed(Fingerprint),
}

// ---------------------------------------------------------------------------
// Inbox
// ---------------------------------------------------------------------------

/// Sending half of a node's bounded inbound block queue.
///
/// Cheap to clone. `deliver` waits while the queue is full, so a slow node
/// applies back-pressure to everyone sending to it.
#[derive(Debug, Clone)]
pub struct Inbox {
    owner: Fingerprint,
    sender: mpsc::Sender<Block>,
}

impl Inbox {
    /// Creates a queue of `capacity` blocks for `owner`, returning both ends.
    pub fn channel(owner: Fingerprint, capacity: usize) -> (Self, mpsc::Receiver<Block>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { owner, sender }, receiver)
    }

    /// Fingerprint of the node that consumes this queue.
    pub fn owner(&self) -> Fingerprint {
        self.owner
    }

    /// Enqueues a candidate block, waiting for capacity if the queue is full.
    pub async fn deliver(&self, block: Block) -> Result<(), FabricError> {
        self.sender
            .send(block)
            .await
            .map_err(|_| FabricError::InboxClosed(self.owner))
    }

    /// Free slots right now.
    pub fn available(&self) -> usize {
        self.sender.capacity()
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

// ---------------------------------------------------------------------------
// BroadcastFabric
// ---------------------------------------------------------------------------

/// Registry of all inboxes in one ledger network.
///
/// Share it between nodes with an `Arc`. Separate fabrics are fully isolated
/// networks.
#[derive(Debug, Default)]
pub struct BroadcastFabric {
    inboxes: RwLock<Vec<Inbox>>,
}

impl BroadcastFabric {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an inbox. Registration order is preserved for fan-out.
    pub fn register(&self, inbox: Inbox) -> Result<(), FabricError> {
        let mut inboxes = self.inboxes.write();
        if inboxes.iter().any(|i| i.owner == inbox.owner) {
            return Err(FabricError::DuplicateNode(inbox.owner));
        }
        debug!(node = %inbox.owner.short(), members = inboxes.len() + 1, "inbox registered");
        inboxes.push(inbox);
        Ok(())
    }

    /// Snapshot of every registered inbox.
    pub fn all_queues(&self) -> Vec<Inbox> {
        self.inboxes.read().clone()
    }

    /// Snapshot of every inbox except `node`'s own.
    pub fn peers_of(&self, node: Fingerprint) -> Vec<Inbox> {
        self.inboxes
            .read()
            .iter()
            .filter(|i| i.owner != node)
            .cloned()
            .collect()
    }

    /// The inbox registered for `node`, if any.
    pub fn inbox_of(&self, node: Fingerprint) -> Option<Inbox> {
        self.inboxes.read().iter().find(|i| i.owner == node).cloned()
    }

    pub fn len(&self) -> usize {
        self.inboxes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inboxes.read().is_empty()
    }
}
