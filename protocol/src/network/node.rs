//! # Ledger Node
//!
//! A `Node` is the runtime for one part: it owns the part's identity, its
//! private copy of the chain and the receiving end of its inbox.
//!
//! ```text
//! new() ──▶ NotStarted ──start_validation()──▶ Idle ⇄ Validating ──shutdown()──▶ Stopped
//! ```
//!
//! Two things write to a node's chain: its own [`Node::transmit`], which
//! appends unconditionally, and its validation loop, which appends whatever
//! passes the linkage check. Nothing outside the node ever mutates it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::{NodeConfig, MAX_PRIORITY};
use crate::crypto::Signature;
use crate::identity::{Fingerprint, IdentityError, Part};
use crate::network::fabric::{BroadcastFabric, FabricError, Inbox};
use crate::network::validation::{RejectReason, ValidationLoop};
use crate::storage::{Block, Chain, Message};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("identity error: {0}")]
    Identity(#[from] IdentityError),

    #[error("fabric registration failed: {0}")]
    Registration(#[from] FabricError),

    /// `start_validation` was called a second time.
    #[error("validation loop already started")]
    AlreadyStarted,

    /// The peer's validation loop has shut down and its inbox is closed.
    #[error("peer {0} is not accepting blocks")]
    PeerUnavailable(Fingerprint),
}

// ---------------------------------------------------------------------------
// Node Status
// ---------------------------------------------------------------------------

/// Lifecycle state of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    /// Constructed, validation loop not yet spawned.
    NotStarted,
    /// Waiting for the next candidate.
    Idle,
    /// Checking, appending or forwarding a candidate.
    Validating,
    /// The validation loop has exited.
    Stopped,
}

// ---------------------------------------------------------------------------
// Events & Stats
// ---------------------------------------------------------------------------

/// Something that happened to a node's chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum NodeEvent {
    /// The node appended a block of its own via `transmit`.
    Authored { index: u64, signature: Signature },
    /// The validation loop appended a received candidate.
    Accepted {
        index: u64,
        author: Fingerprint,
        signature: Signature,
    },
    /// The validation loop discarded a candidate.
    Rejected { reason: RejectReason },
}

/// Running counters for one node. Updated lock-free.
#[derive(Debug, Default)]
pub struct NodeStats {
    accepted: AtomicU64,
    rejected: AtomicU64,
    authored: AtomicU64,
    forwarded: AtomicU64,
}

/// Point-in-time copy of [`NodeStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeStatsSnapshot {
    pub accepted: u64,
    pub rejected: u64,
    pub authored: u64,
    pub forwarded: u64,
}

impl NodeStats {
    pub(crate) fn record_accepted(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_authored(&self) {
        self.authored.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_forwarded(&self) {
        self.forwarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> NodeStatsSnapshot {
        NodeStatsSnapshot {
            accepted: self.accepted.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            authored: self.authored.load(Ordering::Relaxed),
            forwarded: self.forwarded.load(Ordering::Relaxed),
        }
    }
}

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

/// One participant in a ledger network.
///
/// Chain, status and stats sit behind `Arc`s shared with the node's
/// validation task; guards on them are always dropped before any `.await`.
pub struct Node {
    part: Arc<Part>,
    /// Random rank in `[0, MAX_PRIORITY)`. Carried for display only.
    priority: u8,
    config: NodeConfig,
    chain: Arc<RwLock<Chain>>,
    inbox: Inbox,
    /// Taken by `start_validation`.
    receiver: Mutex<Option<mpsc::Receiver<Block>>>,
    fabric: Arc<BroadcastFabric>,
    status: Arc<RwLock<NodeStatus>>,
    stats: Arc<NodeStats>,
    events: broadcast::Sender<NodeEvent>,
    shutdown: watch::Sender<bool>,
}

impl Node {
    /// Wraps `part` in a node and registers its inbox with `fabric`.
    ///
    /// # Errors
    ///
    /// [`NodeError::Registration`] if a node with the same fingerprint is
    /// already part of the fabric.
    pub fn new(
        part: Part,
        fabric: Arc<BroadcastFabric>,
        config: NodeConfig,
    ) -> Result<Self, NodeError> {
        let (inbox, receiver) = Inbox::channel(part.fingerprint, config.inbox_capacity);
        fabric.register(inbox.clone())?;

        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let (shutdown, _) = watch::channel(false);
        let priority = rand::thread_rng().gen_range(0..MAX_PRIORITY);

        info!(
            node = %part.name,
            fingerprint = %part.fingerprint,
            priority,
            "node created"
        );

        Ok(Self {
            part: Arc::new(part),
            priority,
            config,
            chain: Arc::new(RwLock::new(Chain::new())),
            inbox,
            receiver: Mutex::new(Some(receiver)),
            fabric,
            status: Arc::new(RwLock::new(NodeStatus::NotStarted)),
            stats: Arc::new(NodeStats::default()),
            events,
            shutdown,
        })
    }

    /// Mints a fresh part and wraps it in a node.
    ///
    /// # Errors
    ///
    /// [`NodeError::Identity`] if the OS entropy source fails, otherwise as
    /// [`Node::new`].
    pub fn create(
        name: &str,
        manufacturer: &str,
        serial_number: &str,
        model_number: &str,
        fabric: Arc<BroadcastFabric>,
        config: NodeConfig,
    ) -> Result<Self, NodeError> {
        let part = Part::create(name, manufacturer, serial_number, model_number)?;
        Self::new(part, fabric, config)
    }

    /// Spawns the validation loop on the current tokio runtime.
    ///
    /// Can only be called once per node.
    pub fn start_validation(&self) -> Result<JoinHandle<()>, NodeError> {
        let receiver = self
            .receiver
            .lock()
            .take()
            .ok_or(NodeError::AlreadyStarted)?;

        *self.status.write() = NodeStatus::Idle;

        let validation = ValidationLoop {
            name: self.part.name.clone(),
            fingerprint: self.part.fingerprint,
            chain: Arc::clone(&self.chain),
            receiver,
            fabric: Arc::clone(&self.fabric),
            status: Arc::clone(&self.status),
            stats: Arc::clone(&self.stats),
            events: self.events.clone(),
            shutdown: self.shutdown.subscribe(),
        };

        Ok(tokio::spawn(validation.run()))
    }

    /// Authors a block, appends it to this node's chain and hands it to
    /// `peer` for validation.
    ///
    /// The local append is unconditional and happens even if the peer turns
    /// out to be unavailable. Returns the sealed block.
    pub async fn transmit(&self, peer: &Node, message: Message) -> Result<Block, NodeError> {
        self.transmit_to(&peer.inbox, message).await
    }

    /// Like [`Node::transmit`], addressed by inbox handle.
    pub async fn transmit_to(&self, peer: &Inbox, message: Message) -> Result<Block, NodeError> {
        let block = {
            let mut chain = self.chain.write();
            chain.append(self.part.create_block(message)).clone()
        };

        self.stats.record_authored();
        debug!(
            node = %self.part.name,
            to = %peer.owner().short(),
            index = block.index,
            signature = %block.signature_hex(),
            "block authored"
        );
        let _ = self.events.send(NodeEvent::Authored {
            index: block.index,
            signature: block.signature.clone().unwrap_or_default(),
        });

        peer.deliver(block.clone())
            .await
            .map_err(|_| NodeError::PeerUnavailable(peer.owner()))?;

        tokio::time::sleep(self.config.handoff_delay()).await;
        Ok(block)
    }

    /// Asks the validation loop to exit after its current candidate.
    pub fn shutdown(&self) {
        info!(node = %self.part.name, "shutdown requested");
        self.shutdown.send_replace(true);
    }

    // ----- Read access -----

    /// This node's blocks, most recent first.
    pub fn dump(&self) -> Vec<Block> {
        self.chain.read().dump()
    }

    /// Block dumps of the whole chain, head first.
    pub fn render_ledger(&self) -> String {
        self.chain.read().iter().map(Block::to_string).collect()
    }

    pub fn head(&self) -> Option<Block> {
        self.chain.read().head().cloned()
    }

    pub fn len(&self) -> usize {
        self.chain.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.read().is_empty()
    }

    /// Sending handle to this node's inbox.
    pub fn inbox(&self) -> Inbox {
        self.inbox.clone()
    }

    pub fn part(&self) -> &Part {
        &self.part
    }

    pub fn fingerprint(&self) -> Fingerprint {
        self.part.fingerprint
    }

    pub fn name(&self) -> &str {
        &self.part.name
    }

    pub fn priority(&self) -> u8 {
        self.priority
    }

    pub fn status(&self) -> NodeStatus {
        *self.status.read()
    }

    pub fn stats(&self) -> NodeStatsSnapshot {
        self.stats.snapshot()
    }

    /// Subscribes to this node's events from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<NodeEvent> {
        self.events.subscribe()
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("name", &self.part.name)
            .field("fingerprint", &self.part.fingerprint)
            .field("priority", &self.priority)
            .field("status", &self.status())
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn fast_config() -> NodeConfig {
        NodeConfig {
            handoff_delay_ms: 1,
            ..NodeConfig::default()
        }
    }

    fn node(fabric: &Arc<BroadcastFabric>, name: &str) -> Node {
        Node::create(
            name,
            "Sckzor Industries",
            "TEST-0000",
            "XX000",
            Arc::clone(fabric),
            fast_config(),
        )
        .unwrap()
    }

    /// A node whose inbox holds a single block.
    fn tight_node(fabric: &Arc<BroadcastFabric>, name: &str) -> Node {
        let config = NodeConfig {
            inbox_capacity: 1,
            ..fast_config()
        };
        Node::create(
            name,
            "Sckzor Industries",
            "TEST-0001",
            "XX001",
            Arc::clone(fabric),
            config,
        )
        .unwrap()
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !condition() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("condition not reached in time");
    }

    #[test]
    fn new_node_is_registered_and_not_started() {
        let fabric = Arc::new(BroadcastFabric::new());
        let n = node(&fabric, "Rudder");

        assert_eq!(n.status(), NodeStatus::NotStarted);
        assert!(n.is_empty());
        assert!(n.priority() < MAX_PRIORITY);
        assert_eq!(fabric.len(), 1);
        assert!(fabric.inbox_of(n.fingerprint()).is_some());
    }

    #[test]
    fn duplicate_part_cannot_join_twice() {
        let fabric = Arc::new(BroadcastFabric::new());
        let part = Part::create("Wing", "Sckzor Industries", "YYG4", "CX410").unwrap();
        Node::new(part.clone(), Arc::clone(&fabric), fast_config()).unwrap();

        let err = Node::new(part, fabric, fast_config()).unwrap_err();
        assert!(matches!(
            err,
            NodeError::Registration(FabricError::DuplicateNode(_))
        ));
    }

    #[tokio::test]
    async fn validation_starts_only_once() {
        let fabric = Arc::new(BroadcastFabric::new());
        let n = node(&fabric, "Elevator");

        let handle = n.start_validation().unwrap();
        assert!(matches!(n.start_validation(), Err(NodeError::AlreadyStarted)));

        n.shutdown();
        handle.await.unwrap();
        assert_eq!(n.status(), NodeStatus::Stopped);
    }

    #[tokio::test]
    async fn hand_off_converges_on_three_nodes() {
        let fabric = Arc::new(BroadcastFabric::new());
        let n1 = node(&fabric, "Rudder");
        let n2 = node(&fabric, "Elevator");
        let n3 = node(&fabric, "Wing");
        for n in [&n1, &n2, &n3] {
            n.start_validation().unwrap();
        }

        let sent = n1
            .transmit(&n2, Message::attach("The Rudder has joined the blockchain"))
            .await
            .unwrap();

        wait_until(|| n2.len() == 1 && n3.len() == 1).await;
        // N1 gets its own block back from N2 and N3 and has to discard both.
        wait_until(|| n1.stats().rejected == 2).await;

        for n in [&n1, &n2, &n3] {
            let dump = n.dump();
            assert_eq!(dump.len(), 1, "{} diverged", n.name());
            assert_eq!(dump[0], sent);
        }
        assert_eq!(n1.stats().authored, 1);
        assert_eq!(n2.stats().accepted, 1);
        assert_eq!(n3.stats().accepted, 1);
    }

    #[tokio::test]
    async fn forged_index_into_empty_node_is_rejected() {
        let fabric = Arc::new(BroadcastFabric::new());
        let target = node(&fabric, "Fuselage");
        let mut events = target.subscribe();
        target.start_validation().unwrap();

        let mut forged = Block::new(Fingerprint::from_u128(42), Message::error("forged"));
        forged.finalize(None);
        forged.index = 5;
        target.inbox().deliver(forged).await.unwrap();

        let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            event,
            NodeEvent::Rejected {
                reason: RejectReason::NotGenesis { index: 5 }
            }
        );
        assert!(target.is_empty());
    }

    #[tokio::test]
    async fn transmit_appends_locally_even_if_peer_is_gone() {
        let fabric = Arc::new(BroadcastFabric::new());
        let sender = node(&fabric, "Ailerons");
        let peer = node(&fabric, "Propellor");

        let handle = peer.start_validation().unwrap();
        peer.shutdown();
        handle.await.unwrap();

        let err = sender
            .transmit(&peer, Message::info("trim"))
            .await
            .unwrap_err();
        assert!(matches!(err, NodeError::PeerUnavailable(fp) if fp == peer.fingerprint()));
        assert_eq!(sender.len(), 1);
        assert_eq!(sender.head().unwrap().message.text, "trim");
    }

    #[tokio::test]
    async fn authored_event_is_published() {
        let fabric = Arc::new(BroadcastFabric::new());
        let a = node(&fabric, "Landing Gear");
        let b = node(&fabric, "Horizontal Stabilizer");
        let mut events = a.subscribe();

        let block = a.transmit(&b, Message::info("deployed")).await.unwrap();
        assert_eq!(
            events.recv().await.unwrap(),
            NodeEvent::Authored {
                index: 0,
                signature: block.signature.clone().unwrap(),
            }
        );
    }

    #[test]
    fn ledger_rendering_lists_every_block() {
        let fabric = Arc::new(BroadcastFabric::new());
        let n = node(&fabric, "Vertical Stabilizer");
        {
            let mut chain = n.chain.write();
            chain.append(n.part.create_block(Message::info("one")));
            chain.append(n.part.create_block(Message::info("two")));
        }

        let ledger = n.render_ledger();
        assert_eq!(ledger.matches("Block Dump").count(), 2);
        assert!(ledger.find("two").unwrap() < ledger.find("one").unwrap());
    }

    #[tokio::test]
    async fn transmit_waits_for_a_full_peer() {
        let fabric = Arc::new(BroadcastFabric::new());
        let sender = tight_node(&fabric, "Rudder");
        // Never started, so nothing drains its single slot.
        let stalled = tight_node(&fabric, "Elevator");

        sender
            .transmit(&stalled, Message::info("first"))
            .await
            .unwrap();
        let second = tokio::time::timeout(
            Duration::from_millis(100),
            sender.transmit(&stalled, Message::info("second")),
        )
        .await;

        assert!(second.is_err(), "second hand-off should wait for capacity");
        assert_eq!(sender.len(), 2);
        assert_eq!(sender.head().unwrap().message.text, "second");
    }

    #[tokio::test]
    async fn full_fan_out_target_stalls_the_forwarding_node() {
        let fabric = Arc::new(BroadcastFabric::new());
        let origin = tight_node(&fabric, "Wing");
        let forwarder = tight_node(&fabric, "Fuselage");
        let target = tight_node(&fabric, "Propellor");

        // Occupy the target's only slot before anything is forwarded.
        target
            .inbox()
            .deliver(Block::new(Fingerprint::from_u128(7), Message::info("filler")))
            .await
            .unwrap();

        forwarder.start_validation().unwrap();
        origin
            .transmit(&forwarder, Message::attach("The Wing has joined the blockchain"))
            .await
            .unwrap();

        // Origin's slot takes the first forward; the target's is still full.
        wait_until(|| forwarder.len() == 1 && forwarder.stats().forwarded == 1).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(forwarder.status(), NodeStatus::Validating);
        assert_eq!(forwarder.stats().forwarded, 1);

        // Draining the target frees the forwarder.
        target.start_validation().unwrap();
        wait_until(|| forwarder.status() == NodeStatus::Idle).await;
        assert_eq!(forwarder.stats().forwarded, 2);
    }
}
