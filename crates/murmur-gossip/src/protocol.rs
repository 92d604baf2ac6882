//! The gossip protocol controller.
//!
//! [`GossipProtocol`] orchestrates the whole propagation pipeline:
//!
//! ```text
//! broadcast/relay -> fingerprint -> dedup -> validator hand-off
//!     -> validated-record channel -> priority queue -> fan-out to peers
//! ```
//!
//! Three loops run concurrently once [`start`](GossipProtocol::start) has
//! been called: the membership loop keeps the peer registry in sync with
//! transport connect/disconnect events, the feed loop classifies validated
//! records and pushes them into the priority queue, and the engine loop is
//! the queue's single consumer, fanning each record out to every registered
//! peer except its original sender. A single one-shot shutdown signal,
//! fired by [`close`](GossipProtocol::close), terminates all of them.

use crate::classifier::PriorityClassifier;
use crate::dedup::{DEFAULT_DEDUP_CAPACITY, DoubleCache};
use crate::error::GossipError;
use crate::fingerprint::Fingerprint;
use crate::metrics::GossipMetrics;
use crate::peer::{Peer, PeerId};
use crate::registry::PeerRegistry;
use crate::transport::{Transport, ValidationRecord};
use futures::future;
use murmur_priorityq::{Priority, PriorityQueue, QueueError};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};

/// Number of validated records the intake channel buffers. Above this the
/// validator blocks, which is the designed backpressure point.
pub const DEFAULT_PROPAGATE_BUFFER: usize = 5_000;

/// Configuration for the gossip protocol.
#[derive(Debug, Clone)]
pub struct GossipConfig {
    /// Capacity of the validated-record intake channel.
    pub propagate_buffer: usize,
    /// Capacity of the propagation priority queue.
    pub queue_capacity: usize,
    /// Per-generation capacity of the dedup cache.
    pub dedup_capacity: usize,
}

impl Default for GossipConfig {
    fn default() -> Self {
        Self {
            propagate_buffer: DEFAULT_PROPAGATE_BUFFER,
            queue_capacity: DEFAULT_PROPAGATE_BUFFER,
            dedup_capacity: DEFAULT_DEDUP_CAPACITY,
        }
    }
}

impl GossipConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the intake channel capacity.
    #[must_use]
    pub const fn with_propagate_buffer(mut self, capacity: usize) -> Self {
        self.propagate_buffer = capacity;
        self
    }

    /// Sets the priority queue capacity.
    #[must_use]
    pub const fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Sets the per-generation dedup cache capacity.
    #[must_use]
    pub const fn with_dedup_capacity(mut self, capacity: usize) -> Self {
        self.dedup_capacity = capacity;
        self
    }
}

/// Message-propagation core of the gossip layer.
///
/// Decides which inbound messages are novel, hands novel messages to the
/// external validator, and fans validated messages back out to all known
/// peers while suppressing duplicates.
pub struct GossipProtocol {
    inner: Arc<ProtocolInner>,
}

struct ProtocolInner {
    local_id: PeerId,
    net: Arc<dyn Transport>,
    peers: PeerRegistry,
    dedup: DoubleCache,
    priorities: PriorityClassifier,
    queue: PriorityQueue<ValidationRecord>,
    propagate_tx: mpsc::Sender<ValidationRecord>,
    // Taken exactly once, by the feed loop at start.
    propagate_rx: Mutex<Option<mpsc::Receiver<ValidationRecord>>>,
    shutdown: broadcast::Sender<()>,
    started: AtomicBool,
    closed: AtomicBool,
    metrics: Arc<GossipMetrics>,
}

impl GossipProtocol {
    /// Creates a new gossip protocol instance.
    ///
    /// Peer events are deliberately not subscribed here: subscription can
    /// block until the transport is ready, and nothing must queue up before
    /// [`start`](Self::start) runs.
    #[must_use]
    pub fn new(config: GossipConfig, net: Arc<dyn Transport>, local_id: PeerId) -> Self {
        let (propagate_tx, propagate_rx) = mpsc::channel(config.propagate_buffer.max(1));
        let (shutdown, _) = broadcast::channel(1);
        Self {
            inner: Arc::new(ProtocolInner {
                local_id,
                net,
                peers: PeerRegistry::new(),
                dedup: DoubleCache::new(config.dedup_capacity),
                priorities: PriorityClassifier::new(),
                queue: PriorityQueue::new(config.queue_capacity),
                propagate_tx,
                propagate_rx: Mutex::new(Some(propagate_rx)),
                shutdown,
                started: AtomicBool::new(false),
                closed: AtomicBool::new(false),
                metrics: Arc::new(GossipMetrics::new()),
            }),
        }
    }

    /// Creates a protocol with the default configuration.
    #[must_use]
    pub fn with_defaults(net: Arc<dyn Transport>, local_id: PeerId) -> Self {
        Self::new(GossipConfig::default(), net, local_id)
    }

    /// Subscribes to peer events and launches the protocol loops.
    ///
    /// Awaits the transport's event subscription, which may block until the
    /// transport is ready, then spawns the membership loop, the queue
    /// feeding loop, and the propagation engine as independent tasks.
    ///
    /// # Errors
    ///
    /// Returns [`GossipError::AlreadyStarted`] on a second call; a closed
    /// protocol cannot be restarted.
    pub async fn start(&self) -> Result<(), GossipError> {
        if self.inner.started.swap(true, Ordering::SeqCst) {
            return Err(GossipError::AlreadyStarted);
        }
        let (connected, disconnected) = self.inner.net.subscribe_peer_events().await;
        let Some(intake) = self.inner.propagate_rx.lock().take() else {
            return Err(GossipError::AlreadyStarted);
        };

        tokio::spawn(ProtocolInner::membership_loop(
            Arc::clone(&self.inner),
            connected,
            disconnected,
            self.inner.shutdown.subscribe(),
        ));
        tokio::spawn(ProtocolInner::feed_loop(
            Arc::clone(&self.inner),
            intake,
            self.inner.shutdown.subscribe(),
        ));
        tokio::spawn(ProtocolInner::engine_loop(Arc::clone(&self.inner)));
        Ok(())
    }

    /// Signals shutdown to every protocol loop.
    ///
    /// The signal fires once; repeated calls are no-ops and never panic.
    /// The feed loop closes the propagation queue on observing shutdown,
    /// which in turn terminates the engine loop.
    pub fn close(&self) {
        if !self.inner.closed.swap(true, Ordering::SeqCst) {
            // No receivers just means no loop was ever started.
            let _ = self.inner.shutdown.send(());
        }
    }

    /// Submits a locally originated message to the propagation pipeline.
    ///
    /// The local node counts as the sender, so the message is never sent
    /// back to self during fan-out.
    ///
    /// # Errors
    ///
    /// Surfaces the validator hand-off error, if any. A successful return
    /// does not guarantee eventual delivery to any peer.
    pub async fn broadcast(&self, payload: Vec<u8>, protocol: &str) -> Result<(), GossipError> {
        debug!(protocol, "broadcasting local message");
        self.inner
            .process_message(self.inner.local_id, protocol, payload)
            .await
    }

    /// Submits an externally received message to the propagation pipeline.
    ///
    /// Identical to [`broadcast`](Self::broadcast) except that the remote
    /// sender's identity is preserved so fan-out can exclude it.
    ///
    /// # Errors
    ///
    /// Surfaces the validator hand-off error, if any.
    pub async fn relay(
        &self,
        sender: PeerId,
        protocol: &str,
        payload: Vec<u8>,
    ) -> Result<(), GossipError> {
        self.inner.process_message(sender, protocol, payload).await
    }

    /// Sets the propagation priority for a sub-protocol.
    ///
    /// Affects only messages classified after the call.
    pub fn set_priority(&self, protocol: &str, priority: Priority) {
        self.inner.priorities.set(protocol, priority);
    }

    /// Returns the local node's identifier.
    #[must_use]
    pub fn local_id(&self) -> PeerId {
        self.inner.local_id
    }

    /// Returns the observability counters.
    #[must_use]
    pub fn metrics(&self) -> Arc<GossipMetrics> {
        Arc::clone(&self.inner.metrics)
    }

    /// Number of currently registered peers.
    pub async fn peer_count(&self) -> usize {
        self.inner.peers.len().await
    }

    /// Returns true if a peer with the given id is registered.
    pub async fn has_peer(&self, id: &PeerId) -> bool {
        self.inner.peers.contains(id).await
    }
}

impl ProtocolInner {
    /// Shared intake for `broadcast` and `relay`.
    async fn process_message(
        &self,
        sender: PeerId,
        protocol: &str,
        payload: Vec<u8>,
    ) -> Result<(), GossipError> {
        let fingerprint = Fingerprint::compute(&payload, protocol);

        if self.dedup.check_and_mark(fingerprint) {
            self.metrics.record_duplicate(protocol);
            debug!(from = %sender, protocol, %fingerprint, "dropping duplicate gossip message");
            return Ok(());
        }

        debug!(from = %sender, protocol, %fingerprint, "new gossip message");
        self.metrics.record_novel(protocol);
        self.net
            .process_gossip_message(sender, protocol, payload, self.propagate_tx.clone())
            .await
    }

    /// Consumes transport membership events and keeps the registry in sync.
    ///
    /// Registration is dispatched fire-and-forget so a slow registry lock
    /// cannot stall event consumption; completion of a connect and a
    /// following disconnect for the same id is therefore not ordered.
    async fn membership_loop(
        self: Arc<Self>,
        mut connected: mpsc::Receiver<PeerId>,
        mut disconnected: mpsc::Receiver<PeerId>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        loop {
            tokio::select! {
                peer = connected.recv() => {
                    let Some(peer) = peer else { break };
                    let inner = Arc::clone(&self);
                    tokio::spawn(async move { inner.add_peer(peer).await });
                }
                peer = disconnected.recv() => {
                    let Some(peer) = peer else { break };
                    let inner = Arc::clone(&self);
                    tokio::spawn(async move { inner.remove_peer(peer).await });
                }
                _ = shutdown.recv() => break,
            }
        }
        info!("gossip membership loop shut down");
    }

    async fn add_peer(&self, id: PeerId) {
        info!(peer = %id, "adding peer");
        self.peers.add(Peer::new(id, Arc::clone(&self.net))).await;
    }

    async fn remove_peer(&self, id: PeerId) {
        info!(peer = %id, "removing peer");
        self.peers.remove(&id).await;
    }

    /// Moves validated records from the intake channel into the priority
    /// queue, classifying each by its sub-protocol.
    async fn feed_loop(
        self: Arc<Self>,
        mut intake: mpsc::Receiver<ValidationRecord>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        loop {
            tokio::select! {
                record = intake.recv() => {
                    let Some(record) = record else {
                        info!("validated-record channel closed, stopping propagation feed");
                        self.queue.close();
                        return;
                    };
                    let priority = self.priorities.get(&record.protocol);
                    let protocol = record.protocol.clone();
                    if let Err(err) = self.queue.write(priority, record).await {
                        error!(%err, %protocol, "could not write to propagation queue, message dropped");
                    }
                    let depth = self.propagate_tx.max_capacity() - self.propagate_tx.capacity();
                    self.metrics.set_intake_depth(depth);
                }
                _ = shutdown.recv() => {
                    self.queue.close();
                    info!("propagation feed stopped: protocol shutdown");
                    return;
                }
            }
        }
    }

    /// Single consumer of the propagation queue.
    ///
    /// Fan-out of record N completes before record N+1 is dequeued.
    /// Terminates permanently once the queue reports closed.
    async fn engine_loop(self: Arc<Self>) {
        loop {
            match self.queue.read().await {
                Ok(record) => {
                    let fingerprint = Fingerprint::compute(&record.payload, &record.protocol);
                    debug!(protocol = %record.protocol, %fingerprint, "relaying gossip message");
                    self.propagate(record, fingerprint).await;
                }
                Err(QueueError::Closed) => {
                    info!("propagation queue closed, stopping engine");
                    return;
                }
            }
        }
    }

    /// Sends one record to every registered peer except its sender.
    ///
    /// One task per peer, all joined before returning; an individual
    /// failure is logged and never aborts the siblings. There is no
    /// per-send timeout: an unresponsive peer stalls the whole batch, and
    /// transitively the pipeline, until the transport gives up on it.
    async fn propagate(&self, record: ValidationRecord, fingerprint: Fingerprint) {
        let peers = self.peers.snapshot_peers().await;
        let mut sends = Vec::with_capacity(peers.len());
        for peer in peers {
            if peer.id() == record.sender {
                continue;
            }
            let protocol = record.protocol.clone();
            let payload = record.payload.clone();
            sends.push(tokio::spawn(async move {
                if let Err(err) = peer.send(&protocol, payload).await {
                    warn!(
                        peer = %peer.id(),
                        %protocol,
                        %fingerprint,
                        %err,
                        "failed sending gossip message"
                    );
                }
            }));
        }
        future::join_all(sends).await;
    }
}

impl std::fmt::Debug for GossipProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GossipProtocol")
            .field("local_id", &self.inner.local_id)
            .field("started", &self.inner.started.load(Ordering::SeqCst))
            .field("closed", &self.inner.closed.load(Ordering::SeqCst))
            .finish()
    }
}
