//! Thread-safe registry of currently connected peers.
//!
//! The registry is the sole owner of [`Peer`] objects and the only
//! long-lived mutable shared structure in the gossip core. It owns its lock
//! internally and exposes only the operations below; neither the lock nor
//! the underlying map ever leaks out. Fan-out works from a snapshot so no
//! network send happens while the lock is held.

use crate::peer::{Peer, PeerId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Set of currently connected peers, keyed by their stable identifier.
#[derive(Debug, Default)]
pub struct PeerRegistry {
    peers: RwLock<HashMap<PeerId, Arc<Peer>>>,
}

impl PeerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            peers: RwLock::new(HashMap::new()),
        }
    }

    /// Inserts `peer`, replacing any existing entry with the same id.
    pub async fn add(&self, peer: Peer) {
        self.peers.write().await.insert(peer.id(), Arc::new(peer));
    }

    /// Removes the peer with the given id. Removing an absent id is a no-op.
    pub async fn remove(&self, id: &PeerId) {
        self.peers.write().await.remove(id);
    }

    /// Returns true if a peer with the given id is registered.
    pub async fn contains(&self, id: &PeerId) -> bool {
        self.peers.read().await.contains_key(id)
    }

    /// Number of registered peers.
    pub async fn len(&self) -> usize {
        self.peers.read().await.len()
    }

    /// Returns true if no peers are registered.
    pub async fn is_empty(&self) -> bool {
        self.peers.read().await.is_empty()
    }

    /// Returns the ids of all registered peers.
    pub async fn snapshot(&self) -> Vec<PeerId> {
        self.peers.read().await.keys().copied().collect()
    }

    /// Returns all registered peers for one fan-out batch.
    ///
    /// The returned clones are valid for the batch even if a peer is
    /// removed concurrently; the registry entry itself is gone either way.
    pub async fn snapshot_peers(&self) -> Vec<Arc<Peer>> {
        self.peers.read().await.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GossipError;
    use crate::transport::{BoxFuture, Transport, ValidationRecord};
    use tokio::sync::mpsc;

    struct NullTransport;

    impl Transport for NullTransport {
        fn send_message<'a>(
            &'a self,
            _peer: PeerId,
            _protocol: &'a str,
            _payload: Vec<u8>,
        ) -> BoxFuture<'a, Result<(), GossipError>> {
            Box::pin(async { Ok(()) })
        }

        fn subscribe_peer_events(
            &self,
        ) -> BoxFuture<'_, (mpsc::Receiver<PeerId>, mpsc::Receiver<PeerId>)> {
            Box::pin(async {
                let (_ctx, crx) = mpsc::channel(1);
                let (_dtx, drx) = mpsc::channel(1);
                (crx, drx)
            })
        }

        fn process_gossip_message<'a>(
            &'a self,
            _sender: PeerId,
            _protocol: &'a str,
            _payload: Vec<u8>,
            _validated_tx: mpsc::Sender<ValidationRecord>,
        ) -> BoxFuture<'a, Result<(), GossipError>> {
            Box::pin(async { Ok(()) })
        }
    }

    fn peer(n: u8) -> Peer {
        Peer::new(PeerId::from_bytes([n; 32]), Arc::new(NullTransport))
    }

    #[tokio::test]
    async fn add_and_contains() {
        let registry = PeerRegistry::new();
        let id = PeerId::from_bytes([1; 32]);

        assert!(!registry.contains(&id).await);
        registry.add(peer(1)).await;
        assert!(registry.contains(&id).await);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn add_same_id_keeps_one_entry() {
        let registry = PeerRegistry::new();
        registry.add(peer(1)).await;
        registry.add(peer(1)).await;
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn remove_absent_is_noop() {
        let registry = PeerRegistry::new();
        registry.remove(&PeerId::from_bytes([9; 32])).await;
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn remove_drops_entry() {
        let registry = PeerRegistry::new();
        let id = PeerId::from_bytes([2; 32]);
        registry.add(peer(2)).await;
        registry.remove(&id).await;
        assert!(!registry.contains(&id).await);
        assert_eq!(registry.len().await, 0);
    }

    #[tokio::test]
    async fn snapshot_reflects_membership() {
        let registry = PeerRegistry::new();
        registry.add(peer(1)).await;
        registry.add(peer(2)).await;
        registry.add(peer(3)).await;
        registry.remove(&PeerId::from_bytes([2; 32])).await;

        let ids = registry.snapshot().await;
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&PeerId::from_bytes([1; 32])));
        assert!(ids.contains(&PeerId::from_bytes([3; 32])));
    }
}
