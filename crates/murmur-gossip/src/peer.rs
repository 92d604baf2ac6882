//! Peer identity and per-peer send capability.
//!
//! - [`PeerId`]: opaque, stable 32-byte public identifier for a peer
//! - [`Peer`]: a connected peer together with the capability to deliver a
//!   payload to it over a named sub-protocol

use crate::error::GossipError;
use crate::transport::Transport;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Unique identifier for a peer in the network.
///
/// The bytes are an opaque public identifier handed to us by the transport
/// (typically a raw public key); the gossip core never interprets them.
/// Displayed as base58 for log readability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeerId {
    bytes: [u8; 32],
}

impl PeerId {
    /// Creates a `PeerId` from raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self { bytes }
    }

    /// Returns the raw bytes of the peer ID.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", bs58::encode(&self.bytes).into_string())
    }
}

impl From<[u8; 32]> for PeerId {
    fn from(bytes: [u8; 32]) -> Self {
        Self::from_bytes(bytes)
    }
}

/// A connected peer and its send capability.
///
/// Peers are created on connect events and dropped on disconnect events;
/// the registry is their sole owner. Fan-out holds a clone only for the
/// duration of one batch.
pub struct Peer {
    id: PeerId,
    net: Arc<dyn Transport>,
}

impl Peer {
    /// Creates a peer backed by the given transport.
    #[must_use]
    pub fn new(id: PeerId, net: Arc<dyn Transport>) -> Self {
        Self { id, net }
    }

    /// Returns the peer's identifier.
    #[must_use]
    pub const fn id(&self) -> PeerId {
        self.id
    }

    /// Delivers `payload` to this peer over `protocol`.
    ///
    /// # Errors
    ///
    /// Returns whatever the transport reports; the caller decides whether
    /// the failure matters.
    pub async fn send(&self, protocol: &str, payload: Vec<u8>) -> Result<(), GossipError> {
        self.net.send_message(self.id, protocol, payload).await
    }
}

impl fmt::Debug for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Peer").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peer_id_roundtrips_bytes() {
        let id = PeerId::from_bytes([7u8; 32]);
        assert_eq!(id.as_bytes(), &[7u8; 32]);
    }

    #[test]
    fn peer_id_display_is_base58() {
        let id = PeerId::from_bytes([0u8; 32]);
        // All-zero key encodes to all '1's in base58.
        assert_eq!(id.to_string(), "1".repeat(32));
    }

    #[test]
    fn peer_id_equality_is_by_bytes() {
        let a = PeerId::from_bytes([1u8; 32]);
        let b = PeerId::from_bytes([1u8; 32]);
        let c = PeerId::from_bytes([2u8; 32]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
