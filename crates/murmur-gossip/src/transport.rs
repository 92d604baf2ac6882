//! Boundary to the transport collaborator.
//!
//! The gossip core never opens sockets or validates message contents. Both
//! concerns live behind [`Transport`]: it delivers payloads to peers,
//! surfaces peer connect/disconnect events, and hands novel messages to the
//! external validator. Accepted messages come back asynchronously as
//! [`ValidationRecord`]s on the channel supplied with the hand-off.

use crate::error::GossipError;
use crate::peer::PeerId;
use std::future::Future;
use std::pin::Pin;
use tokio::sync::mpsc;

/// Boxed future type for async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A message that passed external validation and is ready for propagation.
///
/// Deliberately carries no fingerprint: the fingerprint is recomputed from
/// these fields at propagation time and must come out byte-identical to the
/// one computed at intake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationRecord {
    /// The peer the message originally arrived from (the local node for
    /// locally originated broadcasts). Excluded from fan-out.
    pub sender: PeerId,
    /// Sub-protocol the message travels on.
    pub protocol: String,
    /// Raw message bytes.
    pub payload: Vec<u8>,
}

impl ValidationRecord {
    /// Creates a validation record.
    #[must_use]
    pub fn new(sender: PeerId, protocol: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            sender,
            protocol: protocol.into(),
            payload,
        }
    }
}

/// Interface to the underlying p2p transport layer.
///
/// Implementations handle sockets, handshakes, and message validation
/// routing; the gossip core only drives this interface.
pub trait Transport: Send + Sync {
    /// Delivers `payload` to `peer` over the named sub-protocol.
    ///
    /// # Errors
    ///
    /// Returns an error if the send fails. The gossip core logs and moves
    /// on; it never retries.
    fn send_message<'a>(
        &'a self,
        peer: PeerId,
        protocol: &'a str,
        payload: Vec<u8>,
    ) -> BoxFuture<'a, Result<(), GossipError>>;

    /// Subscribes to peer membership events.
    ///
    /// Returns a stream of connected peer ids and a stream of disconnected
    /// peer ids. May not resolve until the transport is ready to emit
    /// events. Closure of either stream signals permanent unavailability.
    fn subscribe_peer_events(
        &self,
    ) -> BoxFuture<'_, (mpsc::Receiver<PeerId>, mpsc::Receiver<PeerId>)>;

    /// Hands a novel message to the external validator.
    ///
    /// Messages the validator accepts arrive asynchronously on
    /// `validated_tx` as [`ValidationRecord`]s.
    ///
    /// # Errors
    ///
    /// Returns an error if the hand-off itself fails; acceptance or
    /// rejection of the message is reported only through the channel.
    fn process_gossip_message<'a>(
        &'a self,
        sender: PeerId,
        protocol: &'a str,
        payload: Vec<u8>,
        validated_tx: mpsc::Sender<ValidationRecord>,
    ) -> BoxFuture<'a, Result<(), GossipError>>;
}
