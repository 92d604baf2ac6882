//! Error types for murmur-gossip.

use thiserror::Error;

/// Errors that can occur in the gossip core.
#[derive(Debug, Error)]
pub enum GossipError {
    /// Hand-off to the external message validator failed.
    #[error("validator hand-off failed: {0}")]
    Validator(String),

    /// The underlying transport reported a failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The protocol was started a second time.
    #[error("gossip protocol already started")]
    AlreadyStarted,
}
