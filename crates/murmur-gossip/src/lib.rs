//! # murmur-gossip
//!
//! Message-propagation core of the Murmur peer-to-peer gossip layer.
//!
//! This crate decides which inbound messages are novel, hands novel
//! messages to an external validator, and fans validated messages back out
//! to all known peers while suppressing duplicates and re-broadcast storms.
//! Transport, peer discovery, and validation logic itself live behind the
//! [`Transport`] trait; this crate only drives them.
//!
//! ## Core Types
//!
//! - [`GossipProtocol`]: lifecycle, `broadcast`/`relay` entry points, and
//!   the concurrently running propagation loops
//! - [`DoubleCache`]: bounded two-generation deduplication cache
//! - [`PeerRegistry`]: thread-safe set of currently connected peers
//! - [`PriorityClassifier`]: sub-protocol to propagation-priority mapping
//! - [`Fingerprint`]: 12-byte digest identifying a message for dedup
//! - [`GossipMetrics`]: duplicate/novel counters and intake depth gauge

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod classifier;
pub mod dedup;
pub mod error;
pub mod fingerprint;
pub mod metrics;
pub mod peer;
pub mod protocol;
pub mod registry;
pub mod transport;

pub use classifier::PriorityClassifier;
pub use dedup::{DEFAULT_DEDUP_CAPACITY, DoubleCache};
pub use error::GossipError;
pub use fingerprint::{FINGERPRINT_LEN, Fingerprint};
pub use metrics::{GossipMetrics, MetricsSnapshot};
pub use peer::{Peer, PeerId};
pub use protocol::{DEFAULT_PROPAGATE_BUFFER, GossipConfig, GossipProtocol};
pub use registry::PeerRegistry;
pub use transport::{BoxFuture, Transport, ValidationRecord};

// The propagation priority levels come from the queue crate; re-exported so
// embedders configuring priorities need only this crate.
pub use murmur_priorityq::Priority;
