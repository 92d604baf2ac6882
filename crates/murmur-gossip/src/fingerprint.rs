//! Message fingerprints for deduplication.
//!
//! A [`Fingerprint`] is a fixed-size digest of a message payload and the
//! sub-protocol it travels on. Two messages with identical payload and
//! sub-protocol fingerprint identically regardless of who sent them, which
//! makes the fingerprint the sole dedup key. Digest collisions are treated
//! as message identity; with 12 bytes of blake3 output that risk is
//! accepted.

use std::fmt;

/// Size of a message fingerprint in bytes.
pub const FINGERPRINT_LEN: usize = 12;

/// Fixed-size digest identifying a gossip message for dedup purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; FINGERPRINT_LEN]);

impl Fingerprint {
    /// Computes the fingerprint of a payload on a given sub-protocol.
    ///
    /// The digest covers the payload bytes followed by the sub-protocol
    /// name, so recomputing from the same fields is byte-identical to the
    /// original computation.
    #[must_use]
    pub fn compute(payload: &[u8], protocol: &str) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(payload);
        hasher.update(protocol.as_bytes());
        let digest = hasher.finalize();
        let mut bytes = [0u8; FINGERPRINT_LEN];
        bytes.copy_from_slice(&digest.as_bytes()[..FINGERPRINT_LEN]);
        Self(bytes)
    }

    /// Returns the raw digest bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; FINGERPRINT_LEN] {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}
