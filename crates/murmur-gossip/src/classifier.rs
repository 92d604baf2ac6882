//! Sub-protocol to propagation-priority mapping.

use murmur_priorityq::Priority;
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::warn;

/// Maps sub-protocol names to propagation priorities.
///
/// Mutated rarely (administrative), read for every validated message, so a
/// coarse read/write lock is enough. Unconfigured protocols resolve to
/// [`Priority::Low`] with a warning rather than an error.
#[derive(Debug, Default)]
pub struct PriorityClassifier {
    priorities: RwLock<HashMap<String, Priority>>,
}

impl PriorityClassifier {
    /// Creates a classifier with no configured protocols.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the configured priority for `protocol`, or [`Priority::Low`]
    /// with a logged warning if none was set.
    pub fn get(&self, protocol: &str) -> Priority {
        if let Some(priority) = self.priorities.read().get(protocol) {
            return *priority;
        }
        warn!(protocol, "no priority configured for protocol, defaulting to low");
        Priority::Low
    }

    /// Sets the priority for `protocol`, overwriting any previous value.
    ///
    /// Takes effect for subsequently classified messages only; messages
    /// already queued keep the priority they were classified with.
    pub fn set(&self, protocol: impl Into<String>, priority: Priority) {
        self.priorities.write().insert(protocol.into(), priority);
    }
}
