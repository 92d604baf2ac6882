//! # murmur-priorityq
//!
//! A bounded, priority-aware, closeable async queue.
//!
//! The queue decouples "message accepted for propagation" from "message is
//! being sent to peers": producers write items tagged with a [`Priority`],
//! a consumer reads them back highest-priority-first, FIFO within one
//! priority level.
//!
//! Under sustained high-priority load, low-priority items can be starved
//! indefinitely. That is a deliberate tradeoff: propagation of urgent
//! traffic is never delayed behind a backlog of bulk traffic.
//!
//! ## Core Types
//!
//! - [`Priority`]: three-level propagation priority
//! - [`PriorityQueue`]: the queue itself
//! - [`QueueError`]: returned once the queue has been closed

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use thiserror::Error;
use tokio::sync::Notify;

/// Number of distinct priority levels.
const LEVELS: usize = 3;

/// Propagation priority of a queued item.
///
/// Ordering follows declaration order: `Low < Mid < High`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    /// Lowest priority; the default for unclassified traffic.
    #[default]
    Low,
    /// Medium priority.
    Mid,
    /// Highest priority; always drained first.
    High,
}

impl Priority {
    /// Index of this priority into the internal per-level queues.
    const fn index(self) -> usize {
        match self {
            Self::Low => 0,
            Self::Mid => 1,
            Self::High => 2,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Mid => write!(f, "mid"),
            Self::High => write!(f, "high"),
        }
    }
}

/// Errors returned by [`PriorityQueue`] operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    /// The queue has been closed. Writes fail immediately; reads fail once
    /// all previously accepted items have been drained.
    #[error("priority queue closed")]
    Closed,
}

struct Inner<T> {
    levels: [VecDeque<T>; LEVELS],
    len: usize,
    closed: bool,
}

impl<T> Inner<T> {
    /// Pops the front of the highest non-empty level.
    fn pop(&mut self) -> Option<T> {
        for level in self.levels.iter_mut().rev() {
            if let Some(item) = level.pop_front() {
                self.len -= 1;
                return Some(item);
            }
        }
        None
    }
}

/// Bounded, closeable queue delivering items highest-priority-first.
///
/// Writers wait while the queue is at capacity; the waiting write fails with
/// [`QueueError::Closed`] if the queue is closed in the meantime. Readers
/// wait for an item; after [`close`](Self::close) they continue to drain
/// whatever was already accepted and only then observe `Closed`.
pub struct PriorityQueue<T> {
    capacity: usize,
    inner: Mutex<Inner<T>>,
    readable: Notify,
    writable: Notify,
}

impl<T> PriorityQueue<T> {
    /// Creates a queue bounded at `capacity` items across all priorities.
    ///
    /// A zero capacity is rounded up to one so that a write can always
    /// eventually make progress.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(Inner {
                levels: [VecDeque::new(), VecDeque::new(), VecDeque::new()],
                len: 0,
                closed: false,
            }),
            readable: Notify::new(),
            writable: Notify::new(),
        }
    }

    /// Enqueues `item` at `priority`, waiting for space if the queue is full.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Closed`] if the queue was closed before the
    /// item could be accepted.
    pub async fn write(&self, priority: Priority, item: T) -> Result<(), QueueError> {
        let mut pending = Some(item);
        loop {
            // Register for a wakeup before checking state so a notify
            // between the check and the await is not lost.
            let writable = self.writable.notified();
            {
                let mut inner = self.inner.lock();
                if inner.closed {
                    return Err(QueueError::Closed);
                }
                if inner.len < self.capacity {
                    if let Some(item) = pending.take() {
                        inner.levels[priority.index()].push_back(item);
                        inner.len += 1;
                    }
                    drop(inner);
                    self.readable.notify_one();
                    return Ok(());
                }
            }
            writable.await;
        }
    }

    /// Dequeues the next item, waiting until one is available.
    ///
    /// Higher-priority items are always preferred; items of equal priority
    /// come out in write order.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Closed`] once the queue is closed and empty.
    pub async fn read(&self) -> Result<T, QueueError> {
        loop {
            let readable = self.readable.notified();
            {
                let mut inner = self.inner.lock();
                if let Some(item) = inner.pop() {
                    drop(inner);
                    self.writable.notify_one();
                    return Ok(item);
                }
                if inner.closed {
                    return Err(QueueError::Closed);
                }
            }
            readable.await;
        }
    }

    /// Closes the queue, waking all pending reads and writes.
    ///
    /// Idempotent. Items already accepted remain readable.
    pub fn close(&self) {
        {
            let mut inner = self.inner.lock();
            if inner.closed {
                return;
            }
            inner.closed = true;
        }
        self.readable.notify_waiters();
        self.writable.notify_waiters();
    }

    /// Returns true if [`close`](Self::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    /// Number of items currently queued across all priorities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().len
    }

    /// Returns true if no items are queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> fmt::Debug for PriorityQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("PriorityQueue")
            .field("capacity", &self.capacity)
            .field("len", &inner.len)
            .field("closed", &inner.closed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::timeout;

    const TICK: Duration = Duration::from_millis(50);

    // ========== Priority Tests ==========

    #[test]
    fn priority_ordering() {
        assert!(Priority::Low < Priority::Mid);
        assert!(Priority::Mid < Priority::High);
    }

    #[test]
    fn priority_default_is_low() {
        assert_eq!(Priority::default(), Priority::Low);
    }

    // ========== Ordering Tests ==========

    #[tokio::test]
    async fn reads_highest_priority_first() {
        let q = PriorityQueue::new(10);
        q.write(Priority::Low, "low").await.unwrap();
        q.write(Priority::High, "high").await.unwrap();
        q.write(Priority::Mid, "mid").await.unwrap();

        assert_eq!(q.read().await.unwrap(), "high");
        assert_eq!(q.read().await.unwrap(), "mid");
        assert_eq!(q.read().await.unwrap(), "low");
    }

    #[tokio::test]
    async fn fifo_within_one_priority() {
        let q = PriorityQueue::new(10);
        for i in 0..5 {
            q.write(Priority::Mid, i).await.unwrap();
        }
        for i in 0..5 {
            assert_eq!(q.read().await.unwrap(), i);
        }
    }

    #[tokio::test]
    async fn read_blocks_until_write() {
        let q = Arc::new(PriorityQueue::new(4));

        // Nothing queued yet: read must not resolve.
        assert!(timeout(TICK, q.read()).await.is_err());

        let reader = {
            let q = Arc::clone(&q);
            tokio::spawn(async move { q.read().await })
        };
        q.write(Priority::Low, 7u32).await.unwrap();

        let got = timeout(Duration::from_secs(1), reader)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(got, Ok(7));
    }

    // ========== Capacity Tests ==========

    #[tokio::test]
    async fn write_waits_when_full() {
        let q = Arc::new(PriorityQueue::new(1));
        q.write(Priority::Low, 1u32).await.unwrap();

        // Queue full: second write must park.
        let blocked = {
            let q = Arc::clone(&q);
            tokio::spawn(async move { q.write(Priority::Low, 2).await })
        };
        tokio::time::sleep(TICK).await;
        assert!(!blocked.is_finished());

        // Draining one item frees the writer.
        assert_eq!(q.read().await.unwrap(), 1);
        timeout(Duration::from_secs(1), blocked)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(q.read().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn zero_capacity_rounds_up() {
        let q = PriorityQueue::new(0);
        q.write(Priority::Low, ()).await.unwrap();
        assert_eq!(q.len(), 1);
    }

    // ========== Close Tests ==========

    #[tokio::test]
    async fn write_after_close_fails() {
        let q = PriorityQueue::new(4);
        q.close();
        assert_eq!(q.write(Priority::High, 1u8).await, Err(QueueError::Closed));
    }

    #[tokio::test]
    async fn close_wakes_blocked_reader() {
        let q = Arc::new(PriorityQueue::<u8>::new(4));
        let reader = {
            let q = Arc::clone(&q);
            tokio::spawn(async move { q.read().await })
        };
        tokio::time::sleep(TICK).await;
        q.close();

        let got = timeout(Duration::from_secs(1), reader)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(got, Err(QueueError::Closed));
    }

    #[tokio::test]
    async fn close_wakes_blocked_writer() {
        let q = Arc::new(PriorityQueue::new(1));
        q.write(Priority::Low, 1u32).await.unwrap();

        let writer = {
            let q = Arc::clone(&q);
            tokio::spawn(async move { q.write(Priority::Low, 2).await })
        };
        tokio::time::sleep(TICK).await;
        q.close();

        let got = timeout(Duration::from_secs(1), writer)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(got, Err(QueueError::Closed));
    }

    #[tokio::test]
    async fn drains_accepted_items_after_close() {
        let q = PriorityQueue::new(10);
        q.write(Priority::Low, 1u32).await.unwrap();
        q.write(Priority::High, 2).await.unwrap();
        q.close();

        assert_eq!(q.read().await, Ok(2));
        assert_eq!(q.read().await, Ok(1));
        assert_eq!(q.read().await, Err(QueueError::Closed));
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let q = PriorityQueue::<u8>::new(4);
        q.close();
        q.close();
        assert!(q.is_closed());
    }

    // ========== Proptest ==========

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        fn arb_priority() -> impl Strategy<Value = Priority> {
            prop_oneof![
                Just(Priority::Low),
                Just(Priority::Mid),
                Just(Priority::High),
            ]
        }

        proptest! {
            #[test]
            fn drain_order_is_priority_then_fifo(
                items in proptest::collection::vec((arb_priority(), 0u32..1000), 0..64)
            ) {
                let rt = tokio::runtime::Builder::new_current_thread()
                    .build()
                    .unwrap();
                rt.block_on(async {
                    let q = PriorityQueue::new(items.len().max(1));
                    for (prio, item) in &items {
                        q.write(*prio, (*prio, *item)).await.unwrap();
                    }
                    q.close();

                    let mut drained = Vec::new();
                    while let Ok(item) = q.read().await {
                        drained.push(item);
                    }

                    // Same multiset in, and priorities never increase while
                    // draining.
                    assert_eq!(drained.len(), items.len());
                    for pair in drained.windows(2) {
                        assert!(pair[0].0 >= pair[1].0);
                    }
                    // FIFO within one level.
                    for level in [Priority::Low, Priority::Mid, Priority::High] {
                        let expected: Vec<u32> = items
                            .iter()
                            .filter(|(p, _)| *p == level)
                            .map(|(_, v)| *v)
                            .collect();
                        let got: Vec<u32> = drained
                            .iter()
                            .filter(|(p, _)| *p == level)
                            .map(|(_, v)| *v)
                            .collect();
                        assert_eq!(got, expected);
                    }
                });
            }
        }
    }
}
