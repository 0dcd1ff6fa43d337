//! The hand-off between the network thread and the simulation thread.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A mutex-guarded FIFO with an atomic "has pending" flag.
///
/// The producer pushes one item at a time; the consumer drains everything
/// once per tick. The flag lets an idle consumer skip the lock entirely.
#[derive(Debug)]
pub struct PacketQueue<T> {
    items: Mutex<VecDeque<T>>,
    pending: AtomicBool,
}

impl<T> Default for PacketQueue<T> {
    fn default() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            pending: AtomicBool::new(false),
        }
    }
}

impl<T> PacketQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock can't leave the deque half-modified,
    // so a poisoned lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, VecDeque<T>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends an item and raises the pending flag.
    pub fn push(&self, item: T) {
        let mut items = self.lock();
        items.push_back(item);
        self.pending.store(true, Ordering::Release);
    }

    /// Whether anything is waiting. Doesn't take the lock.
    pub fn has_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Takes every queued item in arrival order.
    pub fn drain(&self) -> Vec<T> {
        if !self.has_pending() {
            return Vec::new();
        }
        let mut items = self.lock();
        self.pending.store(false, Ordering::Release);
        items.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_drain_empty_queue_returns_nothing() {
        let q: PacketQueue<u32> = PacketQueue::new();
        assert!(!q.has_pending());
        assert!(q.drain().is_empty());
    }

    #[test]
    fn test_drain_preserves_arrival_order() {
        let q = PacketQueue::new();
        q.push(1);
        q.push(2);
        q.push(3);
        assert!(q.has_pending());
        assert_eq!(q.drain(), vec![1, 2, 3]);
        assert!(!q.has_pending());
        assert!(q.is_empty());
    }

    #[test]
    fn test_push_after_drain_raises_flag_again() {
        let q = PacketQueue::new();
        q.push("a");
        q.drain();
        q.push("b");
        assert!(q.has_pending());
        assert_eq!(q.drain(), vec!["b"]);
    }

    #[test]
    fn test_concurrent_producers_lose_nothing() {
        let q = Arc::new(PacketQueue::new());
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let q = Arc::clone(&q);
                std::thread::spawn(move || {
                    for i in 0..250 {
                        q.push(t * 1000 + i);
                    }
                })
            })
            .collect();

        let mut seen = Vec::new();
        for h in handles {
            h.join().unwrap();
        }
        seen.extend(q.drain());
        assert_eq!(seen.len(), 1000);
    }
}
