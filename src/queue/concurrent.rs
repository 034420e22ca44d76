//! Concurrent FIFO queue (replaces `aqueues.c`'s `AQUEUE_t`, the atomic
//! handoff queue between the acceptor and the worker threads).
//!
//! Identical semantics to [`BoundedQueue`] with a single mutex guarding every
//! mutating and observing operation, plus a lock-free `count_hint()` used
//! only to decide whether a non-blocking drain is worth attempting.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::error::{CoreError, CoreResult};
use crate::queue::bounded::BoundedQueue;

/// Multi-producer/multi-consumer bounded FIFO queue.
pub struct ConcurrentQueue<T> {
    inner: Mutex<Inner<T>>,
    /// Observable without the lock, as a hint only — never authoritative.
    count_hint: AtomicUsize,
}

struct Inner<T> {
    queue: BoundedQueue<T>,
    closed: bool,
}

impl<T> ConcurrentQueue<T> {
    /// Creates an empty, open queue bounded at `cap` items.
    pub fn create(cap: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                queue: BoundedQueue::create(cap),
                closed: false,
            }),
            count_hint: AtomicUsize::new(0),
        }
    }

    /// A racy, lock-free count snapshot. Callers may use it only to decide
    /// whether attempting a non-blocking `pop` is worthwhile — never to make
    /// correctness decisions.
    pub fn count_hint(&self) -> usize {
        self.count_hint.load(Ordering::Relaxed)
    }

    /// Appends `item` to the tail under the lock.
    ///
    /// Fails with [`CoreError::Closed`] after [`Self::close`], or
    /// [`CoreError::Full`] at capacity.
    pub fn push(&self, item: T) -> CoreResult<()> {
        let mut guard = self.inner.lock().unwrap();
        if guard.closed {
            return Err(CoreError::Closed);
        }
        guard.queue.push(item)?;
        self.count_hint.store(guard.queue.len(), Ordering::Relaxed);
        Ok(())
    }

    /// Removes and returns the head item under the lock.
    ///
    /// After [`Self::close`], pending items still drain via `pop` until the
    /// queue is empty, at which point `pop` starts returning
    /// [`CoreError::Closed`] instead of `Ok(None)`.
    pub fn pop(&self) -> CoreResult<Option<T>> {
        let mut guard = self.inner.lock().unwrap();
        let item = guard.queue.pop();
        self.count_hint.store(guard.queue.len(), Ordering::Relaxed);
        if item.is_none() && guard.closed {
            return Err(CoreError::Closed);
        }
        Ok(item)
    }

    /// Returns the head item without removing it.
    pub fn peek_cloned(&self) -> Option<T>
    where
        T: Clone,
    {
        let guard = self.inner.lock().unwrap();
        guard.queue.peek().cloned()
    }

    /// Linear scan testing every payload against `predicate`.
    pub fn contains(&self, predicate: impl Fn(&T) -> bool) -> bool {
        let guard = self.inner.lock().unwrap();
        guard.queue.contains(predicate)
    }

    /// Drops every queued item, leaving the queue empty but still open
    /// (unless previously closed).
    pub fn clear(&self) {
        let mut guard = self.inner.lock().unwrap();
        guard.queue.clear();
        self.count_hint.store(0, Ordering::Relaxed);
    }

    /// Marks the queue closed: no further `push` succeeds, and `pop` returns
    /// [`CoreError::Closed`] once drained.
    pub fn close(&self) {
        let mut guard = self.inner.lock().unwrap();
        guard.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().unwrap().closed
    }

    /// Closes then clears — the concurrent-queue teardown vocabulary
    /// matching `destroy_queue()` in the C original.
    pub fn destroy(&self) {
        self.close();
        self.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn push_pop_roundtrip() {
        let q = ConcurrentQueue::create(4);
        q.push(1).unwrap();
        q.push(2).unwrap();
        assert_eq!(q.pop().unwrap(), Some(1));
        assert_eq!(q.pop().unwrap(), Some(2));
        assert_eq!(q.pop().unwrap(), None);
    }

    #[test]
    fn full_at_capacity() {
        let q = ConcurrentQueue::create(1);
        q.push(1).unwrap();
        assert!(matches!(q.push(2), Err(CoreError::Full)));
    }

    #[test]
    fn closed_after_drain() {
        let q = ConcurrentQueue::create(4);
        q.push(1).unwrap();
        q.close();
        assert!(matches!(q.push(2), Err(CoreError::Closed)));
        // Pending item still drains.
        assert_eq!(q.pop().unwrap(), Some(1));
        // Then Closed, not Ok(None).
        assert!(matches!(q.pop(), Err(CoreError::Closed)));
    }

    #[test]
    fn count_hint_tracks_length() {
        let q = ConcurrentQueue::create(8);
        assert_eq!(q.count_hint(), 0);
        q.push(1).unwrap();
        q.push(2).unwrap();
        assert_eq!(q.count_hint(), 2);
        q.pop().unwrap();
        assert_eq!(q.count_hint(), 1);
    }

    /// S2: 1000 items pushed from one thread, popped from another; recovered
    /// sequence equals the push sequence.
    #[test]
    fn single_producer_single_consumer_preserves_order() {
        let q = Arc::new(ConcurrentQueue::create(MAX_QUEUE_NODES_FOR_TEST));
        let producer_q = q.clone();
        let producer = thread::spawn(move || {
            for i in 0..1000u32 {
                loop {
                    match producer_q.push(i) {
                        Ok(()) => break,
                        Err(CoreError::Full) => thread::yield_now(),
                        Err(e) => panic!("unexpected push error: {e}"),
                    }
                }
            }
        });

        let consumer_q = q.clone();
        let consumer = thread::spawn(move || {
            let mut collected = Vec::with_capacity(1000);
            while collected.len() < 1000 {
                match consumer_q.pop() {
                    Ok(Some(v)) => collected.push(v),
                    Ok(None) => thread::yield_now(),
                    Err(e) => panic!("unexpected pop error: {e}"),
                }
            }
            collected
        });

        producer.join().unwrap();
        let collected = consumer.join().unwrap();
        let expected: Vec<u32> = (0..1000).collect();
        assert_eq!(collected, expected);
    }

    const MAX_QUEUE_NODES_FOR_TEST: usize = 1000;
}
