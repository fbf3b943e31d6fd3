//! A fixed-capacity FIFO queue shared between producer and consumer threads.
//!
//! One mutex guards a circular buffer and one condition variable is broadcast
//! on every change, so blocked producers and consumers all re-check their
//! predicate after any enqueue or dequeue. Ordering among several threads
//! blocked at once is whatever order the condvar wakes them in; it is not
//! guaranteed to be first-come first-served.

use std::fmt;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

mod error;
pub use error::Error;

mod ring;
use ring::Ring;

mod trace;
use trace::{debug, trace};
pub use trace::init_tracing;


pub struct BoundedQueue<T> {
    capacity: usize,
    ring: Mutex<Ring<T>>,
    changed: Condvar,
}

impl<T> BoundedQueue<T> {
    /// Creates a queue holding at most `capacity` elements.
    ///
    /// A capacity of zero is rejected rather than clamped.
    pub fn new(capacity: usize) -> Result<BoundedQueue<T>, Error> {
        if capacity == 0 {
            return Err(Error::ZeroCapacity);
        }
        debug!(capacity, "created bounded queue");
        Ok(BoundedQueue {
            capacity,
            ring: Mutex::new(Ring::with_capacity(capacity)),
            changed: Condvar::new(),
        })
    }

    // No operation leaves the ring half-updated, so a poisoned lock (a panic
    // in `T::clone` during `peek`) still guards consistent state.
    fn lock(&self) -> MutexGuard<'_, Ring<T>> {
        self.ring.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wait<'a>(&self, ring: MutexGuard<'a, Ring<T>>) -> MutexGuard<'a, Ring<T>> {
        self.changed
            .wait(ring)
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn wait_timeout<'a>(
        &self,
        ring: MutexGuard<'a, Ring<T>>,
        timeout: Duration,
    ) -> MutexGuard<'a, Ring<T>> {
        let (ring, _) = self
            .changed
            .wait_timeout(ring, timeout)
            .unwrap_or_else(PoisonError::into_inner);
        ring
    }

    fn enqueue(&self, ring: &mut Ring<T>, value: T) -> Result<(), T> {
        ring.push(value)?;
        self.changed.notify_all();
        Ok(())
    }

    fn dequeue(&self, ring: &mut Ring<T>) -> Option<T> {
        let value = ring.pop()?;
        self.changed.notify_all();
        Some(value)
    }

    /// Inserts `value`, blocking while the queue is full.
    pub fn put(&self, mut value: T) {
        let mut ring = self.lock();
        loop {
            match self.enqueue(&mut ring, value) {
                Ok(()) => return,
                Err(ret) => value = ret,
            }
            trace!(capacity = self.capacity, "queue full, producer waiting");
            ring = self.wait(ring);
        }
    }

    /// Removes the oldest element, blocking while the queue is empty.
    pub fn take(&self) -> T {
        let mut ring = self.lock();
        loop {
            if let Some(value) = self.dequeue(&mut ring) {
                return value;
            }
            trace!("queue empty, consumer waiting");
            ring = self.wait(ring);
        }
    }

    /// Like [`put`](BoundedQueue::put), but gives `value` back if the queue
    /// is still full once `timeout` has elapsed.
    pub fn put_timeout(&self, mut value: T, timeout: Duration) -> Result<(), T> {
        let deadline = match Instant::now().checked_add(timeout) {
            Some(deadline) => deadline,
            None => {
                self.put(value);
                return Ok(());
            }
        };
        let mut ring = self.lock();
        loop {
            match self.enqueue(&mut ring, value) {
                Ok(()) => return Ok(()),
                Err(ret) => value = ret,
            }
            let now = Instant::now();
            if now >= deadline {
                trace!(?timeout, "timed out waiting for room");
                return Err(value);
            }
            ring = self.wait_timeout(ring, deadline - now);
        }
    }

    /// Like [`take`](BoundedQueue::take), but returns `None` if the queue is
    /// still empty once `timeout` has elapsed.
    pub fn take_timeout(&self, timeout: Duration) -> Option<T> {
        let deadline = match Instant::now().checked_add(timeout) {
            Some(deadline) => deadline,
            None => return Some(self.take()),
        };
        let mut ring = self.lock();
        loop {
            if let Some(value) = self.dequeue(&mut ring) {
                return Some(value);
            }
            let now = Instant::now();
            if now >= deadline {
                trace!(?timeout, "timed out waiting for an element");
                return None;
            }
            ring = self.wait_timeout(ring, deadline - now);
        }
    }

    /// Inserts `value` if there is room, otherwise hands it straight back.
    pub fn offer(&self, value: T) -> Result<(), T> {
        self.enqueue(&mut self.lock(), value)
    }

    /// Removes the oldest element, or returns `None` if the queue is empty.
    pub fn poll(&self) -> Option<T> {
        self.dequeue(&mut self.lock())
    }

    /// Returns a copy of the oldest element without removing it.
    pub fn peek(&self) -> Option<T>
    where
        T: Clone,
    {
        self.lock().front().cloned()
    }

    /// Removes up to `max` elements, oldest first, under a single lock
    /// acquisition. No other put or take interleaves with the batch.
    pub fn drain(&self, max: usize) -> Vec<T> {
        let mut ring = self.lock();
        let n = max.min(ring.len());
        let drained: Vec<T> = (0..n).filter_map(|_| ring.pop()).collect();
        if !drained.is_empty() {
            self.changed.notify_all();
            trace!(count = drained.len(), "drained");
        }
        drained
    }

    // The three snapshots below may be stale as soon as the lock drops.

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.lock().is_full()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Blocking iterator; each `next` is a [`take`](BoundedQueue::take) and
    /// never returns `None`.
    pub fn iter(&self) -> Iter<'_, T> {
        self.into_iter()
    }

    /// Non-blocking iterator that polls until the queue is observed empty.
    pub fn try_iter(&self) -> TryIter<'_, T> {
        TryIter { queue: self }
    }
}

impl<T> fmt::Debug for BoundedQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedQueue")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .finish()
    }
}

pub struct Iter<'a, T> {
    queue: &'a BoundedQueue<T>,
}

impl<T> Iterator for Iter<'_, T> {
    type Item = T;
    fn next(&mut self) -> Option<T> {
        Some(self.queue.take())
    }
}

impl<'a, T> IntoIterator for &'a BoundedQueue<T> {
    type IntoIter = Iter<'a, T>;
    type Item = T;
    fn into_iter(self) -> Self::IntoIter {
        Iter { queue: self }
    }
}

pub struct TryIter<'a, T> {
    queue: &'a BoundedQueue<T>,
}

impl<T> Iterator for TryIter<'_, T> {
    type Item = T;
    fn next(&mut self) -> Option<T> {
        self.queue.poll()
    }
}

/// Owning iterator over whatever was still queued, oldest first.
pub struct IntoIter<T> {
    ring: Ring<T>,
}

impl<T> Iterator for IntoIter<T> {
    type Item = T;
    fn next(&mut self) -> Option<T> {
        self.ring.pop()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.ring.len(), Some(self.ring.len()))
    }
}

impl<T> IntoIterator for BoundedQueue<T> {
    type IntoIter = IntoIter<T>;
    type Item = T;
    fn into_iter(self) -> IntoIter<T> {
        IntoIter {
            ring: self.ring.into_inner().unwrap_or_else(PoisonError::into_inner),
        }
    }
}
