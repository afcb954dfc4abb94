//! Lock-Free Byte Ring Implementation

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

/// Lock-free SPSC ring of bytes with `N` slots.
///
/// One slot is always left empty so that `head == tail` means empty and
/// `head + 1 == tail` means full; the usable capacity is `N - 1`.
///
/// Discipline: exactly one context calls [`push`](Self::push) (the producer)
/// and exactly one context calls [`pop`](Self::pop) and
/// [`clear`](Self::clear) (the consumer). The producer publishes `head` with
/// release ordering after storing the payload; the consumer publishes `tail`
/// with release ordering after loading it.
pub struct ByteRing<const N: usize> {
    /// Slot storage, written only at `head` and read only at `tail`
    slots: UnsafeCell<[u8; N]>,
    /// Next slot to write (owned by the producer)
    head: AtomicUsize,
    /// Next slot to read (owned by the consumer)
    tail: AtomicUsize,
    /// Pushes rejected because the ring was full
    overflows: AtomicU32,
    /// Bytes accepted since construction
    total_written: AtomicU32,
}

// SAFETY: the producer only touches the slot at `head` before publishing it,
// the consumer only touches the slot at `tail` after observing it published.
unsafe impl<const N: usize> Sync for ByteRing<N> {}

impl<const N: usize> ByteRing<N> {
    const CAPACITY_OK: () = assert!(N >= 2, "ring needs at least two slots");

    /// Create an empty ring. Usable in `static` items.
    pub const fn new() -> Self {
        let () = Self::CAPACITY_OK;
        Self {
            slots: UnsafeCell::new([0; N]),
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
            overflows: AtomicU32::new(0),
            total_written: AtomicU32::new(0),
        }
    }

    #[inline(always)]
    const fn advance(index: usize) -> usize {
        if index + 1 == N {
            0
        } else {
            index + 1
        }
    }

    /// Append a byte (producer side).
    ///
    /// Returns `false` and bumps the overflow count when the ring is full;
    /// the rejected byte is the one dropped.
    #[inline]
    pub fn push(&self, byte: u8) -> bool {
        let head = self.head.load(Ordering::Relaxed);
        let next = Self::advance(head);
        if next == self.tail.load(Ordering::Acquire) {
            self.overflows.fetch_add(1, Ordering::Relaxed);
            return false;
        }

        // SAFETY: `head < N`, and the consumer never reads this slot until
        // the release store below makes it visible.
        unsafe {
            self.slots.get().cast::<u8>().add(head).write(byte);
        }

        self.head.store(next, Ordering::Release);
        self.total_written.fetch_add(1, Ordering::Relaxed);
        true
    }

    /// Remove the oldest byte (consumer side).
    #[inline]
    pub fn pop(&self) -> Option<u8> {
        let tail = self.tail.load(Ordering::Relaxed);
        if tail == self.head.load(Ordering::Acquire) {
            return None;
        }

        // SAFETY: `tail < N` and the acquire load above observed the
        // producer's publication of this slot.
        let byte = unsafe { self.slots.get().cast::<u8>().add(tail).read() };

        self.tail.store(Self::advance(tail), Ordering::Release);
        Some(byte)
    }

    /// Number of bytes currently queued
    pub fn len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        if head >= tail {
            head - tail
        } else {
            N - tail + head
        }
    }

    /// Check if ring is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check if ring is full
    pub fn is_full(&self) -> bool {
        self.len() == N - 1
    }

    /// Number of bytes that can still be pushed
    pub fn free(&self) -> usize {
        N - 1 - self.len()
    }

    /// Get the slot count `N`
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Pushes rejected because the ring was full
    pub fn overflow_count(&self) -> u32 {
        self.overflows.load(Ordering::Relaxed)
    }

    /// Bytes accepted since construction (wraps at `u32::MAX`)
    pub fn total_written(&self) -> u32 {
        self.total_written.load(Ordering::Relaxed)
    }

    /// Discard every queued byte (consumer side).
    ///
    /// Callers that share the ring with an interrupt disable that interrupt
    /// around this call so no byte is published halfway through.
    pub fn clear(&self) {
        self.tail
            .store(self.head.load(Ordering::Acquire), Ordering::Release);
    }
}

impl<const N: usize> Default for ByteRing<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::VecDeque;

    static SHARED: ByteRing<8> = ByteRing::new();

    #[test]
    fn test_push_and_pop_in_order() {
        let ring = ByteRing::<16>::new();

        for b in b"hello" {
            assert!(ring.push(*b));
        }
        assert_eq!(ring.len(), 5);

        let out: Vec<u8> = std::iter::from_fn(|| ring.pop()).collect();
        assert_eq!(out, b"hello");
        assert!(ring.is_empty());
    }

    #[test]
    fn test_full_ring_drops_newest() {
        let ring = ByteRing::<4>::new();

        assert!(ring.push(1));
        assert!(ring.push(2));
        assert!(ring.push(3));
        assert!(ring.is_full());

        // One slot stays reserved
        assert!(!ring.push(4));
        assert_eq!(ring.overflow_count(), 1);
        assert_eq!(ring.len(), 3);

        assert_eq!(ring.pop(), Some(1));
        assert_eq!(ring.pop(), Some(2));
        assert_eq!(ring.pop(), Some(3));
        assert_eq!(ring.pop(), None);
    }

    #[test]
    fn test_wrap_around() {
        let ring = ByteRing::<4>::new();

        for round in 0..10u8 {
            assert!(ring.push(round));
            assert!(ring.push(round.wrapping_add(100)));
            assert_eq!(ring.pop(), Some(round));
            assert_eq!(ring.pop(), Some(round.wrapping_add(100)));
        }
        assert_eq!(ring.total_written(), 20);
        assert_eq!(ring.overflow_count(), 0);
    }

    #[test]
    fn test_clear() {
        let ring = ByteRing::<8>::new();
        for b in 0..5 {
            ring.push(b);
        }

        ring.clear();
        assert!(ring.is_empty());
        assert_eq!(ring.free(), 7);

        assert!(ring.push(42));
        assert_eq!(ring.pop(), Some(42));
    }

    #[test]
    fn test_static_ring() {
        assert!(SHARED.push(7));
        assert_eq!(SHARED.pop(), Some(7));
        assert_eq!(SHARED.capacity(), 8);
    }

    #[test]
    fn test_spsc_across_threads() {
        let ring = ByteRing::<64>::new();
        const COUNT: usize = 20_000;

        let received = std::thread::scope(|s| {
            s.spawn(|| {
                for i in 0..COUNT {
                    while !ring.push((i % 251) as u8) {
                        std::hint::spin_loop();
                    }
                }
            });

            let mut received = Vec::with_capacity(COUNT);
            while received.len() < COUNT {
                match ring.pop() {
                    Some(b) => received.push(b),
                    None => std::hint::spin_loop(),
                }
            }
            received
        });

        assert!(received
            .iter()
            .enumerate()
            .all(|(i, b)| *b == (i % 251) as u8));
    }

    proptest! {
        // Every pushed byte is either popped in order or counted as an overflow.
        #[test]
        fn prop_matches_bounded_queue(ops in proptest::collection::vec(any::<Option<u8>>(), 0..400)) {
            let ring = ByteRing::<16>::new();
            let mut model = VecDeque::new();
            let mut dropped = 0u32;

            for op in ops {
                match op {
                    Some(b) => {
                        if model.len() < 15 {
                            model.push_back(b);
                            prop_assert!(ring.push(b));
                        } else {
                            dropped += 1;
                            prop_assert!(!ring.push(b));
                        }
                    }
                    None => prop_assert_eq!(ring.pop(), model.pop_front()),
                }
                prop_assert_eq!(ring.len(), model.len());
                prop_assert!(ring.len() <= 15);
            }
            prop_assert_eq!(ring.overflow_count(), dropped);
        }
    }
}
