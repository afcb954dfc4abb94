//! Timestamp Sources

use std::sync::atomic::{AtomicU32, Ordering};

/// Source of record timestamps. Values are opaque ticks, not wall time,
/// and never 0.
pub trait TickSource {
    fn now(&self) -> u32;
}

/// Counter that advances on every call, skipping 0 when it wraps
#[derive(Debug, Default)]
pub struct MonotonicTicks {
    counter: AtomicU32,
}

impl MonotonicTicks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start counting after `tick`
    pub fn starting_at(tick: u32) -> Self {
        Self {
            counter: AtomicU32::new(tick),
        }
    }
}

impl TickSource for MonotonicTicks {
    fn now(&self) -> u32 {
        loop {
            let tick = self.counter.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
            if tick != 0 {
                return tick;
            }
        }
    }
}

/// Constant tick, for deterministic parsing
#[derive(Debug, Clone, Copy)]
pub struct FixedTicks(u32);

impl FixedTicks {
    /// A zero tick is bumped to 1
    pub fn new(tick: u32) -> Self {
        Self(tick.max(1))
    }
}

impl TickSource for FixedTicks {
    fn now(&self) -> u32 {
        self.0
    }
}

impl<T: TickSource + ?Sized> TickSource for &T {
    fn now(&self) -> u32 {
        (**self).now()
    }
}
