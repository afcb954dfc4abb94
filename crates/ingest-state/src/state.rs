//! Shared Counters and Registers

use crate::kind::{ErrorKind, StoreStatus, Subsystem};
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};

/// Statistics counters. All wrap modulo 2^32.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    /// Bytes delivered by the receive interrupt (dropped ones included)
    RxBytes,
    /// Bytes handed to the UART by the transmit interrupt
    TxBytes,
    /// Frames whose outcome is settled
    FramesTotal,
    /// Frames that became stored records
    FramesValid,
    /// Frames rejected by the parser or dropped by the store
    FramesRejected,
    /// Bytes dropped because the receive ring was full
    RxOverflows,
    /// Overlong lines and UART line faults
    FramingErrors,
    /// Polled receives that timed out and slow store calls
    Timeouts,
    /// Records dropped after exhausting store retries
    RecordsDropped,
    /// Successful store reconnects
    StoreReconnects,
    /// Outbound lines refused for lack of transmit space
    TxDropped,
}

const COUNTER_COUNT: usize = 11;

impl Counter {
    fn index(&self) -> usize {
        *self as usize
    }
}

/// Snapshot of the last-error registers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct LastErrors {
    pub link: ErrorKind,
    pub parser: ErrorKind,
    pub store: ErrorKind,
}

impl LastErrors {
    /// Get the register of one subsystem
    pub fn get(&self, subsystem: Subsystem) -> ErrorKind {
        match subsystem {
            Subsystem::Link => self.link,
            Subsystem::Parser => self.parser,
            Subsystem::Store => self.store,
        }
    }
}

/// Read-only copy of the ingest state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StatsSnapshot {
    pub rx_bytes: u32,
    pub tx_bytes: u32,
    pub frames_total: u32,
    pub frames_valid: u32,
    pub frames_rejected: u32,
    pub rx_overflows: u32,
    pub framing_errors: u32,
    pub timeout_count: u32,
    pub records_dropped: u32,
    pub store_reconnects: u32,
    pub tx_dropped: u32,
    pub last_errors: LastErrors,
    pub store_status: StoreStatus,
}

impl StatsSnapshot {
    /// `frames_total == frames_valid + frames_rejected`, modulo 2^32
    pub fn is_balanced(&self) -> bool {
        self.frames_total == self.frames_valid.wrapping_add(self.frames_rejected)
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "frames total={} valid={} rejected={} dropped={} | rx={}B tx={}B overflows={} \
             framing={} timeouts={} tx_dropped={} | store={} reconnects={} | \
             last_error link={} parser={} store={}",
            self.frames_total,
            self.frames_valid,
            self.frames_rejected,
            self.records_dropped,
            self.rx_bytes,
            self.tx_bytes,
            self.rx_overflows,
            self.framing_errors,
            self.timeout_count,
            self.tx_dropped,
            self.store_status,
            self.store_reconnects,
            self.last_errors.link,
            self.last_errors.parser,
            self.last_errors.store,
        )
    }
}

/// Process-wide ingest state.
///
/// Constructed once at init (it can live in a `static`), reset with
/// [`clear`](Self::clear). Updates use relaxed atomics; a consistent
/// multi-counter view needs the caller to hold off the receive interrupt
/// while taking [`snapshot`](Self::snapshot).
pub struct IngestState {
    counters: [AtomicU32; COUNTER_COUNT],
    last_errors: [AtomicU8; 3],
    store_status: AtomicU8,
}

impl IngestState {
    /// Create a zeroed state block
    pub const fn new() -> Self {
        Self {
            counters: [const { AtomicU32::new(0) }; COUNTER_COUNT],
            last_errors: [const { AtomicU8::new(0) }; 3],
            store_status: AtomicU8::new(StoreStatus::Disconnected as u8),
        }
    }

    /// Add one to a counter (wrapping). Safe from interrupt context.
    #[inline]
    pub fn incr(&self, counter: Counter) {
        self.add(counter, 1);
    }

    /// Add `n` to a counter (wrapping). Safe from interrupt context.
    #[inline]
    pub fn add(&self, counter: Counter, n: u32) {
        self.counters[counter.index()].fetch_add(n, Ordering::Relaxed);
    }

    /// Current value of a counter
    pub fn get(&self, counter: Counter) -> u32 {
        self.counters[counter.index()].load(Ordering::Relaxed)
    }

    /// Record the last error of a subsystem. Safe from interrupt context.
    #[inline]
    pub fn record_error(&self, subsystem: Subsystem, kind: ErrorKind) {
        self.last_errors[subsystem.index()].store(kind.code(), Ordering::Relaxed);
    }

    /// Last error recorded for a subsystem
    pub fn last_error(&self, subsystem: Subsystem) -> ErrorKind {
        ErrorKind::from_code(self.last_errors[subsystem.index()].load(Ordering::Relaxed))
    }

    /// Publish the store connection status
    pub fn set_store_status(&self, status: StoreStatus) {
        self.store_status.store(status as u8, Ordering::Relaxed);
    }

    /// Last published store connection status
    pub fn store_status(&self) -> StoreStatus {
        StoreStatus::from_code(self.store_status.load(Ordering::Relaxed))
    }

    /// Copy every counter and register
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            rx_bytes: self.get(Counter::RxBytes),
            tx_bytes: self.get(Counter::TxBytes),
            frames_total: self.get(Counter::FramesTotal),
            frames_valid: self.get(Counter::FramesValid),
            frames_rejected: self.get(Counter::FramesRejected),
            rx_overflows: self.get(Counter::RxOverflows),
            framing_errors: self.get(Counter::FramingErrors),
            timeout_count: self.get(Counter::Timeouts),
            records_dropped: self.get(Counter::RecordsDropped),
            store_reconnects: self.get(Counter::StoreReconnects),
            tx_dropped: self.get(Counter::TxDropped),
            last_errors: LastErrors {
                link: self.last_error(Subsystem::Link),
                parser: self.last_error(Subsystem::Parser),
                store: self.last_error(Subsystem::Store),
            },
            store_status: self.store_status(),
        }
    }

    /// Reset counters and registers to their initial values
    pub fn clear(&self) {
        for counter in &self.counters {
            counter.store(0, Ordering::Relaxed);
        }
        for register in &self.last_errors {
            register.store(ErrorKind::None.code(), Ordering::Relaxed);
        }
        self.set_store_status(StoreStatus::Disconnected);
    }
}

impl Default for IngestState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static GLOBAL: IngestState = IngestState::new();

    #[test]
    fn test_counters_start_at_zero() {
        let state = IngestState::new();
        let snap = state.snapshot();
        assert_eq!(snap, StatsSnapshot::default());
        assert!(snap.is_balanced());
    }

    #[test]
    fn test_counters_wrap() {
        let state = IngestState::new();
        state.add(Counter::RxBytes, u32::MAX);
        state.incr(Counter::RxBytes);
        state.incr(Counter::RxBytes);
        assert_eq!(state.get(Counter::RxBytes), 1);
    }

    #[test]
    fn test_last_error_registers() {
        let state = IngestState::new();
        state.record_error(Subsystem::Link, ErrorKind::RxOverflow);
        state.record_error(Subsystem::Parser, ErrorKind::InvalidRange);

        let snap = state.snapshot();
        assert_eq!(snap.last_errors.get(Subsystem::Link), ErrorKind::RxOverflow);
        assert_eq!(snap.last_errors.get(Subsystem::Parser), ErrorKind::InvalidRange);
        assert_eq!(snap.last_errors.get(Subsystem::Store), ErrorKind::None);
    }

    #[test]
    fn test_balance_and_clear() {
        GLOBAL.incr(Counter::FramesTotal);
        GLOBAL.incr(Counter::FramesValid);
        GLOBAL.incr(Counter::FramesTotal);
        assert!(!GLOBAL.snapshot().is_balanced());

        GLOBAL.incr(Counter::FramesRejected);
        assert!(GLOBAL.snapshot().is_balanced());

        GLOBAL.set_store_status(StoreStatus::Connected);
        GLOBAL.record_error(Subsystem::Store, ErrorKind::QueryFailed);
        GLOBAL.clear();
        assert_eq!(GLOBAL.snapshot(), StatsSnapshot::default());
    }

    #[test]
    fn test_snapshot_display() {
        let state = IngestState::new();
        state.incr(Counter::FramesTotal);
        state.incr(Counter::FramesRejected);
        state.record_error(Subsystem::Parser, ErrorKind::InvalidFormat);

        let line = state.snapshot().to_string();
        assert!(line.contains("total=1"));
        assert!(line.contains("rejected=1"));
        assert!(line.contains("parser=INVALID_FORMAT"));
        assert!(line.contains("store=DISCONNECTED"));
    }
}
