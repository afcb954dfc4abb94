//! Interrupt-Shared UART Link

use crate::config::UartConfig;
use crate::error::LinkError;
use crate::hardware::{LineError, UartHardware};
use ingest_state::{Counter, ErrorKind, IngestState, StatsSnapshot, Subsystem};
use ring_buffer::{RxRing, TxRing};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

/// UART link shared by the interrupt handler and the mainline.
///
/// The receive ring is produced by [`on_rx_byte`](Self::on_rx_byte) and
/// consumed by [`pop_rx`](Self::pop_rx); the transmit ring is produced by
/// [`submit_byte`](Self::submit_byte) / [`send`](Self::send) and consumed by
/// [`on_tx_empty`](Self::on_tx_empty).
pub struct SerialLink<'a, H: UartHardware> {
    hw: H,
    rx: RxRing,
    tx: TxRing,
    state: &'a IngestState,
    /// Mirror of the global interrupt enable, for nesting critical sections
    irq_enabled: AtomicBool,
}

impl<'a, H: UartHardware> SerialLink<'a, H> {
    /// Create a link over `hw`. Interrupts stay masked until
    /// [`set_interrupts`](Self::set_interrupts) enables them.
    pub fn new(hw: H, state: &'a IngestState) -> Self {
        Self {
            hw,
            rx: RxRing::new(),
            tx: TxRing::new(),
            state,
            irq_enabled: AtomicBool::new(false),
        }
    }

    /// Validate and apply line settings
    pub fn configure(&self, config: &UartConfig) -> Result<(), LinkError> {
        config.validate()?;
        self.hw.configure(config)?;
        info!("UART configured: {}", config);
        Ok(())
    }

    /// Enable or mask the UART interrupts
    pub fn set_interrupts(&self, enabled: bool) {
        self.irq_enabled.store(enabled, Ordering::Release);
        self.hw.set_interrupts(enabled);
    }

    /// Run `f` with UART interrupts masked, restoring the previous mask
    /// after. Sections nest: only the outermost one unmasks.
    pub fn critical<R>(&self, f: impl FnOnce() -> R) -> R {
        let was_enabled = self.irq_enabled.swap(false, Ordering::AcqRel);
        if was_enabled {
            self.hw.set_interrupts(false);
        }
        let result = f();
        if was_enabled {
            self.irq_enabled.store(true, Ordering::Release);
            self.hw.set_interrupts(true);
        }
        result
    }

    // ----- interrupt context -----

    /// Byte-received interrupt. Only touches the receive ring and counters.
    #[inline]
    pub fn on_rx_byte(&self, byte: u8) {
        self.state.incr(Counter::RxBytes);
        if !self.rx.push(byte) {
            self.state.incr(Counter::RxOverflows);
            self.state.record_error(Subsystem::Link, ErrorKind::RxOverflow);
        }
    }

    /// Line-fault interrupt. Only touches counters.
    #[inline]
    pub fn on_line_error(&self, error: LineError) {
        match error {
            LineError::Overrun => {
                self.state.incr(Counter::RxOverflows);
                self.state.record_error(Subsystem::Link, ErrorKind::RxOverflow);
            }
            LineError::Framing | LineError::Parity | LineError::Noise => {
                self.state.incr(Counter::FramingErrors);
                self.state.record_error(Subsystem::Link, ErrorKind::LineFault);
            }
        }
    }

    /// Transmit-empty interrupt: feed the next byte or go quiet
    #[inline]
    pub fn on_tx_empty(&self) {
        match self.tx.pop() {
            Some(byte) => {
                self.hw.write_data(byte);
                self.state.incr(Counter::TxBytes);
            }
            None => {
                self.hw.set_tx_empty_interrupt(false);
                // A message queued between the pop and the mask re-arms
                if !self.tx.is_empty() {
                    self.hw.set_tx_empty_interrupt(true);
                }
            }
        }
    }

    // ----- mainline -----

    /// Take the oldest received byte
    #[inline]
    pub fn pop_rx(&self) -> Option<u8> {
        self.rx.pop()
    }

    /// Whether any received byte is waiting
    pub fn data_available(&self) -> bool {
        !self.rx.is_empty()
    }

    /// Number of received bytes waiting
    pub fn rx_pending(&self) -> usize {
        self.rx.len()
    }

    /// Number of bytes still queued for transmission
    pub fn tx_pending(&self) -> usize {
        self.tx.len()
    }

    /// Queue one byte for transmission and arm the transmit interrupt
    pub fn submit_byte(&self, byte: u8) -> Result<(), LinkError> {
        if !self.tx.push(byte) {
            self.state.incr(Counter::TxDropped);
            self.state.record_error(Subsystem::Link, ErrorKind::BufferFull);
            return Err(LinkError::BufferFull { needed: 1, free: 0 });
        }
        self.hw.set_tx_empty_interrupt(true);
        Ok(())
    }

    /// Queue a whole message, all or nothing
    pub fn send(&self, data: &[u8]) -> Result<(), LinkError> {
        if data.is_empty() {
            return Err(LinkError::InvalidParam("empty message".into()));
        }

        let free = self.tx.free();
        if free < data.len() {
            self.state.incr(Counter::TxDropped);
            self.state.record_error(Subsystem::Link, ErrorKind::BufferFull);
            warn!("TX ring full: {} bytes needed, {} free", data.len(), free);
            return Err(LinkError::BufferFull {
                needed: data.len(),
                free,
            });
        }

        // Only this context produces into the TX ring, so the space checked
        // above cannot shrink.
        for byte in data {
            self.tx.push(*byte);
        }
        self.hw.set_tx_empty_interrupt(true);
        debug!("Queued {} bytes for TX", data.len());
        Ok(())
    }

    /// Queue a text message
    pub fn send_str(&self, text: &str) -> Result<(), LinkError> {
        self.send(text.as_bytes())
    }

    /// Discard everything in the receive ring
    pub fn clear_rx(&self) {
        self.critical(|| self.rx.clear());
        debug!("RX ring cleared");
    }

    /// Discard everything in the transmit ring
    pub fn clear_tx(&self) {
        self.critical(|| self.tx.clear());
        debug!("TX ring cleared");
    }

    /// Statistics taken with interrupts masked
    pub fn snapshot(&self) -> StatsSnapshot {
        self.critical(|| self.state.snapshot())
    }

    /// Shared ingest state
    pub fn state(&self) -> &'a IngestState {
        self.state
    }

    /// Underlying UART driver
    pub fn hardware(&self) -> &H {
        &self.hw
    }
}
