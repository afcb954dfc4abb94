//! UART Hardware Contract
//!
//! The register-level driver stays outside the ingest core. It implements
//! [`UartHardware`] and forwards its interrupts to the `on_*` entry points of
//! [`SerialLink`](crate::SerialLink).

use crate::config::UartConfig;
use crate::error::LinkError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tracing::{debug, info};

/// Line faults the UART reports alongside received data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineError {
    /// Data register overwritten before it was read
    Overrun,
    /// Missing stop bit
    Framing,
    /// Parity check failed
    Parity,
    /// Noise detected on the line
    Noise,
}

/// Calls the ingest core makes into the UART driver.
///
/// Methods take `&self` because the same driver is reached from interrupt
/// context and from the mainline.
pub trait UartHardware {
    /// Program line rate and character format
    fn configure(&self, config: &UartConfig) -> Result<(), LinkError>;

    /// Enable or mask the UART interrupts as a whole
    fn set_interrupts(&self, enabled: bool);

    /// Enable or mask the transmit-empty interrupt
    fn set_tx_empty_interrupt(&self, enabled: bool);

    /// Hand one byte to the transmit data register
    fn write_data(&self, byte: u8);
}

/// Recording UART for hosts without hardware.
///
/// Keeps the interrupt mask bits and every transmitted byte so tests and the
/// host simulator can observe what the core asked for.
pub struct MockUart {
    /// Last applied configuration
    configured: Mutex<Option<UartConfig>>,
    /// Global interrupt enable
    interrupts: AtomicBool,
    /// Transmit-empty interrupt enable
    tx_empty: AtomicBool,
    /// Bytes written to the data register
    transmitted: Mutex<Vec<u8>>,
    /// Reject every configure call
    reject_configure: bool,
}

impl MockUart {
    /// Create a mock UART with interrupts masked
    pub fn new() -> Self {
        debug!("Creating mock UART");
        Self {
            configured: Mutex::new(None),
            interrupts: AtomicBool::new(false),
            tx_empty: AtomicBool::new(false),
            transmitted: Mutex::new(Vec::new()),
            reject_configure: false,
        }
    }

    /// Create a mock UART whose configure call always fails
    pub fn rejecting() -> Self {
        Self {
            reject_configure: true,
            ..Self::new()
        }
    }

    /// Whether interrupts are currently enabled
    pub fn interrupts_enabled(&self) -> bool {
        self.interrupts.load(Ordering::Acquire)
    }

    /// Whether the transmit-empty interrupt is currently enabled
    pub fn tx_empty_enabled(&self) -> bool {
        self.tx_empty.load(Ordering::Acquire)
    }

    /// Last configuration applied
    pub fn configuration(&self) -> Option<UartConfig> {
        self.configured.lock().ok().and_then(|c| c.clone())
    }

    /// Drain the bytes written so far
    pub fn take_transmitted(&self) -> Vec<u8> {
        self.transmitted
            .lock()
            .map(|mut tx| std::mem::take(&mut *tx))
            .unwrap_or_default()
    }
}

impl Default for MockUart {
    fn default() -> Self {
        Self::new()
    }
}

impl UartHardware for MockUart {
    fn configure(&self, config: &UartConfig) -> Result<(), LinkError> {
        if self.reject_configure {
            return Err(LinkError::Hardware("mock UART rejects configuration".into()));
        }
        info!("Mock UART configured: {}", config);
        if let Ok(mut slot) = self.configured.lock() {
            *slot = Some(config.clone());
        }
        Ok(())
    }

    fn set_interrupts(&self, enabled: bool) {
        self.interrupts.store(enabled, Ordering::Release);
    }

    fn set_tx_empty_interrupt(&self, enabled: bool) {
        self.tx_empty.store(enabled, Ordering::Release);
    }

    fn write_data(&self, byte: u8) {
        if let Ok(mut tx) = self.transmitted.lock() {
            tx.push(byte);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_records_configuration() {
        let uart = MockUart::new();
        assert!(uart.configuration().is_none());

        uart.configure(&UartConfig::default()).unwrap();
        assert_eq!(uart.configuration(), Some(UartConfig::default()));
    }

    #[test]
    fn test_mock_rejecting() {
        let uart = MockUart::rejecting();
        assert!(matches!(
            uart.configure(&UartConfig::default()),
            Err(LinkError::Hardware(_))
        ));
    }

    #[test]
    fn test_mock_transmit_log() {
        let uart = MockUart::new();
        uart.write_data(b'o');
        uart.write_data(b'k');
        assert_eq!(uart.take_transmitted(), b"ok");
        assert!(uart.take_transmitted().is_empty());
    }
}
