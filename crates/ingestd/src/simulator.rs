//! Host UART Simulator
//!
//! Stands in for the receive and transmit-empty interrupts on a host without
//! hardware: input bytes are delivered through [`SerialLink::on_rx_byte`] in
//! bursts paced at the configured line rate, and transmitted bytes are
//! copied to an output stream.

use crate::settings::SimulatorConfig;
use serial_link::{MockUart, SerialLink};
use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Start bit, eight data bits, stop bit
const BITS_PER_BYTE: u64 = 10;

pub struct UartSimulator<'l, 'a, R> {
    link: &'l SerialLink<'a, MockUart>,
    input: R,
    config: SimulatorConfig,
    byte_time: Duration,
}

impl<'l, 'a, R: Read> UartSimulator<'l, 'a, R> {
    pub fn new(
        link: &'l SerialLink<'a, MockUart>,
        input: R,
        config: SimulatorConfig,
        baud_rate: u32,
    ) -> Self {
        let byte_time =
            Duration::from_nanos(BITS_PER_BYTE * 1_000_000_000 / u64::from(baud_rate.max(1)));
        Self {
            link,
            input,
            config,
            byte_time,
        }
    }

    /// Feed the whole input, wait for the mainline to drain the receive
    /// ring, then raise `shutdown`. The flag is raised on every exit path.
    ///
    /// Returns the number of bytes delivered.
    pub fn run<W: Write>(&mut self, out: &mut W, shutdown: &AtomicBool) -> io::Result<u64> {
        let result = self.feed(out, shutdown);
        self.drain(out);
        shutdown.store(true, Ordering::Release);

        match &result {
            Ok(fed) => info!("Simulator input finished ({} bytes)", fed),
            Err(e) => warn!("Simulator input failed: {}", e),
        }
        result
    }

    fn feed<W: Write>(&mut self, out: &mut W, shutdown: &AtomicBool) -> io::Result<u64> {
        let mut burst = vec![0u8; self.config.burst_size.max(1)];
        let mut fed = 0u64;

        loop {
            service_tx(self.link, out)?;

            let n = match self.input.read(&mut burst) {
                Ok(0) => return Ok(fed),
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };

            for byte in &burst[..n] {
                if !self.wait_unmasked(shutdown) {
                    debug!("Shutdown while interrupts masked, {} bytes undelivered", n);
                    return Ok(fed);
                }
                self.link.on_rx_byte(*byte);
                fed += 1;
            }
            thread::sleep(self.byte_time * n as u32);
        }
    }

    /// A masked UART holds the byte in its data register until the mask
    /// lifts. Gives up once shutdown is requested.
    fn wait_unmasked(&self, shutdown: &AtomicBool) -> bool {
        while !self.link.hardware().interrupts_enabled() {
            if shutdown.load(Ordering::Acquire) {
                return false;
            }
            thread::yield_now();
        }
        true
    }

    fn drain<W: Write>(&self, out: &mut W) {
        let deadline = Instant::now() + self.config.drain_timeout();
        while self.link.rx_pending() > 0 {
            if Instant::now() >= deadline {
                warn!(
                    "Receive ring not drained within {:?}, {} bytes left",
                    self.config.drain_timeout(),
                    self.link.rx_pending()
                );
                break;
            }
            if let Err(e) = service_tx(self.link, out) {
                debug!("TX output failed: {}", e);
            }
            thread::sleep(Duration::from_millis(1));
        }
        if let Err(e) = service_tx(self.link, out) {
            debug!("TX output failed: {}", e);
        }
    }
}

/// Run the transmit-empty interrupt until it disarms itself and copy what
/// the UART sent to `out`. Returns the number of bytes written.
pub fn service_tx<W: Write>(link: &SerialLink<'_, MockUart>, out: &mut W) -> io::Result<usize> {
    while link.hardware().tx_empty_enabled() {
        link.on_tx_empty();
    }
    let sent = link.hardware().take_transmitted();
    if !sent.is_empty() {
        out.write_all(&sent)?;
        out.flush()?;
    }
    Ok(sent.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ingest_state::{Counter, IngestState};
    use std::io::Cursor;

    fn quick() -> SimulatorConfig {
        SimulatorConfig {
            burst_size: 4,
            drain_timeout_ms: 5,
        }
    }

    #[test]
    fn test_feeds_input_and_raises_shutdown() {
        let state = IngestState::new();
        let link = SerialLink::new(MockUart::new(), &state);
        link.set_interrupts(true);

        let input = b"A,25.6,60.2\n".to_vec();
        let mut sim = UartSimulator::new(&link, Cursor::new(input.clone()), quick(), 115_200);
        let shutdown = AtomicBool::new(false);
        let mut out = Vec::new();

        let fed = sim.run(&mut out, &shutdown).unwrap();
        assert_eq!(fed, input.len() as u64);
        assert!(shutdown.load(Ordering::Acquire));
        assert_eq!(state.get(Counter::RxBytes), input.len() as u32);

        let received: Vec<u8> = std::iter::from_fn(|| link.pop_rx()).collect();
        assert_eq!(received, input);
    }

    #[test]
    fn test_masked_uart_stops_on_shutdown() {
        let state = IngestState::new();
        let link = SerialLink::new(MockUart::new(), &state);

        let mut sim = UartSimulator::new(&link, Cursor::new(b"abc".to_vec()), quick(), 115_200);
        let shutdown = AtomicBool::new(true);
        let mut out = Vec::new();

        assert_eq!(sim.run(&mut out, &shutdown).unwrap(), 0);
        assert_eq!(link.rx_pending(), 0);
    }

    #[test]
    fn test_service_tx_copies_output() {
        let state = IngestState::new();
        let link = SerialLink::new(MockUart::new(), &state);
        link.send_str("[INFO] up\r\n").unwrap();

        let mut out = Vec::new();
        assert_eq!(service_tx(&link, &mut out).unwrap(), 11);
        assert_eq!(out, b"[INFO] up\r\n");
        assert!(!link.hardware().tx_empty_enabled());
        assert_eq!(state.get(Counter::TxBytes), 11);

        assert_eq!(service_tx(&link, &mut out).unwrap(), 0);
    }

    #[test]
    fn test_read_error_still_raises_shutdown() {
        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::BrokenPipe, "gone"))
            }
        }

        let state = IngestState::new();
        let link = SerialLink::new(MockUart::new(), &state);
        let mut sim = UartSimulator::new(&link, Broken, quick(), 9600);
        let shutdown = AtomicBool::new(false);

        assert!(sim.run(&mut Vec::new(), &shutdown).is_err());
        assert!(shutdown.load(Ordering::Acquire));
    }
}
