//! CR/LF Line Reassembly

use crate::chars::{CR, LF};
use crate::error::LinkError;
use crate::hardware::UartHardware;
use crate::link::SerialLink;
use ingest_state::{Counter, ErrorKind, Subsystem};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Line accumulator size, including the terminating NUL
pub const LINE_BUFFER_SIZE: usize = 128;

/// Longest frame that can be emitted
pub const MAX_FRAME_LEN: usize = LINE_BUFFER_SIZE - 1;

#[inline]
fn is_printable(byte: u8) -> bool {
    (0x20..=0x7E).contains(&byte)
}

/// One complete line: 1 to [`MAX_FRAME_LEN`] printable ASCII bytes,
/// followed by a NUL in the backing buffer.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    buf: [u8; LINE_BUFFER_SIZE],
    len: u8,
}

impl Frame {
    /// Build a frame from printable bytes. Returns `None` for empty,
    /// overlong or non-printable input.
    pub fn new(bytes: &[u8]) -> Option<Self> {
        if bytes.is_empty() || bytes.len() > MAX_FRAME_LEN {
            return None;
        }
        if !bytes.iter().copied().all(is_printable) {
            return None;
        }
        let mut buf = [0u8; LINE_BUFFER_SIZE];
        buf[..bytes.len()].copy_from_slice(bytes);
        Some(Self {
            buf,
            len: bytes.len() as u8,
        })
    }

    /// Frame contents without the terminator
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len as usize]
    }

    /// Frame contents with the trailing NUL
    pub fn as_bytes_with_nul(&self) -> &[u8] {
        &self.buf[..self.len as usize + 1]
    }

    /// Frame contents as text (always ASCII)
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(self.as_bytes()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    /// Always false; empty lines are never framed
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Frame").field(&self.as_str()).finish()
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reassembler state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblerState {
    /// Between lines
    Idle,
    /// Collecting printable bytes
    Accumulating,
    /// Discarding the rest of an overlong line
    Overflow,
}

/// Outcome of feeding one byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Nothing to report yet
    Pending,
    /// A delimiter completed a line
    Frame(Frame),
    /// The current line just exceeded [`MAX_FRAME_LEN`]
    Overflowed,
}

/// Byte-at-a-time line reassembler.
///
/// Mainline-only: it owns the line accumulator and is fed from the receive
/// ring of a [`SerialLink`].
pub struct LineAssembler {
    buf: [u8; LINE_BUFFER_SIZE],
    len: usize,
    state: AssemblerState,
}

impl LineAssembler {
    pub fn new() -> Self {
        Self {
            buf: [0u8; LINE_BUFFER_SIZE],
            len: 0,
            state: AssemblerState::Idle,
        }
    }

    /// Advance the state machine by one byte
    pub fn feed(&mut self, byte: u8) -> Step {
        if byte == CR || byte == LF {
            return match self.state {
                AssemblerState::Accumulating => {
                    let frame = Frame::new(&self.buf[..self.len]);
                    self.reset();
                    frame.map_or(Step::Pending, Step::Frame)
                }
                AssemblerState::Overflow => {
                    self.reset();
                    Step::Pending
                }
                AssemblerState::Idle => Step::Pending,
            };
        }

        if !is_printable(byte) {
            return Step::Pending;
        }

        match self.state {
            AssemblerState::Overflow => Step::Pending,
            AssemblerState::Idle | AssemblerState::Accumulating => {
                if self.len == MAX_FRAME_LEN {
                    self.state = AssemblerState::Overflow;
                    self.len = 0;
                    return Step::Overflowed;
                }
                self.buf[self.len] = byte;
                self.len += 1;
                self.state = AssemblerState::Accumulating;
                Step::Pending
            }
        }
    }

    /// Pull bytes from the receive ring until a line completes, a line
    /// overflows, or the ring runs dry.
    ///
    /// Overflows are counted as framing errors and reported as
    /// [`LinkError::FrameTooLong`]; the assembler has already resynchronized
    /// to wait for the next delimiter.
    pub fn poll<H: UartHardware>(
        &mut self,
        link: &SerialLink<'_, H>,
    ) -> Option<Result<Frame, LinkError>> {
        while let Some(byte) = link.pop_rx() {
            match self.feed(byte) {
                Step::Pending => {}
                Step::Frame(frame) => {
                    debug!("Frame received ({} bytes)", frame.len());
                    return Some(Ok(frame));
                }
                Step::Overflowed => {
                    let state = link.state();
                    state.incr(Counter::FramingErrors);
                    state.record_error(Subsystem::Link, ErrorKind::FrameTooLong);
                    warn!("Line exceeded {} bytes, discarding until delimiter", MAX_FRAME_LEN);
                    return Some(Err(LinkError::FrameTooLong {
                        limit: MAX_FRAME_LEN,
                    }));
                }
            }
        }
        None
    }

    /// Polled receive with a time limit.
    ///
    /// Returns `Ok(None)` if the window closes while a partial line is held
    /// (the partial line is kept for the next call), and
    /// [`LinkError::Timeout`] if nothing was accumulated at all.
    pub fn receive_line<H: UartHardware>(
        &mut self,
        link: &SerialLink<'_, H>,
        timeout: Duration,
    ) -> Result<Option<Frame>, LinkError> {
        let start = Instant::now();
        loop {
            if let Some(result) = self.poll(link) {
                return result.map(Some);
            }

            if start.elapsed() >= timeout {
                if self.state == AssemblerState::Accumulating {
                    return Ok(None);
                }
                let state = link.state();
                state.incr(Counter::Timeouts);
                state.record_error(Subsystem::Link, ErrorKind::Timeout);
                return Err(LinkError::Timeout(timeout.as_millis() as u64));
            }

            std::thread::sleep(Duration::from_millis(1));
        }
    }

    /// Current state
    pub fn state(&self) -> AssemblerState {
        self.state
    }

    /// Bytes held in the accumulator
    pub fn pending_len(&self) -> usize {
        self.len
    }

    /// Drop any partial line
    pub fn reset(&mut self) {
        self.buf = [0u8; LINE_BUFFER_SIZE];
        self.len = 0;
        self.state = AssemblerState::Idle;
    }
}

impl Default for LineAssembler {
    fn default() -> Self {
        Self::new()
    }
}
