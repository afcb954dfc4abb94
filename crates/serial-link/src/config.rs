//! UART Line Settings

use crate::error::LinkError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Parity bit setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    None,
    Odd,
    Even,
}

impl Parity {
    /// Single-letter code used in "8N1" notation
    pub fn letter(&self) -> char {
        match self {
            Parity::None => 'N',
            Parity::Odd => 'O',
            Parity::Even => 'E',
        }
    }
}

impl Default for Parity {
    fn default() -> Self {
        Parity::None
    }
}

/// UART configuration. No flow control is supported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UartConfig {
    /// Line rate in baud
    pub baud_rate: u32,
    /// Data bits per character (5-9)
    pub data_bits: u8,
    /// Stop bits (1 or 2)
    pub stop_bits: u8,
    /// Parity bit
    pub parity: Parity,
    /// Polled receive window in milliseconds
    pub timeout_ms: u64,
}

impl Default for UartConfig {
    fn default() -> Self {
        Self {
            baud_rate: 115_200,
            data_bits: 8,
            stop_bits: 1,
            parity: Parity::None,
            timeout_ms: 5000,
        }
    }
}

impl UartConfig {
    /// Check the settings a UART can actually be programmed with
    pub fn validate(&self) -> Result<(), LinkError> {
        if self.baud_rate == 0 {
            return Err(LinkError::InvalidParam("baud rate must be non-zero".into()));
        }
        if !(5..=9).contains(&self.data_bits) {
            return Err(LinkError::InvalidParam(format!(
                "data bits must be 5-9, got {}",
                self.data_bits
            )));
        }
        if !(1..=2).contains(&self.stop_bits) {
            return Err(LinkError::InvalidParam(format!(
                "stop bits must be 1 or 2, got {}",
                self.stop_bits
            )));
        }
        Ok(())
    }
}

impl fmt::Display for UartConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} baud {}{}{}",
            self.baud_rate,
            self.data_bits,
            self.parity.letter(),
            self.stop_bits
        )
    }
}
