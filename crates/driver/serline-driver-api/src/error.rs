//! Line driver error types.

use core::fmt;

/// Software-side failures of a line operation.
///
/// Hardware receive errors (framing, parity, overrun) are not reported here;
/// they travel with each received byte as [`RxStatus`](crate::RxStatus).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineError {
    /// The line has not been opened, or has been closed.
    NotOpen,
    /// The transmit buffer is full (non-blocking send only).
    TransmitBufferFull,
    /// A bounded wait gave up before its condition held.
    Timeout,
    /// The requested baud rate cannot be programmed at this clock.
    InvalidBaud,
}

impl fmt::Display for LineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotOpen => f.write_str("line is not open"),
            Self::TransmitBufferFull => f.write_str("transmit buffer full"),
            Self::Timeout => f.write_str("line operation timed out"),
            Self::InvalidBaud => f.write_str("baud rate out of range"),
        }
    }
}

impl core::error::Error for LineError {}
