//! Baud-rate register values.

use serline_driver_api::LineError;

/// A value for the USART `BAUD` register.
///
/// The AVR 0/1-series USART in normal asynchronous mode runs at
/// `f_cpu * 64 / (16 * BAUD)` bits per second, so the register value for a
/// target rate is `round(4 * f_cpu / bps)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaudRate(u16);

impl BaudRate {
    /// Smallest register value the hardware accepts in normal mode.
    pub const MIN_REGISTER: u16 = 64;

    /// Wraps a precomputed register value.
    #[must_use]
    pub const fn from_register(value: u16) -> Self {
        Self(value)
    }

    /// Computes the register value for `bps` at a CPU clock of `f_cpu_hz`.
    ///
    /// # Errors
    ///
    /// Returns [`LineError::InvalidBaud`] if `bps` is zero, or if the
    /// register value falls below [`MIN_REGISTER`](Self::MIN_REGISTER) or
    /// does not fit in 16 bits.
    #[allow(clippy::cast_possible_truncation, reason = "range checked before the cast")]
    pub const fn from_bps(f_cpu_hz: u32, bps: u32) -> Result<Self, LineError> {
        if bps == 0 {
            return Err(LineError::InvalidBaud);
        }
        let bps = bps as u64;
        let value = (4 * f_cpu_hz as u64 + bps / 2) / bps;
        if value < Self::MIN_REGISTER as u64 || value > u16::MAX as u64 {
            return Err(LineError::InvalidBaud);
        }
        Ok(Self(value as u16))
    }

    /// Returns the raw register value.
    #[must_use]
    pub const fn register(self) -> u16 {
        self.0
    }

    /// Returns the bit rate this register value produces at `f_cpu_hz`, or
    /// zero for a zero register.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, reason = "fits for any clock below 1 GHz")]
    pub const fn actual_bps(self, f_cpu_hz: u32) -> u32 {
        if self.0 == 0 {
            return 0;
        }
        ((4 * f_cpu_hz as u64 + self.0 as u64 / 2) / self.0 as u64) as u32
    }
}
