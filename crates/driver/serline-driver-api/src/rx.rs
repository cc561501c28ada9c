//! Receive status flags and poll results.

use bitflags::bitflags;

bitflags! {
    /// Receive error flags attached to a byte or a poll result.
    ///
    /// The hardware bits sit at their RXDATAH positions on the AVR 0/1-series
    /// USART, so `from_bits_truncate(rxdatah) & RxStatus::HARDWARE` decodes
    /// the register directly.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct RxStatus: u8 {
        /// Parity error (PERR).
        const PARITY_ERROR    = 1 << 1;
        /// Framing error (FERR): stop bit not found.
        const FRAME_ERROR     = 1 << 2;
        /// Hardware receive buffer overflow (BUFOVF).
        const HW_OVERFLOW     = 1 << 6;
        /// Software receive buffer overflow: a byte arrived while the ring
        /// buffer was full and was dropped.
        const BUFFER_OVERFLOW = 1 << 7;

        /// Every flag the hardware reports.
        const HARDWARE = Self::PARITY_ERROR.bits()
            | Self::FRAME_ERROR.bits()
            | Self::HW_OVERFLOW.bits();
    }
}

impl RxStatus {
    /// Decodes an RXDATAH register value, keeping only the error bits.
    #[must_use]
    pub const fn from_rxdatah(raw: u8) -> Self {
        Self::from_bits_truncate(raw & Self::HARDWARE.bits())
    }

    /// Returns `true` if any error flag is set.
    #[must_use]
    pub const fn is_error(self) -> bool {
        !self.is_empty()
    }
}

/// Packed "no data" marker, outside the 0-255 byte range.
pub const PACKED_NO_DATA: u16 = 0x0100;

/// Outcome of a non-blocking receive poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxResult {
    /// A byte was dequeued, tagged with the status latched at its reception.
    Data {
        /// The received byte.
        byte: u8,
        /// Errors observed for this byte.
        status: RxStatus,
    },
    /// The receive buffer was empty.
    NoData {
        /// The most recently latched flags, carried over.
        status: RxStatus,
    },
}

impl RxResult {
    /// Returns the byte, if one was received.
    #[must_use]
    pub const fn byte(&self) -> Option<u8> {
        match *self {
            Self::Data { byte, .. } => Some(byte),
            Self::NoData { .. } => None,
        }
    }

    /// Returns the error flags.
    #[must_use]
    pub const fn status(&self) -> RxStatus {
        match *self {
            Self::Data { status, .. } | Self::NoData { status } => status,
        }
    }

    /// Returns `true` if a byte was received.
    #[must_use]
    pub const fn has_data(&self) -> bool {
        matches!(self, Self::Data { .. })
    }

    /// Packs the result into the compact 16-bit form.
    ///
    /// | Bits | Meaning |
    /// |------|---------|
    /// | `0x00FF` | data byte (zero when absent) |
    /// | `0x0100` | no data |
    /// | `0x0200` | parity error |
    /// | `0x0400` | framing error |
    /// | `0x4000` | hardware overflow |
    /// | `0x8000` | software buffer overflow |
    #[must_use]
    pub const fn to_packed(&self) -> u16 {
        let flags = (self.status().bits() as u16) << 8;
        match *self {
            Self::Data { byte, .. } => flags | byte as u16,
            Self::NoData { .. } => flags | PACKED_NO_DATA,
        }
    }

    /// Unpacks the compact 16-bit form.
    #[must_use]
    pub const fn from_packed(raw: u16) -> Self {
        let status = RxStatus::from_bits_truncate((raw >> 8) as u8);
        if raw & PACKED_NO_DATA != 0 {
            Self::NoData { status }
        } else {
            Self::Data {
                byte: (raw & 0xFF) as u8,
                status,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rxdatah_decoding_ignores_non_error_bits() {
        // RXCIF (bit 7) and DATA8 (bit 0) must not leak into the status.
        let status = RxStatus::from_rxdatah(0b1000_0101);
        assert_eq!(status, RxStatus::FRAME_ERROR);
        assert_eq!(RxStatus::from_rxdatah(0x80), RxStatus::empty());
        assert_eq!(
            RxStatus::from_rxdatah(0x46),
            RxStatus::HW_OVERFLOW | RxStatus::FRAME_ERROR | RxStatus::PARITY_ERROR
        );
    }

    #[test]
    fn packed_values_match_legacy_encoding() {
        let ok = RxResult::Data {
            byte: b'A',
            status: RxStatus::empty(),
        };
        assert_eq!(ok.to_packed(), 0x0041);

        let parity = RxResult::Data {
            byte: 0x7F,
            status: RxStatus::PARITY_ERROR,
        };
        assert_eq!(parity.to_packed(), 0x027F);

        let empty = RxResult::NoData {
            status: RxStatus::FRAME_ERROR,
        };
        assert_eq!(empty.to_packed(), 0x0500);

        let hw_ovf = RxResult::NoData {
            status: RxStatus::HW_OVERFLOW,
        };
        assert_eq!(hw_ovf.to_packed(), 0x4100);

        let sw_ovf = RxResult::Data {
            byte: 0,
            status: RxStatus::BUFFER_OVERFLOW,
        };
        assert_eq!(sw_ovf.to_packed(), 0x8000);
    }

    #[test]
    fn packed_distinguishes_the_three_cases() {
        let clean = RxResult::from_packed(0x0031);
        assert_eq!(clean.byte(), Some(0x31));
        assert!(!clean.status().is_error());

        let errored = RxResult::from_packed(0x0431);
        assert_eq!(errored.byte(), Some(0x31));
        assert_eq!(errored.status(), RxStatus::FRAME_ERROR);

        let none = RxResult::from_packed(0x0700);
        assert!(!none.has_data());
        assert_eq!(
            none.status(),
            RxStatus::FRAME_ERROR | RxStatus::PARITY_ERROR
        );
    }

    #[test]
    fn accessors() {
        let r = RxResult::Data {
            byte: 9,
            status: RxStatus::empty(),
        };
        assert!(r.has_data());
        assert_eq!(r.byte(), Some(9));
        let r = RxResult::NoData {
            status: RxStatus::empty(),
        };
        assert_eq!(r.byte(), None);
    }
}
