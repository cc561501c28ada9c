//! AVR 0/1-series and DA USART backend.
//!
//! Provides [`AvrUsart`], a [`UsartHardware`] implementation over the
//! memory-mapped USART register block found on megaAVR 0-series, tinyAVR
//! 0/1-series and AVR DA parts. All register access is volatile.

use bitflags::bitflags;
use serline_driver_api::{RxStatus, UsartHardware};

// ---------------------------------------------------------------------------
// Register offsets
// ---------------------------------------------------------------------------

/// Register offsets from the USART base address.
mod reg {
    /// Receive Data Low byte.
    pub const RXDATAL: usize = 0x00;
    /// Receive Data High byte (status of the byte in RXDATAL).
    pub const RXDATAH: usize = 0x01;
    /// Transmit Data Low byte.
    pub const TXDATAL: usize = 0x02;
    /// Status register.
    pub const STATUS: usize = 0x04;
    /// Control A: interrupt enables.
    pub const CTRLA: usize = 0x05;
    /// Control B: unit enables.
    pub const CTRLB: usize = 0x06;
    /// Baud register, low byte (write first).
    pub const BAUDL: usize = 0x08;
    /// Baud register, high byte.
    pub const BAUDH: usize = 0x09;
}

// ---------------------------------------------------------------------------
// Bitflag types
// ---------------------------------------------------------------------------

bitflags! {
    /// Control A register bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CtrlA: u8 {
        /// Receive Complete Interrupt Enable.
        const RXCIE = 1 << 7;
        /// Transmit Complete Interrupt Enable.
        const TXCIE = 1 << 6;
        /// Data Register Empty Interrupt Enable.
        const DREIE = 1 << 5;
        /// Receiver Start Frame Interrupt Enable.
        const RXSIE = 1 << 4;
        /// Loop-back Mode Enable.
        const LBME  = 1 << 3;
        /// Auto-baud Error Interrupt Enable.
        const ABEIE = 1 << 2;
    }
}

bitflags! {
    /// Control B register bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CtrlB: u8 {
        /// Receiver Enable.
        const RXEN  = 1 << 7;
        /// Transmitter Enable.
        const TXEN  = 1 << 6;
        /// Start-of-Frame Detection Enable.
        const SFDEN = 1 << 4;
        /// Open Drain Mode Enable.
        const ODME  = 1 << 3;
        /// Multi-processor Communication Mode.
        const MPCM  = 1 << 0;
    }
}

bitflags! {
    /// Receive Data High byte: status of the byte in RXDATAL.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RxDataH: u8 {
        /// Receive Complete Interrupt Flag.
        const RXCIF  = 1 << 7;
        /// Receiver Buffer Overflow.
        const BUFOVF = 1 << 6;
        /// Frame Error.
        const FERR   = 1 << 2;
        /// Parity Error.
        const PERR   = 1 << 1;
        /// Receiver Data bit 8 (9-bit mode).
        const DATA8  = 1 << 0;
    }
}

impl RxDataH {
    /// Maps the error bits onto [`RxStatus`].
    #[must_use]
    pub fn errors(self) -> RxStatus {
        let mut status = RxStatus::empty();
        status.set(RxStatus::HW_OVERFLOW, self.contains(Self::BUFOVF));
        status.set(RxStatus::FRAME_ERROR, self.contains(Self::FERR));
        status.set(RxStatus::PARITY_ERROR, self.contains(Self::PERR));
        status
    }
}

bitflags! {
    /// Status register bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Status: u8 {
        /// Receive Complete Interrupt Flag.
        const RXCIF = 1 << 7;
        /// Transmit Complete Interrupt Flag.
        const TXCIF = 1 << 6;
        /// Data Register Empty Flag.
        const DREIF = 1 << 5;
        /// Receive Start Interrupt Flag.
        const RXSIF = 1 << 4;
        /// Inconsistent Sync Field Interrupt Flag.
        const ISFIF = 1 << 3;
        /// Break Detected Flag.
        const BDF   = 1 << 1;
        /// Wait For Break.
        const WFB   = 1 << 0;
    }
}

// ---------------------------------------------------------------------------
// Base addresses
// ---------------------------------------------------------------------------

/// USART0 base address on megaAVR 0-series and AVR DA.
pub const USART0: usize = 0x0800;
/// USART1 base address on megaAVR 0-series and AVR DA.
pub const USART1: usize = 0x0820;
/// USART2 base address on megaAVR 0-series and AVR DA.
pub const USART2: usize = 0x0840;
/// USART3 base address on megaAVR 0-series and AVR DA.
pub const USART3: usize = 0x0860;
/// USART4 base address on AVR DA.
pub const USART4: usize = 0x0880;
/// USART5 base address on 64-pin AVR DA parts.
pub const USART5: usize = 0x08A0;

/// Time given to the last frame to leave the shift register on close.
pub const SETTLE_MS: u32 = 200;

/// Rough cost of one settle-loop iteration (volatile load plus branch).
const CYCLES_PER_SETTLE_SPIN: u32 = 4;

// ---------------------------------------------------------------------------
// AvrUsart
// ---------------------------------------------------------------------------

/// A USART unit identified by its base address.
///
/// Carries no state beyond the address and the settle budget, so it is
/// `Copy` and can live in a `static` [`Line`](crate::Line).
#[derive(Debug, Clone, Copy)]
pub struct AvrUsart {
    base: usize,
    settle_spins: u32,
}

impl AvrUsart {
    /// Creates a handle. Does **not** touch hardware.
    ///
    /// `f_cpu_hz` sizes the settle delay used by `close`.
    ///
    /// # Safety
    ///
    /// `base` must be the address of a USART register block of the layout
    /// above, and no other code may drive that unit while this handle is in
    /// use.
    #[must_use]
    pub const unsafe fn new(base: usize, f_cpu_hz: u32) -> Self {
        Self {
            base,
            settle_spins: (f_cpu_hz / 1000).saturating_mul(SETTLE_MS) / CYCLES_PER_SETTLE_SPIN,
        }
    }

    /// Returns the base address.
    #[must_use]
    pub const fn base(&self) -> usize {
        self.base
    }

    #[inline]
    fn read(&self, offset: usize) -> u8 {
        // SAFETY: `new`'s contract makes `base + offset` a valid register.
        unsafe { core::ptr::read_volatile((self.base + offset) as *const u8) }
    }

    #[inline]
    fn write(&self, offset: usize, value: u8) {
        // SAFETY: `new`'s contract makes `base + offset` a valid register.
        unsafe { core::ptr::write_volatile((self.base + offset) as *mut u8, value) }
    }

    /// Returns the current status register.
    #[must_use]
    pub fn status(&self) -> Status {
        Status::from_bits_truncate(self.read(reg::STATUS))
    }

    fn modify_ctrla(&self, f: impl FnOnce(CtrlA) -> CtrlA) {
        let ctrla = CtrlA::from_bits_retain(self.read(reg::CTRLA));
        self.write(reg::CTRLA, f(ctrla).bits());
    }

    fn modify_ctrlb(&self, f: impl FnOnce(CtrlB) -> CtrlB) {
        let ctrlb = CtrlB::from_bits_retain(self.read(reg::CTRLB));
        self.write(reg::CTRLB, f(ctrlb).bits());
    }
}

impl UsartHardware for AvrUsart {
    fn set_baud(&self, baud: u16) {
        let [lo, hi] = baud.to_le_bytes();
        // 16-bit register: low byte goes to TEMP, high byte commits both.
        self.write(reg::BAUDL, lo);
        self.write(reg::BAUDH, hi);
    }

    fn enable_units(&self) {
        self.modify_ctrlb(|b| b | CtrlB::RXEN | CtrlB::TXEN);
    }

    fn disable_units(&self) {
        self.modify_ctrlb(|b| b - (CtrlB::RXEN | CtrlB::TXEN));
    }

    fn set_rx_interrupt(&self, enabled: bool) {
        self.modify_ctrla(|mut a| {
            a.set(CtrlA::RXCIE, enabled);
            a
        });
    }

    fn set_tx_interrupt(&self, enabled: bool) {
        self.modify_ctrla(|mut a| {
            a.set(CtrlA::DREIE, enabled);
            a
        });
    }

    fn tx_ready(&self) -> bool {
        self.status().contains(Status::DREIF)
    }

    fn read_rx(&self) -> (u8, RxStatus) {
        // RXDATAH first: reading RXDATAL advances the receive FIFO.
        let high = RxDataH::from_bits_truncate(self.read(reg::RXDATAH));
        let byte = self.read(reg::RXDATAL);
        (byte, high.errors())
    }

    fn write_tx(&self, byte: u8) {
        self.write(reg::TXDATAL, byte);
    }

    fn settle(&self) {
        for _ in 0..self.settle_spins {
            // A volatile read the optimizer cannot drop.
            let _ = self.status();
        }
    }
}
