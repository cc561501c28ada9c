//! Interrupt-side entry points.
//!
//! These are the only writers into the receive buffer and the only readers
//! from the transmit buffer. Both run to completion: no polling, no delays,
//! no logging.

use serline_driver_api::{PortConfigurator, RxStatus, UsartHardware};

use crate::line::{Line, RxEntry};

impl<H: UsartHardware, P: PortConfigurator, const N: usize> Line<H, P, N> {
    /// Receive-complete handler.
    ///
    /// Reads the byte and its error status from the hardware, latches the
    /// status, and queues the byte tagged with it. If the receive buffer is
    /// full the incoming byte is dropped and the overflow flag is set;
    /// buffered bytes are never overwritten. The next byte that fits is
    /// tagged [`RxStatus::BUFFER_OVERFLOW`], marking where data was lost.
    pub fn on_receive_complete(&self) {
        let mut state = self.state.lock();
        // Always read: it acknowledges the interrupt even on a closed line.
        let (byte, status) = self.hw.read_rx();
        if !state.open {
            return;
        }

        state.latched = status;
        if status.is_error() {
            state.stats.rx_errors = state.stats.rx_errors.wrapping_add(1);
        }
        // The first byte stored after a gap carries the overflow mark.
        let entry = RxEntry {
            byte,
            status: if state.overflow {
                status | RxStatus::BUFFER_OVERFLOW
            } else {
                status
            },
        };
        if state.rx.try_push(entry).is_ok() {
            state.overflow = false;
            state.stats.rx_bytes = state.stats.rx_bytes.wrapping_add(1);
        } else {
            state.overflow = true;
            state.stats.rx_dropped = state.stats.rx_dropped.wrapping_add(1);
        }
    }

    /// Transmit data-register-empty handler.
    ///
    /// Moves one queued byte into the hardware. With nothing queued it
    /// disarms itself until the next send re-arms it.
    pub fn on_transmit_empty(&self) {
        let mut state = self.state.lock();
        if !state.open {
            self.hw.set_tx_interrupt(false);
            return;
        }
        match state.tx.pop() {
            Some(byte) => {
                self.hw.write_tx(byte);
                state.stats.tx_bytes = state.stats.tx_bytes.wrapping_add(1);
            }
            None => self.hw.set_tx_interrupt(false),
        }
    }
}
