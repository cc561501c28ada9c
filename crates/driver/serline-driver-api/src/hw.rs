//! Hardware-facing traits.

use crate::rx::RxStatus;

/// Register surface of one USART unit, as seen by the line driver.
///
/// Methods take `&self` because hardware registers are inherently shared
/// state. The line calls every read-modify-write method (interrupt arming,
/// unit enables) with its lock held, so implementations need no locking of
/// their own. Only [`settle`](Self::settle) and [`tx_ready`](Self::tx_ready)
/// may run outside the lock.
pub trait UsartHardware {
    /// Programs the baud-rate register.
    fn set_baud(&self, baud: u16);

    /// Enables the receiver and transmitter units.
    fn enable_units(&self);

    /// Disables the receiver and transmitter units.
    fn disable_units(&self);

    /// Arms or disarms the receive-complete interrupt.
    fn set_rx_interrupt(&self, enabled: bool);

    /// Arms or disarms the transmit data-register-empty interrupt.
    fn set_tx_interrupt(&self, enabled: bool);

    /// Returns `true` if the transmit data register can accept a byte.
    fn tx_ready(&self) -> bool;

    /// Reads the received byte together with the error status latched for
    /// it.
    ///
    /// Reading acknowledges the receive-complete condition.
    fn read_rx(&self) -> (u8, RxStatus);

    /// Writes one byte to the transmit data register.
    fn write_tx(&self, byte: u8);

    /// Waits long enough for the last frame to leave the shift register.
    ///
    /// Called once by `close`, after the data register reports empty and
    /// before the units are disabled.
    fn settle(&self);
}

/// Pin direction and routing for one line.
///
/// Invoked once per `open`. Opaque to the driver: no arguments, no result,
/// no failure mode.
pub trait PortConfigurator {
    /// Routes and configures the line's pins.
    fn configure(&mut self);
}

impl<F: FnMut()> PortConfigurator for F {
    fn configure(&mut self) {
        self();
    }
}

/// A [`PortConfigurator`] for lines whose pins need no setup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoPortConfig;

impl PortConfigurator for NoPortConfig {
    fn configure(&mut self) {}
}
