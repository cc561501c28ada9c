//! Host-side USART simulation.
//!
//! [`SimUsart`] implements [`UsartHardware`] on top of plain memory so the
//! driver can be exercised without a microcontroller. Clones share one
//! simulated register file: hand one clone to the [`Line`](crate::Line) and
//! keep another to inject received bytes, inspect what was transmitted, and
//! decide when to "fire" an interrupt via [`pending_rxc`](SimUsart::pending_rxc)
//! and [`pending_dre`](SimUsart::pending_dre).
//!
//! Clones are `Send + Sync`, so a test thread can play interrupt context.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::vec::Vec;

use serline_driver_api::{RxStatus, UsartHardware};

/// A hardware operation, recorded in call order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimEvent {
    /// Baud register written.
    Baud(u16),
    /// Receiver and transmitter enabled.
    UnitsEnabled,
    /// Receiver and transmitter disabled.
    UnitsDisabled,
    /// Receive-complete interrupt armed (`true`) or disarmed.
    RxInterrupt(bool),
    /// Data-register-empty interrupt armed (`true`) or disarmed.
    TxInterrupt(bool),
    /// Settle delay ran.
    Settle,
}

#[derive(Debug)]
struct SimRegs {
    baud: Option<u16>,
    units_enabled: bool,
    rxcie: bool,
    dreie: bool,
    tx_ready: bool,
    rx_fifo: VecDeque<(u8, RxStatus)>,
    last_rx: u8,
    transmitted: Vec<u8>,
    events: Vec<SimEvent>,
}

/// Simulated USART register file.
#[derive(Debug, Clone)]
pub struct SimUsart {
    regs: Arc<Mutex<SimRegs>>,
}

impl Default for SimUsart {
    fn default() -> Self {
        Self::new()
    }
}

impl SimUsart {
    /// Creates a powered-down USART whose transmit register is empty.
    #[must_use]
    pub fn new() -> Self {
        Self {
            regs: Arc::new(Mutex::new(SimRegs {
                baud: None,
                units_enabled: false,
                rxcie: false,
                dreie: false,
                tx_ready: true,
                rx_fifo: VecDeque::new(),
                last_rx: 0,
                transmitted: Vec::new(),
                events: Vec::new(),
            })),
        }
    }

    fn regs(&self) -> MutexGuard<'_, SimRegs> {
        self.regs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queues a byte as if it had arrived on the wire with `status`.
    pub fn inject(&self, byte: u8, status: RxStatus) {
        self.regs().rx_fifo.push_back((byte, status));
    }

    /// Number of injected bytes not yet read by the driver.
    #[must_use]
    pub fn rx_pending(&self) -> usize {
        self.regs().rx_fifo.len()
    }

    /// Returns `true` if the receive-complete interrupt would fire now.
    #[must_use]
    pub fn pending_rxc(&self) -> bool {
        let regs = self.regs();
        regs.units_enabled && regs.rxcie && !regs.rx_fifo.is_empty()
    }

    /// Returns `true` if the data-register-empty interrupt would fire now.
    #[must_use]
    pub fn pending_dre(&self) -> bool {
        let regs = self.regs();
        regs.units_enabled && regs.dreie && regs.tx_ready
    }

    /// Holds the data-register-empty status low (`false`) or releases it.
    pub fn set_tx_ready(&self, ready: bool) {
        self.regs().tx_ready = ready;
    }

    /// Bytes written to the transmit register so far.
    #[must_use]
    pub fn transmitted(&self) -> Vec<u8> {
        self.regs().transmitted.clone()
    }

    /// Takes and clears the transmitted bytes.
    pub fn take_transmitted(&self) -> Vec<u8> {
        core::mem::take(&mut self.regs().transmitted)
    }

    /// Last value written to the baud register.
    #[must_use]
    pub fn baud(&self) -> Option<u16> {
        self.regs().baud
    }

    /// Returns `true` if the receiver and transmitter are enabled.
    #[must_use]
    pub fn units_enabled(&self) -> bool {
        self.regs().units_enabled
    }

    /// Returns `true` if the receive-complete interrupt is armed.
    #[must_use]
    pub fn rx_interrupt_armed(&self) -> bool {
        self.regs().rxcie
    }

    /// Returns `true` if the data-register-empty interrupt is armed.
    #[must_use]
    pub fn tx_interrupt_armed(&self) -> bool {
        self.regs().dreie
    }

    /// Every hardware operation so far, in order.
    #[must_use]
    pub fn events(&self) -> Vec<SimEvent> {
        self.regs().events.clone()
    }
}

impl UsartHardware for SimUsart {
    fn set_baud(&self, baud: u16) {
        let mut regs = self.regs();
        regs.baud = Some(baud);
        regs.events.push(SimEvent::Baud(baud));
    }

    fn enable_units(&self) {
        let mut regs = self.regs();
        regs.units_enabled = true;
        regs.events.push(SimEvent::UnitsEnabled);
    }

    fn disable_units(&self) {
        let mut regs = self.regs();
        regs.units_enabled = false;
        regs.events.push(SimEvent::UnitsDisabled);
    }

    fn set_rx_interrupt(&self, enabled: bool) {
        let mut regs = self.regs();
        regs.rxcie = enabled;
        regs.events.push(SimEvent::RxInterrupt(enabled));
    }

    fn set_tx_interrupt(&self, enabled: bool) {
        let mut regs = self.regs();
        regs.dreie = enabled;
        regs.events.push(SimEvent::TxInterrupt(enabled));
    }

    fn tx_ready(&self) -> bool {
        self.regs().tx_ready
    }

    fn read_rx(&self) -> (u8, RxStatus) {
        let mut regs = self.regs();
        match regs.rx_fifo.pop_front() {
            Some((byte, status)) => {
                regs.last_rx = byte;
                (byte, status)
            }
            // An empty data register reads back its previous contents.
            None => (regs.last_rx, RxStatus::empty()),
        }
    }

    fn write_tx(&self, byte: u8) {
        self.regs().transmitted.push(byte);
    }

    fn settle(&self) {
        self.regs().events.push(SimEvent::Settle);
    }
}
