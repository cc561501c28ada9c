//! Line state and the foreground driver operations.
//!
//! A line is **Closed** until [`Line::open`] and returns to Closed on
//! [`Line::close`]. Every foreground operation on a closed line fails with
//! [`LineError::NotOpen`]; the interrupt handlers treat a closed line as a
//! sink and only acknowledge the hardware.

use serline_core::sync::IrqSpinLock;
use serline_driver_api::{LineError, NoPortConfig, PortConfigurator, RxResult, RxStatus, UsartHardware};
use serline_ringbuf::RingBuf;

use crate::DEFAULT_BUFFER_SIZE;
use crate::baud::BaudRate;

/// A received byte tagged with the status latched for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RxEntry {
    pub(crate) byte: u8,
    pub(crate) status: RxStatus,
}

/// Traffic counters for one line. All counters wrap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineStats {
    /// Bytes handed to the transmit data register.
    pub tx_bytes: u32,
    /// Bytes stored in the receive buffer.
    pub rx_bytes: u32,
    /// Bytes dropped because the receive buffer was full.
    pub rx_dropped: u32,
    /// Bytes received with a framing, parity or overrun error.
    pub rx_errors: u32,
}

impl LineStats {
    const fn new() -> Self {
        Self {
            tx_bytes: 0,
            rx_bytes: 0,
            rx_dropped: 0,
            rx_errors: 0,
        }
    }
}

/// Everything the foreground and the interrupt handlers share.
pub(crate) struct LineState<P, const N: usize> {
    pub(crate) port: P,
    pub(crate) rx: RingBuf<RxEntry, N>,
    pub(crate) tx: RingBuf<u8, N>,
    /// Status of the most recently received byte.
    pub(crate) latched: RxStatus,
    /// A byte was dropped and no byte has been stored since.
    pub(crate) overflow: bool,
    pub(crate) open: bool,
    pub(crate) stats: LineStats,
}

/// One USART unit driven through interrupt-fed ring buffers.
///
/// `H` is the register surface, `P` the pin configuration run by
/// [`open`](Self::open), `N` the capacity of each ring buffer (a power of
/// two). Independent units are independent `Line` values.
pub struct Line<H, P = NoPortConfig, const N: usize = DEFAULT_BUFFER_SIZE> {
    pub(crate) hw: H,
    pub(crate) state: IrqSpinLock<LineState<P, N>>,
}

impl<H, P, const N: usize> Line<H, P, N> {
    /// Creates a closed line. Does **not** touch hardware.
    pub const fn new(hw: H, port: P) -> Self {
        Self {
            hw,
            state: IrqSpinLock::new(LineState {
                port,
                rx: RingBuf::new(),
                tx: RingBuf::new(),
                latched: RxStatus::empty(),
                overflow: false,
                open: false,
                stats: LineStats::new(),
            }),
        }
    }

    /// Returns the hardware handle.
    pub const fn hardware(&self) -> &H {
        &self.hw
    }

    /// Returns `true` between [`open`](Self::open) and [`close`](Self::close).
    pub fn is_open(&self) -> bool {
        self.state.lock().open
    }

    /// Returns a snapshot of the traffic counters.
    pub fn stats(&self) -> LineStats {
        self.state.lock().stats
    }

    /// Number of received bytes waiting to be read.
    pub fn rx_len(&self) -> usize {
        self.state.lock().rx.len()
    }

    /// Number of bytes waiting to be transmitted.
    pub fn tx_len(&self) -> usize {
        self.state.lock().tx.len()
    }
}

impl<H: UsartHardware, P: PortConfigurator, const N: usize> Line<H, P, N> {
    /// Brings the line up.
    ///
    /// Empties both buffers and the latched flags, runs the port
    /// configurator, programs the baud rate, enables the receiver and
    /// transmitter, and arms the receive-complete interrupt. The transmit
    /// interrupt stays disarmed until the first send.
    ///
    /// Opening an already-open line re-initializes it; unsent and unread
    /// bytes are discarded.
    pub fn open(&self, baud: BaudRate) {
        let reopened = {
            let mut state = self.state.lock();
            let reopened = state.open;

            self.hw.set_tx_interrupt(false);
            state.rx.clear();
            state.tx.clear();
            state.latched = RxStatus::empty();
            state.overflow = false;

            state.port.configure();
            self.hw.set_baud(baud.register());
            self.hw.enable_units();
            self.hw.set_rx_interrupt(true);
            state.open = true;
            reopened
        };

        if reopened {
            log::warn!("serline: line reopened, pending data discarded");
        }
        log::debug!(
            "serline: line open, BAUD={:#06x}, {} byte buffers",
            baud.register(),
            N
        );
    }

    /// Queues one byte for transmission, waiting while the transmit buffer
    /// is full.
    ///
    /// Never drops data: back-pressure stalls the caller. The lock is
    /// released between polls so the transmit interrupt can drain.
    ///
    /// # Errors
    ///
    /// Returns [`LineError::NotOpen`] if the line is closed.
    pub fn send_byte(&self, byte: u8) -> Result<(), LineError> {
        loop {
            match self.try_send_byte(byte) {
                Err(LineError::TransmitBufferFull) => core::hint::spin_loop(),
                other => return other,
            }
        }
    }

    /// Queues one byte for transmission without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`LineError::NotOpen`] if the line is closed, or
    /// [`LineError::TransmitBufferFull`] if the byte does not fit right now.
    pub fn try_send_byte(&self, byte: u8) -> Result<(), LineError> {
        let mut state = self.state.lock();
        if !state.open {
            return Err(LineError::NotOpen);
        }
        state
            .tx
            .try_push(byte)
            .map_err(|_| LineError::TransmitBufferFull)?;
        self.hw.set_tx_interrupt(true);
        Ok(())
    }

    /// Queues every byte of `bytes` in order.
    ///
    /// Not atomic as a whole: bytes are queued one [`send_byte`](Self::send_byte)
    /// at a time.
    ///
    /// # Errors
    ///
    /// Returns [`LineError::NotOpen`] if the line is closed.
    pub fn send_bytes(&self, bytes: &[u8]) -> Result<(), LineError> {
        for &byte in bytes {
            self.send_byte(byte)?;
        }
        Ok(())
    }

    /// Polls the receive buffer.
    ///
    /// Returns the oldest byte with the status latched at its reception, or
    /// [`RxResult::NoData`] carrying the most recently latched flags. An
    /// empty poll changes nothing.
    ///
    /// If bytes were dropped because the buffer was full, the first byte
    /// stored after the gap carries [`RxStatus::BUFFER_OVERFLOW`]. Until that
    /// byte arrives, empty polls report the flag too.
    ///
    /// # Errors
    ///
    /// Returns [`LineError::NotOpen`] if the line is closed.
    pub fn read_byte(&self) -> Result<RxResult, LineError> {
        let (result, dropped) = {
            let mut state = self.state.lock();
            if !state.open {
                return Err(LineError::NotOpen);
            }
            match state.rx.pop() {
                Some(entry) => {
                    let dropped = entry
                        .status
                        .contains(RxStatus::BUFFER_OVERFLOW)
                        .then_some(state.stats.rx_dropped);
                    let result = RxResult::Data {
                        byte: entry.byte,
                        status: entry.status,
                    };
                    (result, dropped)
                }
                None => {
                    let status = if state.overflow {
                        state.latched | RxStatus::BUFFER_OVERFLOW
                    } else {
                        state.latched
                    };
                    (RxResult::NoData { status }, None)
                }
            }
        };

        if let Some(total) = dropped {
            log::warn!("serline: receive buffer overflowed ({total} bytes dropped so far)");
        }
        Ok(result)
    }

    /// Shuts the line down after all queued output has left.
    ///
    /// Waits for the transmit buffer to drain and the data register to
    /// report empty, lets the last frame settle, then disables both units
    /// and both interrupts. Buffers keep their contents until the next
    /// [`open`](Self::open).
    ///
    /// # Errors
    ///
    /// Returns [`LineError::NotOpen`] if the line is already closed.
    pub fn close(&self) -> Result<(), LineError> {
        self.close_with_limit(None)
    }

    /// Like [`close`](Self::close), but gives up after `max_polls` polls of
    /// the drain condition.
    ///
    /// # Errors
    ///
    /// Returns [`LineError::NotOpen`] if the line is already closed, or
    /// [`LineError::Timeout`] if output did not drain in time. The line stays
    /// open on timeout.
    pub fn close_timeout(&self, max_polls: u32) -> Result<(), LineError> {
        self.close_with_limit(Some(max_polls))
    }

    fn close_with_limit(&self, max_polls: Option<u32>) -> Result<(), LineError> {
        let mut polls: u32 = 0;
        loop {
            {
                let state = self.state.lock();
                if !state.open {
                    return Err(LineError::NotOpen);
                }
                if state.tx.is_empty() && self.hw.tx_ready() {
                    break;
                }
            }
            if max_polls.is_some_and(|max| polls >= max) {
                log::warn!(
                    "serline: close timed out with {} bytes unsent",
                    self.tx_len()
                );
                return Err(LineError::Timeout);
            }
            polls = polls.saturating_add(1);
            core::hint::spin_loop();
        }

        // Interrupts stay enabled while the last frame shifts out.
        self.hw.settle();

        {
            let mut state = self.state.lock();
            self.hw.disable_units();
            self.hw.set_rx_interrupt(false);
            self.hw.set_tx_interrupt(false);
            state.open = false;
        }
        log::debug!("serline: line closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{SimEvent, SimUsart};

    const BAUD: BaudRate = BaudRate::from_register(1389);

    fn open_line<const N: usize>() -> (Line<SimUsart, NoPortConfig, N>, SimUsart) {
        let sim = SimUsart::new();
        let line = Line::new(sim.clone(), NoPortConfig);
        line.open(BAUD);
        (line, sim)
    }

    /// Fires the transmit interrupt until the simulated hardware stops
    /// requesting it.
    fn drain_tx<P: PortConfigurator, const N: usize>(line: &Line<SimUsart, P, N>, sim: &SimUsart) {
        while sim.pending_dre() {
            line.on_transmit_empty();
        }
    }

    #[test]
    fn open_programs_hardware_in_order() {
        let sim = SimUsart::new();
        let mut configured = 0;
        {
            let line: Line<_, _, 8> = Line::new(sim.clone(), || configured += 1);
            assert!(!line.is_open());
            line.open(BAUD);
            assert!(line.is_open());
        }
        assert_eq!(configured, 1);
        assert_eq!(sim.baud(), Some(1389));
        assert!(sim.units_enabled());
        assert!(sim.rx_interrupt_armed());
        assert!(!sim.tx_interrupt_armed());
        assert_eq!(
            sim.events(),
            vec![
                SimEvent::TxInterrupt(false),
                SimEvent::Baud(1389),
                SimEvent::UnitsEnabled,
                SimEvent::RxInterrupt(true),
            ]
        );
    }

    #[test]
    fn operations_on_closed_line_fail() {
        let sim = SimUsart::new();
        let line: Line<_, _, 8> = Line::new(sim.clone(), NoPortConfig);
        assert_eq!(line.send_byte(1), Err(LineError::NotOpen));
        assert_eq!(line.try_send_byte(1), Err(LineError::NotOpen));
        assert_eq!(line.send_bytes(b"ab"), Err(LineError::NotOpen));
        assert_eq!(line.read_byte(), Err(LineError::NotOpen));
        assert_eq!(line.close(), Err(LineError::NotOpen));
        assert!(sim.events().is_empty());
    }

    #[test]
    fn transmit_round_trip() {
        let (line, sim) = open_line::<32>();
        line.send_bytes(&[0x01, 0x02, 0x03, 0x04, 0x05]).unwrap();
        assert!(sim.tx_interrupt_armed());
        assert_eq!(line.tx_len(), 5);

        drain_tx(&line, &sim);
        assert_eq!(sim.transmitted(), vec![0x01, 0x02, 0x03, 0x04, 0x05]);
        // The interrupt disarmed itself once the buffer ran dry.
        assert!(!sim.tx_interrupt_armed());
        assert_eq!(line.stats().tx_bytes, 5);
    }

    #[test]
    fn try_send_reports_full_buffer() {
        let (line, sim) = open_line::<4>();
        for b in 0..4 {
            line.try_send_byte(b).unwrap();
        }
        assert_eq!(line.try_send_byte(4), Err(LineError::TransmitBufferFull));

        line.on_transmit_empty();
        line.try_send_byte(4).unwrap();
        drain_tx(&line, &sim);
        assert_eq!(sim.transmitted(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn receive_in_order_without_errors() {
        let (line, sim) = open_line::<32>();
        for &b in b"ABC" {
            sim.inject(b, RxStatus::empty());
            line.on_receive_complete();
        }
        for &b in b"ABC" {
            assert_eq!(
                line.read_byte(),
                Ok(RxResult::Data {
                    byte: b,
                    status: RxStatus::empty()
                })
            );
        }
        assert_eq!(
            line.read_byte(),
            Ok(RxResult::NoData {
                status: RxStatus::empty()
            })
        );
        assert_eq!(line.stats().rx_bytes, 3);
    }

    #[test]
    fn empty_poll_carries_latched_flags_and_mutates_nothing() {
        let (line, sim) = open_line::<8>();
        sim.inject(b'x', RxStatus::PARITY_ERROR);
        line.on_receive_complete();
        let _ = line.read_byte().unwrap();

        let before = line.stats();
        for _ in 0..3 {
            assert_eq!(
                line.read_byte(),
                Ok(RxResult::NoData {
                    status: RxStatus::PARITY_ERROR
                })
            );
        }
        assert_eq!(line.rx_len(), 0);
        assert_eq!(line.stats(), before);
    }

    #[test]
    fn each_byte_keeps_its_own_status() {
        let (line, sim) = open_line::<8>();
        sim.inject(b'1', RxStatus::FRAME_ERROR);
        line.on_receive_complete();
        sim.inject(b'2', RxStatus::empty());
        line.on_receive_complete();
        sim.inject(b'3', RxStatus::HW_OVERFLOW);
        line.on_receive_complete();

        let statuses: Vec<_> = (0..3).map(|_| line.read_byte().unwrap().status()).collect();
        assert_eq!(
            statuses,
            vec![RxStatus::FRAME_ERROR, RxStatus::empty(), RxStatus::HW_OVERFLOW]
        );
        // A received error never costs the byte.
        assert_eq!(line.stats().rx_errors, 2);
        assert_eq!(line.stats().rx_bytes, 3);
    }

    #[test]
    fn receive_overflow_drops_newest_and_keeps_invariants() {
        let (line, sim) = open_line::<4>();
        for b in 0..5u8 {
            sim.inject(b, RxStatus::empty());
            line.on_receive_complete();
        }
        assert_eq!(line.rx_len(), 4);
        assert_eq!(line.stats().rx_dropped, 1);

        // Bytes received before the gap stay clean.
        for b in 0..4u8 {
            assert_eq!(
                line.read_byte(),
                Ok(RxResult::Data {
                    byte: b,
                    status: RxStatus::empty()
                })
            );
        }
        assert!(!line.read_byte().unwrap().has_data());

        // The first byte after the gap is marked, and only that one.
        sim.inject(9, RxStatus::empty());
        line.on_receive_complete();
        sim.inject(10, RxStatus::empty());
        line.on_receive_complete();
        assert_eq!(
            line.read_byte(),
            Ok(RxResult::Data {
                byte: 9,
                status: RxStatus::BUFFER_OVERFLOW
            })
        );
        assert_eq!(
            line.read_byte(),
            Ok(RxResult::Data {
                byte: 10,
                status: RxStatus::empty()
            })
        );
        assert_eq!(line.rx_len(), 0);
    }

    #[test]
    fn close_disables_everything_after_settling() {
        let (line, sim) = open_line::<8>();
        line.close().unwrap();
        assert!(!line.is_open());
        assert!(!sim.units_enabled());
        assert!(!sim.rx_interrupt_armed());
        assert!(!sim.tx_interrupt_armed());

        let events = sim.events();
        let settle = events.iter().position(|e| *e == SimEvent::Settle).unwrap();
        let disable = events
            .iter()
            .position(|e| *e == SimEvent::UnitsDisabled)
            .unwrap();
        assert!(settle < disable);
        assert_eq!(line.read_byte(), Err(LineError::NotOpen));
    }

    #[test]
    fn close_timeout_with_pending_output() {
        let (line, sim) = open_line::<8>();
        line.send_bytes(b"hi").unwrap();
        assert_eq!(line.close_timeout(10), Err(LineError::Timeout));
        assert!(line.is_open());

        drain_tx(&line, &sim);
        sim.set_tx_ready(false);
        assert_eq!(line.close_timeout(10), Err(LineError::Timeout));

        sim.set_tx_ready(true);
        assert_eq!(line.close_timeout(10), Ok(()));
        assert_eq!(sim.transmitted(), b"hi".to_vec());
    }

    #[test]
    fn reopen_discards_pending_data() {
        let (line, sim) = open_line::<8>();
        line.send_bytes(b"lost").unwrap();
        sim.inject(b'z', RxStatus::FRAME_ERROR);
        line.on_receive_complete();

        line.open(BAUD);
        assert_eq!(line.tx_len(), 0);
        assert_eq!(line.rx_len(), 0);
        assert!(!sim.tx_interrupt_armed());
        assert_eq!(
            line.read_byte(),
            Ok(RxResult::NoData {
                status: RxStatus::empty()
            })
        );
    }

    #[test]
    fn buffers_survive_close_until_next_open() {
        let (line, sim) = open_line::<8>();
        sim.inject(b'q', RxStatus::empty());
        line.on_receive_complete();
        line.close().unwrap();
        assert_eq!(line.rx_len(), 1);

        line.open(BAUD);
        assert_eq!(line.rx_len(), 0);
    }
}
