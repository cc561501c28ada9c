//! Interrupt-driven UART line driver.
//!
//! A [`Line`] multiplexes one USART unit between foreground code and two
//! interrupt handlers, with a fixed-capacity ring buffer in each direction:
//!
//! - **Transmit**: [`Line::send_byte`] enqueues and arms the
//!   data-register-empty interrupt; [`Line::on_transmit_empty`] moves one byte
//!   per interrupt into the hardware and disarms itself once the buffer runs
//!   dry.
//! - **Receive**: [`Line::on_receive_complete`] pushes each byte with the
//!   error status latched for it; [`Line::read_byte`] polls without blocking.
//!
//! All state shared between the two contexts sits behind one
//! [`IrqSpinLock`](serline_core::sync::IrqSpinLock), so every compound update
//! runs with interrupts masked on the target.
//!
//! Hardware access goes through [`UsartHardware`]. [`avr::AvrUsart`] drives
//! the AVR 0/1-series and DA USART register block; the `sim` feature adds a
//! host-side simulation used by the tests.

#![cfg_attr(not(test), no_std)]

#[cfg(all(feature = "sim", not(test)))]
extern crate std;

pub mod avr;
pub mod baud;
mod isr;
pub mod line;
pub mod registry;
#[cfg(any(test, feature = "sim"))]
pub mod sim;
pub mod stream;

pub use baud::BaudRate;
pub use line::{Line, LineStats};
pub use serline_driver_api::{
    LineError, NoPortConfig, PortConfigurator, RxResult, RxStatus, UsartHardware,
};
pub use stream::LineWriter;

/// Ring buffer capacity used when a [`Line`] does not name one.
pub const DEFAULT_BUFFER_SIZE: usize = 32;

serline_core::static_assert!(
    DEFAULT_BUFFER_SIZE.is_power_of_two(),
    "line buffers index with a bitmask"
);
