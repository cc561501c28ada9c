//! Static line declarations and interrupt vector glue.
//!
//! Firmware typically owns one `static` [`Line`](crate::Line) per enabled
//! USART unit and forwards the unit's two interrupt vectors to it:
//!
//! ```ignore
//! use serline::avr::{AvrUsart, USART0};
//!
//! fn usart0_pins() {
//!     // PORTA.DIR: PA0 (TxD) output, PA1 (RxD) input.
//! }
//!
//! serline::declare_line! {
//!     /// Console on USART0.
//!     pub static CONSOLE: AvrUsart = unsafe { AvrUsart::new(USART0, F_CPU) },
//!         port = usart0_pins;
//! }
//!
//! serline::bind_line_interrupts! {
//!     CONSOLE,
//!     #[avr_device::interrupt(atmega4808)]
//!     rxc = USART0_RXC,
//!     #[avr_device::interrupt(atmega4808)]
//!     dre = USART0_DRE,
//! }
//! ```
//!
//! Vector naming and attributes are toolchain-specific, so the binding macro
//! only generates the forwarding functions and passes attributes through.

/// Declares a `static` line.
///
/// The hardware expression must be `const`-evaluable; `port` names a
/// `fn()` run once per `open`. An optional `capacity = N;` overrides
/// [`DEFAULT_BUFFER_SIZE`](crate::DEFAULT_BUFFER_SIZE).
#[macro_export]
macro_rules! declare_line {
    (
        $(#[$attr:meta])*
        $vis:vis static $name:ident: $hw_ty:ty = $hw:expr, port = $port:path;
    ) => {
        $crate::declare_line! {
            $(#[$attr])*
            $vis static $name: $hw_ty = $hw, port = $port, capacity = $crate::DEFAULT_BUFFER_SIZE;
        }
    };
    (
        $(#[$attr:meta])*
        $vis:vis static $name:ident: $hw_ty:ty = $hw:expr, port = $port:path, capacity = $n:expr;
    ) => {
        $(#[$attr])*
        $vis static $name: $crate::Line<$hw_ty, fn(), { $n }> =
            $crate::Line::new($hw, $port as fn());
    };
}

/// Generates the receive-complete and data-register-empty handlers for a
/// `static` line.
///
/// Each generated function forwards to
/// [`Line::on_receive_complete`](crate::Line::on_receive_complete) or
/// [`Line::on_transmit_empty`](crate::Line::on_transmit_empty). Attributes
/// written before `rxc` and `dre` are attached to the respective function,
/// which is how a vector-binding attribute is applied.
#[macro_export]
macro_rules! bind_line_interrupts {
    (
        $line:expr,
        $(#[$rx_attr:meta])*
        rxc = $rxc:ident,
        $(#[$tx_attr:meta])*
        dre = $dre:ident $(,)?
    ) => {
        $(#[$rx_attr])*
        #[allow(non_snake_case)]
        pub fn $rxc() {
            $line.on_receive_complete();
        }

        $(#[$tx_attr])*
        #[allow(non_snake_case)]
        pub fn $dre() {
            $line.on_transmit_empty();
        }
    };
}
