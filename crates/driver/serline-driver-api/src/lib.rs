//! Driver API traits and types for the serline UART driver.
//!
//! This crate defines the seams between the line driver and everything it
//! does not own:
//!
//! - [`UsartHardware`] -- the narrow register surface one line needs (arm or
//!   disarm an interrupt, move one byte in or out, read status).
//! - [`PortConfigurator`] -- the one-shot pin/route setup run by `open`.
//! - [`RxStatus`] and [`RxResult`] -- what a receive poll reports.
//! - [`LineError`] -- software-side failures.

#![cfg_attr(not(test), no_std)]

pub mod error;
pub mod hw;
pub mod rx;

pub use error::LineError;
pub use hw::{NoPortConfig, PortConfigurator, UsartHardware};
pub use rx::{RxResult, RxStatus};
