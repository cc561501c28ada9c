//! Core synchronization primitives for the serline driver.
//!
//! The serial line driver shares its ring buffers between interrupt handlers
//! and foreground code. Every compound update on that state goes through an
//! [`IrqSpinLock`](sync::IrqSpinLock), which masks interrupts for the
//! duration of the critical section on bare-metal targets and falls back to
//! a plain atomic spin lock on the host.
//!
//! By living outside the driver crate, these types can be tested with
//! `cargo test` on the host without a microcontroller target.

#![cfg_attr(not(test), no_std)]
#![cfg_attr(
    all(target_os = "none", target_arch = "avr"),
    feature(asm_experimental_arch)
)]

pub mod static_assert;
pub mod sync;
