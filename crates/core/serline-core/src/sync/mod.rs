//! Synchronization primitives shared by foreground and interrupt context.
//!
//! Provides [`IrqSpinLock`], usable in `static` items and before any
//! scheduler exists.

mod irq_spinlock;

pub use irq_spinlock::{IrqSpinLock, IrqSpinLockGuard};
