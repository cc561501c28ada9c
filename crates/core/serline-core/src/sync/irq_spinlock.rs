//! Interrupt-safe spin lock.
//!
//! Masks interrupts before taking the lock and restores the previous
//! interrupt state on release. On a single-core microcontroller this is the
//! whole critical section: an interrupt handler can never observe the
//! protected data half-updated by the foreground code it preempted.
//!
//! On the host (`target_os != "none"`) there is nothing to mask, and the lock
//! degrades to an atomic test-and-test-and-set spin lock so threads can stand
//! in for interrupt context in tests.

use core::cell::UnsafeCell;
use core::marker::PhantomData;
use core::ops::{Deref, DerefMut};
use core::sync::atomic::{AtomicBool, Ordering};
#[cfg(target_os = "none")]
use core::sync::atomic::compiler_fence;

/// A spin lock that masks interrupts while held.
///
/// Const-constructable so it can be placed in `static` items.
pub struct IrqSpinLock<T> {
    locked: AtomicBool,
    data: UnsafeCell<T>,
}

// SAFETY: Interrupt masking (target) or the atomic flag (host) ensures
// exclusive access to `T`.
unsafe impl<T: Send> Send for IrqSpinLock<T> {}
unsafe impl<T: Send> Sync for IrqSpinLock<T> {}

impl<T> IrqSpinLock<T> {
    /// Creates a new unlocked `IrqSpinLock`.
    pub const fn new(value: T) -> Self {
        Self {
            locked: AtomicBool::new(false),
            data: UnsafeCell::new(value),
        }
    }

    /// Acquires the lock, masking interrupts first.
    ///
    /// Must not be called again on the same lock while a guard is alive in
    /// the same context.
    pub fn lock(&self) -> IrqSpinLockGuard<'_, T> {
        let saved_flags = save_flags_and_cli();
        self.acquire();
        IrqSpinLockGuard {
            lock: self,
            saved_flags,
            _not_send: PhantomData,
        }
    }

    /// Returns `true` if the lock is currently held.
    ///
    /// The answer is stale the moment it is returned; only useful for
    /// assertions.
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Relaxed)
    }

    /// Returns a mutable reference to the data without locking.
    ///
    /// The `&mut self` borrow already proves exclusivity.
    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }

    /// Single core with interrupts masked: nobody else can be holding it.
    #[cfg(target_os = "none")]
    #[inline]
    fn acquire(&self) {
        debug_assert!(
            !self.locked.load(Ordering::Relaxed),
            "IrqSpinLock re-entered with interrupts masked"
        );
        self.locked.store(true, Ordering::Relaxed);
        // Data accesses must not be hoisted above the mask.
        compiler_fence(Ordering::Acquire);
    }

    #[cfg(not(target_os = "none"))]
    #[inline]
    fn acquire(&self) {
        loop {
            if self
                .locked
                .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
            {
                return;
            }
            while self.locked.load(Ordering::Relaxed) {
                core::hint::spin_loop();
            }
        }
    }
}

/// RAII guard that restores interrupt state on drop.
///
/// `!Send`: the saved interrupt state belongs to the context that took it.
pub struct IrqSpinLockGuard<'a, T> {
    lock: &'a IrqSpinLock<T>,
    saved_flags: SavedFlags,
    _not_send: PhantomData<*const ()>,
}

impl<T> Deref for IrqSpinLockGuard<'_, T> {
    type Target = T;
    fn deref(&self) -> &T {
        // SAFETY: The lock is held, so we have exclusive access to the data.
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> DerefMut for IrqSpinLockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: The lock is held, so we have exclusive access to the data.
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T> Drop for IrqSpinLockGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.locked.store(false, Ordering::Release);
        restore_flags(self.saved_flags);
    }
}

// ---------------------------------------------------------------------------
// Interrupt masking
// ---------------------------------------------------------------------------

#[cfg(all(target_os = "none", target_arch = "avr"))]
type SavedFlags = u8;

/// Saves SREG and clears the global interrupt flag.
#[cfg(all(target_os = "none", target_arch = "avr"))]
#[inline]
fn save_flags_and_cli() -> SavedFlags {
    let sreg: u8;
    // SAFETY: Reading SREG (I/O 0x3F) and masking interrupts has no memory
    // side effects.
    unsafe {
        core::arch::asm!(
            "in {0}, 0x3F",
            "cli",
            out(reg) sreg,
            options(nostack),
        );
    }
    sreg
}

/// Writes SREG back, re-enabling interrupts only if they were enabled.
#[cfg(all(target_os = "none", target_arch = "avr"))]
#[inline]
fn restore_flags(sreg: SavedFlags) {
    // SAFETY: Restoring a previously saved SREG.
    unsafe {
        core::arch::asm!("out 0x3F, {0}", in(reg) sreg, options(nostack));
    }
}

#[cfg(all(target_os = "none", target_arch = "arm"))]
type SavedFlags = u32;

#[cfg(all(target_os = "none", target_arch = "arm"))]
#[inline]
fn save_flags_and_cli() -> SavedFlags {
    let primask: u32;
    // SAFETY: Reading PRIMASK and masking interrupts is safe in privileged
    // thread or handler mode.
    unsafe {
        core::arch::asm!(
            "mrs {}, PRIMASK",
            "cpsid i",
            out(reg) primask,
            options(nostack),
        );
    }
    primask
}

#[cfg(all(target_os = "none", target_arch = "arm"))]
#[inline]
fn restore_flags(primask: SavedFlags) {
    // PRIMASK bit 0 clear means interrupts were enabled.
    if primask & 1 == 0 {
        // SAFETY: Re-enabling interrupts restores the previous state.
        unsafe {
            core::arch::asm!("cpsie i", options(nostack));
        }
    }
}

#[cfg(all(
    target_os = "none",
    not(any(target_arch = "avr", target_arch = "arm"))
))]
compile_error!("IrqSpinLock has no interrupt masking for this bare-metal architecture");

#[cfg(not(target_os = "none"))]
type SavedFlags = ();

#[cfg(not(target_os = "none"))]
#[inline]
fn save_flags_and_cli() -> SavedFlags {}

#[cfg(not(target_os = "none"))]
#[inline]
fn restore_flags(_flags: SavedFlags) {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn lock_and_mutate() {
        let lock = IrqSpinLock::new(0u32);
        {
            let mut guard = lock.lock();
            *guard = 42;
            assert!(lock.is_locked());
        }
        assert!(!lock.is_locked());
        assert_eq!(*lock.lock(), 42);
    }

    #[test]
    fn get_mut_without_locking() {
        let mut lock = IrqSpinLock::new(1u8);
        *lock.get_mut() += 1;
        assert_eq!(*lock.lock(), 2);
    }

    #[test]
    fn const_static() {
        static COUNTER: IrqSpinLock<u32> = IrqSpinLock::new(0);
        *COUNTER.lock() += 5;
        assert_eq!(*COUNTER.lock(), 5);
    }

    #[test]
    fn contended_increments_are_not_lost() {
        // Two contexts doing read-modify-write on the same counter: the
        // situation an unprotected occupancy counter gets wrong.
        let lock = Arc::new(IrqSpinLock::new(0usize));
        let handles: Vec<_> = (0..2)
            .map(|_| {
                let lock = Arc::clone(&lock);
                thread::spawn(move || {
                    for _ in 0..10_000 {
                        let mut guard = lock.lock();
                        let v = *guard;
                        *guard = v + 1;
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(*lock.lock(), 20_000);
    }

    #[test]
    fn writes_under_guard_are_visible_to_next_holder() {
        // One context publishes a buffer and a flag in one critical section;
        // the other must never see the flag without the buffer.
        let lock = Arc::new(IrqSpinLock::new(([0u8; 8], false)));
        let writer = {
            let lock = Arc::clone(&lock);
            thread::spawn(move || {
                let mut guard = lock.lock();
                guard.0 = [0xAA; 8];
                guard.1 = true;
            })
        };
        loop {
            let guard = lock.lock();
            if guard.1 {
                assert_eq!(guard.0, [0xAA; 8]);
                break;
            }
            drop(guard);
            thread::yield_now();
        }
        writer.join().unwrap();
    }
}
