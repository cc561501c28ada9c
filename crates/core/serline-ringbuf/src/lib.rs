//! Circular/ring buffer with a fixed, power-of-two capacity.
//!
//! [`RingBuf`] is the only data structure shared between interrupt handlers
//! and foreground code in the serial line driver. It is a plain
//! single-producer/single-consumer FIFO with no internal synchronization;
//! the driver keeps each buffer inside an interrupt-masking lock.
//!
//! # Capacity
//!
//! The capacity `N` must be a power of two (at least 2). Index wraparound is
//! a bitmask (`N - 1`) and an explicit occupancy counter tracks the number of
//! unread elements, so all `N` slots are usable: the buffer is empty when
//! `len() == 0` and full when `len() == N`.
//!
//! # Performance
//!
//! - Push: O(1)
//! - Pop: O(1)
//! - No heap allocation, storage is `N * size_of::<T>()` plus three indices
//!
//! # Examples
//!
//! ```ignore
//! use serline_ringbuf::RingBuf;
//!
//! let mut buf = RingBuf::<u8, 4>::new();
//! buf.push(1);
//! buf.push(2);
//! assert_eq!(buf.pop(), Some(1));
//! assert_eq!(buf.len(), 1);
//!
//! // Full at exactly `N` elements.
//! buf.push(3);
//! buf.push(4);
//! buf.push(5);
//! assert!(buf.is_full());
//! assert_eq!(buf.try_push(6), Err(6));
//! ```

#![cfg_attr(not(test), no_std)]

use core::fmt;
use core::mem::MaybeUninit;

/// A fixed-capacity circular FIFO.
///
/// # Type Parameters
///
/// - `T`: The element type (must be `Copy`)
/// - `N`: The capacity, a power of two no smaller than 2
#[derive(Clone, Copy)]
pub struct RingBuf<T: Copy, const N: usize> {
    buf: [MaybeUninit<T>; N],
    /// Insertion index.
    head: usize,
    /// Removal index.
    tail: usize,
    /// Number of unread elements, `0..=N`.
    count: usize,
}

impl<T: Copy, const N: usize> Default for RingBuf<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy, const N: usize> RingBuf<T, N> {
    /// Evaluated on first use of [`new`](Self::new); rejects bad capacities
    /// at compile time.
    const CAPACITY_OK: () = assert!(
        N >= 2 && N.is_power_of_two(),
        "RingBuf capacity must be a power of two no smaller than 2"
    );

    const MASK: usize = N - 1;

    /// Creates an empty ring buffer.
    #[must_use]
    pub const fn new() -> Self {
        let () = Self::CAPACITY_OK;
        Self {
            buf: [const { MaybeUninit::uninit() }; N],
            head: 0,
            tail: 0,
            count: 0,
        }
    }

    /// Resets the buffer to empty. Previously stored elements are discarded.
    #[inline]
    pub fn clear(&mut self) {
        self.head = 0;
        self.tail = 0;
        self.count = 0;
    }

    /// Returns the number of unread elements.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.count
    }

    /// Returns `true` if there is nothing to pop.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Returns `true` if another push would not fit.
    #[inline]
    #[must_use]
    pub const fn is_full(&self) -> bool {
        self.count == N
    }

    /// Returns the capacity `N`.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Enqueues an element.
    ///
    /// # Errors
    ///
    /// Returns the element back if the buffer is full. The buffer is left
    /// untouched in that case.
    pub fn try_push(&mut self, x: T) -> Result<(), T> {
        if self.is_full() {
            return Err(x);
        }
        self.buf[self.head].write(x);
        self.head = (self.head + 1) & Self::MASK;
        self.count += 1;
        Ok(())
    }

    /// Enqueues an element.
    ///
    /// # Panics
    ///
    /// Panics if the buffer is full. See [`RingBuf::try_push`] for the
    /// fallible variant.
    pub fn push(&mut self, x: T) {
        assert!(self.try_push(x).is_ok(), "ringbuf is full");
    }

    /// Dequeues the oldest element, or returns `None` if the buffer is empty.
    #[must_use]
    pub fn pop(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        // SAFETY: `count > 0`, so the slot at `tail` was written by a push
        // that has not been popped yet.
        let x = unsafe { self.buf[self.tail].assume_init_read() };
        self.tail = (self.tail + 1) & Self::MASK;
        self.count -= 1;
        Some(x)
    }

    /// Returns the oldest element without removing it.
    #[must_use]
    pub fn peek(&self) -> Option<&T> {
        if self.is_empty() {
            return None;
        }
        // SAFETY: Same as `pop`, the slot at `tail` is initialized.
        Some(unsafe { self.buf[self.tail].assume_init_ref() })
    }
}

impl<T: Copy, const N: usize> fmt::Debug for RingBuf<T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RingBuf")
            .field("len", &self.count)
            .field("capacity", &N)
            .field("head", &self.head)
            .field("tail", &self.tail)
            .finish()
    }
}
