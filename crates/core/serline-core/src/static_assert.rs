//! Compile-time static assertion macro.

/// Asserts a condition at compile time.
///
/// # Examples
///
/// ```ignore
/// use serline_core::static_assert;
/// static_assert!(RX_BUFFER_SIZE.is_power_of_two());
/// static_assert!(RX_BUFFER_SIZE >= 2, "receive buffer too small");
/// ```
#[macro_export]
macro_rules! static_assert {
    ($cond:expr $(,)?) => {
        const _: () = assert!($cond);
    };
    ($cond:expr, $msg:expr $(,)?) => {
        const _: () = assert!($cond, $msg);
    };
}
