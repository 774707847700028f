//! Utility macros and functions for the HTTP crate.
//!
//! This module provides helper macros and functions that are used internally
//! by the HTTP crate implementation.

/// A macro for early returns with an error if a condition is not met.
///
/// This is similar to the `assert!` macro, but returns an error instead of panicking.
/// It's useful for validation checks where you want to return early with an error
/// if some condition is not satisfied.
///
/// # Example
///
/// ```ignore
/// ensure!(self.head_size <= self.max_head_size, ParseError::too_large_header(..));
/// ```
macro_rules! ensure {
    ($predicate:expr, $error:expr) => {
        if !$predicate {
            return Err($error);
        }
    };
}

pub(crate) use ensure;

/// Maps every byte to the char with the same code point.
///
/// Header values travel as opaque octets; this is the lossless way to hand them out as text.
pub(crate) fn latin1(bytes: &[u8]) -> String {
    bytes.iter().copied().map(char::from).collect()
}

/// Control characters as defined by RFC 2616 (CTL), horizontal tab included.
#[inline]
pub(crate) fn is_ctl(byte: u8) -> bool {
    byte < 0x20 || byte == 0x7f
}
