//! # Digit Accumulator
//!
//! Bounded decoding of the numeric prefix of a raw group value.
//!
//! Meter values are fixed-width, zero-padded decimal strings (`00350`,
//! `012345678`). Only the leading run of ASCII digits within the bound is
//! read. An empty run yields `0`, which cannot be told apart from a real zero.

/// Largest bound that cannot overflow a `u32` accumulator
pub const MAX_DIGITS: usize = 9;

/// Accumulate leading decimal digits of `data`, reading at most `max_len` bytes
///
/// Stops at the first non-digit byte or after `max_len` bytes, whichever
/// comes first.
///
/// # Examples
///
/// ```
/// use tic_bridge::dispatch::digits::accumulate_digits;
///
/// assert_eq!(accumulate_digits("00350X99", 5), 350);
/// assert_eq!(accumulate_digits("12345", 3), 123);
/// assert_eq!(accumulate_digits("X12", 3), 0);
/// ```
pub fn accumulate_digits(data: &str, max_len: usize) -> u32 {
    debug_assert!(max_len <= MAX_DIGITS, "bound {} overflows u32", max_len);

    data.bytes()
        .take(max_len)
        .take_while(u8::is_ascii_digit)
        .fold(0u32, |value, digit| value * 10 + u32::from(digit - b'0'))
}

/// Copy at most `max_len` characters of `data` verbatim
pub fn copy_text(data: &str, max_len: usize) -> String {
    data.chars().take(max_len).collect()
}
