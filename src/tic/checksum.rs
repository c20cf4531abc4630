//! # TIC Group Checksum
//!
//! The checksum is the 6 low bits of the byte sum, shifted into the
//! printable range: `(sum & 0x3F) + 0x20`.

/// Calculate the checksum character for the covered bytes of a group
///
/// # Arguments
///
/// * `data` - Covered bytes (label, separators and data, depending on mode)
///
/// # Returns
///
/// * `u8` - Printable checksum character
///
/// # Examples
///
/// ```
/// use tic_bridge::tic::checksum::group_checksum;
///
/// assert_eq!(group_checksum(b"PAPP 00350"), b')');
/// ```
pub fn group_checksum(data: &[u8]) -> u8 {
    let sum = data
        .iter()
        .fold(0u32, |acc, &byte| acc.wrapping_add(byte as u32));

    ((sum & 0x3F) as u8) + 0x20
}
