// Address and variable-length integer packing shared by the codecs.

use crate::FsaError;

/// Widest explicit address either format writes.
pub const MAX_ADDRESS_BYTES: usize = 6;

/// Smallest number of bytes (at least 1) that holds `value`.
#[inline]
pub fn address_width(value: u64) -> usize {
    let bits = 64 - value.leading_zeros() as usize;
    bits.div_ceil(8).max(1)
}

/// Appends `value` as `width` little-endian bytes.
pub fn encode_address(width: usize, value: u64, out: &mut Vec<u8>) -> Result<(), FsaError> {
    if width == 0 || width > 8 || (width < 8 && value >> (8 * width) != 0) {
        return Err(FsaError::AddressOverflow {
            value,
            max_bytes: width,
        });
    }
    out.extend_from_slice(&value.to_le_bytes()[..width]);
    Ok(())
}

/// Reads a `width`-byte little-endian value from the start of `bytes`.
#[inline]
pub fn decode_address(bytes: &[u8], width: usize) -> Option<u64> {
    if width > 8 {
        return None;
    }
    let field = bytes.get(..width)?;
    let mut buf = [0u8; 8];
    buf[..width].copy_from_slice(field);
    Some(u64::from_le_bytes(buf))
}

/// Appends `value` in 7-bit groups, low group first; the high bit marks
/// continuation.
pub fn write_vint(mut value: u64, out: &mut Vec<u8>) {
    while value >= 0x80 {
        out.push((value as u8 & 0x7F) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
}

pub fn vint_len(value: u64) -> usize {
    let bits = 64 - value.leading_zeros() as usize;
    bits.div_ceil(7).max(1)
}

/// Reads a variable-length integer at `pos`. Returns the value and the
/// position after it, or `None` when truncated or longer than 64 bits.
pub fn read_vint(bytes: &[u8], pos: usize) -> Option<(u64, usize)> {
    let mut value = 0u64;
    let mut shift = 0u32;
    let mut pos = pos;
    loop {
        let byte = *bytes.get(pos)?;
        pos += 1;
        let group = u64::from(byte & 0x7F);
        if shift == 63 && group > 1 {
            return None;
        }
        value |= group << shift;
        if byte & 0x80 == 0 {
            return Some((value, pos));
        }
        shift += 7;
        if shift > 63 {
            return None;
        }
    }
}
