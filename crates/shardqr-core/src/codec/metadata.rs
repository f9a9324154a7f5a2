//! Share metadata prefix encoding.
//!
//! Every share token begins with a short header carrying the finite-field
//! width and the share id:
//!
//! - one uppercase base-36 digit for `bits` (the field width exponent)
//! - `idLen` lowercase hex digits for `id`, where `idLen` is the number of
//!   hex digits needed to represent `2^bits - 1`
//!
//! `idLen` is derived from `bits` and never stored, so the prefix length is
//! always exactly `1 + idLen` characters.

use crate::error::{Error, Result};

/// Maximum supported field width exponent (one base-36 digit)
pub const MAX_BITS: u32 = 35;

/// Number of hex digits needed to represent an id for the given field width.
///
/// Equals the hex digit count of `2^bits - 1`.
pub fn id_hex_len(bits: u32) -> usize {
    ((bits + 3) / 4) as usize
}

/// Encode a metadata prefix from field width and share id.
///
/// Fails with [`Error::InvalidField`] if `bits` is not in `[1, 35]` or `id`
/// does not fit in the derived number of hex digits.
pub fn encode(bits: u32, id: u64) -> Result<String> {
    if bits == 0 || bits > MAX_BITS {
        return Err(Error::invalid_field(format!(
            "field width {} is not in 1..={}",
            bits, MAX_BITS
        )));
    }

    // bits <= 35, so id_len <= 9 and the shift below cannot overflow
    let id_len = id_hex_len(bits);
    if id >> (4 * id_len) != 0 {
        return Err(Error::invalid_field(format!(
            "share id {} does not fit in {} hex digits",
            id, id_len
        )));
    }

    let bits_digit = char::from_digit(bits, 36)
        .ok_or_else(|| Error::invalid_field(format!("field width {} has no base-36 digit", bits)))?
        .to_ascii_uppercase();

    Ok(format!("{}{:0width$x}", bits_digit, id, width = id_len))
}

/// Decode a metadata prefix from the start of a share token.
///
/// Returns the field width, the share id, and the number of bytes consumed
/// (always `1 + idLen`; the prefix is pure ASCII).
///
/// Fails with [`Error::MalformedMetadata`] if the text is too short or any
/// consumed character is not a valid digit in its expected base.
pub fn decode(text: &str) -> Result<(u32, u64, usize)> {
    let mut chars = text.chars();

    let Some(first) = chars.next() else {
        return Err(Error::malformed_metadata("empty input"));
    };

    let bits = first.to_digit(36).ok_or_else(|| {
        Error::malformed_metadata(format!("'{}' is not a base-36 field width digit", first))
    })?;
    if bits == 0 {
        return Err(Error::malformed_metadata("field width digit is zero"));
    }

    let id_len = id_hex_len(bits);
    let id_digits: String = chars.take(id_len).collect();
    if id_digits.chars().count() < id_len {
        return Err(Error::malformed_metadata(format!(
            "truncated share id: need {} hex digits, have {}",
            id_len,
            id_digits.chars().count()
        )));
    }
    if !id_digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(Error::malformed_metadata(format!(
            "share id '{}' contains non-hex characters",
            id_digits
        )));
    }

    let id = u64::from_str_radix(&id_digits, 16)
        .map_err(|e| Error::malformed_metadata(format!("share id '{}': {}", id_digits, e)))?;

    Ok((bits, id, 1 + id_len))
}
