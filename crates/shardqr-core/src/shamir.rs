//! Threshold-sharing adapter over the `sharks` crate.
//!
//! The rest of the crate speaks the hex share-string contract: a raw share
//! is `<bits-base36-digit><id-hex><data-hex>`. This module produces and
//! consumes those strings, delegating the actual Shamir math (polynomial
//! evaluation over GF(2^8) and Lagrange interpolation) to `sharks`.

use crate::codec::metadata;
use crate::error::{Error, Result};
use sharks::{Share, Sharks};
use tracing::debug;

/// Field width exponent of the underlying GF(2^8) scheme
pub const GF_BITS: u32 = 8;

/// Maximum number of shares one secret can be split into (field order - 1)
pub const MAX_SHARES: u8 = 255;

/// The `(bits, id, data)` triple carried by one raw share
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareComponents {
    /// Field width exponent
    pub bits: u32,
    /// Share id (the x coordinate), at least 1
    pub id: u64,
    /// Hex-encoded share payload
    pub data: String,
}

/// Split a hex-encoded secret into `total` raw shares, any `threshold` of
/// which reconstruct it.
pub fn share(secret_hex: &str, total: u8, threshold: u8) -> Result<Vec<String>> {
    if threshold < 2 {
        return Err(Error::invalid_field(format!(
            "threshold {} is below the minimum of 2",
            threshold
        )));
    }
    if total < threshold {
        return Err(Error::invalid_field(format!(
            "cannot issue {} shares with a threshold of {}",
            total, threshold
        )));
    }

    let secret = hex::decode(secret_hex)?;
    if secret.is_empty() {
        return Err(Error::invalid_field("secret must not be empty"));
    }

    debug!(
        "splitting {} secret bytes into {} shares (threshold {})",
        secret.len(),
        total,
        threshold
    );

    Sharks(threshold)
        .dealer(&secret)
        .take(total as usize)
        .map(|s| raw_share_string(&s))
        .collect()
}

/// Combine raw shares back into the hex-encoded secret.
///
/// The threshold must be supplied explicitly; recovery with fewer shares
/// fails instead of interpolating a plausible-looking wrong secret.
pub fn combine(raw_shares: &[String], threshold: u8) -> Result<String> {
    let mut shares = Vec::with_capacity(raw_shares.len());
    for raw in raw_shares {
        shares.push(parse_raw_share(raw)?);
    }

    let secret = Sharks(threshold)
        .recover(shares.iter())
        .map_err(Error::sharing)?;

    Ok(hex::encode(secret))
}

/// Extract the `(bits, id, data)` components of a raw share string.
///
/// Generic over any field width the metadata prefix can express, so tokens
/// from other field sizes still parse; [`combine`] itself only accepts
/// GF(2^8) shares.
pub fn extract_components(raw: &str) -> Result<ShareComponents> {
    let (bits, id, consumed) = metadata::decode(raw)?;
    if id == 0 {
        return Err(Error::invalid_share_format("share id must be at least 1"));
    }

    let data = &raw[consumed..];
    if data.is_empty() {
        return Err(Error::invalid_share_format("share carries no payload"));
    }
    if !data.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(Error::invalid_share_format(
            "share payload contains non-hex characters",
        ));
    }
    if data.len() % 2 != 0 {
        return Err(Error::invalid_share_format(
            "share payload has an odd number of hex digits",
        ));
    }

    Ok(ShareComponents {
        bits,
        id,
        data: data.to_string(),
    })
}

/// Serialize one dealt share as `<bits><id-hex><data-hex>`
fn raw_share_string(share: &Share) -> Result<String> {
    let bytes = Vec::from(share);
    let (x, data) = bytes
        .split_first()
        .ok_or_else(|| Error::sharing("dealer produced an empty share"))?;

    let prefix = metadata::encode(GF_BITS, u64::from(*x))?;
    Ok(format!("{}{}", prefix, hex::encode(data)))
}

/// Parse a raw share string back into a `sharks` share
fn parse_raw_share(raw: &str) -> Result<Share> {
    let parts = extract_components(raw)?;
    if parts.bits != GF_BITS {
        return Err(Error::invalid_share_format(format!(
            "unsupported field width {} (expected {})",
            parts.bits, GF_BITS
        )));
    }
    if parts.id > u64::from(MAX_SHARES) {
        return Err(Error::invalid_share_format(format!(
            "share id {} exceeds the field order",
            parts.id
        )));
    }

    let mut bytes = Vec::with_capacity(1 + parts.data.len() / 2);
    bytes.push(parts.id as u8);
    bytes.extend(hex::decode(&parts.data)?);

    Share::try_from(bytes.as_slice()).map_err(Error::sharing)
}
