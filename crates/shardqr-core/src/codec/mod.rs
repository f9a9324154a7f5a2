//! Share token encoding and decoding.
//!
//! A share token is the printable text form of one raw share:
//!
//! ```text
//! <metadata prefix><bech32 segment>
//! 801             s1q...checksum
//! ```
//!
//! The metadata prefix (see [`metadata`]) carries the field width and share
//! id. The bech32 segment carries the share payload under the
//! human-readable prefix `s<index>` with an embedded checksum, so a mistyped
//! or misscanned token is rejected instead of silently combining into
//! garbage.
//!
//! Decoding locates the metadata/bech32 boundary arithmetically: the prefix
//! is always exactly `1 + idLen` characters, with `idLen` derived from the
//! leading field width digit. Searching for an `s<digits>1` pattern would be
//! ambiguous whenever the payload happens to contain one.

pub mod metadata;

use crate::error::{Error, Result};
use crate::shamir;
use bech32::{FromBase32, ToBase32, Variant};
use tracing::trace;

/// Encode a raw share into a self-contained share token.
///
/// `share_index` is the 1-based position of the share in the issued set and
/// becomes the human-readable bech32 prefix (`s1`, `s2`, ...).
pub fn encode(raw_share: &str, share_index: usize) -> Result<String> {
    if share_index == 0 {
        return Err(Error::invalid_field("share index must be at least 1"));
    }

    let parts = shamir::extract_components(raw_share)?;
    let payload = hex::decode(&parts.data)?;

    let hrp = format!("s{}", share_index);
    let segment = bech32::encode(&hrp, payload.to_base32(), Variant::Bech32)
        .map_err(|e| Error::invalid_share_format(format!("bech32 encoding failed: {}", e)))?;
    let prefix = metadata::encode(parts.bits, parts.id)?;

    trace!(
        "encoded share {} ({} payload bytes) into {} chars",
        share_index,
        payload.len(),
        prefix.len() + segment.len()
    );

    Ok(format!("{}{}", prefix, segment))
}

/// Decode a share token back into the raw share string expected by the
/// threshold-combine function (`<bits-digit><id-hex><data-hex>`).
///
/// The bech32 checksum is validated; corruption surfaces as
/// [`Error::Checksum`]. Structural problems surface as
/// [`Error::MalformedMetadata`] or [`Error::InvalidShareFormat`].
pub fn decode(token: &str) -> Result<String> {
    let token = token.trim();
    let (bits, id, consumed) = metadata::decode(token)?;

    // The metadata prefix is pure ASCII, so `consumed` is a char boundary.
    let segment = &token[consumed..];
    if segment.is_empty() {
        return Err(Error::invalid_share_format(
            "token ends after the metadata prefix; bech32 segment is missing",
        ));
    }

    let (hrp, words, variant) = bech32::decode(segment).map_err(|e| match e {
        // A flipped or mistyped symbol: the user should rescan or re-enter.
        bech32::Error::InvalidChecksum | bech32::Error::InvalidChar(_) => Error::Checksum(e),
        other => Error::invalid_share_format(format!("bech32 segment rejected: {}", other)),
    })?;

    if variant != Variant::Bech32 {
        return Err(Error::invalid_share_format(
            "bech32 segment uses an unexpected checksum variant",
        ));
    }
    if !is_share_hrp(&hrp) {
        return Err(Error::invalid_share_format(format!(
            "bech32 prefix '{}' is not a share prefix (expected s<index>)",
            hrp
        )));
    }

    let payload = Vec::<u8>::from_base32(&words)
        .map_err(|e| Error::invalid_share_format(format!("bech32 payload rejected: {}", e)))?;

    let prefix = metadata::encode(bits, id)?;
    Ok(format!("{}{}", prefix, hex::encode(payload)))
}

/// Returns true for human-readable prefixes of the form `s<digits>` with a
/// nonzero index.
fn is_share_hrp(hrp: &str) -> bool {
    match hrp.strip_prefix('s') {
        Some(rest) if !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()) => {
            rest.parse::<usize>().map(|i| i >= 1).unwrap_or(false)
        }
        _ => false,
    }
}
