//! End-to-end secret pipeline.
//!
//! Split direction: secret text → DEFLATE → hex → threshold shares → share
//! tokens. Combine direction: pasted or scanned inputs → tokens → raw
//! shares → threshold combine → inflate → secret text.
//!
//! Compression runs before sharing because every share is as long as the
//! secret; shrinking the secret shrinks all N shares (and their QR codes)
//! at once.

use crate::error::{Error, Result};
use crate::transport::{self, Fragment};
use crate::{codec, shamir};
use flate2::read::{DeflateDecoder, DeflateEncoder};
use flate2::Compression;
use std::io::Read;
use tracing::debug;

/// Compress bytes with DEFLATE at the highest level
pub fn compress(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = DeflateEncoder::new(bytes, Compression::best());
    let mut out = Vec::new();
    encoder.read_to_end(&mut out)?;
    Ok(out)
}

/// Decompress DEFLATE bytes
pub fn decompress(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = DeflateDecoder::new(bytes);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(out)
}

/// Split a secret into `total` share tokens with the given threshold.
///
/// Share indices (and bech32 prefixes `s1`, `s2`, ...) follow issue order.
pub fn split_secret(secret: &str, total: u8, threshold: u8) -> Result<Vec<String>> {
    let compressed = compress(secret.as_bytes())?;
    debug!(
        "secret compressed from {} to {} bytes",
        secret.len(),
        compressed.len()
    );

    let raw_shares = shamir::share(&hex::encode(compressed), total, threshold)?;
    raw_shares
        .iter()
        .enumerate()
        .map(|(i, raw)| codec::encode(raw, i + 1))
        .collect()
}

/// Combine share inputs back into the secret.
///
/// Each input is one share: either a full token or all of its `PART` lines
/// pasted together (see [`normalize_share_input`]). Failures are local to
/// one share and name its position.
pub fn combine_shares<S: AsRef<str>>(inputs: &[S], threshold: u8) -> Result<String> {
    let mut raw_shares = Vec::with_capacity(inputs.len());
    for (i, input) in inputs.iter().enumerate() {
        let raw = normalize_share_input(input.as_ref())
            .and_then(|token| codec::decode(&token))
            .map_err(|e| annotate_share(i + 1, e))?;
        raw_shares.push(raw);
    }

    let secret_hex = shamir::combine(&raw_shares, threshold)?;
    let bytes = decompress(&hex::decode(secret_hex)?)?;
    Ok(String::from_utf8(bytes)?)
}

/// Normalize one pasted share input into a single token.
///
/// Multi-line input where every line is a labeled fragment is reassembled.
/// A lone labeled fragment is rejected as [`Error::IncompleteShare`] naming
/// the required total. Anything else passes through trimmed.
pub fn normalize_share_input(text: &str) -> Result<String> {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    if lines.len() > 1
        && lines
            .iter()
            .all(|line| Fragment::parse(line).label().is_some())
    {
        return transport::reassemble_raw(&lines);
    }

    let trimmed = text.trim();
    if let Some((_, total)) = Fragment::parse(trimmed).label() {
        return Err(Error::incomplete_share(1, total));
    }

    Ok(trimmed.to_string())
}

/// Attribute share-local decode errors to the 1-based share position,
/// keeping the underlying error kind intact
fn annotate_share(position: usize, error: Error) -> Error {
    if error.is_recoverable() {
        Error::share(position, error)
    } else {
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_compress_round_trip() {
        let data = b"the quick brown fox jumps over the lazy dog".repeat(10);
        let compressed = compress(&data).unwrap();
        assert!(compressed.len() < data.len());
        assert_eq!(decompress(&compressed).unwrap(), data);
    }

    #[test]
    fn test_decompress_rejects_garbage() {
        assert!(matches!(
            decompress(&[0xde, 0xad, 0xbe, 0xef]),
            Err(Error::Compression(_))
        ));
    }

    #[test]
    fn test_split_and_combine_any_pair() {
        let tokens = split_secret("hello world", 3, 2).unwrap();
        assert_eq!(tokens.len(), 3);

        for (a, b) in [(0, 1), (0, 2), (1, 2)] {
            let pair = vec![tokens[a].clone(), tokens[b].clone()];
            assert_eq!(combine_shares(&pair, 2).unwrap(), "hello world");
        }
    }

    #[test]
    fn test_single_share_is_not_sufficient() {
        let tokens = split_secret("hello world", 3, 2).unwrap();
        let one = vec![tokens[2].clone()];
        assert!(matches!(combine_shares(&one, 2), Err(Error::Sharing(_))));
    }

    /// Deterministic noise that DEFLATE cannot shrink much, so the
    /// resulting tokens are long enough to need chunking
    fn noisy_secret(len: usize) -> String {
        let mut state = 0x2545_f491_4f6c_dd1du64;
        (0..len)
            .map(|_| {
                state = state
                    .wrapping_mul(6_364_136_223_846_793_005)
                    .wrapping_add(1_442_695_040_888_963_407);
                char::from(b'!' + ((state >> 33) % 90) as u8)
            })
            .collect()
    }

    #[test]
    fn test_combine_accepts_pasted_fragments() {
        // Force chunking, then paste all PART lines of each share as one
        // multi-line input
        let secret = noisy_secret(800);
        let tokens = split_secret(&secret, 3, 2).unwrap();

        let inputs: Vec<String> = tokens[..2]
            .iter()
            .map(|token| {
                let fragments = transport::split(token);
                assert!(fragments.len() > 1, "secret long enough to chunk");
                fragments
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .collect();

        assert_eq!(combine_shares(&inputs, 2).unwrap(), secret);
    }

    #[test]
    fn test_combine_names_the_bad_share() {
        let tokens = split_secret("hello world", 3, 2).unwrap();
        let inputs = vec![tokens[0].clone(), "garbage".to_string()];
        let err = combine_shares(&inputs, 2).unwrap_err();
        assert!(err.to_string().contains("share 2"));
    }

    #[test]
    fn test_combine_keeps_error_kind_of_the_bad_share() {
        let tokens = split_secret("hello world", 3, 2).unwrap();

        // Swap the last bech32 symbol for another alphabet character so the
        // token stays structurally valid but fails checksum verification.
        let mut corrupted = tokens[1].clone();
        let last = corrupted.pop().unwrap();
        corrupted.push(if last == 'q' { 'p' } else { 'q' });

        let inputs = vec![tokens[0].clone(), corrupted];
        match combine_shares(&inputs, 2).unwrap_err() {
            Error::Share { position, source } => {
                assert_eq!(position, 2);
                assert!(matches!(*source, Error::Checksum(_)));
            }
            other => panic!("expected a positioned share error, got {other:?}"),
        }
    }

    #[test]
    fn test_normalize_passthrough() {
        assert_eq!(normalize_share_input(" token \n").unwrap(), "token");
    }

    #[test]
    fn test_normalize_reassembles_fragment_lines() {
        let input = "PART2OF2:BB\nPART1OF2:AA\n";
        assert_eq!(normalize_share_input(input).unwrap(), "AABB");
    }

    #[test]
    fn test_normalize_rejects_lone_fragment() {
        assert!(matches!(
            normalize_share_input("PART1OF3:AA"),
            Err(Error::IncompleteShare { have: 1, need: 3 })
        ));
    }

    #[test]
    fn test_unicode_secret_round_trip() {
        let secret = "pässwörd ✓ 秘密";
        let tokens = split_secret(secret, 4, 3).unwrap();
        let subset = vec![tokens[3].clone(), tokens[0].clone(), tokens[2].clone()];
        assert_eq!(combine_shares(&subset, 3).unwrap(), secret);
    }
}
