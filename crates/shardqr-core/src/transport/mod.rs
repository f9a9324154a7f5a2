//! Multi-part fragment transport for share tokens.
//!
//! A share token can exceed what one QR code can carry reliably. This
//! module splits an over-long token into labeled, QR-sized fragments of the
//! form `PART<i>OF<n>:<chunk>` and reassembles a fragment set back into the
//! original token, detecting incompleteness, duplication, and cross-share
//! mixing.
//!
//! Tokens short enough for a single QR code are passed through unlabeled,
//! which keeps older single-fragment shares scannable.
//!
//! ## Algorithm Overview
//!
//! 1. [`split`] slices the token into `ceil(len / limit)` contiguous chunks
//! 2. Each chunk is labeled with its 1-based index and the total count
//! 3. [`reassemble`] validates the set (one total, indices exactly `1..=n`)
//!    and concatenates payloads in index order
//!
//! Callers must not rely on fragment order surviving transport; reassembly
//! sorts by index.

mod session;

use crate::error::{Error, Result};
use std::fmt;
use tracing::debug;

pub use session::{ScanNotice, ScanSession, ScanSink, SessionState};

/// Maximum characters carried by one fragment.
///
/// A conservative limit for reliable optical scanning; a transport tunable,
/// not a protocol invariant. [`split_with_limit`] accepts other values.
pub const MAX_FRAGMENT_PAYLOAD: usize = 300;

/// One transportable piece of a share token.
///
/// A token short enough for a single QR code travels as [`Fragment::Plain`]
/// with no label. Longer tokens travel as [`Fragment::Labeled`] parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    /// A complete, unlabeled share token
    Plain(String),
    /// One labeled part of a multi-fragment share token
    Labeled {
        /// 1-based position of this part
        index: usize,
        /// Total number of parts in the share
        total: usize,
        /// The slice of the token carried by this part
        payload: String,
    },
}

impl Fragment {
    /// Parse scanned or pasted text into a fragment.
    ///
    /// Text matching `PART<i>OF<n>:<chunk>` with `1 <= i <= n` and `n >= 2`
    /// becomes [`Fragment::Labeled`]; anything else is a plain token. This
    /// is the only place the label pattern is recognized.
    pub fn parse(raw: &str) -> Self {
        parse_label(raw).unwrap_or_else(|| Fragment::Plain(raw.to_string()))
    }

    /// Returns the `(index, total)` label, if this fragment has one
    pub fn label(&self) -> Option<(usize, usize)> {
        match self {
            Fragment::Plain(_) => None,
            Fragment::Labeled { index, total, .. } => Some((*index, *total)),
        }
    }

    /// Returns the carried text without any label
    pub fn payload(&self) -> &str {
        match self {
            Fragment::Plain(token) => token,
            Fragment::Labeled { payload, .. } => payload,
        }
    }
}

impl fmt::Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fragment::Plain(token) => f.write_str(token),
            Fragment::Labeled {
                index,
                total,
                payload,
            } => write!(f, "PART{}OF{}:{}", index, total, payload),
        }
    }
}

/// Try to parse a `PART<i>OF<n>:<chunk>` label
fn parse_label(raw: &str) -> Option<Fragment> {
    let rest = raw.strip_prefix("PART")?;
    let (index, rest) = take_number(rest)?;
    let rest = rest.strip_prefix("OF")?;
    let (total, rest) = take_number(rest)?;
    let payload = rest.strip_prefix(':')?;

    if index == 0 || total < 2 || index > total {
        return None;
    }

    Some(Fragment::Labeled {
        index,
        total,
        payload: payload.to_string(),
    })
}

/// Consume a leading run of ASCII digits
fn take_number(s: &str) -> Option<(usize, &str)> {
    let end = s
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(s.len());
    if end == 0 {
        return None;
    }
    let value = s[..end].parse().ok()?;
    Some((value, &s[end..]))
}

/// Split a share token into QR-sized fragments using the default limit.
///
/// Tokens of at most [`MAX_FRAGMENT_PAYLOAD`] characters yield exactly one
/// unlabeled fragment.
pub fn split(token: &str) -> Vec<Fragment> {
    split_with_limit(token, MAX_FRAGMENT_PAYLOAD)
}

/// Split a share token into fragments of at most `limit` characters each.
///
/// Slices are contiguous and non-overlapping; the last slice may be
/// shorter. Slicing counts characters, so any string round-trips through
/// [`reassemble`]. A `limit` of zero is treated as one.
pub fn split_with_limit(token: &str, limit: usize) -> Vec<Fragment> {
    let limit = limit.max(1);

    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= limit {
        return vec![Fragment::Plain(token.to_string())];
    }

    let total = chars.len().div_ceil(limit);
    debug!(
        "splitting {} char token into {} fragments of <= {} chars",
        chars.len(),
        total,
        limit
    );

    chars
        .chunks(limit)
        .enumerate()
        .map(|(i, slice)| Fragment::Labeled {
            index: i + 1,
            total,
            payload: slice.iter().collect(),
        })
        .collect()
}

/// Reassemble a fragment set back into the original share token.
///
/// Fragments may be supplied in any order. A single unlabeled fragment is
/// returned unchanged (legacy non-chunked shares). Errors:
///
/// - [`Error::IncompleteShare`] when parts are missing (including a lone
///   labeled fragment, which names the required total)
/// - [`Error::MalformedChunk`] when an unlabeled fragment appears in a
///   multi-fragment set
/// - [`Error::InconsistentChunkSet`] when fragments advertise different
///   totals
/// - [`Error::MissingPart`] when indices have a gap or duplicate; reports
///   the first absent part number
pub fn reassemble(fragments: &[Fragment]) -> Result<String> {
    match fragments {
        [] => return Err(Error::malformed_chunk("empty fragment set")),
        [Fragment::Plain(token)] => return Ok(token.clone()),
        [Fragment::Labeled { total, .. }] => return Err(Error::incomplete_share(1, *total)),
        _ => {}
    }

    let mut labeled = Vec::with_capacity(fragments.len());
    for fragment in fragments {
        match fragment {
            Fragment::Labeled {
                index,
                total,
                payload,
            } => labeled.push((*index, *total, payload.as_str())),
            Fragment::Plain(text) => {
                return Err(Error::malformed_chunk(format!(
                    "unlabeled fragment in a multi-part set: '{}'",
                    preview(text)
                )));
            }
        }
    }

    let need = labeled[0].1;
    if let Some(&(_, found, _)) = labeled.iter().find(|&&(_, n, _)| n != need) {
        return Err(Error::inconsistent_chunk_set(need, found));
    }

    labeled.sort_by_key(|&(index, _, _)| index);

    if labeled.len() != need {
        return Err(Error::incomplete_share(labeled.len(), need));
    }

    // Duplicates and gaps both show up as the first out-of-place index
    for (pos, &(index, _, _)) in labeled.iter().enumerate() {
        if index != pos + 1 {
            return Err(Error::missing_part(pos + 1, need));
        }
    }

    Ok(labeled.into_iter().map(|(_, _, payload)| payload).collect())
}

/// Parse raw scanned or pasted lines and reassemble them into a token
pub fn reassemble_raw<S: AsRef<str>>(lines: &[S]) -> Result<String> {
    let fragments: Vec<Fragment> = lines.iter().map(|l| Fragment::parse(l.as_ref())).collect();
    reassemble(&fragments)
}

/// Shorten long fragment text for error messages
fn preview(text: &str) -> String {
    const MAX: usize = 32;
    if text.chars().count() <= MAX {
        text.to_string()
    } else {
        let head: String = text.chars().take(MAX).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_labeled() {
        let fragment = Fragment::parse("PART2OF3:abc");
        assert_eq!(fragment.label(), Some((2, 3)));
        assert_eq!(fragment.payload(), "abc");
    }

    #[test]
    fn test_parse_empty_payload() {
        assert_eq!(Fragment::parse("PART1OF2:").label(), Some((1, 2)));
    }

    #[test]
    fn test_parse_rejects_bad_labels() {
        // Anything that is not a valid label is a plain token
        assert_eq!(Fragment::parse("PART0OF2:x").label(), None);
        assert_eq!(Fragment::parse("PART3OF2:x").label(), None);
        assert_eq!(Fragment::parse("PART1OF1:x").label(), None);
        assert_eq!(Fragment::parse("PART1OF:x").label(), None);
        assert_eq!(Fragment::parse("PARTXOF2:x").label(), None);
        assert_eq!(Fragment::parse("PART1OF2x").label(), None);
        assert_eq!(Fragment::parse("plain token").label(), None);
    }

    #[test]
    fn test_display_round_trip() {
        let fragment = Fragment::parse("PART2OF3:abc");
        assert_eq!(fragment.to_string(), "PART2OF3:abc");
        assert_eq!(Fragment::parse("token").to_string(), "token");
    }

    #[test]
    fn test_split_boundaries() {
        let at_limit = "x".repeat(300);
        assert_eq!(split(&at_limit), vec![Fragment::Plain(at_limit.clone())]);

        let over_limit = "x".repeat(301);
        let fragments = split(&over_limit);
        assert_eq!(fragments.len(), 2);
        assert_eq!(fragments[0].label(), Some((1, 2)));
        assert_eq!(fragments[1].label(), Some((2, 2)));
        assert_eq!(fragments[1].payload().len(), 1);

        assert_eq!(split(&"x".repeat(600)).len(), 2);
        assert_eq!(split(&"x".repeat(601)).len(), 3);
    }

    #[test]
    fn test_split_empty_token() {
        assert_eq!(split(""), vec![Fragment::Plain(String::new())]);
    }

    #[test]
    fn test_split_partitions_token() {
        let token: String = ('a'..='z').cycle().take(750).collect();
        let fragments = split(&token);
        assert_eq!(fragments.len(), 3);

        let glued: String = fragments.iter().map(Fragment::payload).collect();
        assert_eq!(glued, token);
    }

    #[test]
    fn test_reassemble_shuffled() {
        let token: String = ('0'..='9').cycle().take(1234).collect();
        let mut fragments = split(&token);
        assert_eq!(fragments.len(), 5);

        fragments.reverse();
        fragments.swap(1, 3);
        assert_eq!(reassemble(&fragments).unwrap(), token);
    }

    #[test]
    fn test_reassemble_plain_passthrough() {
        let fragments = vec![Fragment::Plain("short token".to_string())];
        assert_eq!(reassemble(&fragments).unwrap(), "short token");
    }

    #[test]
    fn test_reassemble_single_labeled_is_incomplete() {
        let fragments = vec![Fragment::parse("PART1OF2:abc")];
        match reassemble(&fragments) {
            Err(Error::IncompleteShare { have, need }) => {
                assert_eq!(have, 1);
                assert_eq!(need, 2);
            }
            other => panic!("expected IncompleteShare, got {:?}", other),
        }
    }

    #[test]
    fn test_reassemble_duplicate_part() {
        let fragments = vec![
            Fragment::parse("PART1OF2:abc"),
            Fragment::parse("PART1OF2:abc"),
        ];
        match reassemble(&fragments) {
            Err(Error::MissingPart { index, total }) => {
                assert_eq!(index, 2);
                assert_eq!(total, 2);
            }
            other => panic!("expected MissingPart, got {:?}", other),
        }
    }

    #[test]
    fn test_reassemble_missing_part() {
        let fragments = vec![
            Fragment::parse("PART2OF3:x"),
            Fragment::parse("PART1OF3:y"),
        ];
        assert!(matches!(
            reassemble(&fragments),
            Err(Error::IncompleteShare { have: 2, need: 3 })
        ));
    }

    #[test]
    fn test_reassemble_mixed_totals() {
        let fragments = vec![
            Fragment::parse("PART1OF2:x"),
            Fragment::parse("PART2OF3:y"),
        ];
        assert!(matches!(
            reassemble(&fragments),
            Err(Error::InconsistentChunkSet {
                expected: 2,
                found: 3
            })
        ));
    }

    #[test]
    fn test_reassemble_unlabeled_among_several() {
        let fragments = vec![
            Fragment::parse("PART1OF2:x"),
            Fragment::parse("not a chunk"),
        ];
        assert!(matches!(
            reassemble(&fragments),
            Err(Error::MalformedChunk { .. })
        ));
    }

    #[test]
    fn test_reassemble_empty_set() {
        assert!(matches!(
            reassemble(&[]),
            Err(Error::MalformedChunk { .. })
        ));
    }

    #[test]
    fn test_reassemble_raw() {
        let lines = ["PART2OF2:BB", "PART1OF2:AA"];
        assert_eq!(reassemble_raw(&lines).unwrap(), "AABB");
    }

    #[test]
    fn test_round_trip_with_custom_limit() {
        let token = "abcdefghij";
        let fragments = split_with_limit(token, 3);
        assert_eq!(fragments.len(), 4);
        assert_eq!(reassemble(&fragments).unwrap(), token);
    }

    #[test]
    fn test_zero_limit_is_clamped_to_one() {
        let fragments = split_with_limit("abc", 0);
        assert_eq!(fragments, split_with_limit("abc", 1));
        assert_eq!(fragments.len(), 3);
        assert_eq!(reassemble(&fragments).unwrap(), "abc");
    }

    #[test]
    fn test_round_trip_non_ascii() {
        let token: String = "héllo wörld ".repeat(40);
        let mut fragments = split(&token);
        fragments.rotate_left(1);
        assert_eq!(reassemble(&fragments).unwrap(), token);
    }
}
