//! Error types for the shardqr-core library.
//!
//! This module provides comprehensive error handling using the `thiserror` crate,
//! with detailed error variants for different failure modes.

use thiserror::Error;

/// Result type alias for shardqr operations
pub type Result<T> = std::result::Result<T, Error>;

/// Comprehensive error type for all shardqr operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Invalid field parameters at encode time (programmer error)
    #[error("invalid share field parameters: {details}")]
    InvalidField {
        /// Description of the invalid parameter
        details: String,
    },

    /// Malformed metadata prefix in a share token
    #[error("malformed share metadata: {details}")]
    MalformedMetadata {
        /// Description of what was expected
        details: String,
    },

    /// Share token does not have the expected structure
    #[error("invalid share format: {details}")]
    InvalidShareFormat {
        /// Description of the structural problem
        details: String,
    },

    /// Checksum verification of the share payload failed
    #[error("share checksum verification failed: {0}")]
    Checksum(bech32::Error),

    /// Fragment text is not a valid share chunk
    #[error("malformed share chunk: {details}")]
    MalformedChunk {
        /// Description of the offending fragment
        details: String,
    },

    /// Fragment set does not contain every part of the share
    #[error("incomplete share: need {need} parts, have {have}")]
    IncompleteShare {
        /// Number of fragments supplied
        have: usize,
        /// Number of fragments required
        need: usize,
    },

    /// A specific part of the share is missing from the fragment set
    #[error("missing part {index} of {total}")]
    MissingPart {
        /// The first absent part number (1-based)
        index: usize,
        /// Total number of parts in the share
        total: usize,
    },

    /// Fragments advertise different totals and cannot belong to one share
    #[error("inconsistent chunk set: fragments claim {expected} and {found} total parts")]
    InconsistentChunkSet {
        /// Total advertised by the first fragment
        expected: usize,
        /// Conflicting total advertised by another fragment
        found: usize,
    },

    /// A failure attributed to one share within a combine input set
    #[error("share {position}: {source}")]
    Share {
        /// 1-based position of the offending share in the input order
        position: usize,
        /// The underlying failure for that share
        #[source]
        source: Box<Error>,
    },

    /// Invalid hex in a share payload or secret
    #[error("invalid hex data: {0}")]
    Hex(#[from] hex::FromHexError),

    /// Threshold-sharing library rejected the operation
    #[error("secret sharing failed: {0}")]
    Sharing(String),

    /// Compression codec failure
    #[error("compression codec failure: {0}")]
    Compression(#[from] std::io::Error),

    /// Recovered secret bytes are not valid UTF-8
    #[error("recovered secret is not valid UTF-8: {0}")]
    SecretEncoding(#[from] std::string::FromUtf8Error),
}

impl Error {
    /// Creates a new invalid field error
    pub fn invalid_field(details: impl Into<String>) -> Self {
        Self::InvalidField {
            details: details.into(),
        }
    }

    /// Creates a new malformed metadata error
    pub fn malformed_metadata(details: impl Into<String>) -> Self {
        Self::MalformedMetadata {
            details: details.into(),
        }
    }

    /// Creates a new invalid share format error
    pub fn invalid_share_format(details: impl Into<String>) -> Self {
        Self::InvalidShareFormat {
            details: details.into(),
        }
    }

    /// Creates a new malformed chunk error
    pub fn malformed_chunk(details: impl Into<String>) -> Self {
        Self::MalformedChunk {
            details: details.into(),
        }
    }

    /// Creates a new incomplete share error
    pub fn incomplete_share(have: usize, need: usize) -> Self {
        Self::IncompleteShare { have, need }
    }

    /// Creates a new missing part error
    pub fn missing_part(index: usize, total: usize) -> Self {
        Self::MissingPart { index, total }
    }

    /// Creates a new inconsistent chunk set error
    pub fn inconsistent_chunk_set(expected: usize, found: usize) -> Self {
        Self::InconsistentChunkSet { expected, found }
    }

    /// Wraps an error with the 1-based position of the share it came from
    pub fn share(position: usize, source: Error) -> Self {
        Self::Share {
            position,
            source: Box::new(source),
        }
    }

    /// Creates a new sharing error
    pub fn sharing(msg: impl Into<String>) -> Self {
        Self::Sharing(msg.into())
    }

    /// Returns true if this error is local to one share or fragment set
    /// and the caller can retry with corrected input
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::InvalidField { .. })
    }
}
