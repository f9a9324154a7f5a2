//! # shardqr-core
//!
//! A library for splitting secrets into QR-transportable threshold shares
//! and combining scanned or pasted shares back into the secret.
//!
//! This crate provides the core functionality for:
//! - Encoding one cryptographic share as a compact, checksum-protected text
//!   token and decoding it back
//! - Fragmenting over-long tokens into ordered, self-describing QR-sized
//!   parts and reassembling them from out-of-order scans
//! - Driving an interactive scan session with progress and notices
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`codec`]: Share token and metadata prefix encoding
//! - [`transport`]: Fragment chunking protocol and scan sessions
//! - [`shamir`]: Threshold-sharing adapter (hex share-string contract)
//! - [`secret`]: End-to-end split/combine pipeline with compression
//! - [`error`]: Error types and handling
//!
//! ## Example
//!
//! ```
//! use shardqr_core::{secret, transport};
//!
//! // Split a secret 2-of-3
//! let tokens = secret::split_secret("hello world", 3, 2)?;
//!
//! // Each token becomes one or more QR-sized fragments
//! for token in &tokens {
//!     for fragment in transport::split(token) {
//!         println!("{}", fragment);
//!     }
//! }
//!
//! // Any 2 tokens reconstruct the secret
//! let recovered = secret::combine_shares(&tokens[..2], 2)?;
//! assert_eq!(recovered, "hello world");
//! # Ok::<(), shardqr_core::Error>(())
//! ```
//!
//! ## Extensibility
//!
//! The [`transport::ScanSink`] trait decouples scan sessions from whatever
//! surface displays progress and receives the completed token.

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]

pub mod codec;
pub mod error;
pub mod secret;
pub mod shamir;
pub mod transport;

// Re-export primary types for convenience
pub use error::{Error, Result};
pub use transport::{
    Fragment, ScanNotice, ScanSession, ScanSink, SessionState, MAX_FRAGMENT_PAYLOAD,
};

/// Crate version for programmatic access
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
