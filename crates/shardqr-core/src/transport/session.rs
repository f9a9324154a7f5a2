//! Interactive scan session state machine.
//!
//! A [`ScanSession`] drives fragment acquisition from a QR-scanning
//! collaborator, one fragment at a time. The external scanner delivers each
//! decoded string into [`ScanSession::on_fragment`]; the session tracks
//! which parts have arrived, filters duplicates and fragments from the
//! wrong share, and delivers the reassembled token through the injected
//! [`ScanSink`] once complete.
//!
//! The session is strictly single-consumer: one sink is bound at a time,
//! each fragment event is handled to completion before the next, and
//! fragments delivered after a terminal state are ignored.

use crate::error::Result;
use crate::transport::{self, Fragment};
use std::collections::BTreeMap;
use tracing::{debug, trace};

/// Callback surface for scan progress and results.
///
/// The sink is the session's target: the original UI bound scanned tokens
/// to an input field, a CLI binds them to stdout. All methods except
/// [`ScanSink::on_complete`] default to no-ops.
pub trait ScanSink {
    /// Called after each newly collected fragment while parts are missing
    fn on_progress(&mut self, collected: usize, total: usize) {
        let _ = (collected, total);
    }

    /// Called for non-fatal conditions; the session keeps collecting
    fn on_notice(&mut self, notice: &ScanNotice) {
        let _ = notice;
    }

    /// Called exactly once with the fully reassembled share token
    fn on_complete(&mut self, token: &str);

    /// Called when the session is cancelled or implicitly abandoned
    fn on_aborted(&mut self) {}
}

/// Non-fatal conditions surfaced while scanning.
///
/// Notices never abort the session; the user simply scans the next code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanNotice {
    /// This part was already scanned
    DuplicatePart {
        /// Index of the duplicated part
        index: usize,
        /// Total parts expected by the session
        total: usize,
    },
    /// The fragment belongs to a share with a different part count
    MismatchedShare {
        /// Total the session expects
        expected: usize,
        /// Total advertised by the rejected fragment
        found: usize,
    },
}

/// Lifecycle states of a scan session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Constructed, not yet started
    Idle,
    /// Started, no labeled fragment seen yet
    Awaiting,
    /// At least one labeled fragment collected
    Collecting,
    /// Token delivered to the sink
    Complete,
    /// Cancelled before completion
    Aborted,
}

/// Stateful collector for multi-part QR scans.
///
/// # Example
///
/// ```
/// use shardqr_core::transport::{ScanSession, ScanSink};
///
/// #[derive(Default)]
/// struct Captured(Option<String>);
///
/// impl ScanSink for Captured {
///     fn on_complete(&mut self, token: &str) {
///         self.0 = Some(token.to_string());
///     }
/// }
///
/// let mut session = ScanSession::new(Captured::default());
/// session.start();
/// session.on_fragment("PART1OF2:AA")?;
/// session.on_fragment("PART2OF2:BB")?;
/// assert_eq!(session.into_sink().0.as_deref(), Some("AABB"));
/// # Ok::<(), shardqr_core::Error>(())
/// ```
#[derive(Debug)]
pub struct ScanSession<S: ScanSink> {
    sink: S,
    state: SessionState,
    expected_total: Option<usize>,
    collected: BTreeMap<usize, Fragment>,
}

impl<S: ScanSink> ScanSession<S> {
    /// Creates a new session bound to the given sink, in [`SessionState::Idle`]
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            state: SessionState::Idle,
            expected_total: None,
            collected: BTreeMap::new(),
        }
    }

    /// Begin (or restart) scanning.
    ///
    /// Starting over a live session abandons it first, equivalent to an
    /// implicit [`ScanSession::cancel`].
    pub fn start(&mut self) {
        if self.is_active() {
            debug!("restarting a live scan session; abandoning collected parts");
            self.sink.on_aborted();
        }
        self.collected.clear();
        self.expected_total = None;
        self.state = SessionState::Awaiting;
    }

    /// Handle one decoded string from the scanner.
    ///
    /// Unlabeled text completes the session immediately (legacy non-chunked
    /// share). Labeled fragments are collected until every part has
    /// arrived, then the reassembled token is delivered to the sink.
    /// Deliveries outside an active session are ignored.
    pub fn on_fragment(&mut self, raw: &str) -> Result<()> {
        if !self.is_active() {
            trace!("fragment delivered outside an active session; ignored");
            return Ok(());
        }

        match Fragment::parse(raw) {
            Fragment::Plain(token) => {
                debug!("single-fragment share scanned");
                self.finish(&token);
                Ok(())
            }
            fragment @ Fragment::Labeled { .. } => self.collect(fragment),
        }
    }

    fn collect(&mut self, fragment: Fragment) -> Result<()> {
        // parse() guarantees the label is present and well-formed
        let Some((index, total)) = fragment.label() else {
            return Ok(());
        };

        let expected = *self.expected_total.get_or_insert(total);

        if total != expected {
            trace!(
                "fragment from a different share (total {} != expected {})",
                total,
                expected
            );
            self.sink.on_notice(&ScanNotice::MismatchedShare {
                expected,
                found: total,
            });
            return Ok(());
        }

        if self.collected.contains_key(&index) {
            trace!("part {} already collected", index);
            self.sink.on_notice(&ScanNotice::DuplicatePart {
                index,
                total: expected,
            });
            return Ok(());
        }

        self.collected.insert(index, fragment);
        self.state = SessionState::Collecting;
        debug!("collected part {} ({}/{})", index, self.collected.len(), expected);

        if self.collected.len() == expected {
            let fragments: Vec<Fragment> = self.collected.values().cloned().collect();
            let token = transport::reassemble(&fragments)?;
            self.finish(&token);
        } else {
            self.sink.on_progress(self.collected.len(), expected);
        }
        Ok(())
    }

    fn finish(&mut self, token: &str) {
        self.collected.clear();
        self.expected_total = None;
        self.state = SessionState::Complete;
        self.sink.on_complete(token);
    }

    /// Cancel the session from any non-terminal state.
    ///
    /// Clears all collected data. Has no effect once the session is
    /// complete or already aborted.
    pub fn cancel(&mut self) {
        if self.is_active() {
            self.collected.clear();
            self.expected_total = None;
            self.state = SessionState::Aborted;
            self.sink.on_aborted();
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Collected and expected part counts, once a labeled fragment has
    /// fixed the total
    pub fn progress(&self) -> Option<(usize, usize)> {
        self.expected_total.map(|total| (self.collected.len(), total))
    }

    /// Consumes the session and returns the sink
    pub fn into_sink(self) -> S {
        self.sink
    }

    fn is_active(&self) -> bool {
        matches!(self.state, SessionState::Awaiting | SessionState::Collecting)
    }
}
