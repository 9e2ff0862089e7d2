//! Line-based text channel
//!
//! Abstraction over the interactive connection a session is driven through.
//! The session only ever sends whole lines and waits for text patterns, so
//! the same driver runs against the Horizons telnet service
//! ([`TelnetChannel`]) and against canned transcripts ([`ScriptedChannel`]).

pub mod scripted;
pub mod telnet;

pub use scripted::ScriptedChannel;
pub use telnet::TelnetChannel;

use async_trait::async_trait;
use regex::bytes::Regex;
use std::time::Duration;
use thiserror::Error;

/// Channel transport errors
#[derive(Error, Debug)]
pub enum ChannelError {
    /// None of the expected patterns showed up in time
    #[error("no expected pattern within {waited:?}")]
    Timeout {
        waited: Duration,
        /// Text received but not matched
        pending: String,
    },

    /// The remote side closed the connection before a pattern matched
    #[error("connection closed by remote")]
    Closed { pending: String },

    #[error("channel I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ChannelError {
    /// Unmatched text buffered at the time of the error
    pub fn pending(&self) -> &str {
        match self {
            ChannelError::Timeout { pending, .. } | ChannelError::Closed { pending } => pending,
            ChannelError::Io(_) => "",
        }
    }
}

/// Result of a successful [`Channel::expect`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectMatch {
    /// Index of the matched pattern
    pub index: usize,
    /// Text received before the match
    pub before: String,
    /// The matched text itself
    pub matched: String,
}

/// A blocking, bidirectional line-based text connection.
#[async_trait]
pub trait Channel: Send {
    /// Write one line followed by the line terminator.
    async fn send_line(&mut self, line: &str) -> Result<(), ChannelError>;

    /// Wait until the incoming stream matches one of `patterns`.
    ///
    /// The earliest match in the stream wins, ties go to the lower pattern
    /// index. Everything up to the end of the match is consumed.
    async fn expect(
        &mut self,
        patterns: &[&Regex],
        timeout: Duration,
    ) -> Result<ExpectMatch, ChannelError>;
}

/// Incoming bytes not yet consumed by an `expect`
#[derive(Debug, Default)]
pub(crate) struct ExpectBuffer {
    data: Vec<u8>,
}

impl ExpectBuffer {
    pub(crate) fn extend(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    pub(crate) fn try_match(&mut self, patterns: &[&Regex]) -> Option<ExpectMatch> {
        let mut best: Option<(usize, usize, usize)> = None;
        for (index, pattern) in patterns.iter().enumerate() {
            if let Some(m) = pattern.find(&self.data) {
                if best.map_or(true, |(start, _, _)| m.start() < start) {
                    best = Some((m.start(), m.end(), index));
                }
            }
        }

        let (start, end, index) = best?;
        let before = String::from_utf8_lossy(&self.data[..start]).into_owned();
        let matched = String::from_utf8_lossy(&self.data[start..end]).into_owned();
        self.data.drain(..end);

        Some(ExpectMatch { index, before, matched })
    }

    pub(crate) fn pending_text(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }
}
