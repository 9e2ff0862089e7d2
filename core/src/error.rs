//! Structured error types for sbspk
//!
//! Session failures are classified into a small taxonomy so callers can tell
//! "target not found" apart from "parse failed" and "server unresponsive".

use std::fmt;
use thiserror::Error;

use crate::fetch::FetchError;

/// Value the session could not extract from the transcript
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseField {
    ObjectId,
    Locator,
}

impl fmt::Display for ParseField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseField::ObjectId => write!(f, "object ID"),
            ParseField::Locator => write!(f, "download locator"),
        }
    }
}

/// Classification of a failed session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// No expected prompt within the step timeout (connectivity loss or protocol drift)
    ChannelTimeout,
    /// Horizons explicitly reported no match for the target name
    TargetNotFound,
    /// A required value could not be extracted although its prompt was reached
    ParseError(ParseField),
    /// Transport-level send/receive failure
    ChannelIoError,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::ChannelTimeout => write!(f, "channel timeout"),
            FailureKind::TargetNotFound => write!(f, "target not found"),
            FailureKind::ParseError(field) => write!(f, "cannot parse {}", field),
            FailureKind::ChannelIoError => write!(f, "channel I/O error"),
        }
    }
}

/// A terminal session failure together with the transcript seen so far
#[derive(Error, Debug, Clone)]
#[error("{kind}: {detail}")]
pub struct SessionFailure {
    pub kind: FailureKind,
    pub detail: String,
    /// Transcript accumulated up to the point of failure
    pub transcript: String,
}

impl SessionFailure {
    pub fn new(
        kind: FailureKind,
        detail: impl Into<String>,
        transcript: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            detail: detail.into(),
            transcript: transcript.into(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        self.kind == FailureKind::ChannelTimeout
    }
}

/// Error returned by [`crate::retriever::KernelRetriever::get`]
#[derive(Error, Debug)]
pub enum RetrievalError {
    /// A target name was empty after trimming
    #[error("empty target name")]
    EmptyTarget,

    /// The Horizons session for a target failed
    #[error(transparent)]
    Session(#[from] SessionFailure),

    /// The kernel file could not be downloaded
    #[error("download of kernel for {target} failed: {source}")]
    Fetch {
        target: String,
        #[source]
        source: FetchError,
    },
}

impl RetrievalError {
    /// Failure kind if this error came out of a session
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            RetrievalError::Session(failure) => Some(failure.kind),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_display() {
        let failure = SessionFailure::new(
            FailureKind::ParseError(ParseField::ObjectId),
            "no digits after label",
            "",
        );
        assert_eq!(failure.to_string(), "cannot parse object ID: no digits after label");
        assert!(!failure.is_timeout());
    }

    #[test]
    fn test_session_error_keeps_kind() {
        let err: RetrievalError = SessionFailure::new(FailureKind::TargetNotFound, "x", "").into();
        assert_eq!(err.failure_kind(), Some(FailureKind::TargetNotFound));
        assert_eq!(RetrievalError::EmptyTarget.failure_kind(), None);
    }
}
