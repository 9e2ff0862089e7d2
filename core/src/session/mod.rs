//! Horizons session driver
//!
//! One session runs the SPK generation dialogue for a single target:
//!
//! ```text
//! Init -> PagingAck -> ContinuePrompt -> MatchOrNone -> EmailPrompt -> EmailConfirm
//!      -> FormatPrompt -> StartDatePrompt -> StopDatePrompt -> MoreObjectsPrompt
//!      -> LocatorWait -> Succeeded
//! ```
//!
//! Every state waits for its prompt(s), answers with a fixed command and
//! moves on. Any deviation ends the session in `Failed(kind)`; nothing is
//! retried here.

pub mod protocol;
pub mod runner;
pub mod scripted;

pub use runner::{HorizonsSessionRunner, SessionRunner};
pub use scripted::{ScriptedSessionRunner, SessionScript};

use log::Level;
use regex::bytes::Regex;

use crate::channel::{Channel, ChannelError, ExpectMatch};
use crate::config::RetrievalConfig;
use crate::diagnostics::{DiagnosticSink, Transcript};
use crate::error::{FailureKind, ParseField, SessionFailure};
use protocol::*;

/// Protocol state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Init,
    PagingAck,
    ContinuePrompt,
    MatchOrNone,
    EmailPrompt,
    EmailConfirm,
    FormatPrompt,
    StartDatePrompt,
    StopDatePrompt,
    MoreObjectsPrompt,
    LocatorWait,
    Succeeded,
    Failed(FailureKind),
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Succeeded | SessionState::Failed(_))
    }

    /// Patterns awaited in this state; empty for terminal states
    pub fn awaits(&self) -> Vec<&'static Regex> {
        match self {
            SessionState::Init => vec![&*HORIZONS_PROMPT],
            SessionState::PagingAck => vec![&*PAGING_OFF_ACK],
            SessionState::ContinuePrompt => vec![&*CONTINUE_PROMPT],
            SessionState::MatchOrNone => vec![&*SPK_SELECTOR, &*NO_MATCHES],
            SessionState::EmailPrompt => vec![&*EMAIL_PROMPT],
            SessionState::EmailConfirm => vec![&*EMAIL_CONFIRM],
            SessionState::FormatPrompt => vec![&*FORMAT_PROMPT],
            SessionState::StartDatePrompt => vec![&*START_PROMPT],
            SessionState::StopDatePrompt => vec![&*STOP_PROMPT],
            SessionState::MoreObjectsPrompt => vec![&*MORE_OBJECTS_PROMPT],
            SessionState::LocatorWait => vec![&*LOCATOR_LINE],
            SessionState::Succeeded | SessionState::Failed(_) => Vec::new(),
        }
    }
}

/// Terminal result of a session
#[derive(Debug, Clone)]
pub enum SessionOutcome {
    Success { locator: String, object_id: String },
    Failure(SessionFailure),
}

impl SessionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SessionOutcome::Success { .. })
    }

    /// `(locator, object_id)` on success
    pub fn into_result(self) -> Result<(String, String), SessionFailure> {
        match self {
            SessionOutcome::Success { locator, object_id } => Ok((locator, object_id)),
            SessionOutcome::Failure(failure) => Err(failure),
        }
    }
}

impl From<SessionFailure> for SessionOutcome {
    fn from(failure: SessionFailure) -> Self {
        SessionOutcome::Failure(failure)
    }
}

struct Transition {
    reply: Option<String>,
    next: SessionState,
}

impl Transition {
    fn reply(line: impl Into<String>, next: SessionState) -> Self {
        Self {
            reply: Some(line.into()),
            next,
        }
    }
}

/// Drives one session over a [`Channel`]
pub struct SessionDriver<'a, C: Channel + ?Sized, S: DiagnosticSink> {
    channel: &'a mut C,
    config: &'a RetrievalConfig,
    sink: S,
    state: SessionState,
    transcript: Transcript,
    object_id: Option<String>,
    locator: Option<String>,
}

impl<'a, C: Channel + ?Sized, S: DiagnosticSink> SessionDriver<'a, C, S> {
    pub fn new(channel: &'a mut C, config: &'a RetrievalConfig, sink: S) -> Self {
        Self {
            channel,
            config,
            sink,
            state: SessionState::Init,
            transcript: Transcript::default(),
            object_id: None,
            locator: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Run the dialogue for `target` to its terminal state.
    pub async fn run(mut self, target: &str) -> SessionOutcome {
        while !self.state.is_terminal() {
            if let Err(failure) = self.step(target).await {
                self.state = SessionState::Failed(failure.kind);
                self.sink.record(Level::Error, &format!("{} ({})", failure, target));
                return SessionOutcome::Failure(failure);
            }
        }

        match (self.locator.take(), self.object_id.take()) {
            (Some(locator), Some(object_id)) => SessionOutcome::Success { locator, object_id },
            _ => SessionOutcome::Failure(SessionFailure::new(
                FailureKind::ParseError(ParseField::Locator),
                "session ended without locator",
                self.transcript.as_str(),
            )),
        }
    }

    async fn step(&mut self, target: &str) -> Result<(), SessionFailure> {
        let state = self.state;
        let patterns = state.awaits();

        let m = match self.channel.expect(&patterns, self.config.timeout()).await {
            Ok(m) => m,
            Err(e) => return Err(self.channel_failure(state, e)),
        };
        self.transcript.push(&m.before);
        self.transcript.push(&m.matched);
        self.sink.record(Level::Debug, &m.before);
        self.sink.record(Level::Debug, &format!("MATCH: {}", m.matched));

        let transition = self.transition(state, &m, target)?;
        if let Some(reply) = transition.reply {
            if let Err(e) = self.channel.send_line(&reply).await {
                return Err(self.channel_failure(state, e));
            }
        }
        self.state = transition.next;
        Ok(())
    }

    fn transition(
        &mut self,
        state: SessionState,
        m: &ExpectMatch,
        target: &str,
    ) -> Result<Transition, SessionFailure> {
        use SessionState::*;

        let transition = match state {
            Init => Transition::reply(PAGING_OFF, PagingAck),
            PagingAck => Transition::reply(target, ContinuePrompt),
            ContinuePrompt => Transition::reply(AFFIRMATIVE, MatchOrNone),
            MatchOrNone => {
                if m.index == NO_MATCHES_INDEX {
                    return Err(SessionFailure::new(
                        FailureKind::TargetNotFound,
                        format!("No match found for {}", target),
                        self.transcript.as_str(),
                    ));
                }
                Transition::reply(SELECT_SPK, EmailPrompt)
            }
            EmailPrompt => {
                let object_id = parse_object_id(&m.before).map_err(|e| self.extract_failure(e))?;
                self.sink.record(Level::Info, &format!("Object ID: {}", object_id));
                self.object_id = Some(object_id);
                Transition::reply(self.config.email.as_str(), EmailConfirm)
            }
            EmailConfirm => Transition::reply(AFFIRMATIVE, FormatPrompt),
            FormatPrompt => Transition::reply(BINARY_FORMAT, StartDatePrompt),
            StartDatePrompt => Transition::reply(self.config.start_date.as_str(), StopDatePrompt),
            StopDatePrompt => Transition::reply(self.config.stop_date.as_str(), MoreObjectsPrompt),
            // single-body kernels only
            MoreObjectsPrompt => Transition::reply(NEGATIVE, LocatorWait),
            LocatorWait => {
                let locator = parse_locator(&m.matched).map_err(|e| self.extract_failure(e))?;
                self.sink.record(Level::Info, &format!("Kernel URL: {}", locator));
                self.locator = Some(locator);
                Transition::reply(QUIT, Succeeded)
            }
            Succeeded | Failed(_) => Transition { reply: None, next: state },
        };

        Ok(transition)
    }

    fn extract_failure(&self, (kind, detail): ExtractError) -> SessionFailure {
        SessionFailure::new(kind, detail, self.transcript.as_str())
    }

    fn channel_failure(&self, state: SessionState, err: ChannelError) -> SessionFailure {
        let kind = match err {
            ChannelError::Timeout { .. } => FailureKind::ChannelTimeout,
            ChannelError::Closed { .. } | ChannelError::Io(_) => FailureKind::ChannelIoError,
        };
        SessionFailure::new(
            kind,
            format!("{} in state {:?}", err, state),
            self.transcript.with_pending(err.pending()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::ScriptedChannel;
    use crate::diagnostics::MemorySink;
    use std::time::Duration;

    const OBJECT_ID: &str = "3054374";
    const LOCATOR: &str = "ftp://ssd.jpl.nasa.gov/pub/ssd/wld24862.15";

    fn config() -> RetrievalConfig {
        RetrievalConfig {
            email: "someone@example.org".to_string(),
            start_date: "2016-01-01".to_string(),
            stop_date: "2018-06-01".to_string(),
            ..Default::default()
        }
    }

    fn channel_for(script: SessionScript) -> ScriptedChannel {
        script.into_channel()
    }

    #[tokio::test]
    async fn test_full_dialogue_succeeds() {
        let config = config();
        let mut channel = channel_for(SessionScript::horizons("2000 SG344", OBJECT_ID, LOCATOR));
        let mut sink = MemorySink::default();

        let outcome = SessionDriver::new(&mut channel, &config, &mut sink).run("2000 SG344").await;

        let (locator, object_id) = outcome.into_result().unwrap();
        assert_eq!(locator, LOCATOR);
        assert_eq!(object_id, OBJECT_ID);
        assert_eq!(
            channel.sent(),
            [
                "PAGE",
                "2000 SG344",
                "yes",
                "s",
                "someone@example.org",
                "yes",
                "NO",
                "2016-01-01",
                "2018-06-01",
                "no",
                "quit",
            ]
        );
        assert_eq!(
            sink.messages_at(Level::Info),
            vec![format!("Object ID: {}", OBJECT_ID), format!("Kernel URL: {}", LOCATOR)]
        );
    }

    #[tokio::test]
    async fn test_no_matches_stops_sending() {
        let config = config();
        let mut channel = channel_for(SessionScript::not_found("Bogus Rock"));

        let failure = SessionDriver::new(&mut channel, &config, MemorySink::default())
            .run("Bogus Rock")
            .await
            .into_result()
            .unwrap_err();

        assert_eq!(failure.kind, FailureKind::TargetNotFound);
        assert!(failure.transcript.contains("No matches found"));
        assert_eq!(channel.sent(), ["PAGE", "Bogus Rock", "yes"]);
    }

    #[tokio::test]
    async fn test_missing_object_id_is_parse_error() {
        let config = config();
        let script = SessionScript::horizons("2000 SG344", OBJECT_ID, LOCATOR).replace_reply(
            3,
            "\r\n Unnumbered object: \"2000 SG344\"\r\n\r\n Enter your Internet e-mail address [?]: ",
        );
        let mut channel = channel_for(script);

        let failure = SessionDriver::new(&mut channel, &config, MemorySink::default())
            .run("2000 SG344")
            .await
            .into_result()
            .unwrap_err();

        assert_eq!(failure.kind, FailureKind::ParseError(ParseField::ObjectId));
        // the e-mail address is never sent
        assert_eq!(channel.sent().last().map(String::as_str), Some("s"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_server_times_out_after_step_timeout() {
        let config = RetrievalConfig {
            timeout_secs: 5,
            ..config()
        };
        let script = SessionScript::horizons("2000 SG344", OBJECT_ID, LOCATOR).truncate_replies(6);
        let mut channel = channel_for(script);

        let started = tokio::time::Instant::now();
        let failure = SessionDriver::new(&mut channel, &config, MemorySink::default())
            .run("2000 SG344")
            .await
            .into_result()
            .unwrap_err();

        assert_eq!(started.elapsed(), Duration::from_secs(5));
        assert_eq!(failure.kind, FailureKind::ChannelTimeout);
        assert!(failure.detail.contains("StartDatePrompt"));
    }

    #[tokio::test]
    async fn test_send_failure_is_io_error() {
        let config = config();
        let mut channel = SessionScript::horizons("2000 SG344", OBJECT_ID, LOCATOR)
            .into_channel()
            .failing_sends_after(2);

        let failure = SessionDriver::new(&mut channel, &config, MemorySink::default())
            .run("2000 SG344")
            .await
            .into_result()
            .unwrap_err();

        assert_eq!(failure.kind, FailureKind::ChannelIoError);
    }

    #[tokio::test]
    async fn test_closed_connection_is_io_error() {
        let config = config();
        let mut channel = ScriptedChannel::new("Connection refused\r\n").closed_at_end();

        let failure = SessionDriver::new(&mut channel, &config, MemorySink::default())
            .run("2000 SG344")
            .await
            .into_result()
            .unwrap_err();

        assert_eq!(failure.kind, FailureKind::ChannelIoError);
        assert_eq!(failure.transcript, "Connection refused\r\n");
        assert!(channel.sent().is_empty());
    }

    #[test]
    fn test_state_patterns() {
        assert_eq!(SessionState::MatchOrNone.awaits().len(), 2);
        let no_matches = SessionState::MatchOrNone.awaits()[NO_MATCHES_INDEX];
        assert!(no_matches.is_match(b"No matches found."));
        assert!(SessionState::Succeeded.awaits().is_empty());
        assert!(SessionState::Failed(FailureKind::TargetNotFound).is_terminal());
        assert!(!SessionState::LocatorWait.is_terminal());
    }
}
