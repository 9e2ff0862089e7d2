//! Scripted session runner
//!
//! Stand-in for [`HorizonsSessionRunner`](super::HorizonsSessionRunner) that
//! plays canned Horizons transcripts, keyed by target name.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;

use super::{SessionDriver, SessionOutcome, SessionRunner};
use crate::channel::ScriptedChannel;
use crate::config::RetrievalConfig;
use crate::diagnostics::MemorySink;
use crate::error::{FailureKind, SessionFailure};

const GREETING: &str = "\r\n JPL Horizons, version 4.70\r\n \
    Type `?' for brief intro, `?!' for more details\r\n \
    System news updated June 08, 2023\r\n\r\nHorizons> ";

/// Server side of one session: greeting plus one reply per line sent
#[derive(Debug, Clone, Default)]
pub struct SessionScript {
    pub greeting: String,
    pub replies: Vec<String>,
}

impl SessionScript {
    pub fn new(greeting: impl Into<String>) -> Self {
        Self {
            greeting: greeting.into(),
            replies: Vec::new(),
        }
    }

    pub fn reply(mut self, text: impl Into<String>) -> Self {
        self.replies.push(text.into());
        self
    }

    /// Successful SPK generation dialogue for `target`
    pub fn horizons(target: &str, object_id: &str, locator: &str) -> Self {
        Self::new(GREETING)
            .reply("\r\n PAGING toggled OFF.\r\n\r\nHorizons> ")
            .reply(format!(
                "\r\n*******************************************************************************\r\n\
                 JPL/DASTCOM            Small-body Index Search Results     2023-Jun-12 10:41:07\r\n\r\n \
                 Comet AND asteroid index search:\r\n\r\n    NAME = {};\r\n\r\n \
                 Continue [ <cr>=yes, n=no, ? ] : ",
                target
            ))
            .reply(format!(
                "\r\n JPL/HORIZONS                  ({})                 2023-Jun-12 10:41:09\r\n \
                 Rec #:{}                Soln.date: 2021-Apr-14_16:02:07\r\n\r\n \
                 Select ... [A]pproaches, [E]phemeris, [F]tp,[M]ail,[R]edisplay, [S]PK,?,<cr>: ",
                target, object_id
            ))
            .reply(format!(
                "s\r\n Unnumbered object: \"{}\"\r\n Assigned SPK object ID:  {}\r\n\r\n \
                 Enter your Internet e-mail address [?]: ",
                target, object_id
            ))
            .reply("\r\n Confirm e-mail address [Yes(<cr>),No] : ")
            .reply("\r\n Set SPK text transfer format (YES, NO, ?) : ")
            .reply("\r\n SPK object START [ t >= 1900-Jan-01, ? ] : ")
            .reply("\r\n SPK object STOP  [ t <= 2200-Jan-01, ? ] : ")
            .reply("\r\n Add more objects to file  [ YES, NO, ? ] : ")
            .reply(format!(
                "\r\n Total objects in SPK: 1\r\n\r\n File type : Binary SPK\r\n\r\n   \
                 Full path   :  {}\r\n\r\n[R]edisplay, ? : ",
                locator
            ))
    }

    /// Dialogue in which Horizons finds nothing for `target`
    pub fn not_found(target: &str) -> Self {
        Self::new(GREETING)
            .reply("\r\n PAGING toggled OFF.\r\n\r\nHorizons> ")
            .reply(format!(
                "\r\n JPL/DASTCOM            Small-body Index Search Results\r\n\r\n    NAME = {};\r\n\r\n \
                 Continue [ <cr>=yes, n=no, ? ] : ",
                target
            ))
            .reply("\r\n    No matches found.\r\n\r\nHorizons> ")
    }

    /// Replace the reply released by the `index`-th line sent
    pub fn replace_reply(mut self, index: usize, text: impl Into<String>) -> Self {
        if let Some(reply) = self.replies.get_mut(index) {
            *reply = text.into();
        }
        self
    }

    /// Keep only the first `n` replies; the server goes silent afterwards
    pub fn truncate_replies(mut self, n: usize) -> Self {
        self.replies.truncate(n);
        self
    }

    pub fn into_channel(self) -> ScriptedChannel {
        ScriptedChannel::new(self.greeting).with_replies(self.replies)
    }
}

/// Runs sessions against [`SessionScript`]s instead of the network
#[derive(Default)]
pub struct ScriptedSessionRunner {
    scripts: HashMap<String, SessionScript>,
    attempted: Mutex<Vec<String>>,
    sent: Mutex<Vec<Vec<String>>>,
}

impl ScriptedSessionRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_script(mut self, target: impl Into<String>, script: SessionScript) -> Self {
        self.scripts.insert(target.into(), script);
        self
    }

    /// Targets `run` was called for, in call order
    pub fn attempted(&self) -> Vec<String> {
        self.attempted.lock().clone()
    }

    /// Lines sent in each session, in call order
    pub fn sent(&self) -> Vec<Vec<String>> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl SessionRunner for ScriptedSessionRunner {
    async fn run(&self, target: &str, config: &RetrievalConfig) -> SessionOutcome {
        self.attempted.lock().push(target.to_string());

        let Some(script) = self.scripts.get(target) else {
            return SessionFailure::new(
                FailureKind::ChannelIoError,
                format!("no script for target {}", target),
                "",
            )
            .into();
        };

        let mut channel = script.clone().into_channel();
        let outcome = SessionDriver::new(&mut channel, config, MemorySink::default())
            .run(target)
            .await;
        self.sent.lock().push(channel.sent().to_vec());
        outcome
    }
}
