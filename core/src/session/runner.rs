//! Session runners
//!
//! [`SessionRunner`] is the seam between the retriever and the session: the
//! retriever only needs "run the dialogue for this target", so tests can swap
//! the network-backed runner for a scripted one.

use async_trait::async_trait;

use super::{SessionDriver, SessionOutcome};
use crate::channel::{ChannelError, TelnetChannel};
use crate::config::RetrievalConfig;
use crate::diagnostics::LogSink;
use crate::error::{FailureKind, SessionFailure};

/// Runs one complete Horizons session for a target.
#[async_trait]
pub trait SessionRunner: Send + Sync {
    async fn run(&self, target: &str, config: &RetrievalConfig) -> SessionOutcome;
}

/// Talks to the Horizons telnet service, one fresh connection per session.
#[derive(Debug, Default, Clone)]
pub struct HorizonsSessionRunner;

impl HorizonsSessionRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SessionRunner for HorizonsSessionRunner {
    async fn run(&self, target: &str, config: &RetrievalConfig) -> SessionOutcome {
        let connected = TelnetChannel::connect(&config.host, config.port, config.timeout()).await;
        let mut channel = match connected {
            Ok(channel) => channel,
            Err(e) => {
                let kind = match e {
                    ChannelError::Timeout { .. } => FailureKind::ChannelTimeout,
                    _ => FailureKind::ChannelIoError,
                };
                return SessionFailure::new(
                    kind,
                    format!("cannot connect to {}:{}: {}", config.host, config.port, e),
                    "",
                )
                .into();
            }
        };

        SessionDriver::new(&mut channel, config, LogSink::default())
            .run(target)
            .await
    }
}
