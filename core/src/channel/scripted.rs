//! Scripted channel
//!
//! Replays a canned server transcript: a greeting, then one reply released
//! per line sent. Used to exercise the session state machine without a
//! network connection.

use async_trait::async_trait;
use regex::bytes::Regex;
use std::collections::VecDeque;
use std::io;
use std::time::Duration;

use super::{Channel, ChannelError, ExpectBuffer, ExpectMatch};

#[derive(Debug, Default)]
pub struct ScriptedChannel {
    buffer: ExpectBuffer,
    replies: VecDeque<String>,
    sent: Vec<String>,
    fail_sends_after: Option<usize>,
    closed: bool,
}

impl ScriptedChannel {
    /// Channel whose server side starts by printing `greeting`
    pub fn new(greeting: impl AsRef<str>) -> Self {
        let mut buffer = ExpectBuffer::default();
        buffer.extend(greeting.as_ref().as_bytes());
        Self {
            buffer,
            ..Default::default()
        }
    }

    /// Queue the server output following the next unanswered line
    pub fn with_reply(mut self, reply: impl Into<String>) -> Self {
        self.replies.push_back(reply.into());
        self
    }

    pub fn with_replies<I, S>(mut self, replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.replies.extend(replies.into_iter().map(Into::into));
        self
    }

    /// Make every send after the first `n` fail with a broken pipe
    pub fn failing_sends_after(mut self, n: usize) -> Self {
        self.fail_sends_after = Some(n);
        self
    }

    /// Report a closed connection instead of waiting when nothing matches
    pub fn closed_at_end(mut self) -> Self {
        self.closed = true;
        self
    }

    /// Lines sent so far, without terminators
    pub fn sent(&self) -> &[String] {
        &self.sent
    }
}

#[async_trait]
impl Channel for ScriptedChannel {
    async fn send_line(&mut self, line: &str) -> Result<(), ChannelError> {
        if self.fail_sends_after.is_some_and(|n| self.sent.len() >= n) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "scripted send failure").into());
        }

        self.sent.push(line.to_string());
        if let Some(reply) = self.replies.pop_front() {
            self.buffer.extend(reply.as_bytes());
        }
        Ok(())
    }

    async fn expect(
        &mut self,
        patterns: &[&Regex],
        wait: Duration,
    ) -> Result<ExpectMatch, ChannelError> {
        if let Some(m) = self.buffer.try_match(patterns) {
            return Ok(m);
        }

        if self.closed {
            return Err(ChannelError::Closed {
                pending: self.buffer.pending_text(),
            });
        }

        // a scripted server never sends anything unprompted
        tokio::time::sleep(wait).await;
        Err(ChannelError::Timeout {
            waited: wait,
            pending: self.buffer.pending_text(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replies_follow_sends() {
        let prompt = Regex::new("Horizons>").unwrap();
        let ack = Regex::new("PAGING toggled OFF").unwrap();
        let mut channel = ScriptedChannel::new("Horizons> ").with_reply("PAGING toggled OFF\r\n");

        channel.expect(&[&prompt], Duration::from_secs(1)).await.unwrap();
        channel.send_line("PAGE").await.unwrap();
        let m = channel.expect(&[&ack], Duration::from_secs(1)).await.unwrap();

        assert_eq!(m.before, " ");
        assert_eq!(channel.sent(), ["PAGE"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unmatched_expect_waits_full_timeout() {
        let prompt = Regex::new("never").unwrap();
        let mut channel = ScriptedChannel::new("something else");

        let started = tokio::time::Instant::now();
        let err = channel.expect(&[&prompt], Duration::from_secs(7)).await.unwrap_err();

        assert_eq!(started.elapsed(), Duration::from_secs(7));
        assert!(matches!(err, ChannelError::Timeout { .. }));
        assert_eq!(err.pending(), "something else");
    }

    #[tokio::test]
    async fn test_send_failure() {
        let mut channel = ScriptedChannel::new("").failing_sends_after(1);
        channel.send_line("PAGE").await.unwrap();
        let err = channel.send_line("target").await.unwrap_err();
        assert!(matches!(err, ChannelError::Io(_)));
        assert_eq!(channel.sent(), ["PAGE"]);
    }
}
