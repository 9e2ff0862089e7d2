//! Telnet channel to the Horizons interactive service
//!
//! Horizons speaks telnet on port 6775. We only need the data stream, so
//! every option the server offers or requests is refused and negotiation
//! bytes are stripped before pattern matching.

use async_trait::async_trait;
use regex::bytes::Regex;
use std::future::Future;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{timeout, timeout_at, Instant};

use super::{Channel, ChannelError, ExpectBuffer, ExpectMatch};

const IAC: u8 = 255;
const DONT: u8 = 254;
const DO: u8 = 253;
const WONT: u8 = 252;
const WILL: u8 = 251;
const SB: u8 = 250;
const SE: u8 = 240;

const READ_CHUNK: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecodeState {
    Data,
    Iac,
    Negotiate(u8),
    Sub,
    SubIac,
}

/// Separates telnet commands from data across read boundaries
#[derive(Debug)]
pub(crate) struct TelnetDecoder {
    state: DecodeState,
}

impl Default for TelnetDecoder {
    fn default() -> Self {
        Self { state: DecodeState::Data }
    }
}

impl TelnetDecoder {
    /// Returns `(data, replies)`: the payload bytes and the option refusals to send back.
    pub(crate) fn feed(&mut self, input: &[u8]) -> (Vec<u8>, Vec<u8>) {
        let mut data = Vec::with_capacity(input.len());
        let mut replies = Vec::new();

        for &b in input {
            self.state = match self.state {
                DecodeState::Data => match b {
                    IAC => DecodeState::Iac,
                    // NUL follows a bare CR in telnet
                    0 => DecodeState::Data,
                    _ => {
                        data.push(b);
                        DecodeState::Data
                    }
                },
                DecodeState::Iac => match b {
                    IAC => {
                        data.push(IAC);
                        DecodeState::Data
                    }
                    DO | DONT | WILL | WONT => DecodeState::Negotiate(b),
                    SB => DecodeState::Sub,
                    _ => DecodeState::Data,
                },
                DecodeState::Negotiate(cmd) => {
                    match cmd {
                        DO => replies.extend_from_slice(&[IAC, WONT, b]),
                        WILL => replies.extend_from_slice(&[IAC, DONT, b]),
                        _ => {}
                    }
                    DecodeState::Data
                }
                DecodeState::Sub => match b {
                    IAC => DecodeState::SubIac,
                    _ => DecodeState::Sub,
                },
                DecodeState::SubIac => match b {
                    SE => DecodeState::Data,
                    _ => DecodeState::Sub,
                },
            };
        }

        (data, replies)
    }
}

/// Telnet connection, normally over TCP
pub struct TelnetChannel<S = TcpStream> {
    stream: S,
    buffer: ExpectBuffer,
    decoder: TelnetDecoder,
}

impl TelnetChannel<TcpStream> {
    /// Connect to `host:port`, giving up after `connect_timeout`.
    pub async fn connect(
        host: &str,
        port: u16,
        connect_timeout: Duration,
    ) -> Result<Self, ChannelError> {
        log::debug!("connecting to {}:{}", host, port);
        let stream = match timeout(connect_timeout, TcpStream::connect((host, port))).await {
            Ok(stream) => stream?,
            Err(_) => {
                return Err(ChannelError::Timeout {
                    waited: connect_timeout,
                    pending: String::new(),
                })
            }
        };
        stream.set_nodelay(true)?;

        Ok(Self::new(stream))
    }
}

impl<S> TelnetChannel<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Telnet over an already established stream
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            buffer: ExpectBuffer::default(),
            decoder: TelnetDecoder::default(),
        }
    }

    fn timed_out(&self, waited: Duration) -> ChannelError {
        ChannelError::Timeout {
            waited,
            pending: self.buffer.pending_text(),
        }
    }
}

/// Run `fut` until `deadline`; `None` if the deadline passed first.
async fn before_deadline<F: Future>(deadline: Option<Instant>, fut: F) -> Option<F::Output> {
    match deadline {
        Some(deadline) => timeout_at(deadline, fut).await.ok(),
        // wait too long for the clock to represent
        None => Some(fut.await),
    }
}

#[async_trait]
impl<S> Channel for TelnetChannel<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn send_line(&mut self, line: &str) -> Result<(), ChannelError> {
        log::trace!("send: {:?}", line);
        self.stream.write_all(line.as_bytes()).await?;
        self.stream.write_all(b"\r\n").await?;
        self.stream.flush().await?;
        Ok(())
    }

    async fn expect(
        &mut self,
        patterns: &[&Regex],
        wait: Duration,
    ) -> Result<ExpectMatch, ChannelError> {
        let deadline = Instant::now().checked_add(wait);
        let mut chunk = [0u8; READ_CHUNK];

        loop {
            if let Some(m) = self.buffer.try_match(patterns) {
                return Ok(m);
            }

            let n = match before_deadline(deadline, self.stream.read(&mut chunk)).await {
                Some(read) => read?,
                None => return Err(self.timed_out(wait)),
            };
            if n == 0 {
                return Err(ChannelError::Closed {
                    pending: self.buffer.pending_text(),
                });
            }

            let (data, replies) = self.decoder.feed(&chunk[..n]);
            self.buffer.extend(&data);
            if !replies.is_empty() {
                match before_deadline(deadline, self.stream.write_all(&replies)).await {
                    Some(written) => written?,
                    None => return Err(self.timed_out(wait)),
                }
            }
        }
    }
}
