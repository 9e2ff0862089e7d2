//! Session diagnostics
//!
//! Each session owns a [`Transcript`] of everything the server printed and
//! reports its progress to a [`DiagnosticSink`] handed to it by the caller.

use chrono::Local;
use log::Level;
use std::collections::VecDeque;

/// Destination for session diagnostics
pub trait DiagnosticSink: Send {
    fn record(&mut self, level: Level, message: &str);
}

/// Forwards diagnostics to the `log` facade
#[derive(Debug, Clone)]
pub struct LogSink {
    target: String,
}

impl LogSink {
    pub fn new(target: impl Into<String>) -> Self {
        Self { target: target.into() }
    }
}

impl Default for LogSink {
    fn default() -> Self {
        Self::new("sbspk::session")
    }
}

impl DiagnosticSink for LogSink {
    fn record(&mut self, level: Level, message: &str) {
        log::log!(target: &self.target, level, "{}", message);
    }
}

pub struct DiagnosticEntry {
    pub timestamp: String,
    pub level: Level,
    pub message: String,
}

/// Keeps the most recent diagnostics in memory
pub struct MemorySink {
    ring_buffer: VecDeque<DiagnosticEntry>,
    max_entries: usize,
}

impl MemorySink {
    pub fn new(max_entries: usize) -> Self {
        Self {
            ring_buffer: VecDeque::with_capacity(max_entries),
            max_entries,
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = &DiagnosticEntry> {
        self.ring_buffer.iter()
    }

    /// Messages recorded at `level`, oldest first
    pub fn messages_at(&self, level: Level) -> Vec<&str> {
        self.ring_buffer
            .iter()
            .filter(|e| e.level == level)
            .map(|e| e.message.as_str())
            .collect()
    }

    pub fn get_recent(&self, n: usize) -> Vec<String> {
        self.ring_buffer
            .iter()
            .rev()
            .take(n)
            .map(|e| format!("[{}] [{}] {}", e.timestamp, e.level, e.message))
            .collect::<Vec<_>>()
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl DiagnosticSink for MemorySink {
    fn record(&mut self, level: Level, message: &str) {
        if self.max_entries == 0 {
            return;
        }
        if self.ring_buffer.len() >= self.max_entries {
            self.ring_buffer.pop_front();
        }
        self.ring_buffer.push_back(DiagnosticEntry {
            timestamp: Local::now().format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
            level,
            message: message.to_string(),
        });
    }
}

impl<S: DiagnosticSink + ?Sized> DiagnosticSink for &mut S {
    fn record(&mut self, level: Level, message: &str) {
        (**self).record(level, message)
    }
}

/// Text exchanged during one session, in arrival order
#[derive(Debug, Default, Clone)]
pub struct Transcript {
    text: String,
}

impl Transcript {
    pub fn push(&mut self, text: &str) {
        self.text.push_str(text);
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Transcript plus text that arrived but never matched
    pub fn with_pending(&self, pending: &str) -> String {
        let mut text = self.text.clone();
        text.push_str(pending);
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_is_bounded() {
        let mut sink = MemorySink::new(2);
        sink.record(Level::Debug, "one");
        sink.record(Level::Info, "two");
        sink.record(Level::Debug, "three");

        assert_eq!(sink.entries().count(), 2);
        assert_eq!(sink.messages_at(Level::Debug), vec!["three"]);
        let recent = sink.get_recent(1);
        assert!(recent[0].ends_with("[DEBUG] three"));
    }

    #[test]
    fn test_transcript_with_pending() {
        let mut transcript = Transcript::default();
        transcript.push("Horizons> ");
        assert_eq!(transcript.with_pending("partial"), "Horizons> partial");
        assert_eq!(transcript.as_str(), "Horizons> ");
    }
}
