//! Download progress meter

use console::{Style, Term};
use sbspk_core::DownloadProgress;
use std::sync::atomic::{AtomicI16, Ordering};

const NOTHING_SHOWN: i16 = -1;
const SIZE_UNKNOWN: i16 = -2;
const COMPLETE: i16 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Frame {
    Percent(i16),
    Bytes(u64),
}

/// Single-line `Downloading kernel... NN%` meter on stdout
pub struct ProgressMeter {
    term: Term,
    last_shown: AtomicI16,
}

impl ProgressMeter {
    pub fn new() -> Self {
        Self {
            term: Term::stdout(),
            last_shown: AtomicI16::new(NOTHING_SHOWN),
        }
    }

    pub fn update(&self, progress: DownloadProgress) {
        let Some(frame) = self.next_frame(progress) else {
            return;
        };

        let _ = self.term.clear_line();
        match frame {
            Frame::Percent(percent) => {
                let _ = self.term.write_str(&format!("Downloading kernel... {:2}%", percent));
                if percent == COMPLETE {
                    self.write_done();
                }
            }
            Frame::Bytes(received) => {
                let _ = self.term.write_str(&format!("Downloading kernel... {} bytes", received));
            }
        }
    }

    /// Terminate a meter line left open by an interrupted download
    pub fn finish(&self) {
        if self.close_line() {
            self.write_done();
        }
    }

    fn write_done(&self) {
        let _ = self.term.write_line(&format!("  {}", Style::new().green().apply_to("Done.")));
    }

    fn next_frame(&self, progress: DownloadProgress) -> Option<Frame> {
        if progress.received == 0 {
            self.last_shown.store(NOTHING_SHOWN, Ordering::Relaxed);
        }

        match progress.percent() {
            Some(percent) => {
                let percent = i16::from(percent);
                let previous = self.last_shown.swap(percent, Ordering::Relaxed);
                (previous != percent).then_some(Frame::Percent(percent))
            }
            None => {
                self.last_shown.store(SIZE_UNKNOWN, Ordering::Relaxed);
                Some(Frame::Bytes(progress.received))
            }
        }
    }

    /// Whether a meter line is still open; the meter is reset either way
    fn close_line(&self) -> bool {
        let previous = self.last_shown.swap(NOTHING_SHOWN, Ordering::Relaxed);
        !matches!(previous, NOTHING_SHOWN | COMPLETE)
    }
}

impl Default for ProgressMeter {
    fn default() -> Self {
        Self::new()
    }
}
