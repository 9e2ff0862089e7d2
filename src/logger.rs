//! Console logger
//!
//! Prints `LEVEL - message` to stderr and optionally appends timestamped
//! records to a log file. Debug output from other crates is suppressed.

use anyhow::{Context, Result};
use chrono::Local;
use console::Style;
use log::{Level, LevelFilter, Log, Metadata, Record};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

const OWN_TARGET_PREFIX: &str = "sbspk";

pub struct ConsoleLogger {
    level: LevelFilter,
    file: Option<Mutex<File>>,
}

impl ConsoleLogger {
    pub fn new(level: LevelFilter) -> Self {
        Self { level, file: None }
    }

    pub fn with_file(mut self, path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;
        self.file = Some(Mutex::new(file));
        Ok(self)
    }

    fn level_style(level: Level) -> Style {
        match level {
            Level::Error => Style::new().red().bold(),
            Level::Warn => Style::new().yellow(),
            Level::Info => Style::new().blue(),
            Level::Debug | Level::Trace => Style::new().dim(),
        }
    }
}

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
            && (metadata.level() <= Level::Warn || metadata.target().starts_with(OWN_TARGET_PREFIX))
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let level = record.level();
        eprintln!("{} - {}", Self::level_style(level).apply_to(level), record.args());

        if let Some(file) = &self.file {
            if let Ok(mut file) = file.lock() {
                let _ = writeln!(
                    file,
                    "[{}] [{}] [{}] {}",
                    Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                    level,
                    record.module_path().unwrap_or_else(|| record.target()),
                    record.args()
                );
            }
        }
    }

    fn flush(&self) {
        if let Some(file) = &self.file {
            if let Ok(mut file) = file.lock() {
                let _ = file.flush();
            }
        }
    }
}

/// Install the console logger as the global `log` backend
pub fn init(level: LevelFilter, log_file: Option<PathBuf>) -> Result<()> {
    let mut logger = ConsoleLogger::new(level);
    if let Some(path) = log_file {
        logger = logger.with_file(path)?;
    }

    log::set_logger(Box::leak(Box::new(logger)))
        .map_err(|e| anyhow::anyhow!("Failed to install logger: {}", e))?;
    log::set_max_level(level);
    Ok(())
}
