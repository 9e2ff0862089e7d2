//! CLI argument parsing using clap 4.x derive macros

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser};
use log::LevelFilter;
use sbspk_core::RetrievalConfig;
use std::path::{Path, PathBuf};

/// Retrieve small body SPICE SPK kernels from the JPL Horizons system
///
/// Needs outgoing telnet access to horizons.jpl.nasa.gov on port 6775 and
/// passive FTP for the kernel download.
#[derive(Parser, Debug)]
#[command(name = "sbspk")]
#[command(author, version, about, long_about = None)]
#[command(group(ArgGroup::new("input").args(["targets", "file"]).required(true)))]
pub struct Cli {
    /// One or many target names
    #[arg(short = 't', value_name = "TARGET", num_args = 1..)]
    pub targets: Option<Vec<String>>,

    /// File with target names, one per line
    #[arg(short = 'f', value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Verbose DEBUG mode
    #[arg(short = 'v')]
    pub verbose: bool,

    /// Directory the kernels are written to (default: current directory)
    #[arg(short, long)]
    pub directory: Option<PathBuf>,

    /// Configuration file (default: sbspk.toml in the current or config directory)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// E-mail address reported to Horizons
    #[arg(long)]
    pub email: Option<String>,

    /// Ephemeris start date, e.g. 2010-01-01
    #[arg(long)]
    pub start: Option<String>,

    /// Ephemeris stop date, e.g. 2040-01-01
    #[arg(long)]
    pub stop: Option<String>,

    /// Seconds to wait for each Horizons prompt
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Kernel file name format with <OBJID> and <TARGET> placeholders
    #[arg(long)]
    pub format: Option<String>,

    /// Also append log records to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Do not print the download progress meter
    #[arg(long)]
    pub no_progress: bool,
}

impl Cli {
    pub fn log_level(&self) -> LevelFilter {
        if self.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        }
    }

    /// Configuration file (or defaults) with command line overrides applied
    pub fn resolve_config(&self) -> Result<RetrievalConfig> {
        let mut config = match &self.config {
            Some(path) => RetrievalConfig::load(path)?,
            None => RetrievalConfig::load_or_default()?,
        };

        if let Some(email) = &self.email {
            config.email = email.clone();
        }
        if let Some(start) = &self.start {
            config.start_date = start.clone();
        }
        if let Some(stop) = &self.stop {
            config.stop_date = stop.clone();
        }
        if let Some(timeout) = self.timeout {
            config.timeout_secs = timeout;
        }
        if let Some(format) = &self.format {
            config.file_format = format.clone();
        }
        config.print_progress = !self.no_progress;

        Ok(config)
    }

    pub fn load_targets(&self) -> Result<Vec<String>> {
        match (&self.targets, &self.file) {
            (Some(targets), _) => Ok(targets.clone()),
            (None, Some(path)) => read_targets_file(path),
            (None, None) => anyhow::bail!("no targets given"),
        }
    }

    pub fn output_directory(&self) -> Result<PathBuf> {
        match &self.directory {
            Some(dir) => Ok(dir.clone()),
            None => std::env::current_dir().context("Could not determine current directory"),
        }
    }
}

/// Target names from a file, one per line, blank lines skipped
pub fn read_targets_file(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read target file {}", path.display()))?;

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_many_targets() {
        let cli = Cli::try_parse_from(["sbspk", "-t", "2014 SU1", "2015 TB", "-v"]).unwrap();
        assert_eq!(cli.load_targets().unwrap(), vec!["2014 SU1", "2015 TB"]);
        assert_eq!(cli.log_level(), LevelFilter::Debug);
    }

    #[test]
    fn test_targets_and_file_are_exclusive() {
        let result = Cli::try_parse_from(["sbspk", "-t", "2015 TB", "-f", "targets.txt"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_input_required() {
        assert!(Cli::try_parse_from(["sbspk", "-v"]).is_err());
    }

    #[test]
    fn test_targets_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("targets.txt");
        std::fs::write(&path, "2014 SU1\n\n  2015 TB  \r\n2000 SG344\n").unwrap();

        let cli = Cli::try_parse_from(["sbspk", "-f", path.to_str().unwrap()]).unwrap();
        assert_eq!(cli.load_targets().unwrap(), vec!["2014 SU1", "2015 TB", "2000 SG344"]);
        assert_eq!(cli.log_level(), LevelFilter::Info);
    }

    #[test]
    fn test_overrides_apply_on_top_of_config_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sbspk.toml");
        std::fs::write(
            &path,
            "email = \"file@example.org\"\nstop_date = \"2030-01-01\"\n",
        )
        .unwrap();

        let cli = Cli::try_parse_from([
            "sbspk",
            "-t",
            "2015 TB",
            "-c",
            path.to_str().unwrap(),
            "--start",
            "2016-01-01",
            "--timeout",
            "20",
        ])
        .unwrap();
        let config = cli.resolve_config().unwrap();

        assert_eq!(config.email, "file@example.org");
        assert_eq!(config.start_date, "2016-01-01");
        assert_eq!(config.stop_date, "2030-01-01");
        assert_eq!(config.timeout_secs, 20);
        assert!(config.print_progress);
    }
}
