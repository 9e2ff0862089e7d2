//! Kernel retrieval
//!
//! Runs one Horizons session per target, strictly one after the other, and
//! downloads each generated kernel before the next session starts.

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::RetrievalConfig;
use crate::error::RetrievalError;
use crate::fetch::{DownloadProgress, Fetcher, ProgressFn, UrlFetcher};
use crate::session::{HorizonsSessionRunner, SessionRunner};

pub const OBJID_PLACEHOLDER: &str = "<OBJID>";
pub const TARGET_PLACEHOLDER: &str = "<TARGET>";

/// Kernel file name for `target` from the configured template.
///
/// Spaces in the target become underscores here only; Horizons always gets
/// the name as typed.
pub fn kernel_file_name(template: &str, object_id: &str, target: &str) -> String {
    template
        .replace(OBJID_PLACEHOLDER, object_id)
        .replace(TARGET_PLACEHOLDER, &target.replace(' ', "_"))
}

/// Ordered target names; a single name is a one-element list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Targets(Vec<String>);

impl Targets {
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for Targets {
    fn from(target: &str) -> Self {
        Targets(vec![target.to_string()])
    }
}

impl From<String> for Targets {
    fn from(target: String) -> Self {
        Targets(vec![target])
    }
}

impl From<Vec<String>> for Targets {
    fn from(targets: Vec<String>) -> Self {
        Targets(targets)
    }
}

impl From<Vec<&str>> for Targets {
    fn from(targets: Vec<&str>) -> Self {
        Targets(targets.into_iter().map(str::to_string).collect())
    }
}

impl From<&[String]> for Targets {
    fn from(targets: &[String]) -> Self {
        Targets(targets.to_vec())
    }
}

impl<const N: usize> From<[&str; N]> for Targets {
    fn from(targets: [&str; N]) -> Self {
        Targets(targets.iter().map(|t| t.to_string()).collect())
    }
}

/// A downloaded kernel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievalResult {
    pub path: PathBuf,
    pub object_id: String,
}

/// Default progress meter on stdout
pub fn print_download_progress(progress: DownloadProgress) {
    if let Some(percent) = progress.percent() {
        let mut stdout = std::io::stdout();
        let _ = write!(stdout, "\rDownloading kernel... {:2}%", percent);
        let _ = stdout.flush();
    }
}

/// Retrieves small-body SPK kernels from Horizons
///
/// ```no_run
/// # async fn demo() -> Result<(), sbspk_core::RetrievalError> {
/// use sbspk_core::{KernelRetriever, RetrievalConfig};
///
/// let config = RetrievalConfig {
///     start_date: "2016-01-01".to_string(),
///     stop_date: "2018-06-01".to_string(),
///     ..Default::default()
/// };
/// let kernels = KernelRetriever::horizons(config)
///     .get(["2014 SU1", "2015 TB", "2000 SG344"], "/tmp")
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct KernelRetriever<R: SessionRunner, F: Fetcher> {
    config: RetrievalConfig,
    runner: R,
    fetcher: F,
    progress: Option<Box<ProgressFn>>,
}

impl KernelRetriever<HorizonsSessionRunner, UrlFetcher> {
    /// Retriever talking to the real Horizons service
    pub fn horizons(config: RetrievalConfig) -> Self {
        let fetcher = UrlFetcher::new(config.email.clone());
        Self::new(config, HorizonsSessionRunner::new(), fetcher)
    }
}

impl<R: SessionRunner, F: Fetcher> KernelRetriever<R, F> {
    pub fn new(config: RetrievalConfig, runner: R, fetcher: F) -> Self {
        Self {
            config,
            runner,
            fetcher,
            progress: None,
        }
    }

    /// Report download progress to `callback` instead of the stdout meter.
    /// Only used when `print_progress` is set in the configuration.
    pub fn with_progress(
        mut self,
        callback: impl Fn(DownloadProgress) + Send + Sync + 'static,
    ) -> Self {
        self.progress = Some(Box::new(callback));
        self
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Generate and download the binary SPK kernel of every target, in order.
    ///
    /// The first failing target aborts the whole call: later targets are not
    /// attempted and no partial result list is returned. Callers that want to
    /// carry on past failures call `get` once per target.
    pub async fn get(
        &self,
        targets: impl Into<Targets>,
        directory: impl AsRef<Path>,
    ) -> Result<Vec<RetrievalResult>, RetrievalError> {
        let targets = targets.into();
        if targets.iter().any(|t| t.trim().is_empty()) {
            return Err(RetrievalError::EmptyTarget);
        }

        let mut results = Vec::with_capacity(targets.len());
        for target in targets.iter() {
            let result = self.get_one(target.trim(), directory.as_ref()).await?;
            results.push(result);
        }
        Ok(results)
    }

    async fn get_one(
        &self,
        target: &str,
        directory: &Path,
    ) -> Result<RetrievalResult, RetrievalError> {
        log::info!("Retrieving {}", target);

        let (locator, object_id) = match self.runner.run(target, &self.config).await.into_result() {
            Ok(found) => found,
            Err(failure) => {
                if failure.is_timeout() {
                    log::error!("TIMED OUT. Perhaps interface changed?");
                }
                log::debug!("transcript of failed session:\n{}", failure.transcript);
                return Err(failure.into());
            }
        };

        let file_name = kernel_file_name(&self.config.file_format, &object_id, target);
        let destination = directory.join(file_name);

        let path = self
            .fetcher
            .fetch(&locator, &destination, self.progress_callback())
            .await
            .map_err(|source| RetrievalError::Fetch {
                target: target.to_string(),
                source,
            })?;
        if self.config.print_progress && self.progress.is_none() {
            println!("  Done.");
        }

        log::info!("Kernel file can be found at {}", path.display());
        Ok(RetrievalResult { path, object_id })
    }

    fn progress_callback(&self) -> Option<&ProgressFn> {
        if !self.config.print_progress {
            return None;
        }
        Some(self.progress.as_deref().unwrap_or(&print_download_progress))
    }
}
