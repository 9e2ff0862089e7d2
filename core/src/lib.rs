//! Retrieve small body SPICE SPK kernels from the JPL Horizons system.
//!
//! Horizons generates SPK files on demand through its interactive telnet
//! interface. [`KernelRetriever`] drives that dialogue for each target and
//! downloads the resulting kernel.

pub mod channel;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod fetch;
pub mod retriever;
pub mod session;

// Re-exports for convenience
pub use config::RetrievalConfig;
pub use error::{FailureKind, ParseField, RetrievalError, SessionFailure};
pub use fetch::{DownloadProgress, Fetcher, UrlFetcher};
pub use retriever::{kernel_file_name, KernelRetriever, RetrievalResult, Targets};
pub use session::{
    HorizonsSessionRunner, SessionDriver, SessionOutcome, SessionRunner, SessionState,
};
