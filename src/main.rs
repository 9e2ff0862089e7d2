//! `sbspk` - retrieve small body SPICE SPK kernels from the JPL Horizons system
//!
//! Each target is looked up through the Horizons telnet interface and its
//! binary SPK kernel is downloaded to the output directory.

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use console::Style;
use std::sync::Arc;

use crate::cli::Cli;
use crate::progress::ProgressMeter;
use sbspk_core::KernelRetriever;

mod cli;
mod logger;
mod progress;

#[tokio::main]
async fn main() -> Result<()> {
    // no arguments at all: usage, exit status 1
    if std::env::args_os().len() <= 1 {
        Cli::command().print_help()?;
        std::process::exit(1);
    }

    let cli = Cli::parse();
    logger::init(cli.log_level(), cli.log_file.clone())?;

    let config = cli.resolve_config().context("Failed to load configuration")?;
    let targets = cli.load_targets()?;
    let directory = cli.output_directory()?;

    let meter = Arc::new(ProgressMeter::new());
    let updates = Arc::clone(&meter);
    let retriever = KernelRetriever::horizons(config).with_progress(move |p| updates.update(p));

    let kernels = retriever.get(targets, &directory).await;
    meter.finish();
    let kernels = kernels.context("Kernel retrieval failed")?;

    let bold = Style::new().bold();
    for kernel in kernels {
        println!("{} (object ID {})", bold.apply_to(kernel.path.display()), kernel.object_id);
    }

    Ok(())
}
