//! runtarget - Resolve which Android device a run should target
//!
//! This is the binary entry point. All logic lives in the library.

use clap::Parser;
use runtarget::cli::Args;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let args = Args::parse();

    // Logs go to a file; stdout carries command output
    runtarget_core::logging::init()?;

    runtarget::run(args).await?;
    Ok(())
}
