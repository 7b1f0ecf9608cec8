//! runtarget library
//!
//! Resolves which Android device, and which boot mode, a run should target.
//! The binary is a thin wrapper around [`run`].

pub mod cli;
pub mod output;
pub mod runner;

use std::path::PathBuf;

use runtarget_app::init_config_dir;
use runtarget_app::config::RUNTARGET_DIR;
use runtarget_core::prelude::*;

use cli::{Args, Command};
use output::{OutputEvent, OutputMode};
use runner::AndroidRunner;

/// Execute one parsed command line
pub async fn run(args: Args) -> Result<()> {
    let output = OutputMode::from_json_flag(args.json);
    let mut emit = |event: OutputEvent| output.emit(&event);

    let project = match args.project {
        Some(path) => path,
        None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    };
    info!("Project: {}", project.display());

    let result = execute(&project, args.command, &mut emit).await;
    if let Err(e) = &result {
        error!("Command failed: {}", e);
        if output == OutputMode::Json {
            emit(OutputEvent::error(e.to_string(), e.is_fatal()));
        }
    }
    result
}

async fn execute(
    project: &std::path::Path,
    command: Command,
    emit: &mut impl FnMut(OutputEvent),
) -> Result<()> {
    if command == Command::Init {
        init_config_dir(project).context("Failed to initialize .runtarget")?;
        let path = project.join(RUNTARGET_DIR).join("config.toml");
        emit(OutputEvent::config_initialized(path.display().to_string()));
        return Ok(());
    }

    let runner = AndroidRunner::for_project(project, emit)?;
    match command {
        Command::Devices => runner.devices(emit).await,
        Command::Selected => runner.selected(emit).await,
        Command::Select { key, mode } => runner.select(&key, &mode, emit).await,
        Command::SelectMultiple { keys } => runner.select_multiple(&keys, emit).await,
        Command::SelectedMultiple => runner.selected_multiple(emit).await,
        Command::Watch => {
            let shutdown = async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!("Failed to listen for Ctrl-C: {}", e);
                    std::future::pending::<()>().await;
                }
            };
            runner.watch(emit, shutdown).await
        }
        Command::Clear => runner.clear(emit),
        Command::Init => Ok(()),
    }
}
