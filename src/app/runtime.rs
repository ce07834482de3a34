//! Top-level composition: parse, configure, dispatch.

use std::io::{self, IsTerminal};

use anyhow::{Context, Result};
use harvester_core::{CheckpointStore, PhaseRunner, PipelineConfig, StartupIndiaApi};
use tracing::{debug, info};

use crate::app::{config_runtime, exit_handler, progress_manager, terminal};
use crate::cli::{Command, RunArgs};
use crate::{ProcessExit, commands, output};

pub(crate) async fn run_harvester() -> Result<ProcessExit> {
    let (cli, cli_sources) = config_runtime::parse_cli_with_sources();
    let args = &cli.args;

    let default_level = config_runtime::resolve_default_log_level(args.verbose, args.quiet);
    let force_cli_log_level = config_runtime::should_force_cli_log_level(&cli_sources);
    terminal::init_tracing(default_level, force_cli_log_level, args.log_file.as_deref())?;
    debug!(?cli, "CLI arguments parsed");

    // Configuration errors surface here, before any request is made.
    let resolved = config_runtime::resolve_config(args, &cli_sources)?;

    match cli.command.unwrap_or(Command::Run) {
        Command::Config => {
            commands::run_config_show_command(&resolved);
            Ok(ProcessExit::Success)
        }
        Command::Status => {
            commands::run_status_command(&resolved.config)?;
            Ok(ProcessExit::Success)
        }
        Command::Run => run_pipeline(resolved.config, args).await,
    }
}

async fn run_pipeline(config: PipelineConfig, args: &RunArgs) -> Result<ProcessExit> {
    info!(
        states = %config.states.label(),
        data_dir = %config.data_dir.display(),
        "harvester starting"
    );

    let store = CheckpointStore::open(&config.data_dir)
        .with_context(|| format!("cannot open data directory {}", config.data_dir.display()))?
        .with_results_path(config.results_path());
    if args.fresh {
        store.reset()?;
    }

    let client = config
        .build_client()
        .context("failed to build HTTP client")?;
    let api = StartupIndiaApi::new(client, config.endpoints.clone());

    let reporter = progress_manager::ProgressReporter::new(terminal::should_use_progress_bar(
        io::stderr().is_terminal(),
        args.quiet,
        terminal::is_dumb_terminal(),
    ));
    debug!(progress_bar = reporter.is_enabled(), "progress reporting configured");

    let runner = PhaseRunner::new(config, Box::new(api), store);
    let result = runner.run(&reporter).await;
    reporter.finish();
    let summary = result?;

    if !args.quiet {
        output::print_summary(&summary, runner.store().results_path());
    }
    Ok(exit_handler::determine_exit_outcome(&summary))
}
