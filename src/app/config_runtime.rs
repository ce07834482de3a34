//! Effective configuration: defaults < config file < command-line flags.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgMatches, CommandFactory, FromArgMatches, parser::ValueSource};
use harvester_core::config::DEFAULT_CONFIG_FILE;
use harvester_core::{FileConfig, PipelineConfig, StateFilter};
use tracing::debug;

use crate::cli::{Cli, RunArgs};

/// Which flags carrying a default value were typed on the command line.
///
/// Only those override the config file.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct CliValueSources {
    pub(crate) rate_limit: bool,
    pub(crate) retries: bool,
    pub(crate) backoff: bool,
    pub(crate) checkpoint_interval: bool,
    pub(crate) verbose: bool,
    pub(crate) quiet: bool,
}

/// Configuration after layering, plus where it came from.
#[derive(Debug, Clone)]
pub(crate) struct ResolvedConfig {
    pub(crate) config: PipelineConfig,
    pub(crate) config_path: PathBuf,
    pub(crate) loaded_from_file: bool,
}

pub(crate) fn parse_cli_with_sources() -> (Cli, CliValueSources) {
    let command = Cli::command();
    let matches = command.get_matches();
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|err| err.exit());
    let sources = value_sources(&matches);
    (cli, sources)
}

fn value_sources(matches: &ArgMatches) -> CliValueSources {
    CliValueSources {
        rate_limit: is_commandline_value(matches, "rate_limit"),
        retries: is_commandline_value(matches, "retries"),
        backoff: is_commandline_value(matches, "backoff"),
        checkpoint_interval: is_commandline_value(matches, "checkpoint_interval"),
        verbose: is_commandline_value(matches, "verbose"),
        quiet: is_commandline_value(matches, "quiet"),
    }
}

fn is_commandline_value(matches: &ArgMatches, id: &str) -> bool {
    if matches.value_source(id) == Some(ValueSource::CommandLine) {
        return true;
    }
    // Global flags typed after a subcommand are recorded on the subcommand.
    matches
        .subcommand()
        .is_some_and(|(_, sub)| sub.value_source(id) == Some(ValueSource::CommandLine))
}

/// Builds and validates the effective pipeline configuration.
pub(crate) fn resolve_config(args: &RunArgs, sources: &CliValueSources) -> Result<ResolvedConfig> {
    let explicit = args.config.is_some();
    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

    let file_config = load_file_config(&config_path, explicit)?;
    let mut config = PipelineConfig::default();
    if let Some(file_config) = &file_config {
        file_config
            .apply(&mut config)
            .with_context(|| format!("invalid config file {}", config_path.display()))?;
    }

    apply_cli_overrides(&mut config, args, sources)?;
    config.validate()?;

    debug!(?config, "effective configuration");
    Ok(ResolvedConfig {
        config,
        config_path,
        loaded_from_file: file_config.is_some(),
    })
}

fn load_file_config(path: &Path, explicit: bool) -> Result<Option<FileConfig>> {
    if explicit {
        return Ok(Some(FileConfig::load(path)?));
    }
    Ok(FileConfig::load_optional(path)?)
}

pub(crate) fn apply_cli_overrides(
    config: &mut PipelineConfig,
    args: &RunArgs,
    sources: &CliValueSources,
) -> Result<()> {
    if args.all_states {
        config.states = StateFilter::All;
    } else if !args.states.is_empty() {
        config.states = StateFilter::from_ids(&args.states)?;
    }

    if sources.rate_limit {
        config.rate_limit_delay = Duration::from_secs_f64(args.rate_limit);
    }
    if sources.retries {
        config.retry_attempts = args.retries;
    }
    if sources.backoff {
        config.retry_backoff = args.backoff;
    }
    if sources.checkpoint_interval {
        config.checkpoint_interval = args.checkpoint_interval;
    }

    if let Some(dir) = &args.data_dir {
        config.data_dir.clone_from(dir);
    }
    if let Some(output) = &args.output {
        config.output_file = Some(output.clone());
    }
    if args.limit.is_some() {
        config.limit = args.limit;
    }
    Ok(())
}

/// Default log level from `-q` / `-v` / `-vv`.
pub(crate) fn resolve_default_log_level(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "error";
    }
    match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

/// Explicit verbosity flags win over `RUST_LOG`.
pub(crate) fn should_force_cli_log_level(sources: &CliValueSources) -> bool {
    sources.verbose || sources.quiet
}
