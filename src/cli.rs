//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use harvester_core::config::{
    DEFAULT_CHECKPOINT_INTERVAL, DEFAULT_RATE_LIMIT_DELAY_SECS, DEFAULT_RETRY_ATTEMPTS,
    DEFAULT_RETRY_BACKOFF, MAX_RETRY_ATTEMPTS,
};

/// Harvest DPIIT-recognised startup profiles from the Startup India API.
///
/// Runs a resumable listing → detail → contact pipeline. Progress is
/// checkpointed to the data directory; re-running picks up where the last
/// run stopped.
#[derive(Parser, Debug)]
#[command(name = "harvester")]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub args: RunArgs,
}

/// Subcommands. Without one, `run` is assumed.
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Run or resume the pipeline (default)
    Run,
    /// Show checkpoint progress for the data directory
    Status,
    /// Print the effective configuration
    Config,
}

/// Flags shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// JSON config file (default: ./config.json when present)
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Also write logs (without colours) to this file
    #[arg(long, value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// State id to search (24 hex chars, or `all`); repeatable
    #[arg(long = "state", value_name = "ID", global = true)]
    pub states: Vec<String>,

    /// Search every state
    #[arg(long, global = true, conflicts_with = "states")]
    pub all_states: bool,

    /// Seconds to wait before every request (0 to disable, max 60)
    #[arg(long, value_name = "SECS", default_value_t = DEFAULT_RATE_LIMIT_DELAY_SECS, value_parser = parse_delay_secs, global = true)]
    pub rate_limit: f64,

    /// Retries for transient failures after the first attempt (0-10)
    #[arg(short = 'r', long, default_value_t = DEFAULT_RETRY_ATTEMPTS, value_parser = clap::value_parser!(u32).range(0..=i64::from(MAX_RETRY_ATTEMPTS)), global = true)]
    pub retries: u32,

    /// Backoff multiplier between retries (1-10)
    #[arg(long, value_name = "FACTOR", default_value_t = DEFAULT_RETRY_BACKOFF, value_parser = parse_backoff, global = true)]
    pub backoff: f64,

    /// Items processed between checkpoint flushes (1-10000)
    #[arg(long, value_name = "N", default_value_t = DEFAULT_CHECKPOINT_INTERVAL, value_parser = parse_checkpoint_interval, global = true)]
    pub checkpoint_interval: usize,

    /// Directory for checkpoint files
    #[arg(long, value_name = "DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Result file (default: <data-dir>/startups_data.json)
    #[arg(short, long, value_name = "FILE", global = true)]
    pub output: Option<PathBuf>,

    /// Stop after processing N profiles/contacts in this invocation
    #[arg(long, value_name = "N", value_parser = parse_limit, global = true)]
    pub limit: Option<usize>,

    /// Discard existing checkpoint and results before running
    #[arg(long, global = true)]
    pub fresh: bool,
}

fn parse_delay_secs(raw: &str) -> Result<f64, String> {
    let value: f64 = raw
        .parse()
        .map_err(|_| format!("'{raw}' is not a number of seconds"))?;
    if !value.is_finite() || !(0.0..=60.0).contains(&value) {
        return Err(format!("{value} is not in 0..=60"));
    }
    Ok(value)
}

fn parse_backoff(raw: &str) -> Result<f64, String> {
    let value: f64 = raw
        .parse()
        .map_err(|_| format!("'{raw}' is not a number"))?;
    if !value.is_finite() || !(1.0..=10.0).contains(&value) {
        return Err(format!("{value} is not in 1..=10"));
    }
    Ok(value)
}

fn parse_checkpoint_interval(raw: &str) -> Result<usize, String> {
    let value: usize = raw
        .parse()
        .map_err(|_| format!("'{raw}' is not a positive integer"))?;
    if !(1..=10_000).contains(&value) {
        return Err(format!("{value} is not in 1..=10000"));
    }
    Ok(value)
}

fn parse_limit(raw: &str) -> Result<usize, String> {
    match raw.parse::<usize>() {
        Ok(0) | Err(_) => Err(format!("'{raw}' is not a positive integer")),
        Ok(value) => Ok(value),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default_args_parses_successfully() {
        let cli = Cli::try_parse_from(["harvester"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.args.verbose, 0);
        assert!(!cli.args.quiet);
        assert!((cli.args.rate_limit - 0.5).abs() < f64::EPSILON);
        assert_eq!(cli.args.retries, 3);
        assert_eq!(cli.args.checkpoint_interval, 50);
        assert!(cli.args.states.is_empty());
        assert!(cli.args.limit.is_none());
    }

    #[test]
    fn test_cli_verbose_flag_increments_count() {
        let cli = Cli::try_parse_from(["harvester", "-v"]).unwrap();
        assert_eq!(cli.args.verbose, 1);

        let cli = Cli::try_parse_from(["harvester", "-vv"]).unwrap();
        assert_eq!(cli.args.verbose, 2);
    }

    #[test]
    fn test_cli_quiet_flag_sets_quiet() {
        let cli = Cli::try_parse_from(["harvester", "--quiet"]).unwrap();
        assert!(cli.args.quiet);
    }

    #[test]
    fn test_cli_help_flag_shows_usage() {
        let err = Cli::try_parse_from(["harvester", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_cli_version_flag_shows_version() {
        let err = Cli::try_parse_from(["harvester", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_cli_invalid_flag_returns_error() {
        let err = Cli::try_parse_from(["harvester", "--invalid-flag"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::UnknownArgument);
    }

    #[test]
    fn test_cli_subcommands() {
        let cli = Cli::try_parse_from(["harvester", "status"]).unwrap();
        assert_eq!(cli.command, Some(Command::Status));
        let cli = Cli::try_parse_from(["harvester", "config"]).unwrap();
        assert_eq!(cli.command, Some(Command::Config));
        let cli = Cli::try_parse_from(["harvester", "run"]).unwrap();
        assert_eq!(cli.command, Some(Command::Run));
    }

    #[test]
    fn test_cli_flags_after_subcommand() {
        let cli =
            Cli::try_parse_from(["harvester", "run", "--limit", "10", "--data-dir", "out"]).unwrap();
        assert_eq!(cli.args.limit, Some(10));
        assert_eq!(cli.args.data_dir, Some(PathBuf::from("out")));
    }

    #[test]
    fn test_cli_state_is_repeatable() {
        let cli = Cli::try_parse_from([
            "harvester",
            "--state",
            "5f48ce592a9bb065cdf9fb25",
            "--state",
            "5f48ce592a9bb065cdf9fb26",
        ])
        .unwrap();
        assert_eq!(cli.args.states.len(), 2);
    }

    #[test]
    fn test_cli_all_states_conflicts_with_state() {
        let result = Cli::try_parse_from([
            "harvester",
            "--all-states",
            "--state",
            "5f48ce592a9bb065cdf9fb25",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_retries_range() {
        assert_eq!(
            Cli::try_parse_from(["harvester", "-r", "0"]).unwrap().args.retries,
            0
        );
        assert_eq!(
            Cli::try_parse_from(["harvester", "--retries", "10"])
                .unwrap()
                .args
                .retries,
            10
        );
        assert!(Cli::try_parse_from(["harvester", "--retries", "11"]).is_err());
    }

    #[test]
    fn test_cli_rate_limit_range() {
        let cli = Cli::try_parse_from(["harvester", "--rate-limit", "0"]).unwrap();
        assert!(cli.args.rate_limit.abs() < f64::EPSILON);
        assert!(Cli::try_parse_from(["harvester", "--rate-limit", "-1"]).is_err());
        assert!(Cli::try_parse_from(["harvester", "--rate-limit", "61"]).is_err());
        assert!(Cli::try_parse_from(["harvester", "--rate-limit", "fast"]).is_err());
    }

    #[test]
    fn test_cli_backoff_and_interval_ranges() {
        assert!(Cli::try_parse_from(["harvester", "--backoff", "0.5"]).is_err());
        assert!(Cli::try_parse_from(["harvester", "--checkpoint-interval", "0"]).is_err());
        let cli = Cli::try_parse_from(["harvester", "--checkpoint-interval", "5"]).unwrap();
        assert_eq!(cli.args.checkpoint_interval, 5);
    }

    #[test]
    fn test_cli_limit_must_be_positive() {
        assert!(Cli::try_parse_from(["harvester", "--limit", "0"]).is_err());
    }

    #[test]
    fn test_cli_fresh_flag() {
        let cli = Cli::try_parse_from(["harvester", "--fresh"]).unwrap();
        assert!(cli.args.fresh);
    }
}
