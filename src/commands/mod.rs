//! Subcommand handlers that do not run the pipeline.

mod config;
mod status;

pub(crate) use config::run_config_show_command;
pub(crate) use status::run_status_command;
