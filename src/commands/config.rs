//! Config command handler: show effective configuration.

use crate::app::config_runtime::ResolvedConfig;

pub(crate) fn config_lines(resolved: &ResolvedConfig) -> Vec<String> {
    let config = &resolved.config;
    vec![
        format!("config_path = {}", resolved.config_path.display()),
        format!(
            "config_file = {}",
            if resolved.loaded_from_file {
                "loaded"
            } else {
                "not found (using defaults)"
            }
        ),
        format!("listing_api_url = {}", config.endpoints.listing),
        format!("details_api_url = {}", config.endpoints.details),
        format!("cin_api_url = {}", config.endpoints.cin),
        format!("states = {}", config.states.label()),
        format!("rate_limit_delay = {}", config.rate_limit_delay.as_secs_f64()),
        format!("retry_attempts = {}", config.retry_attempts),
        format!("retry_backoff = {}", config.retry_backoff),
        format!("retry_jitter_ms = {}", config.retry_jitter.as_millis()),
        format!("checkpoint_interval = {}", config.checkpoint_interval),
        format!("request_timeout_secs = {}", config.request_timeout.as_secs()),
        format!("data_dir = {}", config.data_dir.display()),
        format!("output_file = {}", config.results_path().display()),
        format!(
            "limit = {}",
            config
                .limit
                .map_or_else(|| "none".to_string(), |n| n.to_string())
        ),
    ]
}

pub(crate) fn run_config_show_command(resolved: &ResolvedConfig) {
    for line in config_lines(resolved) {
        println!("{line}");
    }
}
