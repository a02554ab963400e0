use anyhow::anyhow;
use fieldmatch_settings::LogSettings;
use std::io;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

const DEFAULT_TIME_PATTERN: &str =
    "[year]-[month]-[day]T[hour repr:24]:[minute]:[second]::[subsecond digits:4]";

/// Installs the global subscriber. Logs go to stderr so that reports written
/// to stdout can be piped.
pub fn setup_logging(settings: &LogSettings) -> Result<(), anyhow::Error> {
    let filter = EnvFilter::try_new(&settings.level)
        .map_err(|e| anyhow!("Invalid log level '{}': {e}", settings.level))?;

    if settings.json {
        let time_format = time::format_description::parse(DEFAULT_TIME_PATTERN)?;

        tracing_subscriber::fmt()
            .json()
            .with_target(false)
            .flatten_event(true)
            .with_thread_ids(true)
            .with_timer(UtcTime::new(time_format))
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .try_init()
            .map_err(|e| anyhow!("Failed to install log subscriber: {e}"))?;
    } else {
        tracing_subscriber::fmt()
            .with_target(false)
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .try_init()
            .map_err(|e| anyhow!("Failed to install log subscriber: {e}"))?;
    }

    Ok(())
}
