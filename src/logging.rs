// src/logging.rs

//! `tracing` subscriber setup for the `globwatch` binary.
//!
//! The filter comes from, in order: the `--log-level` flag, the
//! `GLOBWATCH_LOG` environment variable (full `EnvFilter` directive syntax,
//! e.g. `"debug"` or `"globwatch::watch=trace"`), and finally `info`.
//! Output goes to stderr; stdout belongs to the commands being run.

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, EnvFilter};

use crate::cli::LogLevel;

pub const LOG_ENV: &str = "GLOBWATCH_LOG";

/// `notify` is chatty at debug level; keep it quiet unless asked for.
const BACKEND_DIRECTIVE: &str = "notify=warn";

pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env = std::env::var(LOG_ENV).ok();
    let directives = filter_directives(cli_level, env.as_deref());
    let filter = EnvFilter::try_new(&directives)
        .with_context(|| format!("invalid log filter {directives:?} (from {LOG_ENV})"))?;

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialise logging: {e}"))
}

/// Filter directives for the given CLI level and `GLOBWATCH_LOG` value.
///
/// A CLI level always wins. An environment value is used verbatim.
pub fn filter_directives(cli_level: Option<LogLevel>, env: Option<&str>) -> String {
    match (cli_level, env.map(str::trim).filter(|s| !s.is_empty())) {
        (Some(level), _) => format!("{},{BACKEND_DIRECTIVE}", level.as_str()),
        (None, Some(env)) => env.to_string(),
        (None, None) => format!("info,{BACKEND_DIRECTIVE}"),
    }
}
