//! Tracing subscriber setup
//!
//! `RUST_LOG` takes precedence when set; otherwise the resolved level is
//! applied to the vocprep crates only. Output goes to stderr so stdout
//! stays free for tool output.

use crate::config::LOG_LEVELS;
use crate::{Error, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Build the filter directive for a level, e.g. `vocprep=info,vocprep_common=info`
pub fn filter_directive(level: &str) -> Result<String> {
    if !LOG_LEVELS.contains(&level) {
        return Err(Error::Config(format!(
            "Unknown log level '{}' (expected one of {})",
            level,
            LOG_LEVELS.join(", ")
        )));
    }
    Ok(format!("vocprep={level},vocprep_common={level}"))
}

/// Install the global tracing subscriber
pub fn init(level: &str) -> Result<()> {
    let directive = filter_directive(level)?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| directive.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .map_err(|e| Error::Config(format!("Failed to initialize logging: {}", e)))
}
