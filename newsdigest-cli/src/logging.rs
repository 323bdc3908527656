//! Subscriber setup. `RUST_LOG` wins over `general.log_level`.

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

use newsdigest_core::config::GeneralConfig;

/// Install the global `tracing` subscriber.
///
/// # Errors
///
/// Fails on an unparsable level directive or if a subscriber is already set.
pub fn init(general: &GeneralConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&general.log_level)
            .map_err(|e| anyhow!("invalid log level {:?}: {e}", general.log_level))?,
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let installed = if general.log_format == "json" {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| anyhow!("failed to install log subscriber: {e}"))
}
