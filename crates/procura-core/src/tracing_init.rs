//! Tracing subscriber setup for the Procura binaries.

use tracing::debug;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::{Error, Result};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over `default_filter` when set. With `log_json` each event
/// is written as one JSON object per line. Fails if a subscriber is already
/// installed or the filter does not parse.
pub fn init_tracing(default_filter: &str, log_json: bool) -> Result<()> {
    let env_filter = match std::env::var("RUST_LOG") {
        Ok(directives) if !directives.trim().is_empty() => EnvFilter::try_new(directives),
        _ => EnvFilter::try_new(default_filter),
    }
    .map_err(|e| Error::Config(format!("invalid log filter: {e}")))?;
    let directives = env_filter.to_string();

    let registry = tracing_subscriber::registry().with(env_filter);
    let installed = if log_json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(false))
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init()
    };
    installed.map_err(|e| Error::Config(format!("tracing already initialised: {e}")))?;

    debug!(filter = %directives, json = log_json, "Tracing initialised");
    Ok(())
}

/// Build the default log filter for a crate at the given level.
///
/// Crate names are normalised to their module form, so `procura-dashboard`
/// becomes `procura_dashboard=info`. `tower_http` is included so request
/// handling shows up at the same level.
pub fn default_filter(crate_name: &str, level: &str) -> String {
    let module = crate_name.replace('-', "_");
    format!("{module}={level},procura_core={level},tower_http={level}")
}
