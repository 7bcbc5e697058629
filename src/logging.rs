//! Log set-up for the binary.

use std::sync::Once;

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

static INIT: Once = Once::new();

/// Environment variable overriding the log filter, e.g.
/// `FLOW_FORECASTS_LOG=flow_forecasts::services::update_queue=trace`.
pub const LOG_ENV: &str = "FLOW_FORECASTS_LOG";

/// Installs the global subscriber once; later calls do nothing.
///
/// Logs go to stderr so command output on stdout stays clean.
pub fn init_logging(verbose: bool) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

        tracing_subscriber::registry()
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .with(filter)
            .init();
    });
}

fn default_directive(verbose: bool) -> &'static str {
    if verbose { "flow_forecasts=debug" } else { "flow_forecasts=info" }
}
