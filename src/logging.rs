//! Structured logging bootstrap using `tracing`.

use anyhow::Result;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Default directive when `RUST_LOG` is unset, raised by repeated `-v`.
pub fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "ctgov_assistant=info,tower_http=info,warn",
        1 => "ctgov_assistant=debug,tower_http=debug,info",
        _ => "trace",
    }
}

/// Install the global subscriber once; later calls are no-ops.
///
/// Logs go to stderr so CLI output on stdout stays pipeable.
pub fn init_tracing(verbosity: u8) -> Result<()> {
    if tracing::dispatcher::has_been_set() {
        return Ok(());
    }

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive(verbosity)))?;

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_target(true)
        .with_line_number(verbosity > 0)
        .with_file(verbosity > 0)
        .with_filter(env_filter);

    tracing_subscriber::registry().with(fmt_layer).try_init()?;

    tracing::debug!(verbosity, "tracing initialised");
    Ok(())
}
