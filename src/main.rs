//! Entry point wiring CLI dispatch to the assistant pipeline.

use anyhow::Result;
use ctgov_assistant::{cli::Cli, config::Settings, logging};
use tracing::debug;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_tracing(cli.verbose)?;
    let settings = Settings::load()?;

    debug!(?cli, "starting command");
    cli.dispatch(settings).await
}
