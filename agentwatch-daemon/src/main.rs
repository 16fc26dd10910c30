use anyhow::Result;
use clap::Parser;

use agentwatch_daemon::cli::DaemonCli;
use agentwatch_daemon::logging;
use agentwatch_daemon::orchestrator::Orchestrator;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = DaemonCli::parse();
    let config = cli.resolve_config().await?;

    if cli.validate {
        println!("configuration is valid");
        return Ok(());
    }

    logging::init_tracing(&config.general)?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        notifier = config.notifier.enabled,
        "agentwatch starting"
    );

    let mut orchestrator = Orchestrator::build(config).await?;
    orchestrator.run().await
}
