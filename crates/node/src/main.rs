//! Pulse indexer command line.

mod cli;

use anyhow::Context;
use clap::Parser;
use cli::RunCmd;
use pc_db::ExplorerBackend;
use pc_eth::EthereumClient;
use pc_sync::SyncService;
use pp_utils::service::ServiceContext;
use std::sync::Arc;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

const GREET_IMPL_NAME: &str = "Pulse Indexer";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    setup_logging().context("Initializing the log subscriber")?;

    let run_cmd = RunCmd::parse();
    run_cmd.validate()?;

    tracing::info!("🚀 {} v{}", GREET_IMPL_NAME, env!("CARGO_PKG_VERSION"));
    tracing::info!("🌐 Endpoint: {} (chain id {})", run_cmd.eth_params.rpc_url, pc_eth::PULSECHAIN_CHAIN_ID);
    tracing::info!(
        "💽 Database: {}@{}:{}/{}",
        run_cmd.db_params.db_user,
        run_cmd.db_params.db_host,
        run_cmd.db_params.db_port,
        run_cmd.db_params.db_name
    );
    tracing::info!(
        "⚙️  Indexing from block {} in batches of {}, {} batches in parallel",
        run_cmd.indexer_params.start_block,
        run_cmd.indexer_params.batch_size,
        run_cmd.indexer_params.parallel_batches
    );

    // Both external services must answer before the run loop starts; either failure here is
    // fatal and exits non-zero.
    let backend = ExplorerBackend::connect(&run_cmd.db_params.database_config())
        .await
        .context("Connecting to the database")?;
    backend.health_check().await.context("Database health check")?;

    let client = EthereumClient::new(run_cmd.eth_params.client_config()).context("Building the RPC client")?;

    let ctx = ServiceContext::new();
    ctx.cancel_on_shutdown_signals();

    let mut service = SyncService::new(
        Arc::new(client),
        Arc::new(backend),
        run_cmd.indexer_params.sync_config(run_cmd.eth_params.rpc_retries),
    );
    service.initialize().await.context("Initializing the sync service")?;
    service.run(ctx).await.context("Running the sync service")?;

    Ok(())
}

fn setup_logging() -> anyhow::Result<()> {
    let filter =
        EnvFilter::builder().with_default_directive(LevelFilter::INFO.into()).with_env_var("LOG_LEVEL").from_env()?;
    tracing_subscriber::fmt().with_env_filter(filter).init();
    Ok(())
}
