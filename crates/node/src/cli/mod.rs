use clap::Parser;

mod db;
mod eth;
mod indexer;

pub use db::DbParams;
pub use eth::EthereumParams;
pub use indexer::IndexerParams;

/// PulseChain block indexer. Configuration is environment-first; every option also has a
/// long flag for ad-hoc runs.
#[derive(Clone, Debug, Parser)]
#[clap(name = "pulse-indexer", version)]
pub struct RunCmd {
    #[clap(flatten)]
    pub db_params: DbParams,

    #[clap(flatten)]
    pub eth_params: EthereumParams,

    #[clap(flatten)]
    pub indexer_params: IndexerParams,
}

impl RunCmd {
    /// Rejects configurations the sync service cannot run with. Fatal at startup.
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.indexer_params.batch_size >= 1, "INDEXER_BATCH_SIZE must be at least 1");
        anyhow::ensure!(self.indexer_params.parallel_batches >= 1, "INDEXER_PARALLEL_BATCHES must be at least 1");
        anyhow::ensure!(self.db_params.db_max_connections >= 1, "DB_MAX_CONNECTIONS must be at least 1");
        Ok(())
    }
}
