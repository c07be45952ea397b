use pc_sync::SyncConfig;
use std::time::Duration;

#[derive(Clone, Debug, clap::Args)]
pub struct IndexerParams {
    /// Lowest height to index when the store is empty.
    #[clap(env = "INDEXER_START_BLOCK", long, default_value_t = 0, value_name = "BLOCK NUMBER")]
    pub start_block: u64,

    /// Heights per batch.
    #[clap(env = "INDEXER_BATCH_SIZE", long, default_value_t = 50)]
    pub batch_size: usize,

    /// Max batches in flight concurrently.
    #[clap(env = "INDEXER_PARALLEL_BATCHES", long, default_value_t = 5)]
    pub parallel_batches: usize,

    /// Pause between consecutive chunks in milliseconds, for rate-limited endpoints.
    #[clap(env = "INDEXER_BLOCK_DELAY", long, default_value_t = 0, value_name = "MS")]
    pub block_delay: u64,

    /// Set to false to skip the reorganization check before each batch commit.
    #[clap(env = "INDEXER_ENABLE_REORG_CHECK", long, default_value_t = true, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true")]
    pub enable_reorg_check: bool,

    /// Gracefully shut down once the store has caught up with the chain head, instead of
    /// tailing for new blocks.
    #[clap(env = "INDEXER_STOP_ON_SYNC", long)]
    pub stop_on_sync: bool,
}

impl IndexerParams {
    /// `batch_retries` comes from the RPC params: `RPC_RETRIES` is the single retry budget
    /// for both single fetches and batch commits.
    pub fn sync_config(&self, batch_retries: u32) -> SyncConfig {
        SyncConfig::default()
            .start_block(self.start_block)
            .batch_size(self.batch_size)
            .parallel_batches(self.parallel_batches)
            .block_delay(Duration::from_millis(self.block_delay))
            .enable_reorg_check(self.enable_reorg_check)
            .batch_retries(batch_retries)
            .stop_on_sync(self.stop_on_sync)
    }
}
