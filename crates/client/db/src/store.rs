use crate::StorageError;
use async_trait::async_trait;
use pp_block::{BlockRow, StoreStats};

/// Write/read surface of the block store, as consumed by the sync service.
///
/// The contract mirrors the `blocks` table semantics: inserts are idempotent on `hash`,
/// batch inserts are atomic, and `remove_blocks_from` is only ever called by reorg repair.
#[async_trait]
pub trait BlockStore: Send + Sync + 'static {
    /// Insert one block. Returns whether a new row was actually inserted (`false` means the
    /// hash was already present and the write was skipped).
    async fn store_block(&self, block: &BlockRow) -> Result<bool, StorageError>;

    /// Insert a batch of blocks in one transaction: either every block commits or none does.
    /// Returns the number of newly inserted rows; conflicts are skipped, not errors.
    async fn store_block_batch(&self, blocks: &[BlockRow]) -> Result<u64, StorageError>;

    async fn block_exists(&self, block_n: u64) -> Result<bool, StorageError>;

    async fn get_block(&self, block_n: u64) -> Result<Option<BlockRow>, StorageError>;

    async fn get_block_hash(&self, block_n: u64) -> Result<Option<Vec<u8>>, StorageError>;

    /// Highest stored block number, `None` when the store is empty.
    async fn latest_block_n(&self) -> Result<Option<u64>, StorageError>;

    async fn block_count(&self) -> Result<u64, StorageError>;

    /// Delete every row with `number >= block_n`, returning the delete count.
    async fn remove_blocks_from(&self, block_n: u64) -> Result<u64, StorageError>;

    async fn stats(&self) -> Result<StoreStats, StorageError>;
}
