use pc_db::{BlockStore, StorageError};
use pp_block::BlockRow;

/// Compares the incoming canonical blocks against what is stored and repairs the store when
/// they diverge.
///
/// The first diverging height wins: every stored row from that height upwards is removed in
/// one go, which also wipes any deeper divergence in the same batch, and the caller's batch
/// write then lays the new canonical blocks over the vacated range. Returns the height the
/// store was truncated from, or `None` when nothing diverged.
pub(crate) async fn check_and_repair<S: BlockStore>(
    store: &S,
    incoming: &[BlockRow],
) -> Result<Option<u64>, StorageError> {
    for block in incoming {
        // Genesis has no competing fork.
        if block.block_n == 0 {
            continue;
        }
        let Some(stored_hash) = store.get_block_hash(block.block_n).await? else {
            continue;
        };
        if stored_hash != block.hash {
            tracing::warn!(
                block_n = block.block_n,
                "⚠️ Reorganization detected: stored block hash differs from the canonical chain"
            );
            let removed = store.remove_blocks_from(block.block_n).await?;
            tracing::info!(removed, from = block.block_n, "Removed stale blocks, rewriting from the fork point");
            return Ok(Some(block.block_n));
        }
    }
    Ok(None)
}
