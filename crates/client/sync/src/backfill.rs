use crate::reorg;
use pc_db::BlockStore;
use pc_eth::EthereumClient;
use pp_block::BlockRow;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Inclusive range of heights processed as one fetch-and-commit unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockRange {
    pub from: u64,
    pub to: u64,
}

impl BlockRange {
    pub fn len(&self) -> u64 {
        self.to - self.from + 1
    }

    pub fn is_empty(&self) -> bool {
        self.to < self.from
    }
}

impl fmt::Display for BlockRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.from, self.to)
    }
}

/// Splits `[from, to]` into contiguous batches of `batch_size` heights, in order. The last
/// batch may be shorter.
pub fn partition_into_batches(from: u64, to: u64, batch_size: usize) -> Vec<BlockRange> {
    let batch_size = batch_size.max(1) as u64;
    let mut batches = Vec::new();
    let mut start = from;
    while start <= to {
        let end = to.min(start.saturating_add(batch_size - 1));
        batches.push(BlockRange { from: start, to: end });
        match end.checked_add(1) {
            Some(next) => start = next,
            None => break,
        }
    }
    batches
}

#[derive(Debug)]
pub struct FailedBatch {
    pub range: BlockRange,
    pub error: String,
}

#[derive(Debug, Default)]
pub struct BackfillSummary {
    pub completed: usize,
    pub inserted: u64,
    pub failed: Vec<FailedBatch>,
}

impl BackfillSummary {
    pub fn failed_ranges(&self) -> String {
        self.failed.iter().map(|f| f.range.to_string()).collect::<Vec<_>>().join(", ")
    }
}

pub(crate) struct BatchOutcome {
    pub inserted: u64,
    /// Height the store was truncated from when this batch repaired a reorg.
    pub reorg_point: Option<u64>,
}

pub(crate) struct BatchError {
    /// Set when the store was already truncated before the failure, so the caller can rewind
    /// its cursor even though the batch did not commit.
    pub reorg_point: Option<u64>,
    pub error: anyhow::Error,
}

fn deepest(a: Option<u64>, b: Option<u64>) -> Option<u64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (point, None) | (None, point) => point,
    }
}

/// One attempt of the batch unit: fetch the range, transform, then (under the commit lock)
/// check for a reorg and write the batch atomically.
async fn fetch_and_commit<S: BlockStore>(
    client: &EthereumClient,
    store: &S,
    commit_lock: &Mutex<()>,
    enable_reorg_check: bool,
    range: BlockRange,
) -> Result<BatchOutcome, BatchError> {
    let blocks = client.get_block_range(range.from, range.to).await.map_err(|e| BatchError {
        reorg_point: None,
        error: anyhow::Error::new(e).context(format!("Fetching blocks {range}")),
    })?;

    let rows: Vec<BlockRow> =
        blocks.iter().map(BlockRow::from_rpc).collect::<Result<_, _>>().map_err(|e| BatchError {
            reorg_point: None,
            error: anyhow::Error::new(e).context(format!("Transforming blocks {range}")),
        })?;

    // The lock serializes reorg checks and commits across concurrent batches; without it, a
    // sibling batch could re-commit blocks this one just truncated.
    let _guard = commit_lock.lock().await;

    let reorg_point = if enable_reorg_check {
        reorg::check_and_repair(store, &rows).await.map_err(|e| BatchError {
            reorg_point: None,
            error: anyhow::Error::new(e).context(format!("Checking blocks {range} for reorgs")),
        })?
    } else {
        None
    };

    let inserted = store.store_block_batch(&rows).await.map_err(|e| BatchError {
        reorg_point,
        error: anyhow::Error::new(e).context(format!("Committing blocks {range}")),
    })?;

    Ok(BatchOutcome { inserted, reorg_point })
}

/// Runs the batch unit up to `retries + 1` times with exponential backoff. Retries are
/// per-batch; budgets are not shared across batches.
pub(crate) async fn fetch_and_commit_with_retry<S: BlockStore>(
    client: Arc<EthereumClient>,
    store: Arc<S>,
    commit_lock: Arc<Mutex<()>>,
    enable_reorg_check: bool,
    range: BlockRange,
    retries: u32,
    base_delay: Duration,
) -> Result<BatchOutcome, BatchError> {
    let mut reorg_point = None;
    let mut attempt = 0;
    loop {
        match fetch_and_commit(&client, store.as_ref(), &commit_lock, enable_reorg_check, range).await {
            Ok(outcome) => {
                return Ok(BatchOutcome {
                    inserted: outcome.inserted,
                    reorg_point: deepest(reorg_point, outcome.reorg_point),
                })
            }
            Err(err) => {
                reorg_point = deepest(reorg_point, err.reorg_point);
                if attempt >= retries {
                    return Err(BatchError { reorg_point, error: err.error });
                }
                attempt += 1;
                let delay = base_delay * 2_u32.pow(attempt.min(6));
                tracing::warn!(
                    "Batch {range} failed (attempt {attempt}/{}): {:#}, retrying in {delay:?}",
                    retries + 1,
                    err.error
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
