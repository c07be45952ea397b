use crate::backfill::{self, BackfillSummary, FailedBatch};
use crate::metrics::SyncMetrics;
use crate::util::{fmt_option, ServiceStateSender};
use anyhow::Context;
use pc_db::BlockStore;
use pc_eth::{EthereumClient, PULSECHAIN_BLOCK_TIME};
use pp_utils::service::ServiceContext;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinSet;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncState {
    New,
    Initialized,
    Running,
    Stopping,
    Stopped,
}

/// Lifecycle notifications, mainly consumed by tests through the service state channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServiceEvent {
    Starting,
    SyncingTo { target: u64 },
    Idle,
}

pub struct SyncConfig {
    /// Lowest height to index when the store is empty.
    pub start_block: u64,
    /// Heights per batch.
    pub batch_size: usize,
    /// Max batches in flight concurrently.
    pub parallel_batches: usize,
    /// Pause between consecutive chunks, for rate-limited endpoints.
    pub block_delay: Duration,
    pub enable_reorg_check: bool,
    /// Per-batch retry budget, on top of the initial attempt.
    pub batch_retries: u32,
    /// Base of the per-batch backoff schedule.
    pub retry_base_delay: Duration,
    /// Tail-mode poll interval, pinned to the chain's block time.
    pub poll_interval: Duration,
    /// End the run once caught up instead of tailing the chain.
    pub stop_on_sync: bool,
    pub service_state_sender: ServiceStateSender<ServiceEvent>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            start_block: 0,
            batch_size: 50,
            parallel_batches: 5,
            block_delay: Duration::ZERO,
            enable_reorg_check: true,
            batch_retries: 3,
            retry_base_delay: Duration::from_secs(1),
            poll_interval: PULSECHAIN_BLOCK_TIME,
            stop_on_sync: false,
            service_state_sender: Default::default(),
        }
    }
}

impl SyncConfig {
    pub fn start_block(self, start_block: u64) -> Self {
        Self { start_block, ..self }
    }
    pub fn batch_size(self, batch_size: usize) -> Self {
        Self { batch_size, ..self }
    }
    pub fn parallel_batches(self, parallel_batches: usize) -> Self {
        Self { parallel_batches, ..self }
    }
    pub fn block_delay(self, block_delay: Duration) -> Self {
        Self { block_delay, ..self }
    }
    pub fn enable_reorg_check(self, enable_reorg_check: bool) -> Self {
        Self { enable_reorg_check, ..self }
    }
    pub fn batch_retries(self, batch_retries: u32) -> Self {
        Self { batch_retries, ..self }
    }
    pub fn retry_base_delay(self, retry_base_delay: Duration) -> Self {
        Self { retry_base_delay, ..self }
    }
    pub fn poll_interval(self, poll_interval: Duration) -> Self {
        Self { poll_interval, ..self }
    }
    pub fn stop_on_sync(self, stop_on_sync: bool) -> Self {
        Self { stop_on_sync, ..self }
    }
    pub fn service_state_sender(self, service_state_sender: ServiceStateSender<ServiceEvent>) -> Self {
        Self { service_state_sender, ..self }
    }
}

/// Progress snapshot combining the chain head with store aggregates.
#[derive(Clone, Debug, PartialEq)]
pub struct SyncStats {
    pub chain_height: u64,
    pub indexed: u64,
    pub behind: u64,
    pub progress: String,
    pub first_block: Option<u64>,
    pub last_block: Option<u64>,
    pub total_transactions: u64,
}

pub struct SyncService<S: BlockStore> {
    client: Arc<EthereumClient>,
    store: Arc<S>,
    config: SyncConfig,
    state: SyncState,
    /// Highest height known to be durably stored; `None` until anything is.
    cursor: Option<u64>,
    chain_height: u64,
    status: Option<ServiceEvent>,
    commit_lock: Arc<Mutex<()>>,
    metrics: SyncMetrics,
    abandoned_batches: Vec<FailedBatch>,
}

impl<S: BlockStore> SyncService<S> {
    pub fn new(client: Arc<EthereumClient>, store: Arc<S>, config: SyncConfig) -> Self {
        Self {
            client,
            store,
            config,
            state: SyncState::New,
            cursor: None,
            chain_height: 0,
            status: None,
            commit_lock: Arc::new(Mutex::new(())),
            metrics: SyncMetrics::register(),
            abandoned_batches: Vec::new(),
        }
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Highest height known to be contiguously stored.
    pub fn current_block(&self) -> Option<u64> {
        self.cursor
    }

    fn next_block_n(&self) -> u64 {
        self.cursor.map(|c| c + 1).unwrap_or(self.config.start_block)
    }

    /// Verifies the endpoint, reads both heads and positions the cursor. Must be called once
    /// before [`Self::run`].
    pub async fn initialize(&mut self) -> anyhow::Result<()> {
        anyhow::ensure!(self.state == SyncState::New, "sync service was already initialized");

        self.client.verify_chain_id().await.context("Verifying the endpoint chain id")?;
        self.chain_height = self.client.latest_block_n().await.context("Reading the chain head")?;
        self.cursor = self.store.latest_block_n().await.context("Reading the stored height")?;

        tracing::info!(
            "💾 Store is at {}, chain head is at {}",
            fmt_option(self.cursor, "genesis"),
            self.chain_height
        );

        self.state = SyncState::Initialized;
        Ok(())
    }

    /// Runs backfill then tail mode until the context is cancelled (or, with `stop_on_sync`,
    /// until the store has caught up with the head).
    pub async fn run(&mut self, ctx: ServiceContext) -> anyhow::Result<()> {
        match self.state {
            SyncState::Running => {
                tracing::warn!("Sync service is already running, ignoring the start request");
                return Ok(());
            }
            SyncState::Initialized => {}
            state => anyhow::bail!("cannot start the sync service from the {state:?} state"),
        }

        self.state = SyncState::Running;
        self.set_status(ServiceEvent::Starting);

        let res = self.run_inner(&ctx).await;

        self.state = SyncState::Stopping;
        self.shutdown_summary().await;
        self.state = SyncState::Stopped;
        res
    }

    async fn run_inner(&mut self, ctx: &ServiceContext) -> anyhow::Result<()> {
        let mut interval = tokio::time::interval(self.config.poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            // The first tick completes immediately; afterwards this is the tail-mode poll.
            if ctx.run_until_cancelled(interval.tick()).await.is_none() {
                return Ok(());
            }

            match self.client.latest_block_n().await {
                Ok(head) => {
                    self.chain_height = head;
                    let next = self.next_block_n();
                    if head >= next {
                        self.set_status(ServiceEvent::SyncingTo { target: head });
                        let summary = self.backfill(ctx, next, head).await?;
                        self.abandoned_batches.extend(summary.failed);
                    } else {
                        self.set_status(ServiceEvent::Idle);
                        if self.config.stop_on_sync {
                            tracing::info!("🌐 Caught up with the chain head, stopping as requested");
                            return Ok(());
                        }
                    }
                    if ctx.is_cancelled() {
                        return Ok(());
                    }
                }
                // Transient probe failures must not kill tail mode.
                Err(err) => tracing::warn!("Failed to read the chain head: {err:#}"),
            }
        }
    }

    /// Indexes `[from, to]` in batches, running up to `parallel_batches` of them at a time.
    /// A failing batch is recorded and does not abort its siblings; the cursor only advances
    /// along the contiguous prefix of committed batches, so holes are re-fetched by the next
    /// pass and healed by the store's idempotent writes.
    pub async fn backfill(&mut self, ctx: &ServiceContext, from: u64, to: u64) -> anyhow::Result<BackfillSummary> {
        anyhow::ensure!(from <= to, "invalid backfill range {from}-{to}");

        let parallel = self.config.parallel_batches.max(1);
        let batches = backfill::partition_into_batches(from, to, self.config.batch_size);
        tracing::info!("⛏️  Backfilling blocks {from}-{to} in {} batches of up to {}", batches.len(), parallel);

        let mut summary = BackfillSummary::default();
        for (chunk_idx, chunk) in batches.chunks(parallel).enumerate() {
            if ctx.is_cancelled() {
                tracing::info!("Backfill interrupted by shutdown after {chunk_idx} chunks");
                break;
            }
            if chunk_idx > 0
                && !self.config.block_delay.is_zero()
                && ctx.run_until_cancelled(tokio::time::sleep(self.config.block_delay)).await.is_none()
            {
                break;
            }

            let mut join_set = JoinSet::new();
            for (slot, range) in chunk.iter().enumerate() {
                let client = Arc::clone(&self.client);
                let store = Arc::clone(&self.store);
                let commit_lock = Arc::clone(&self.commit_lock);
                let enable_reorg_check = self.config.enable_reorg_check;
                let retries = self.config.batch_retries;
                let base_delay = self.config.retry_base_delay;
                let range = *range;
                join_set.spawn(async move {
                    let res = backfill::fetch_and_commit_with_retry(
                        client,
                        store,
                        commit_lock,
                        enable_reorg_check,
                        range,
                        retries,
                        base_delay,
                    )
                    .await;
                    (slot, res)
                });
            }

            let mut outcomes: Vec<_> = chunk.iter().map(|_| None).collect();
            while let Some(joined) = join_set.join_next().await {
                let (slot, outcome) = joined.context("Batch task panicked")?;
                outcomes[slot] = Some(outcome);
            }

            // Serial bookkeeping in batch order: reorg rewinds first, then the cursor follows
            // the contiguous prefix of committed batches.
            let mut committed = vec![false; chunk.len()];
            for (slot, (range, outcome)) in chunk.iter().zip(outcomes).enumerate() {
                match outcome.expect("every spawned batch reports an outcome") {
                    Ok(outcome) => {
                        if let Some(reorg_point) = outcome.reorg_point {
                            self.rewind_to(reorg_point);
                        }
                        self.metrics.record_imported(outcome.inserted);
                        summary.inserted += outcome.inserted;
                        summary.completed += 1;
                        committed[slot] = true;
                    }
                    Err(err) => {
                        if let Some(reorg_point) = err.reorg_point {
                            self.rewind_to(reorg_point);
                        }
                        tracing::error!("Batch {range} abandoned after retries: {:#}", err.error);
                        summary.failed.push(FailedBatch { range: *range, error: format!("{:#}", err.error) });
                    }
                }
            }
            for (range, batch_committed) in chunk.iter().zip(&committed) {
                if !batch_committed {
                    break;
                }
                if range.from == self.next_block_n() {
                    self.cursor = Some(range.to);
                }
            }

            self.show_status();
        }

        if summary.failed.is_empty() {
            tracing::info!(
                "✅ Backfill of {from}-{to} complete: {} batches, {} new blocks",
                summary.completed,
                summary.inserted
            );
        } else {
            tracing::warn!(
                "Backfill of {from}-{to} finished degraded: {} batches succeeded, {} failed ({})",
                summary.completed,
                summary.failed.len(),
                summary.failed_ranges()
            );
        }
        Ok(summary)
    }

    /// The store was truncated from `reorg_point`; the cursor must not stay above it.
    fn rewind_to(&mut self, reorg_point: u64) {
        let rewound = reorg_point.saturating_sub(1);
        let cursor = match self.cursor {
            Some(cursor) => cursor.min(rewound),
            None => rewound,
        };
        tracing::info!("Rewound sync cursor to {cursor} after reorg repair");
        self.cursor = Some(cursor);
    }

    fn set_status(&mut self, status: ServiceEvent) {
        if self.status != Some(status) {
            self.config.service_state_sender.send(status);
            self.status = Some(status);
        }
    }

    fn show_status(&self) {
        tracing::info!(
            "🔗 Sync is at {}/{} [{:.2} blocks/s]",
            fmt_option(self.cursor, "N"),
            self.chain_height,
            self.metrics.throughput()
        );
    }

    /// Progress snapshot against the last observed chain head.
    pub async fn stats(&self) -> anyhow::Result<SyncStats> {
        let store_stats = self.store.stats().await.context("Reading store statistics")?;

        let progress = match store_stats.last_block {
            Some(last) if self.chain_height > 0 => {
                format!("{:.2}%", last as f64 / self.chain_height as f64 * 100.0)
            }
            _ => "0%".to_string(),
        };

        Ok(SyncStats {
            chain_height: self.chain_height,
            indexed: store_stats.total_blocks,
            behind: self.chain_height.saturating_sub(store_stats.last_block.unwrap_or(0)),
            progress,
            first_block: store_stats.first_block,
            last_block: store_stats.last_block,
            total_transactions: store_stats.total_transactions,
        })
    }

    async fn shutdown_summary(&self) {
        match self.stats().await {
            Ok(stats) => tracing::info!(
                "🔌 Shutting down: {} blocks indexed up to {} ({} transactions, {} of the chain)",
                stats.indexed,
                fmt_option(stats.last_block, "N"),
                stats.total_transactions,
                stats.progress
            ),
            Err(err) => tracing::warn!("Could not gather final statistics: {err:#}"),
        }
        if !self.abandoned_batches.is_empty() {
            let ranges = self.abandoned_batches.iter().map(|f| f.range.to_string()).collect::<Vec<_>>().join(", ");
            tracing::warn!("{} batches were abandoned after retries: {ranges}", self.abandoned_batches.len());
        }
    }
}
