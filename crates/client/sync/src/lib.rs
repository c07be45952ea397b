//! Keeps the block store in sync with the chain.
//!
//! The [`SyncService`] drives two phases. During backfill it partitions the missing height
//! range into batches and runs up to `parallel_batches` of them concurrently, each batch
//! being one fetch → reorg check → atomic write unit with its own retry budget. Once caught
//! up it tails the chain, polling the head at the chain's block interval and re-entering
//! backfill for whatever is new.
//!
//! Reorg checks and batch commits are serialized under a single lock so that concurrent
//! batches cannot undo each other's repairs; fetches stay parallel.

pub mod backfill;
pub mod metrics;
pub mod reorg;
pub mod sync;
pub mod util;

#[cfg(test)]
mod tests;

pub use backfill::{BackfillSummary, BlockRange, FailedBatch};
pub use sync::{ServiceEvent, SyncConfig, SyncService, SyncState, SyncStats};
