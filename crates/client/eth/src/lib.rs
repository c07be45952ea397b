//! JSON-RPC client for the PulseChain endpoint.

use std::time::Duration;

mod client;
mod error;
mod retry;

pub use client::{EthereumClient, EthereumClientConfig, RpcBlock};
pub use error::EthereumClientError;

/// Chain id of PulseChain mainnet.
pub const PULSECHAIN_CHAIN_ID: u64 = 369;

/// Nominal block time of the chain; the tail poll interval is pinned to it.
pub const PULSECHAIN_BLOCK_TIME: Duration = Duration::from_secs(12);
