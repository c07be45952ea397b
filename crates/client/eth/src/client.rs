use crate::error::EthereumClientError;
use crate::retry::retry;
use crate::{PULSECHAIN_BLOCK_TIME, PULSECHAIN_CHAIN_ID};
use alloy::eips::BlockNumberOrTag;
use alloy::providers::{Provider, RootProvider};
use alloy::rpc::client::RpcClient;
use alloy::transports::http::Http;
use futures::{stream, StreamExt, TryStreamExt};
use std::time::Duration;
use url::Url;

/// A block as served by `eth_getBlockByNumber`, transaction list carrying hashes only.
pub type RpcBlock = alloy::rpc::types::Block;

#[derive(Clone, Debug)]
pub struct EthereumClientConfig {
    pub rpc_url: Url,
    pub chain_id: u64,
    pub request_timeout: Duration,
    /// Retry budget for single fetches, on top of the initial attempt.
    pub rpc_retries: u32,
    /// Base of the exponential backoff schedule between retries.
    pub retry_base_delay: Duration,
}

impl Default for EthereumClientConfig {
    fn default() -> Self {
        Self {
            rpc_url: Url::parse("https://rpc.pulsechain.com").expect("valid default url"),
            chain_id: PULSECHAIN_CHAIN_ID,
            request_timeout: Duration::from_secs(30),
            rpc_retries: 3,
            retry_base_delay: Duration::from_secs(1),
        }
    }
}

pub struct EthereumClient {
    provider: RootProvider,
    chain_id: u64,
    rpc_retries: u32,
    retry_base_delay: Duration,
}

impl EthereumClient {
    /// Create a new client for the given HTTP endpoint. The connection itself is lazy; use
    /// [`Self::is_healthy`] or [`Self::verify_chain_id`] to probe the endpoint.
    pub fn new(config: EthereumClientConfig) -> Result<Self, EthereumClientError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| EthereumClientError::Http(e.to_string()))?;
        let transport = Http::with_client(http_client, config.rpc_url);
        let provider = RootProvider::new(RpcClient::new(transport, false));

        Ok(Self {
            provider,
            chain_id: config.chain_id,
            rpc_retries: config.rpc_retries,
            retry_base_delay: config.retry_base_delay,
        })
    }

    /// Confirms the endpoint serves the configured chain. Run once at startup; a mismatch
    /// means the node is pointed at the wrong network and is fatal.
    pub async fn verify_chain_id(&self) -> Result<(), EthereumClientError> {
        let actual = self.provider.get_chain_id().await.map_err(|e| EthereumClientError::Rpc(e.to_string()))?;
        if actual != self.chain_id {
            return Err(EthereumClientError::ChainIdMismatch { expected: self.chain_id, actual });
        }
        Ok(())
    }

    /// Retrieves the latest block number, retrying transient failures.
    pub async fn latest_block_n(&self) -> Result<u64, EthereumClientError> {
        retry(
            || async { self.provider.get_block_number().await.map_err(|e| EthereumClientError::Rpc(e.to_string())) },
            self.rpc_retries,
            self.retry_base_delay,
        )
        .await
    }

    /// Fetches the block at the given height. `Ok(None)` means the endpoint does not know the
    /// block (future height, or pruned) and is returned immediately without retry; transport
    /// faults and wrong-height answers are retried.
    pub async fn get_block(&self, block_n: u64) -> Result<Option<RpcBlock>, EthereumClientError> {
        retry(|| self.get_block_once(block_n), self.rpc_retries, self.retry_base_delay).await
    }

    async fn get_block_once(&self, block_n: u64) -> Result<Option<RpcBlock>, EthereumClientError> {
        let block = self
            .provider
            .get_block_by_number(BlockNumberOrTag::Number(block_n))
            .await
            .map_err(|e| EthereumClientError::Rpc(e.to_string()))?;

        match block {
            None => Ok(None),
            Some(block) if block.header.number != block_n => {
                Err(EthereumClientError::HeightMismatch { expected: block_n, actual: block.header.number })
            }
            Some(block) => Ok(Some(block)),
        }
    }

    /// Fetches `from..=to` sequentially, in ascending order. A height the endpoint does not
    /// know is a fault here: ranges are only requested below the observed chain head, so a gap
    /// means the endpoint is lagging and the whole call fails.
    pub async fn get_block_range(&self, from: u64, to: u64) -> Result<Vec<RpcBlock>, EthereumClientError> {
        let mut blocks = Vec::with_capacity(to.saturating_sub(from) as usize + 1);
        for block_n in from..=to {
            match self.get_block(block_n).await? {
                Some(block) => blocks.push(block),
                None => return Err(EthereumClientError::MissingBlock(block_n)),
            }
        }
        Ok(blocks)
    }

    /// Fetches an arbitrary set of heights with at most `concurrency` requests in flight.
    /// Completion order is unspecified; unknown heights are silently dropped.
    pub async fn get_block_set(
        &self,
        block_ns: Vec<u64>,
        concurrency: usize,
    ) -> Result<Vec<RpcBlock>, EthereumClientError> {
        let blocks: Vec<Option<RpcBlock>> = stream::iter(block_ns.into_iter().map(|n| self.get_block(n)))
            .buffer_unordered(concurrency.max(1))
            .try_collect()
            .await?;
        Ok(blocks.into_iter().flatten().collect())
    }

    /// Single probe of the endpoint; never raises.
    pub async fn is_healthy(&self) -> bool {
        self.provider.get_block_number().await.is_ok()
    }

    /// The tail poll interval matching the chain's nominal block time.
    pub fn poll_interval(&self) -> Duration {
        PULSECHAIN_BLOCK_TIME
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::MockServer;
    use serde_json::json;

    fn hex_bytes(byte: u8, len: usize) -> String {
        format!("0x{}", format!("{byte:02x}").repeat(len))
    }

    pub(crate) fn block_json(block_n: u64, hash_byte: u8, parent_byte: u8) -> serde_json::Value {
        json!({
            "hash": hex_bytes(hash_byte, 32),
            "parentHash": hex_bytes(parent_byte, 32),
            "sha3Uncles": hex_bytes(0, 32),
            "miner": hex_bytes(0x77, 20),
            "stateRoot": hex_bytes(1, 32),
            "transactionsRoot": hex_bytes(2, 32),
            "receiptsRoot": hex_bytes(3, 32),
            "logsBloom": hex_bytes(0, 256),
            "difficulty": "0x0",
            "number": format!("{block_n:#x}"),
            "gasLimit": "0x1c9c380",
            "gasUsed": "0x5208",
            "timestamp": "0x6553f100",
            "extraData": "0x",
            "mixHash": hex_bytes(0, 32),
            "nonce": "0x0000000000000000",
            "baseFeePerGas": "0x7",
            "size": "0x220",
            "transactions": [],
            "uncles": []
        })
    }

    fn test_client(server: &MockServer, retries: u32) -> EthereumClient {
        EthereumClient::new(EthereumClientConfig {
            rpc_url: server.base_url().parse().unwrap(),
            chain_id: PULSECHAIN_CHAIN_ID,
            request_timeout: Duration::from_secs(5),
            rpc_retries: retries,
            retry_base_delay: Duration::from_millis(5),
        })
        .unwrap()
    }

    fn rpc_result(result: serde_json::Value) -> serde_json::Value {
        json!({"jsonrpc": "2.0", "id": 1, "result": result})
    }

    #[tokio::test]
    async fn latest_block_n_returns_the_head() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method("POST").path("/").body_contains("eth_blockNumber");
            then.status(200).json_body(rpc_result(json!("0x63")));
        });

        let client = test_client(&server, 0);
        assert_eq!(client.latest_block_n().await.unwrap(), 99);
    }

    #[tokio::test]
    async fn get_block_returns_a_typed_block() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method("POST").path("/").body_contains("eth_getBlockByNumber").body_contains("\"0x64\"");
            then.status(200).json_body(rpc_result(block_json(100, 0xaa, 0xab)));
        });

        let client = test_client(&server, 0);
        let block = client.get_block(100).await.unwrap().unwrap();
        assert_eq!(block.header.number, 100);
        assert_eq!(block.header.hash.as_slice(), &[0xaa; 32]);
        assert_eq!(block.transactions.len(), 0);
    }

    #[tokio::test]
    async fn missing_block_is_a_value_not_an_error() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method("POST").path("/").body_contains("eth_getBlockByNumber");
            then.status(200).json_body(rpc_result(json!(null)));
        });

        // Even with a retry budget, "no such block" must come back immediately.
        let client = test_client(&server, 3);
        assert!(client.get_block(7).await.unwrap().is_none());
        assert_eq!(mock.hits(), 1);
    }

    #[tokio::test]
    async fn wrong_height_answer_is_retried_then_surfaced() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method("POST").path("/").body_contains("eth_getBlockByNumber");
            then.status(200).json_body(rpc_result(block_json(5, 0xaa, 0xab)));
        });

        let client = test_client(&server, 1);
        let err = client.get_block(4).await.unwrap_err();
        assert!(matches!(err, EthereumClientError::HeightMismatch { expected: 4, actual: 5 }));
        assert_eq!(mock.hits(), 2);
    }

    #[tokio::test]
    async fn range_fetch_fails_on_a_gap() {
        let server = MockServer::start();
        for n in 0..2u64 {
            server.mock(|when, then| {
                when.method("POST")
                    .path("/")
                    .body_contains("eth_getBlockByNumber")
                    .body_contains(format!("\"{n:#x}\""));
                then.status(200).json_body(rpc_result(block_json(n, n as u8 + 1, n as u8)));
            });
        }
        server.mock(|when, then| {
            when.method("POST").path("/").body_contains("eth_getBlockByNumber").body_contains("\"0x2\"");
            then.status(200).json_body(rpc_result(json!(null)));
        });

        let client = test_client(&server, 0);
        let err = client.get_block_range(0, 2).await.unwrap_err();
        assert!(matches!(err, EthereumClientError::MissingBlock(2)));
    }

    #[tokio::test]
    async fn range_fetch_is_ordered() {
        let server = MockServer::start();
        for n in 10..=12u64 {
            server.mock(|when, then| {
                when.method("POST")
                    .path("/")
                    .body_contains("eth_getBlockByNumber")
                    .body_contains(format!("\"{n:#x}\""));
                then.status(200).json_body(rpc_result(block_json(n, n as u8, n as u8 - 1)));
            });
        }

        let client = test_client(&server, 0);
        let blocks = client.get_block_range(10, 12).await.unwrap();
        assert_eq!(blocks.iter().map(|b| b.header.number).collect::<Vec<_>>(), vec![10, 11, 12]);
    }

    #[tokio::test]
    async fn set_fetch_drops_unknown_heights() {
        let server = MockServer::start();
        for n in [3u64, 5] {
            server.mock(|when, then| {
                when.method("POST")
                    .path("/")
                    .body_contains("eth_getBlockByNumber")
                    .body_contains(format!("\"{n:#x}\""));
                then.status(200).json_body(rpc_result(block_json(n, n as u8, n as u8 - 1)));
            });
        }
        server.mock(|when, then| {
            when.method("POST").path("/").body_contains("eth_getBlockByNumber").body_contains("\"0x4\"");
            then.status(200).json_body(rpc_result(json!(null)));
        });

        let client = test_client(&server, 0);
        let mut block_ns: Vec<u64> =
            client.get_block_set(vec![3, 4, 5], 2).await.unwrap().iter().map(|b| b.header.number).collect();
        block_ns.sort_unstable();
        assert_eq!(block_ns, vec![3, 5]);
    }

    #[tokio::test]
    async fn chain_id_mismatch_is_fatal() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method("POST").path("/").body_contains("eth_chainId");
            then.status(200).json_body(rpc_result(json!("0x1")));
        });

        let client = test_client(&server, 0);
        let err = client.verify_chain_id().await.unwrap_err();
        assert!(matches!(err, EthereumClientError::ChainIdMismatch { expected: 369, actual: 1 }));
        assert!(!err.is_recoverable());
    }

    #[tokio::test]
    async fn chain_id_match_passes() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method("POST").path("/").body_contains("eth_chainId");
            then.status(200).json_body(rpc_result(json!("0x171")));
        });

        let client = test_client(&server, 0);
        client.verify_chain_id().await.unwrap();
    }

    #[tokio::test]
    async fn health_probe_never_raises() {
        let server = MockServer::start();
        // No mocks configured: every request fails.
        let client = test_client(&server, 0);
        assert!(!client.is_healthy().await);

        server.mock(|when, then| {
            when.method("POST").path("/").body_contains("eth_blockNumber");
            then.status(200).json_body(rpc_result(json!("0x10")));
        });
        assert!(client.is_healthy().await);
    }
}
