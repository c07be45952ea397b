//! Mocks the PulseChain JSON-RPC endpoint, and lets the sync service run against it in
//! isolation.

use httpmock::{Mock, MockServer};
use pc_eth::{EthereumClient, EthereumClientConfig, PULSECHAIN_CHAIN_ID};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

pub struct RpcMock {
    server: MockServer,
}

fn hex_bytes(byte: u8, len: usize) -> String {
    format!("0x{}", format!("{byte:02x}").repeat(len))
}

fn rpc_result(result: serde_json::Value) -> serde_json::Value {
    json!({"jsonrpc": "2.0", "id": 1, "result": result})
}

/// Deterministic hash byte for the canonical mock chain at the given height.
pub fn chain_hash_byte(block_n: u64) -> u8 {
    (block_n % 200) as u8 + 1
}

impl RpcMock {
    pub fn new() -> Self {
        let mock = Self { server: MockServer::start() };
        mock.server.mock(|when, then| {
            when.method("POST").path("/").body_contains("eth_chainId");
            then.status(200).json_body(rpc_result(json!("0x171")));
        });
        mock
    }

    pub fn client(&self) -> Arc<EthereumClient> {
        Arc::new(
            EthereumClient::new(EthereumClientConfig {
                rpc_url: self.server.base_url().parse().unwrap(),
                chain_id: PULSECHAIN_CHAIN_ID,
                request_timeout: Duration::from_secs(5),
                rpc_retries: 0,
                retry_base_delay: Duration::from_millis(5),
            })
            .unwrap(),
        )
    }

    pub fn mock_head(&self, block_n: u64) -> Mock<'_> {
        self.server.mock(|when, then| {
            when.method("POST").path("/").body_contains("eth_blockNumber");
            then.status(200).json_body(rpc_result(json!(format!("{block_n:#x}"))));
        })
    }

    pub fn mock_block(&self, block_n: u64, hash_byte: u8, parent_byte: u8) -> Mock<'_> {
        self.server.mock(|when, then| {
            when.method("POST")
                .path("/")
                .body_contains("eth_getBlockByNumber")
                .body_contains(format!("\"{block_n:#x}\""));
            then.status(200).json_body(rpc_result(json!({
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
                "timestamp": format!("{:#x}", 1_700_000_000u64 + block_n * 12),
                "extraData": "0x",
                "mixHash": hex_bytes(0, 32),
                "nonce": "0x0000000000000000",
                "baseFeePerGas": "0x7",
                "size": "0x220",
                "transactions": [hex_bytes(0xf0, 32)],
                "uncles": []
            })));
        })
    }

    /// Serves an internal error for the given height, making every fetch of it fail.
    pub fn mock_block_error(&self, block_n: u64) -> Mock<'_> {
        self.server.mock(|when, then| {
            when.method("POST")
                .path("/")
                .body_contains("eth_getBlockByNumber")
                .body_contains(format!("\"{block_n:#x}\""));
            then.status(500).json_body(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "error": {"code": -32000, "message": "internal server error"}
            }));
        })
    }

    /// Mocks a hash-linked canonical chain over `from..=to`.
    pub fn mock_chain(&self, from: u64, to: u64) -> Vec<Mock<'_>> {
        (from..=to)
            .map(|n| self.mock_block(n, chain_hash_byte(n), if n == 0 { 0 } else { chain_hash_byte(n - 1) }))
            .collect()
    }
}
