//! Block primitives.
//!
//! [`BlockRow`] is the persistent shape of a block: raw bytes for the fixed-size hash fields,
//! decimal values for the EVM wide integers, and a wall-clock timestamp. The conversion from
//! the RPC representation happens once, here, at [`BlockRow::from_rpc`]; everything downstream
//! (storage, sync) works on the converted row.

use alloy::rpc::types::Block as RpcBlock;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};

mod stats;
pub use stats::StoreStats;

/// A block as stored in the `blocks` table.
///
/// `number` stays a `u64` in the domain; the storage layer is responsible for the `BIGINT`
/// cast, which [`BlockRow::from_rpc`] guarantees cannot overflow.
#[derive(Clone, Debug, PartialEq)]
pub struct BlockRow {
    pub hash: Vec<u8>,
    pub block_n: u64,
    pub parent_hash: Vec<u8>,
    pub miner: Vec<u8>,
    pub timestamp: DateTime<Utc>,
    pub gas_limit: BigDecimal,
    pub gas_used: BigDecimal,
    pub base_fee_per_gas: Option<BigDecimal>,
    pub transactions_root: Vec<u8>,
    pub state_root: Vec<u8>,
    pub receipts_root: Vec<u8>,
    pub difficulty: Option<BigDecimal>,
    pub nonce: Vec<u8>,
    pub extra_data: Option<Vec<u8>>,
    pub size: i32,
    pub transaction_count: i32,
}

#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    #[error("block number {0} overflows the storage range")]
    BlockNumber(u64),

    #[error("block {block_n} carries an invalid unix timestamp: {timestamp}")]
    Timestamp { block_n: u64, timestamp: u64 },

    #[error("invalid decimal value for {field}: {value}")]
    Decimal { field: &'static str, value: String },
}

fn wide_decimal(field: &'static str, value: impl ToString) -> Result<BigDecimal, TransformError> {
    let value = value.to_string();
    value.parse().map_err(|_| TransformError::Decimal { field, value })
}

impl BlockRow {
    /// Converts an RPC block into its persistent shape.
    ///
    /// The typed provider already rejected blocks missing mandatory header fields, so the only
    /// fallible parts left are the integer domain checks. The transaction list is reduced to
    /// its length; whether it carries hashes or full bodies does not matter here.
    pub fn from_rpc(block: &RpcBlock) -> Result<Self, TransformError> {
        let header = &block.header;
        let block_n = header.number;
        if i64::try_from(block_n).is_err() {
            return Err(TransformError::BlockNumber(block_n));
        }

        let timestamp = DateTime::<Utc>::from_timestamp(
            i64::try_from(header.timestamp)
                .map_err(|_| TransformError::Timestamp { block_n, timestamp: header.timestamp })?,
            0,
        )
        .ok_or(TransformError::Timestamp { block_n, timestamp: header.timestamp })?;

        Ok(Self {
            hash: header.hash.to_vec(),
            block_n,
            parent_hash: header.parent_hash.to_vec(),
            miner: header.beneficiary.to_vec(),
            timestamp,
            gas_limit: BigDecimal::from(header.gas_limit),
            gas_used: BigDecimal::from(header.gas_used),
            base_fee_per_gas: header.base_fee_per_gas.map(BigDecimal::from),
            transactions_root: header.transactions_root.to_vec(),
            state_root: header.state_root.to_vec(),
            receipts_root: header.receipts_root.to_vec(),
            difficulty: Some(wide_decimal("difficulty", header.difficulty)?),
            nonce: header.nonce.to_vec(),
            extra_data: Some(header.extra_data.to_vec()),
            // Best-effort: most endpoints report it, but nothing downstream depends on it.
            size: header
                .size
                .and_then(|s| u64::try_from(s).ok())
                .and_then(|s| i32::try_from(s).ok())
                .unwrap_or(0),
            transaction_count: block.transactions.len() as i32,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{Address, Bytes, B256, B64, U256};
    use alloy::rpc::types::{Block, BlockTransactions, Header};
    use std::str::FromStr;

    fn rpc_block(block_n: u64, tx_count: usize) -> Block {
        let inner = alloy::consensus::Header {
            number: block_n,
            parent_hash: B256::repeat_byte(0x11),
            beneficiary: Address::repeat_byte(0x22),
            state_root: B256::repeat_byte(0x33),
            transactions_root: B256::repeat_byte(0x44),
            receipts_root: B256::repeat_byte(0x55),
            timestamp: 1_700_000_000,
            gas_limit: 30_000_000,
            gas_used: 21_000,
            base_fee_per_gas: Some(7),
            difficulty: U256::from(131_072u64),
            nonce: B64::repeat_byte(0x66),
            extra_data: Bytes::from_static(b"pulse"),
            ..Default::default()
        };
        Block {
            header: Header {
                hash: B256::repeat_byte(0xaa),
                inner,
                total_difficulty: None,
                size: Some(U256::from(1234u64)),
            },
            uncles: vec![],
            transactions: BlockTransactions::Hashes(vec![B256::ZERO; tx_count]),
            withdrawals: None,
        }
    }

    #[test]
    fn converts_header_fields() {
        let row = BlockRow::from_rpc(&rpc_block(100, 3)).unwrap();

        assert_eq!(row.block_n, 100);
        assert_eq!(row.hash, vec![0xaa; 32]);
        assert_eq!(row.parent_hash, vec![0x11; 32]);
        assert_eq!(row.miner, vec![0x22; 20]);
        assert_eq!(row.state_root, vec![0x33; 32]);
        assert_eq!(row.transactions_root, vec![0x44; 32]);
        assert_eq!(row.receipts_root, vec![0x55; 32]);
        assert_eq!(row.nonce, vec![0x66; 8]);
        assert_eq!(row.extra_data.as_deref(), Some(&b"pulse"[..]));
        assert_eq!(row.size, 1234);
        assert_eq!(row.transaction_count, 3);
        assert_eq!(row.timestamp.timestamp(), 1_700_000_000);
    }

    #[test]
    fn wide_integers_become_decimals() {
        let row = BlockRow::from_rpc(&rpc_block(1, 0)).unwrap();

        assert_eq!(row.gas_limit, BigDecimal::from(30_000_000u64));
        assert_eq!(row.gas_used, BigDecimal::from(21_000u64));
        assert_eq!(row.base_fee_per_gas, Some(BigDecimal::from(7u64)));
        assert_eq!(row.difficulty, Some(BigDecimal::from(131_072u64)));
    }

    #[test]
    fn difficulty_beyond_u64_is_not_narrowed() {
        let mut block = rpc_block(1, 0);
        block.header.inner.difficulty = U256::from_str("340282366920938463463374607431768211456").unwrap(); // 2^128

        let row = BlockRow::from_rpc(&block).unwrap();
        assert_eq!(
            row.difficulty,
            Some(BigDecimal::from_str("340282366920938463463374607431768211456").unwrap())
        );
    }

    #[test]
    fn missing_base_fee_maps_to_null() {
        let mut block = rpc_block(1, 0);
        block.header.inner.base_fee_per_gas = None;

        let row = BlockRow::from_rpc(&block).unwrap();
        assert_eq!(row.base_fee_per_gas, None);
    }

    #[test]
    fn missing_size_defaults_to_zero() {
        let mut block = rpc_block(1, 0);
        block.header.size = None;

        let row = BlockRow::from_rpc(&block).unwrap();
        assert_eq!(row.size, 0);
    }

    #[test]
    fn counts_full_transaction_bodies_too() {
        let mut block = rpc_block(1, 0);
        block.transactions = BlockTransactions::Hashes(vec![B256::repeat_byte(1), B256::repeat_byte(2)]);

        let row = BlockRow::from_rpc(&block).unwrap();
        assert_eq!(row.transaction_count, 2);
    }

    #[test]
    fn rejects_block_number_overflowing_storage() {
        let block = rpc_block(u64::MAX, 0);
        assert!(matches!(BlockRow::from_rpc(&block), Err(TransformError::BlockNumber(_))));
    }
}
