use crate::{BlockStore, ExplorerBackend, StorageError};
use async_trait::async_trait;
use bigdecimal::{BigDecimal, ToPrimitive};
use pp_block::{BlockRow, StoreStats};
use sqlx::postgres::PgRow;
use sqlx::query::Query;
use sqlx::{Postgres, Row};

const BLOCK_COLUMNS: &str = "hash, number, parent_hash, miner, timestamp, gas_limit, gas_used, \
     base_fee_per_gas, transactions_root, state_root, receipts_root, difficulty, nonce, \
     extra_data, size, transaction_count";

const INSERT_BLOCK: &str = "INSERT INTO blocks (hash, number, parent_hash, miner, timestamp, gas_limit, gas_used, \
     base_fee_per_gas, transactions_root, state_root, receipts_root, difficulty, nonce, \
     extra_data, size, transaction_count) \
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16) \
     ON CONFLICT (hash) DO NOTHING";

fn bind_block<'q>(
    query: Query<'q, Postgres, sqlx::postgres::PgArguments>,
    block: &'q BlockRow,
) -> Query<'q, Postgres, sqlx::postgres::PgArguments> {
    query
        .bind(&block.hash)
        .bind(block.block_n as i64)
        .bind(&block.parent_hash)
        .bind(&block.miner)
        .bind(block.timestamp)
        .bind(&block.gas_limit)
        .bind(&block.gas_used)
        .bind(&block.base_fee_per_gas)
        .bind(&block.transactions_root)
        .bind(&block.state_root)
        .bind(&block.receipts_root)
        .bind(&block.difficulty)
        .bind(&block.nonce)
        .bind(&block.extra_data)
        .bind(block.size)
        .bind(block.transaction_count)
}

fn row_to_block(row: &PgRow) -> Result<BlockRow, StorageError> {
    let number: i64 = row.try_get("number")?;
    let block_n =
        u64::try_from(number).map_err(|_| StorageError::MalformedRow(0, format!("negative block number {number}")))?;

    Ok(BlockRow {
        hash: row.try_get("hash")?,
        block_n,
        parent_hash: row.try_get("parent_hash")?,
        miner: row.try_get("miner")?,
        timestamp: row.try_get("timestamp")?,
        gas_limit: row.try_get("gas_limit")?,
        gas_used: row.try_get("gas_used")?,
        base_fee_per_gas: row.try_get("base_fee_per_gas")?,
        transactions_root: row.try_get("transactions_root")?,
        state_root: row.try_get("state_root")?,
        receipts_root: row.try_get("receipts_root")?,
        difficulty: row.try_get("difficulty")?,
        nonce: row.try_get("nonce")?,
        extra_data: row.try_get("extra_data")?,
        size: row.try_get("size")?,
        transaction_count: row.try_get("transaction_count")?,
    })
}

#[async_trait]
impl BlockStore for ExplorerBackend {
    async fn store_block(&self, block: &BlockRow) -> Result<bool, StorageError> {
        let res = bind_block(sqlx::query(INSERT_BLOCK), block).execute(self.pool()).await?;
        Ok(res.rows_affected() == 1)
    }

    async fn store_block_batch(&self, blocks: &[BlockRow]) -> Result<u64, StorageError> {
        let mut tx = self.pool().begin().await?;
        let mut inserted = 0;
        for block in blocks {
            let res = bind_block(sqlx::query(INSERT_BLOCK), block).execute(&mut *tx).await?;
            inserted += res.rows_affected();
        }
        tx.commit().await?;
        Ok(inserted)
    }

    async fn block_exists(&self, block_n: u64) -> Result<bool, StorageError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM blocks WHERE number = $1)")
            .bind(block_n as i64)
            .fetch_one(self.pool())
            .await?;
        Ok(exists)
    }

    async fn get_block(&self, block_n: u64) -> Result<Option<BlockRow>, StorageError> {
        let row = sqlx::query(&format!("SELECT {BLOCK_COLUMNS} FROM blocks WHERE number = $1"))
            .bind(block_n as i64)
            .fetch_optional(self.pool())
            .await?;
        row.as_ref().map(row_to_block).transpose()
    }

    async fn get_block_hash(&self, block_n: u64) -> Result<Option<Vec<u8>>, StorageError> {
        let hash: Option<Vec<u8>> = sqlx::query_scalar("SELECT hash FROM blocks WHERE number = $1")
            .bind(block_n as i64)
            .fetch_optional(self.pool())
            .await?;
        Ok(hash)
    }

    async fn latest_block_n(&self) -> Result<Option<u64>, StorageError> {
        let max: Option<i64> =
            sqlx::query_scalar("SELECT MAX(number) FROM blocks").fetch_one(self.pool()).await?;
        Ok(max.map(|n| n as u64))
    }

    async fn block_count(&self) -> Result<u64, StorageError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM blocks").fetch_one(self.pool()).await?;
        Ok(count as u64)
    }

    async fn remove_blocks_from(&self, block_n: u64) -> Result<u64, StorageError> {
        let res = sqlx::query("DELETE FROM blocks WHERE number >= $1")
            .bind(i64::try_from(block_n).unwrap_or(i64::MAX))
            .execute(self.pool())
            .await?;
        Ok(res.rows_affected())
    }

    async fn stats(&self) -> Result<StoreStats, StorageError> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS total_blocks, \
                    MIN(number) AS first_block, \
                    MAX(number) AS last_block, \
                    COALESCE(SUM(transaction_count), 0)::BIGINT AS total_transactions, \
                    COALESCE(AVG(transaction_count), 0) AS avg_tx_per_block, \
                    COALESCE(SUM(gas_used), 0) AS total_gas_used, \
                    COALESCE(AVG(gas_used), 0) AS avg_gas_per_block \
             FROM blocks",
        )
        .fetch_one(self.pool())
        .await?;

        let total_blocks: i64 = row.try_get("total_blocks")?;
        let first_block: Option<i64> = row.try_get("first_block")?;
        let last_block: Option<i64> = row.try_get("last_block")?;
        let total_transactions: i64 = row.try_get("total_transactions")?;
        let avg_tx_per_block: BigDecimal = row.try_get("avg_tx_per_block")?;

        Ok(StoreStats {
            total_blocks: total_blocks as u64,
            first_block: first_block.map(|n| n as u64),
            last_block: last_block.map(|n| n as u64),
            total_transactions: total_transactions as u64,
            avg_tx_per_block: avg_tx_per_block.to_f64().unwrap_or(0.0),
            total_gas_used: row.try_get("total_gas_used")?,
            avg_gas_per_block: row.try_get("avg_gas_per_block")?,
        })
    }
}
