use bigdecimal::BigDecimal;

/// Aggregate figures over the whole `blocks` table.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StoreStats {
    pub total_blocks: u64,
    pub first_block: Option<u64>,
    pub last_block: Option<u64>,
    pub total_transactions: u64,
    pub avg_tx_per_block: f64,
    pub total_gas_used: BigDecimal,
    pub avg_gas_per_block: BigDecimal,
}
