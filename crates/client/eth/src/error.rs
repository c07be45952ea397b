use thiserror::Error;

#[derive(Error, Debug)]
pub enum EthereumClientError {
    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("endpoint returned block {actual} when block {expected} was requested")]
    HeightMismatch { expected: u64, actual: u64 },

    #[error("block {0} is missing inside a requested range")]
    MissingBlock(u64),

    #[error("endpoint serves chain id {actual}, expected {expected}")]
    ChainIdMismatch { expected: u64, actual: u64 },

    #[error("invalid HTTP client configuration: {0}")]
    Http(String),
}

impl EthereumClientError {
    /// Returns true if the error is transient (network faults, endpoints answering for the
    /// wrong height) and worth retrying. Configuration-level errors are not.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Rpc(_) | Self::HeightMismatch { .. } | Self::MissingBlock(_) => true,
            Self::ChainIdMismatch { .. } | Self::Http(_) => false,
        }
    }
}
