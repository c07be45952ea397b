use pc_eth::{EthereumClientConfig, PULSECHAIN_CHAIN_ID};
use pp_utils::parsers::parse_url;
use std::time::Duration;
use url::Url;

#[derive(Clone, Debug, clap::Args)]
pub struct EthereumParams {
    /// JSON-RPC endpoint of the chain.
    #[clap(env = "RPC_URL", long, value_parser = parse_url, default_value = "https://rpc.pulsechain.com", value_name = "URL")]
    pub rpc_url: Url,

    /// Request timeout in milliseconds.
    #[clap(env = "RPC_TIMEOUT", long, default_value_t = 30_000, value_name = "MS")]
    pub rpc_timeout: u64,

    /// Retry budget for single fetches and batch commits, on top of the initial attempt.
    #[clap(env = "RPC_RETRIES", long, default_value_t = 3)]
    pub rpc_retries: u32,
}

impl EthereumParams {
    pub fn client_config(&self) -> EthereumClientConfig {
        EthereumClientConfig {
            rpc_url: self.rpc_url.clone(),
            chain_id: PULSECHAIN_CHAIN_ID,
            request_timeout: Duration::from_millis(self.rpc_timeout),
            rpc_retries: self.rpc_retries,
            ..Default::default()
        }
    }
}
