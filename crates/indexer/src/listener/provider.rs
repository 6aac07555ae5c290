//! RPC provider wrapper for Ethereum communication.

use alloy::primitives::Address;
use alloy::providers::{Provider, ProviderBuilder, RootProvider};
use alloy::rpc::types::{Filter, Log};
use alloy::transports::http::{Client, Http};
use anyhow::{Context, Result};
use async_trait::async_trait;

use super::events::routed_signatures;

/// Source of raw contract logs.
///
/// Logs are returned as the node hands them out; the sync engine takes care
/// of ordering.
#[async_trait]
pub trait LogSource: Send + Sync {
    /// Latest block number known to the source.
    async fn latest_block(&self) -> Result<u64>;

    /// Logs emitted by the indexed contract in `from..=to`.
    async fn logs(&self, from_block: u64, to_block: u64) -> Result<Vec<Log>>;
}

/// HTTP RPC provider for querying Ethereum.
#[derive(Clone)]
pub struct RpcProvider {
    provider: RootProvider<Http<Client>>,
    contract: Address,
}

impl RpcProvider {
    /// Create a new RPC provider for logs of `contract`.
    pub fn new(rpc_url: &str, contract: Address) -> Result<Self> {
        let url = rpc_url
            .parse()
            .with_context(|| format!("Invalid RPC URL: {}", rpc_url))?;

        let provider = ProviderBuilder::new().on_http(url);

        Ok(Self { provider, contract })
    }

    /// Chain id reported by the node.
    pub async fn chain_id(&self) -> Result<u64> {
        self.provider
            .get_chain_id()
            .await
            .context("Failed to get chain id")
    }

    fn filter(&self, from_block: u64, to_block: u64) -> Filter {
        Filter::new()
            .address(self.contract)
            .event_signature(routed_signatures().to_vec())
            .from_block(from_block)
            .to_block(to_block)
    }
}

#[async_trait]
impl LogSource for RpcProvider {
    async fn latest_block(&self) -> Result<u64> {
        self.provider
            .get_block_number()
            .await
            .context("Failed to get block number")
    }

    async fn logs(&self, from_block: u64, to_block: u64) -> Result<Vec<Log>> {
        let filter = self.filter(from_block, to_block);

        self.provider
            .get_logs(&filter)
            .await
            .with_context(|| format!("Failed to fetch logs for blocks {from_block} to {to_block}"))
    }
}
