use std::time::Duration;

use alloy::{
    eips::{BlockId, BlockNumberOrTag},
    primitives::Address,
    providers::{DynProvider, Provider, ProviderBuilder},
};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use url::Url;

use crate::{
    abis::IVault,
    error::VaultError,
    worker::reader::{BlockSource, MetadataField, RawPriceReading, VaultReader},
};

/// Timeout for individual RPC calls (30 seconds)
const RPC_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// JSON-RPC access to the chain the vaults live on.
#[derive(Clone)]
pub struct ChainClient {
    provider: DynProvider,
}

impl ChainClient {
    pub fn new(rpc_url: &str) -> Result<Self> {
        let url = Url::parse(rpc_url).context("Invalid RPC URL")?;

        let client = ProviderBuilder::new().connect_http(url);

        Ok(Self {
            provider: DynProvider::new(client),
        })
    }

    fn vault_address(vault: &str, field: &'static str) -> Result<Address, VaultError> {
        vault
            .parse()
            .map_err(|e| VaultError::chain_read(vault, field, format!("invalid address: {}", e)))
    }
}

#[async_trait]
impl VaultReader for ChainClient {
    async fn read_metadata(&self, vault: &str, field: MetadataField) -> Result<String, VaultError> {
        let address = Self::vault_address(vault, field.as_str())?;
        let contract = IVault::new(address, &self.provider);

        let result = match field {
            MetadataField::Name => {
                tokio::time::timeout(RPC_CALL_TIMEOUT, contract.name().call()).await
            },
            MetadataField::Symbol => {
                tokio::time::timeout(RPC_CALL_TIMEOUT, contract.symbol().call()).await
            },
        };

        result
            .map_err(|_| VaultError::chain_read(vault, field.as_str(), "rpc timeout"))?
            .map_err(|e| VaultError::chain_read(vault, field.as_str(), e))
    }

    async fn read_share_price(
        &self,
        vault: &str,
        block_number: u64,
    ) -> Result<RawPriceReading, VaultError> {
        let address = Self::vault_address(vault, "pricePerShare")?;
        let contract = IVault::new(address, &self.provider);
        let block = BlockId::number(block_number);

        let price_call = contract.pricePerShare().block(block);
        let supply_call = contract.totalSupply().block(block);

        let (price, supply) = tokio::join!(
            tokio::time::timeout(RPC_CALL_TIMEOUT, price_call.call()),
            tokio::time::timeout(RPC_CALL_TIMEOUT, supply_call.call()),
        );

        let price_per_share = price
            .map_err(|_| VaultError::chain_read(vault, "pricePerShare", "rpc timeout"))?
            .map_err(|e| VaultError::chain_read(vault, "pricePerShare", e))?;

        let total_supply = supply
            .map_err(|_| VaultError::chain_read(vault, "totalSupply", "rpc timeout"))?
            .map_err(|e| VaultError::chain_read(vault, "totalSupply", e))?;

        Ok(RawPriceReading {
            price_per_share,
            total_supply,
        })
    }
}

#[async_trait]
impl BlockSource for ChainClient {
    async fn latest_block_number(&self) -> Result<u64> {
        tokio::time::timeout(RPC_CALL_TIMEOUT, self.provider.get_block_number())
            .await
            .context("eth_blockNumber timeout")?
            .context("eth_blockNumber failed")
    }

    async fn block_timestamp(&self, block_number: u64) -> Result<i64> {
        let block = tokio::time::timeout(
            RPC_CALL_TIMEOUT,
            self.provider
                .get_block_by_number(BlockNumberOrTag::Number(block_number)),
        )
        .await
        .context("eth_getBlockByNumber timeout")?
        .with_context(|| format!("eth_getBlockByNumber failed for block {}", block_number))?
        .ok_or_else(|| anyhow!("Block {} not found", block_number))?;

        i64::try_from(block.header.timestamp)
            .with_context(|| format!("Block {} timestamp out of range", block_number))
    }
}
