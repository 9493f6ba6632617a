use super::{failure_text, Action};
use crate::ethereum::EthereumClient;
use crate::units::format_units;
use alloy::primitives::{Address, U256};
use alloy::providers::Provider;
use anyhow::Result;
use serde_json::{json, Value};

pub struct WalletDetailsAction;

#[async_trait::async_trait]
impl Action for WalletDetailsAction {
    fn name(&self) -> &'static str {
        "get_wallet_details"
    }

    fn description(&self) -> &'static str {
        "Get details about the agent's wallet: its address, the connected chain ID, \
the latest block number and the native ETH balance. Takes no inputs."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {},
            "required": []
        })
    }

    async fn call(&self, client: &EthereumClient, _args: Value) -> Result<String> {
        match fetch_details(client).await {
            Ok(details) => Ok(details.to_string()),
            Err(e) => failure_text("Error getting wallet details", e),
        }
    }
}

struct WalletDetails {
    address: Address,
    chain_id: u64,
    block_number: u64,
    balance: U256,
}

impl std::fmt::Display for WalletDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Wallet: {}", self.address)?;
        writeln!(f, "Chain ID: {}", self.chain_id)?;
        writeln!(f, "Latest block: {}", self.block_number)?;
        write!(f, "ETH balance: {} ETH", format_units(self.balance, 18))
    }
}

async fn fetch_details(client: &EthereumClient) -> Result<WalletDetails> {
    let chain_id = client.provider.get_chain_id().await?;
    let block_number = client.provider.get_block_number().await?;
    let balance = client.native_balance(client.signer_address).await?;

    Ok(WalletDetails {
        address: client.signer_address,
        chain_id,
        block_number,
        balance,
    })
}
