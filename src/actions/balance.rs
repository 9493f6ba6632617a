use super::{failure_text, Action};
use crate::ethereum::EthereumClient;
use crate::units::format_units;
use crate::validation::{parse_address, parse_args, parse_optional_address, ADDRESS_PATTERN};
use alloy::primitives::{Address, U256};
use anyhow::Result;
use serde::Deserialize;
use serde_json::{json, Value};

pub struct GetBalanceAction;

#[derive(Debug, Deserialize)]
struct BalanceInput {
    address: Option<String>,
    token_address: Option<String>,
}

#[async_trait::async_trait]
impl Action for GetBalanceAction {
    fn name(&self) -> &'static str {
        "get_balance"
    }

    fn description(&self) -> &'static str {
        "Get the balance of ETH or an ERC20 token for an address. \
Defaults to the agent's own wallet when no address is given."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "address": {
                    "type": "string",
                    "pattern": ADDRESS_PATTERN,
                    "description": "The wallet address to check balance for. Defaults to the agent's wallet."
                },
                "token_address": {
                    "type": "string",
                    "pattern": ADDRESS_PATTERN,
                    "description": "Optional ERC20 token contract address. If omitted, returns ETH balance."
                }
            },
            "required": []
        })
    }

    async fn call(&self, client: &EthereumClient, args: Value) -> Result<String> {
        let input: BalanceInput = parse_args(args)?;
        let address =
            parse_optional_address("address", input.address.as_deref(), client.signer_address)?;
        let token = input
            .token_address
            .as_deref()
            .map(|t| parse_address("token_address", t))
            .transpose()?;

        match fetch_balance(client, address, token).await {
            Ok(line) => Ok(line),
            Err(e) => failure_text(&format!("Error getting balance for {address}"), e),
        }
    }
}

async fn fetch_balance(
    client: &EthereumClient,
    address: Address,
    token: Option<Address>,
) -> Result<String> {
    let (balance, decimals, symbol) = match token {
        Some(token) => {
            let balance = client.erc20_balance(token, address).await?;
            let decimals = client.erc20_decimals(token).await?;
            let symbol = client.erc20_symbol(token).await?;
            (balance, decimals, symbol)
        }
        None => (client.native_balance(address).await?, 18, "ETH".to_string()),
    };

    Ok(balance_summary(address, balance, decimals, &symbol))
}

fn balance_summary(address: Address, balance: U256, decimals: u8, symbol: &str) -> String {
    format!(
        "Balance of {address}: {} {symbol}",
        format_units(balance, decimals)
    )
}
