use super::{failure_text, Action};
use crate::contracts::{IERC20, IERC4626};
use crate::error::ActionError;
use crate::ethereum::EthereumClient;
use crate::units::{checked_decimals, format_units, parse_units};
use crate::validation::{
    check_amount, check_positive_amount, optional_amount_string, parse_address, parse_args,
    parse_optional_address, ADDRESS_PATTERN, AMOUNT_PATTERN,
};
use alloy::primitives::{Address, TxHash, U256};
use anyhow::Result;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

/// Operations supported against an ERC-4626 vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VaultOperation {
    Deposit,
    Mint,
    Withdraw,
    Redeem,
    Approve,
    Asset,
    TotalAssets,
    BalanceOf,
    ConvertToShares,
    ConvertToAssets,
    PreviewDeposit,
    MaxWithdraw,
}

impl VaultOperation {
    pub const ALL: [VaultOperation; 12] = [
        Self::Deposit,
        Self::Mint,
        Self::Withdraw,
        Self::Redeem,
        Self::Approve,
        Self::Asset,
        Self::TotalAssets,
        Self::BalanceOf,
        Self::ConvertToShares,
        Self::ConvertToAssets,
        Self::PreviewDeposit,
        Self::MaxWithdraw,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::Mint => "mint",
            Self::Withdraw => "withdraw",
            Self::Redeem => "redeem",
            Self::Approve => "approve",
            Self::Asset => "asset",
            Self::TotalAssets => "total_assets",
            Self::BalanceOf => "balance_of",
            Self::ConvertToShares => "convert_to_shares",
            Self::ConvertToAssets => "convert_to_assets",
            Self::PreviewDeposit => "preview_deposit",
            Self::MaxWithdraw => "max_withdraw",
        }
    }

    /// Unit the `amount` input is expressed in, if the operation takes one.
    fn amount_unit(self) -> Option<AmountUnit> {
        match self {
            Self::Deposit
            | Self::Withdraw
            | Self::Approve
            | Self::ConvertToShares
            | Self::PreviewDeposit => Some(AmountUnit::Assets),
            Self::Mint | Self::Redeem | Self::ConvertToAssets => Some(AmountUnit::Shares),
            Self::Asset | Self::TotalAssets | Self::BalanceOf | Self::MaxWithdraw => None,
        }
    }

    fn is_transaction(self) -> bool {
        matches!(
            self,
            Self::Deposit | Self::Mint | Self::Withdraw | Self::Redeem | Self::Approve
        )
    }

    /// Moves tokens, so a zero amount is a mistake rather than a no-op.
    fn moves_funds(self) -> bool {
        matches!(
            self,
            Self::Deposit | Self::Mint | Self::Withdraw | Self::Redeem
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AmountUnit {
    Assets,
    Shares,
}

#[derive(Debug, Deserialize)]
struct VaultInput {
    vault_address: String,
    operation: VaultOperation,
    #[serde(default, deserialize_with = "optional_amount_string")]
    amount: Option<String>,
    receiver: Option<String>,
    owner: Option<String>,
    account: Option<String>,
}

#[derive(Debug)]
struct VaultRequest {
    vault: Address,
    operation: VaultOperation,
    amount: Option<String>,
    receiver: Address,
    owner: Address,
    account: Address,
}

impl VaultRequest {
    fn from_input(input: VaultInput, signer: Address) -> Result<Self, ActionError> {
        let vault = parse_address("vault_address", &input.vault_address)?;
        if input.operation.amount_unit().is_some() && input.amount.is_none() {
            return Err(ActionError::invalid(format!(
                "amount is required for {}",
                input.operation.as_str()
            )));
        }
        if let Some(amount) = &input.amount {
            if input.operation.moves_funds() {
                check_positive_amount("amount", amount)?;
            } else {
                check_amount("amount", amount)?;
            }
        }

        Ok(Self {
            vault,
            operation: input.operation,
            amount: input.amount,
            receiver: parse_optional_address("receiver", input.receiver.as_deref(), signer)?,
            owner: parse_optional_address("owner", input.owner.as_deref(), signer)?,
            account: parse_optional_address("account", input.account.as_deref(), signer)?,
        })
    }
}

/// Vault token metadata needed to convert and render amounts.
struct VaultTokens {
    asset: Address,
    asset_symbol: String,
    asset_decimals: u8,
    share_decimals: u8,
}

impl VaultTokens {
    async fn load(client: &EthereumClient, vault: Address) -> Result<Self> {
        let asset = client.call(vault, IERC4626::assetCall {}).await?._0;
        let asset_symbol = client.erc20_symbol(asset).await?;
        let asset_decimals = client.erc20_decimals(asset).await?;
        let share_decimals =
            checked_decimals(vault, client.call(vault, IERC4626::decimalsCall {}).await?._0)?;
        Ok(Self {
            asset,
            asset_symbol,
            asset_decimals,
            share_decimals,
        })
    }

    fn assets(&self, value: U256) -> String {
        format!("{} {}", format_units(value, self.asset_decimals), self.asset_symbol)
    }

    fn shares(&self, value: U256) -> String {
        format!("{} shares", format_units(value, self.share_decimals))
    }

    fn parse(&self, amount: &str, unit: AmountUnit) -> Result<U256> {
        let decimals = match unit {
            AmountUnit::Assets => self.asset_decimals,
            AmountUnit::Shares => self.share_decimals,
        };
        parse_units(amount, decimals)
    }
}

fn transaction_line(summary: String, tx_hash: TxHash) -> String {
    format!("{summary}\nTransaction hash: {tx_hash}")
}

/// Human-readable outcome of `req`. `amount` is the parsed input amount and
/// `result` the value returned by a read operation.
fn summary(req: &VaultRequest, tokens: &VaultTokens, amount: U256, result: U256) -> String {
    let vault = req.vault;
    match req.operation {
        VaultOperation::Deposit => format!(
            "Deposited {} into vault {vault} for {}.",
            tokens.assets(amount),
            req.receiver
        ),
        VaultOperation::Mint => format!(
            "Minted {} of vault {vault} for {}.",
            tokens.shares(amount),
            req.receiver
        ),
        VaultOperation::Withdraw => format!(
            "Withdrew {} from vault {vault} to {} on behalf of {}.",
            tokens.assets(amount),
            req.receiver,
            req.owner
        ),
        VaultOperation::Redeem => format!(
            "Redeemed {} of vault {vault} to {} on behalf of {}.",
            tokens.shares(amount),
            req.receiver,
            req.owner
        ),
        VaultOperation::Approve => format!(
            "Approved vault {vault} to spend {}.",
            tokens.assets(amount)
        ),
        VaultOperation::Asset => format!(
            "Vault {vault} holds {} ({}) with {} decimals; shares use {} decimals.",
            tokens.asset_symbol, tokens.asset, tokens.asset_decimals, tokens.share_decimals
        ),
        VaultOperation::TotalAssets => {
            format!("Vault {vault} manages {}.", tokens.assets(result))
        }
        VaultOperation::BalanceOf => format!(
            "{} holds {} of vault {vault}.",
            req.account,
            tokens.shares(result)
        ),
        VaultOperation::ConvertToShares => format!(
            "{} converts to {} in vault {vault}.",
            tokens.assets(amount),
            tokens.shares(result)
        ),
        VaultOperation::ConvertToAssets => format!(
            "{} converts to {} in vault {vault}.",
            tokens.shares(amount),
            tokens.assets(result)
        ),
        VaultOperation::PreviewDeposit => format!(
            "Depositing {} into vault {vault} would mint {}.",
            tokens.assets(amount),
            tokens.shares(result)
        ),
        VaultOperation::MaxWithdraw => format!(
            "{} can withdraw at most {} from vault {vault}.",
            req.owner,
            tokens.assets(result)
        ),
    }
}

/// Queries and transacts with ERC-4626 vaults.
pub struct VaultAction;

impl VaultAction {
    async fn execute(&self, client: &EthereumClient, req: &VaultRequest) -> Result<String> {
        let tokens = VaultTokens::load(client, req.vault).await?;
        let vault = req.vault;
        let amount = match (req.operation.amount_unit(), req.amount.as_deref()) {
            (Some(unit), Some(raw)) => tokens.parse(raw, unit)?,
            _ => U256::ZERO,
        };

        if req.operation.is_transaction() {
            info!(%vault, operation = req.operation.as_str(), %amount, "vault transaction");
        }

        let (result, receipt) = match req.operation {
            VaultOperation::Deposit => {
                let call = IERC4626::depositCall {
                    assets: amount,
                    receiver: req.receiver,
                };
                (U256::ZERO, Some(client.invoke(vault, call).await?))
            }
            VaultOperation::Mint => {
                let call = IERC4626::mintCall {
                    shares: amount,
                    receiver: req.receiver,
                };
                (U256::ZERO, Some(client.invoke(vault, call).await?))
            }
            VaultOperation::Withdraw => {
                let call = IERC4626::withdrawCall {
                    assets: amount,
                    receiver: req.receiver,
                    owner: req.owner,
                };
                (U256::ZERO, Some(client.invoke(vault, call).await?))
            }
            VaultOperation::Redeem => {
                let call = IERC4626::redeemCall {
                    shares: amount,
                    receiver: req.receiver,
                    owner: req.owner,
                };
                (U256::ZERO, Some(client.invoke(vault, call).await?))
            }
            VaultOperation::Approve => {
                let call = IERC20::approveCall {
                    spender: vault,
                    amount,
                };
                (U256::ZERO, Some(client.invoke(tokens.asset, call).await?))
            }
            VaultOperation::Asset => (U256::ZERO, None),
            VaultOperation::TotalAssets => {
                let total = client.call(vault, IERC4626::totalAssetsCall {}).await?._0;
                (total, None)
            }
            VaultOperation::BalanceOf => {
                let call = IERC4626::balanceOfCall {
                    account: req.account,
                };
                (client.call(vault, call).await?._0, None)
            }
            VaultOperation::ConvertToShares => {
                let call = IERC4626::convertToSharesCall { assets: amount };
                (client.call(vault, call).await?._0, None)
            }
            VaultOperation::ConvertToAssets => {
                let call = IERC4626::convertToAssetsCall { shares: amount };
                (client.call(vault, call).await?._0, None)
            }
            VaultOperation::PreviewDeposit => {
                let call = IERC4626::previewDepositCall { assets: amount };
                (client.call(vault, call).await?._0, None)
            }
            VaultOperation::MaxWithdraw => {
                let call = IERC4626::maxWithdrawCall { owner: req.owner };
                (client.call(vault, call).await?._0, None)
            }
        };

        let text = summary(req, &tokens, amount, result);
        Ok(match receipt {
            Some(receipt) => transaction_line(text, receipt.transaction_hash),
            None => text,
        })
    }
}

#[async_trait::async_trait]
impl Action for VaultAction {
    fn name(&self) -> &'static str {
        "interact_with_vault"
    }

    fn description(&self) -> &'static str {
        "Query or transact with an ERC-4626 vault. Operations: \
deposit (assets), mint (shares), withdraw (assets), redeem (shares), \
approve (lets the vault pull the underlying asset; do this before deposit or mint), \
asset, total_assets, balance_of (shares held by account), convert_to_shares (assets), \
convert_to_assets (shares), preview_deposit (assets) and max_withdraw (owner). \
Amounts are whole units, e.g. 10.5. Receiver, owner and account default to the agent's wallet."
    }

    fn schema(&self) -> Value {
        let operations: Vec<&str> = VaultOperation::ALL.iter().map(|op| op.as_str()).collect();
        json!({
            "type": "object",
            "properties": {
                "vault_address": {
                    "type": "string",
                    "pattern": ADDRESS_PATTERN,
                    "description": "Address of the ERC-4626 vault"
                },
                "operation": {
                    "type": "string",
                    "enum": operations,
                    "description": "Operation to perform on the vault"
                },
                "amount": {
                    "type": "string",
                    "pattern": AMOUNT_PATTERN,
                    "description": "Amount of assets or shares, in whole units. Required for operations that take an amount."
                },
                "receiver": {
                    "type": "string",
                    "pattern": ADDRESS_PATTERN,
                    "description": "Receiver for deposit, mint, withdraw and redeem"
                },
                "owner": {
                    "type": "string",
                    "pattern": ADDRESS_PATTERN,
                    "description": "Share owner for withdraw, redeem and max_withdraw"
                },
                "account": {
                    "type": "string",
                    "pattern": ADDRESS_PATTERN,
                    "description": "Account to check for balance_of"
                }
            },
            "required": ["vault_address", "operation"]
        })
    }

    async fn call(&self, client: &EthereumClient, args: Value) -> Result<String> {
        let input: VaultInput = parse_args(args)?;
        let req = VaultRequest::from_input(input, client.signer_address)?;

        match self.execute(client, &req).await {
            Ok(text) => Ok(text),
            Err(e) => failure_text(
                &format!(
                    "Error performing {} on vault {}",
                    req.operation.as_str(),
                    req.vault
                ),
                e,
            ),
        }
    }
}
