use super::Action;
use crate::config::Config;
use crate::error::ActionError;
use crate::ethereum::EthereumClient;
use crate::validation::{
    check_not_blank, check_percentage, optional_decimal, parse_address, parse_args,
    parse_optional_address, ADDRESS_PATTERN,
};
use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::sol_types::SolValue;
use anyhow::{Context, Result};
use regex::Regex;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::LazyLock;
use tracing::info;

pub const MAX_FEE_PERCENTAGE: Decimal = dec!(20);
const SYMBOL_PATTERN: &str = "^[A-Za-z0-9]{1,11}$";
const MAX_NAME_LEN: usize = 64;

static SYMBOL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(SYMBOL_PATTERN).expect("valid symbol regex"));

/// Deploys an ERC-4626 vault from preconfigured creation bytecode.
pub struct DeployVaultAction {
    bytecode: Option<Bytes>,
}

#[derive(Debug, Deserialize)]
struct DeployVaultInput {
    asset_address: String,
    name: String,
    symbol: String,
    #[serde(default, deserialize_with = "optional_decimal")]
    fee_percentage: Option<Decimal>,
    fee_recipient: Option<String>,
}

#[derive(Debug, PartialEq)]
struct VaultParams {
    asset: Address,
    name: String,
    symbol: String,
    fee_percentage: Decimal,
    fee_recipient: Address,
}

impl VaultParams {
    fn from_input(input: DeployVaultInput, signer: Address) -> Result<Self, ActionError> {
        let asset = parse_address("asset_address", &input.asset_address)?;

        check_not_blank("name", &input.name)?;
        if input.name.chars().count() > MAX_NAME_LEN {
            return Err(ActionError::invalid(format!(
                "name must be at most {MAX_NAME_LEN} characters"
            )));
        }
        if !SYMBOL_RE.is_match(&input.symbol) {
            return Err(ActionError::invalid(format!(
                "symbol must be 1 to 11 alphanumeric characters, got '{}'",
                input.symbol
            )));
        }

        let fee_percentage = check_percentage(
            "fee_percentage",
            input.fee_percentage.unwrap_or(Decimal::ZERO),
            Decimal::ZERO,
            MAX_FEE_PERCENTAGE,
        )?;
        if fee_percentage.normalize().scale() > 2 {
            return Err(ActionError::invalid(
                "fee_percentage supports at most two decimal places",
            ));
        }
        let fee_recipient =
            parse_optional_address("fee_recipient", input.fee_recipient.as_deref(), signer)?;

        Ok(Self {
            asset,
            name: input.name,
            symbol: input.symbol,
            fee_percentage,
            fee_recipient,
        })
    }

    fn fee_basis_points(&self) -> u64 {
        (self.fee_percentage * dec!(100)).to_u64().unwrap_or_default()
    }

    /// Creation bytecode followed by the ABI-encoded constructor arguments.
    fn init_code(&self, bytecode: &Bytes) -> Bytes {
        let args = (
            self.asset,
            self.name.clone(),
            self.symbol.clone(),
            self.fee_recipient,
            U256::from(self.fee_basis_points()),
        )
            .abi_encode_params();
        let mut code = bytecode.to_vec();
        code.extend_from_slice(&args);
        code.into()
    }
}

impl DeployVaultAction {
    pub fn new(bytecode: Option<Bytes>) -> Self {
        Self { bytecode }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let bytecode = match (&config.vault_bytecode, &config.vault_artifact_path) {
            (Some(hex_code), _) => {
                Some(decode_bytecode(hex_code).context("invalid VAULT_BYTECODE")?)
            }
            (None, Some(path)) => Some(load_artifact(path)?),
            (None, None) => None,
        };
        Ok(Self::new(bytecode))
    }

    async fn deploy(&self, client: &EthereumClient, params: &VaultParams) -> Result<String> {
        let bytecode = self.bytecode.as_ref().ok_or_else(|| {
            ActionError::Config(
                "no vault bytecode configured; set VAULT_BYTECODE or VAULT_ARTIFACT_PATH".into(),
            )
        })?;

        info!(asset = %params.asset, name = %params.name, symbol = %params.symbol, "deploying vault");
        let receipt = client.deploy(params.init_code(bytecode)).await?;
        let address = receipt
            .contract_address
            .context("deployment receipt has no contract address")?;

        Ok(deployment_summary(params, address, receipt.transaction_hash))
    }
}

fn deployment_summary(params: &VaultParams, address: Address, tx_hash: TxHash) -> String {
    format!(
        "Deployed ERC-4626 vault {} ({}) for asset {} at {address}.\n\
Fee: {}% to {}\n\
Transaction hash: {tx_hash}",
        params.name, params.symbol, params.asset, params.fee_percentage, params.fee_recipient
    )
}

fn decode_bytecode(raw: &str) -> Result<Bytes> {
    let trimmed = raw.trim();
    let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    let code = hex::decode(digits)?;
    anyhow::ensure!(!code.is_empty(), "bytecode is empty");
    Ok(code.into())
}

/// Reads creation bytecode from a Foundry or Hardhat build artifact.
fn load_artifact(path: &Path) -> Result<Bytes> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read vault artifact {}", path.display()))?;
    let artifact: Value = serde_json::from_str(&raw)
        .with_context(|| format!("vault artifact {} is not valid JSON", path.display()))?;

    let bytecode = match &artifact["bytecode"] {
        Value::String(code) => code.as_str(),
        Value::Object(obj) => obj
            .get("object")
            .and_then(Value::as_str)
            .context("artifact bytecode object has no 'object' field")?,
        _ => anyhow::bail!("vault artifact {} has no bytecode", path.display()),
    };
    decode_bytecode(bytecode).with_context(|| format!("invalid bytecode in {}", path.display()))
}

#[async_trait::async_trait]
impl Action for DeployVaultAction {
    fn name(&self) -> &'static str {
        "deploy_erc4626_vault"
    }

    fn description(&self) -> &'static str {
        "Deploy an ERC-4626 tokenized vault for an underlying ERC20 asset. \
Inputs: the asset token address, the vault share name and symbol, an optional fee \
percentage (0 to 20, charged by the vault) and an optional fee recipient \
(defaults to the agent's wallet). Returns the deployed vault address and transaction hash."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "asset_address": {
                    "type": "string",
                    "pattern": ADDRESS_PATTERN,
                    "description": "Address of the underlying ERC20 asset"
                },
                "name": {
                    "type": "string",
                    "minLength": 1,
                    "maxLength": MAX_NAME_LEN,
                    "description": "Name of the vault share token"
                },
                "symbol": {
                    "type": "string",
                    "pattern": SYMBOL_PATTERN,
                    "description": "Symbol of the vault share token"
                },
                "fee_percentage": {
                    "type": "number",
                    "minimum": 0,
                    "maximum": 20,
                    "default": 0,
                    "description": "Vault fee in percent, e.g. 0.5 for 0.5%"
                },
                "fee_recipient": {
                    "type": "string",
                    "pattern": ADDRESS_PATTERN,
                    "description": "Address receiving vault fees. Defaults to the agent's wallet."
                }
            },
            "required": ["asset_address", "name", "symbol"]
        })
    }

    async fn call(&self, client: &EthereumClient, args: Value) -> Result<String> {
        let input: DeployVaultInput = parse_args(args)?;
        let params = VaultParams::from_input(input, client.signer_address)?;

        self.deploy(client, &params)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to deploy vault: {}", ActionError::from(e)))
    }
}
