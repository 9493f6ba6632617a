use super::{failure_text, Action};
use crate::config::Config;
use crate::contracts::{
    exactInputSingleCall, quoteExactInputSingleCall, ExactInputSingleParams,
    QuoteExactInputSingleParams,
};
use crate::error::ActionError;
use crate::ethereum::EthereumClient;
use crate::units::{format_units, parse_units};
use crate::validation::{
    amount_string, check_percentage, check_positive_amount, optional_decimal, parse_address, parse_args,
    ADDRESS_PATTERN, AMOUNT_PATTERN,
};
use alloy::primitives::{Address, TxHash, U256};
use anyhow::{Context, Result};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use serde_json::{json, Value};
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;

pub const FEE_TIERS: [u32; 4] = [100, 500, 3000, 10000];
pub const DEFAULT_FEE_TIER: u32 = 3000;
pub const DEFAULT_SLIPPAGE: Decimal = dec!(0.5);
pub const MAX_SLIPPAGE: Decimal = dec!(50);
const DEADLINE_SECS: u64 = 20 * 60;
/// Slippage is carried in millionths of the quoted output (0.5% = 5_000).
const PPM_SCALE: u64 = 1_000_000;
const MAX_SLIPPAGE_DECIMALS: u32 = 4;

/// Executes an exact-input token trade through Uniswap V3.
pub struct TradeAction {
    quoter: Address,
    router: Address,
}

#[derive(Debug, Deserialize)]
struct TradeInput {
    from_token: String,
    to_token: String,
    #[serde(deserialize_with = "amount_string")]
    amount: String,
    fee: Option<u32>,
    #[serde(default, deserialize_with = "optional_decimal")]
    slippage_tolerance: Option<Decimal>,
}

#[derive(Debug)]
struct TradeRequest {
    from_token: Address,
    to_token: Address,
    amount: String,
    fee: u32,
    slippage: Decimal,
    slippage_ppm: u64,
}

impl TradeRequest {
    fn from_input(input: TradeInput) -> Result<Self, ActionError> {
        let from_token = parse_address("from_token", &input.from_token)?;
        let to_token = parse_address("to_token", &input.to_token)?;
        if from_token == to_token {
            return Err(ActionError::invalid("from_token and to_token must differ"));
        }

        check_positive_amount("amount", &input.amount)?;

        let fee = input.fee.unwrap_or(DEFAULT_FEE_TIER);
        if !FEE_TIERS.contains(&fee) {
            return Err(ActionError::invalid(format!(
                "fee must be one of {FEE_TIERS:?}, got {fee}"
            )));
        }

        let slippage = check_percentage(
            "slippage_tolerance",
            input.slippage_tolerance.unwrap_or(DEFAULT_SLIPPAGE),
            Decimal::ZERO,
            MAX_SLIPPAGE,
        )?
        .normalize();
        if slippage.scale() > MAX_SLIPPAGE_DECIMALS {
            return Err(ActionError::invalid(format!(
                "slippage_tolerance must have at most {MAX_SLIPPAGE_DECIMALS} decimal places, got {slippage}"
            )));
        }
        let slippage_ppm = (slippage * Decimal::from(10_000))
            .to_u64()
            .ok_or_else(|| ActionError::invalid(format!("invalid slippage_tolerance {slippage}")))?;

        Ok(Self {
            from_token,
            to_token,
            amount: input.amount,
            fee,
            slippage,
            slippage_ppm,
        })
    }
}

struct TradeReceipt {
    amount_in: String,
    from_symbol: String,
    estimated_out: String,
    minimum_out: String,
    to_symbol: String,
    slippage: Decimal,
    approval: Option<TxHash>,
    tx_hash: TxHash,
}

impl std::fmt::Display for TradeReceipt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Traded {} of {} for approximately {} of {}.",
            self.amount_in, self.from_symbol, self.estimated_out, self.to_symbol
        )?;
        writeln!(
            f,
            "Minimum output with {}% slippage: {} {}",
            self.slippage, self.minimum_out, self.to_symbol
        )?;
        if let Some(approval) = self.approval {
            writeln!(f, "Approval transaction hash: {approval}")?;
        }
        write!(f, "Transaction hash for the trade: {}", self.tx_hash)
    }
}

/// `amount_out * (1 - slippage_ppm / 1_000_000)`, rounded down.
fn minimum_output(amount_out: U256, slippage_ppm: u64) -> U256 {
    let keep = U256::from(PPM_SCALE.saturating_sub(slippage_ppm));
    let scale = U256::from(PPM_SCALE);
    match amount_out.checked_mul(keep) {
        Some(scaled) => scaled / scale,
        None => amount_out / scale * keep,
    }
}

impl TradeAction {
    pub fn new(quoter: Address, router: Address) -> Self {
        Self { quoter, router }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let quoter = Address::from_str(&config.quoter_address)
            .context("invalid UNISWAP_QUOTER_ADDRESS")?;
        let router = Address::from_str(&config.router_address)
            .context("invalid UNISWAP_ROUTER_ADDRESS")?;
        Ok(Self::new(quoter, router))
    }

    async fn execute(&self, client: &EthereumClient, req: &TradeRequest) -> Result<TradeReceipt> {
        let from_decimals = client.erc20_decimals(req.from_token).await?;
        let to_decimals = client.erc20_decimals(req.to_token).await?;
        let from_symbol = client.erc20_symbol(req.from_token).await?;
        let to_symbol = client.erc20_symbol(req.to_token).await?;
        let amount_in = parse_units(&req.amount, from_decimals)?;

        let quote = client
            .call(
                self.quoter,
                quoteExactInputSingleCall {
                    params: QuoteExactInputSingleParams {
                        tokenIn: req.from_token,
                        tokenOut: req.to_token,
                        amountIn: amount_in,
                        fee: req.fee,
                        sqrtPriceLimitX96: Default::default(),
                    },
                },
            )
            .await
            .context("failed to quote trade")?;
        let amount_out_min = minimum_output(quote.amountOut, req.slippage_ppm);

        let approval = client
            .ensure_allowance(req.from_token, self.router, amount_in)
            .await?;

        info!(
            from = %req.from_token,
            to = %req.to_token,
            %amount_in,
            %amount_out_min,
            fee = req.fee,
            "submitting trade"
        );
        let receipt = client
            .invoke(
                self.router,
                exactInputSingleCall {
                    params: ExactInputSingleParams {
                        tokenIn: req.from_token,
                        tokenOut: req.to_token,
                        fee: req.fee,
                        recipient: client.signer_address,
                        deadline: U256::from(deadline()?),
                        amountIn: amount_in,
                        amountOutMinimum: amount_out_min,
                        sqrtPriceLimitX96: Default::default(),
                    },
                },
            )
            .await?;

        Ok(TradeReceipt {
            amount_in: req.amount.clone(),
            from_symbol,
            estimated_out: format_units(quote.amountOut, to_decimals),
            minimum_out: format_units(amount_out_min, to_decimals),
            to_symbol,
            slippage: req.slippage,
            approval,
            tx_hash: receipt.transaction_hash,
        })
    }
}

fn deadline() -> Result<u64> {
    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();
    Ok(now + DEADLINE_SECS)
}

#[async_trait::async_trait]
impl Action for TradeAction {
    fn name(&self) -> &'static str {
        "trade"
    }

    fn description(&self) -> &'static str {
        "Trade a specified amount of one ERC20 token for another on Uniswap V3. \
The amount is given in whole units of the token being sold (e.g. 1.5). \
The router is approved for the amount if needed, and the output is protected by \
a slippage tolerance (percent, default 0.5). Only the agent's own wallet trades."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "from_token": {
                    "type": "string",
                    "pattern": ADDRESS_PATTERN,
                    "description": "Address of the token to sell"
                },
                "to_token": {
                    "type": "string",
                    "pattern": ADDRESS_PATTERN,
                    "description": "Address of the token to buy"
                },
                "amount": {
                    "type": "string",
                    "pattern": AMOUNT_PATTERN,
                    "description": "Amount of from_token to sell, in whole units (e.g. 1.5)"
                },
                "fee": {
                    "type": "integer",
                    "enum": FEE_TIERS,
                    "default": DEFAULT_FEE_TIER,
                    "description": "Pool fee tier in hundredths of a basis point"
                },
                "slippage_tolerance": {
                    "type": "number",
                    "minimum": 0,
                    "maximum": 50,
                    "default": 0.5,
                    "description": "Slippage tolerance in percent (e.g. 0.5 for 0.5%)"
                }
            },
            "required": ["from_token", "to_token", "amount"]
        })
    }

    async fn call(&self, client: &EthereumClient, args: Value) -> Result<String> {
        let input: TradeInput = parse_args(args)?;
        let req = TradeRequest::from_input(input)?;

        match self.execute(client, &req).await {
            Ok(receipt) => Ok(receipt.to_string()),
            Err(e) => failure_text("Error trading assets", e),
        }
    }
}
