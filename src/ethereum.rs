use crate::contracts::IERC20;
use crate::error::ActionError;
use crate::units::checked_decimals;
use alloy::{
    network::{EthereumWallet, TransactionBuilder},
    primitives::{Address, Bytes, TxHash, U256},
    providers::{Provider, ProviderBuilder},
    rpc::types::eth::{TransactionReceipt, TransactionRequest},
    signers::local::PrivateKeySigner,
    sol_types::SolCall,
};
use anyhow::{Context, Result};
use std::str::FromStr;
use tracing::{debug, info};
use url::Url;

#[derive(Clone)]
pub struct EthereumClient {
    pub provider: alloy::providers::RootProvider<
        alloy::transports::http::Http<alloy::transports::http::Client>,
    >,
    pub wallet: EthereumWallet,
    pub signer_address: Address,
}

impl EthereumClient {
    pub async fn new(rpc_url: &str, private_key: &str) -> Result<Self> {
        let signer = PrivateKeySigner::from_str(private_key).context("invalid PRIVATE_KEY")?;
        let signer_address = signer.address();
        let wallet = EthereumWallet::from(signer);

        let url = Url::parse(rpc_url).context("invalid ETHEREUM_RPC_URL")?;
        let provider = ProviderBuilder::new().on_http(url);

        Ok(Self {
            provider,
            wallet,
            signer_address,
        })
    }

    /// Executes a read-only `eth_call` of `call` against `to`.
    pub async fn call<C: SolCall>(&self, to: Address, call: C) -> Result<C::Return> {
        let tx_req = TransactionRequest::default()
            .to(to)
            .from(self.signer_address)
            .input(call.abi_encode().into());

        let result = self.provider.call(&tx_req).await?;
        let decoded = C::abi_decode_returns(&result, true)
            .with_context(|| format!("failed to decode {} result from {to}", C::SIGNATURE))?;
        Ok(decoded)
    }

    /// Sends `call` as a transaction to `to` and waits for the receipt.
    pub async fn invoke<C: SolCall>(&self, to: Address, call: C) -> Result<TransactionReceipt> {
        debug!(contract = %to, method = C::SIGNATURE, "invoking contract");
        let tx = TransactionRequest::default()
            .to(to)
            .input(call.abi_encode().into());
        self.send_transaction(tx).await
    }

    /// Submits a contract-creation transaction and returns the receipt.
    pub async fn deploy(&self, init_code: Bytes) -> Result<TransactionReceipt> {
        let mut tx = TransactionRequest::default();
        tx.set_deploy_code(init_code);
        self.send_transaction(tx).await
    }

    /// Fills nonce, gas and fee fields, signs with the local wallet, submits
    /// the transaction and waits for it to be mined.
    pub async fn send_transaction(&self, mut tx: TransactionRequest) -> Result<TransactionReceipt> {
        tx.set_from(self.signer_address);

        let chain_id = self.provider.get_chain_id().await?;
        let nonce = self
            .provider
            .get_transaction_count(self.signer_address)
            .await?;
        let fees = self.provider.estimate_eip1559_fees(None).await?;
        let gas = self
            .provider
            .estimate_gas(&tx)
            .await
            .context("failed to estimate gas")?;

        tx.set_chain_id(chain_id);
        tx.set_nonce(nonce);
        tx.set_gas_limit(gas * 6 / 5);
        tx.set_max_fee_per_gas(fees.max_fee_per_gas);
        tx.set_max_priority_fee_per_gas(fees.max_priority_fee_per_gas);

        let envelope = tx.build(&self.wallet).await?;
        let pending = self.provider.send_tx_envelope(envelope).await?;
        let tx_hash: TxHash = *pending.tx_hash();
        info!(%tx_hash, nonce, "transaction submitted");

        let receipt = pending.get_receipt().await?;
        if !receipt.status() {
            return Err(ActionError::Reverted(tx_hash).into());
        }
        Ok(receipt)
    }

    pub async fn native_balance(&self, account: Address) -> Result<U256> {
        Ok(self.provider.get_balance(account).await?)
    }

    pub async fn erc20_decimals(&self, token: Address) -> Result<u8> {
        let decimals = self.call(token, IERC20::decimalsCall {}).await?._0;
        checked_decimals(token, decimals)
    }

    pub async fn erc20_symbol(&self, token: Address) -> Result<String> {
        Ok(self.call(token, IERC20::symbolCall {}).await?._0)
    }

    pub async fn erc20_balance(&self, token: Address, account: Address) -> Result<U256> {
        Ok(self
            .call(token, IERC20::balanceOfCall { account })
            .await?
            ._0)
    }

    /// Approves `spender` for `amount` of `token` unless the current allowance
    /// already covers it. A non-zero allowance is reset to zero first, as some
    /// tokens (USDT) reject changing one non-zero allowance to another.
    /// Returns the hash of the last approval sent.
    pub async fn ensure_allowance(
        &self,
        token: Address,
        spender: Address,
        amount: U256,
    ) -> Result<Option<TxHash>> {
        let allowance = self
            .call(
                token,
                IERC20::allowanceCall {
                    owner: self.signer_address,
                    spender,
                },
            )
            .await?
            ._0;

        let mut last = None;
        for amount in approval_amounts(allowance, amount) {
            info!(%token, %spender, %amount, "approving token spend");
            let receipt = self
                .invoke(token, IERC20::approveCall { spender, amount })
                .await?;
            last = Some(receipt.transaction_hash);
        }
        Ok(last)
    }
}

/// Approvals needed to raise an allowance from `current` to `required`.
fn approval_amounts(current: U256, required: U256) -> Vec<U256> {
    if current >= required {
        Vec::new()
    } else if current.is_zero() {
        vec![required]
    } else {
        vec![U256::ZERO, required]
    }
}
