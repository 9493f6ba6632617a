use alloy::primitives::Address;
use dotenv::dotenv;
use serde_json::json;
use std::env;
use vault_agent_actions::{
    actions::{
        Action, ActionRegistry, DeployVaultAction, GetBalanceAction, TradeAction, VaultAction,
        WalletDetailsAction,
    },
    config::Config,
    error::ActionError,
    ethereum::EthereumClient,
};

const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
const UNREACHABLE_RPC: &str = "http://127.0.0.1:9";

const WETH: &str = "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2";
const USDC: &str = "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48";
// Savings DAI, an ERC-4626 vault on mainnet
const SDAI_VAULT: &str = "0x83F20F44975D03b1b09e64809B757c47f942BEeA";

async fn offline_client() -> EthereumClient {
    EthereumClient::new(UNREACHABLE_RPC, TEST_KEY)
        .await
        .expect("Failed to create Ethereum client")
}

/// Client for the live tests, configured from `ETHEREUM_RPC_URL`/`PRIVATE_KEY`.
async fn live_client() -> EthereumClient {
    dotenv().ok();
    let rpc = env::var("ETHEREUM_RPC_URL").expect("ETHEREUM_RPC_URL must be set");
    let pk = env::var("PRIVATE_KEY").expect("PRIVATE_KEY must be set");
    EthereumClient::new(&rpc, &pk)
        .await
        .expect("Failed to create Ethereum client")
}

fn default_trade() -> TradeAction {
    TradeAction::from_config(&Config::new(UNREACHABLE_RPC, TEST_KEY)).unwrap()
}

#[tokio::test]
async fn test_client_rejects_bad_credentials() {
    assert!(EthereumClient::new(UNREACHABLE_RPC, "not-a-key").await.is_err());
    assert!(EthereumClient::new("not a url", TEST_KEY).await.is_err());
}

#[tokio::test]
async fn test_get_balance_invalid_address_errors() {
    let client = offline_client().await;
    let result = GetBalanceAction
        .call(&client, json!({ "address": "invalid-address" }))
        .await;

    let err = result.expect_err("Expected error for invalid address");
    let action_err = err.downcast_ref::<ActionError>().unwrap();
    assert!(action_err.is_invalid_input());
    assert!(err.to_string().contains("invalid-address"));
}

#[tokio::test]
async fn test_trade_rejects_out_of_bounds_slippage() {
    let client = offline_client().await;
    let result = default_trade()
        .call(
            &client,
            json!({
                "from_token": WETH,
                "to_token": USDC,
                "amount": "1",
                "slippage_tolerance": 51
            }),
        )
        .await;

    let err = result.expect_err("Expected slippage to be rejected");
    assert!(err
        .to_string()
        .contains("slippage_tolerance must be between 0 and 50"));
}

#[tokio::test]
async fn test_trade_reports_network_failure_as_string() {
    let client = offline_client().await;
    let text = default_trade()
        .call(
            &client,
            json!({ "from_token": WETH, "to_token": USDC, "amount": "0.1" }),
        )
        .await
        .unwrap();

    assert!(text.starts_with("Error trading assets: network error"), "{text}");
}

#[tokio::test]
async fn test_trade_rejects_zero_amount_before_any_rpc() {
    let client = offline_client().await;
    let result = default_trade()
        .call(
            &client,
            json!({ "from_token": WETH, "to_token": USDC, "amount": "0" }),
        )
        .await;

    let err = result.expect_err("Expected zero amount to be rejected");
    assert!(err.downcast_ref::<ActionError>().unwrap().is_invalid_input());
    assert!(err.to_string().contains("amount must be greater than zero"));
}

#[tokio::test]
async fn test_vault_rejects_zero_deposit_before_any_rpc() {
    let client = offline_client().await;
    let result = VaultAction
        .call(
            &client,
            json!({ "vault_address": SDAI_VAULT, "operation": "deposit", "amount": 0 }),
        )
        .await;

    let err = result.expect_err("Expected zero deposit to be rejected");
    assert!(err.downcast_ref::<ActionError>().unwrap().is_invalid_input());
}

#[tokio::test]
async fn test_deploy_vault_without_bytecode_fails_with_prefix() {
    let client = offline_client().await;
    let result = DeployVaultAction::new(None)
        .call(
            &client,
            json!({ "asset_address": USDC, "name": "USDC Vault", "symbol": "vUSDC" }),
        )
        .await;

    let err = result.expect_err("Expected missing bytecode to fail");
    let message = err.to_string();
    assert!(message.starts_with("Failed to deploy vault: "), "{message}");
    assert!(message.contains("VAULT_BYTECODE"));
}

#[tokio::test]
async fn test_deploy_vault_rejects_fee_above_bound() {
    let client = offline_client().await;
    let result = DeployVaultAction::new(Some(vec![0x60u8, 0x80].into()))
        .call(
            &client,
            json!({
                "asset_address": USDC,
                "name": "USDC Vault",
                "symbol": "vUSDC",
                "fee_percentage": 25
            }),
        )
        .await;

    let err = result.expect_err("Expected fee to be rejected");
    assert!(err.to_string().contains("fee_percentage must be between 0 and 20"));
}

#[tokio::test]
async fn test_vault_requires_amount_for_deposit() {
    let client = offline_client().await;
    let result = VaultAction
        .call(
            &client,
            json!({ "vault_address": SDAI_VAULT, "operation": "deposit" }),
        )
        .await;

    let err = result.expect_err("Expected missing amount to be rejected");
    assert!(err.to_string().contains("amount is required for deposit"));
}

#[tokio::test]
async fn test_vault_rejects_unknown_operation() {
    let client = offline_client().await;
    let result = VaultAction
        .call(
            &client,
            json!({ "vault_address": SDAI_VAULT, "operation": "burn" }),
        )
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_vault_reports_network_failure_as_string() {
    let client = offline_client().await;
    let text = VaultAction
        .call(
            &client,
            json!({ "vault_address": SDAI_VAULT, "operation": "total_assets" }),
        )
        .await
        .unwrap();

    let vault: Address = SDAI_VAULT.parse().unwrap();
    assert!(
        text.starts_with(&format!("Error performing total_assets on vault {vault}")),
        "{text}"
    );
    assert!(text.contains("network error"), "{text}");
}

#[tokio::test]
async fn test_wallet_details_reports_network_failure_as_string() {
    let client = offline_client().await;
    let text = WalletDetailsAction.call(&client, json!({})).await.unwrap();
    assert!(text.starts_with("Error getting wallet details: network error"), "{text}");
}

#[tokio::test]
async fn test_registry_from_env_style_config() {
    let mut config = Config::new(UNREACHABLE_RPC, TEST_KEY);
    config.vault_bytecode = Some("0x6080604052".into());
    let registry = ActionRegistry::from_config(&config).unwrap();
    assert_eq!(registry.definitions().len(), 5);

    config.vault_bytecode = Some("0xnothex".into());
    assert!(ActionRegistry::from_config(&config).is_err());
}

#[tokio::test]
#[ignore = "requires ETHEREUM_RPC_URL and PRIVATE_KEY"]
async fn test_live_wallet_details() {
    let client = live_client().await;

    let text = WalletDetailsAction.call(&client, json!({})).await.unwrap();
    println!("Wallet details: {}", text);
    assert!(text.contains(&client.signer_address.to_string()));
    assert!(text.contains("Chain ID:"));
}

#[tokio::test]
#[ignore = "requires ETHEREUM_RPC_URL and PRIVATE_KEY"]
async fn test_live_get_erc20_balance_usdc() {
    let client = live_client().await;

    let text = GetBalanceAction
        .call(
            &client,
            json!({
                "address": "0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045",
                "token_address": USDC
            }),
        )
        .await
        .unwrap();
    println!("Vitalik's USDC Balance: {}", text);
    assert!(text.starts_with("Balance of 0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045: "));
}

#[tokio::test]
#[ignore = "requires ETHEREUM_RPC_URL and PRIVATE_KEY"]
async fn test_live_vault_queries() {
    let client = live_client().await;

    for (operation, amount) in [
        ("asset", None),
        ("total_assets", None),
        ("convert_to_shares", Some("100")),
        ("preview_deposit", Some("100")),
    ] {
        let mut args = json!({ "vault_address": SDAI_VAULT, "operation": operation });
        if let Some(amount) = amount {
            args["amount"] = json!(amount);
        }
        let text = VaultAction.call(&client, args).await.unwrap();
        println!("{operation}: {text}");
        assert!(!text.starts_with("Error"), "{operation}: {text}");
    }
}
