use anyhow::Context;
use std::env;
use std::path::PathBuf;

/// Uniswap V3 QuoterV2 (mainnet).
pub const DEFAULT_QUOTER_ADDRESS: &str = "0x61fFE0149A332c47d847296F720a48855e9cb754";
/// Uniswap V3 SwapRouter (mainnet).
pub const DEFAULT_ROUTER_ADDRESS: &str = "0xE592427A0AEce92De3Edee1F18E0157C05861564";

#[derive(Clone, Debug)]
pub struct Config {
    pub rpc_url: String,
    pub private_key: String,
    pub vault_bytecode: Option<String>,
    pub vault_artifact_path: Option<PathBuf>,
    pub quoter_address: String,
    pub router_address: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let rpc_url = env::var("ETHEREUM_RPC_URL").context("ETHEREUM_RPC_URL must be set")?;
        let private_key = env::var("PRIVATE_KEY").context("PRIVATE_KEY must be set")?;

        Ok(Self {
            rpc_url,
            private_key,
            vault_bytecode: optional_var("VAULT_BYTECODE"),
            vault_artifact_path: optional_var("VAULT_ARTIFACT_PATH").map(PathBuf::from),
            quoter_address: optional_var("UNISWAP_QUOTER_ADDRESS")
                .unwrap_or_else(|| DEFAULT_QUOTER_ADDRESS.into()),
            router_address: optional_var("UNISWAP_ROUTER_ADDRESS")
                .unwrap_or_else(|| DEFAULT_ROUTER_ADDRESS.into()),
        })
    }

    /// Config with mainnet defaults and no vault bytecode.
    pub fn new(rpc_url: impl Into<String>, private_key: impl Into<String>) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            private_key: private_key.into(),
            vault_bytecode: None,
            vault_artifact_path: None,
            quoter_address: DEFAULT_QUOTER_ADDRESS.into(),
            router_address: DEFAULT_ROUTER_ADDRESS.into(),
        }
    }
}

fn optional_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}
