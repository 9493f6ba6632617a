pub mod balance;
pub mod deploy_vault;
pub mod trade;
pub mod vault;
pub mod wallet;

use crate::config::Config;
use crate::error::ActionError;
use crate::ethereum::EthereumClient;
use serde_json::{json, Value};

pub use balance::GetBalanceAction;
pub use deploy_vault::DeployVaultAction;
pub use trade::TradeAction;
pub use vault::VaultAction;
pub use wallet::WalletDetailsAction;

/// A named, schema-validated operation exposed to an agent.
#[async_trait::async_trait]
pub trait Action: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    fn schema(&self) -> Value;
    async fn call(&self, client: &EthereumClient, args: Value) -> anyhow::Result<String>;
}

/// Ordered list of the actions offered to the agent, built once at startup.
pub struct ActionRegistry {
    actions: Vec<Box<dyn Action>>,
}

impl ActionRegistry {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            actions: vec![
                Box::new(WalletDetailsAction),
                Box::new(GetBalanceAction),
                Box::new(DeployVaultAction::from_config(config)?),
                Box::new(TradeAction::from_config(config)?),
                Box::new(VaultAction),
            ],
        })
    }

    pub fn get(&self, name: &str) -> Option<&dyn Action> {
        self.actions
            .iter()
            .find(|a| a.name() == name)
            .map(|a| a.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Action> {
        self.actions.iter().map(|a| a.as_ref())
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Tool definitions in the shape agent frameworks expect.
    pub fn definitions(&self) -> Vec<Value> {
        self.iter()
            .map(|a| {
                json!({
                    "name": a.name(),
                    "description": a.description(),
                    "inputSchema": a.schema()
                })
            })
            .collect()
    }
}

/// Turns an execution failure into the `"<context>: <error>"` text returned to
/// the agent. Invalid input is still returned as `Err`.
pub(crate) fn failure_text(context: &str, err: anyhow::Error) -> anyhow::Result<String> {
    match ActionError::from(err) {
        invalid @ ActionError::InvalidInput(_) => Err(invalid.into()),
        classified => Ok(format!("{context}: {classified}")),
    }
}
