use alloy::primitives::TxHash;
use thiserror::Error;

const INSUFFICIENT_FUNDS_PATTERNS: &[&str] = &[
    "insufficient funds",
    "insufficient balance",
    "exceeds balance",
];

const GAS_ESTIMATION_PATTERNS: &[&str] = &[
    "gas required exceeds",
    "cannot estimate gas",
    "failed to estimate gas",
    "intrinsic gas too low",
];

const NETWORK_PATTERNS: &[&str] = &[
    "error sending request",
    "connection refused",
    "connection reset",
    "timed out",
    "dns error",
];

/// Failure reported by an action handler.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("insufficient balance: {0}")]
    InsufficientFunds(String),

    #[error("gas estimation failed: {0}")]
    GasEstimation(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("transaction {0} reverted")]
    Reverted(TxHash),

    #[error(transparent)]
    Other(anyhow::Error),
}

impl ActionError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }
}

impl From<anyhow::Error> for ActionError {
    fn from(err: anyhow::Error) -> Self {
        let err = match err.downcast::<ActionError>() {
            Ok(action_err) => return action_err,
            Err(err) => err,
        };

        let message = format!("{err:#}");
        let lowered = message.to_lowercase();
        let matches_any = |patterns: &[&str]| patterns.iter().any(|p| lowered.contains(p));

        // Transport failures are often wrapped in gas-estimation context, so
        // they are matched first.
        if matches_any(INSUFFICIENT_FUNDS_PATTERNS) {
            Self::InsufficientFunds(message)
        } else if matches_any(NETWORK_PATTERNS) {
            Self::Network(message)
        } else if matches_any(GAS_ESTIMATION_PATTERNS) {
            Self::GasEstimation(message)
        } else {
            Self::Other(err)
        }
    }
}
