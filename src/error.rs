use alloy_primitives::Address;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KatanaError {
    #[error("At least one RPC URL must be provided")]
    NoEndpoints,

    #[error("All {attempted} RPC endpoint(s) failed the liveness probe")]
    Unreachable { attempted: usize },

    #[error("Failed to fetch native balance for {wallet:?}: {reason}")]
    NativeBalance { wallet: Address, reason: String },

    #[error("Failed to fetch {symbol} balance: {reason}")]
    TokenBalance { symbol: String, reason: String },

    #[error("Token {0} not found")]
    UnknownToken(String),

    #[error("Invalid address format: {0}")]
    InvalidWallet(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T, E = KatanaError> = std::result::Result<T, E>;
