pub mod balances;
pub mod config;
pub mod erc20;
pub mod error;
pub mod portfolio;
pub mod query;
pub mod rpc;
pub mod tokens;
pub mod yields;
