use crate::balances::{BalanceRecord, total_value};
use crate::yields::find_pool;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Position {
    pub pool: &'static str,
    pub deposited_usd: f64,
    pub apy: f64,
    pub earned_usd: f64,
}

impl Position {
    pub fn pool_name(&self) -> &'static str {
        find_pool(self.pool).map_or(self.pool, |p| p.name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioSummary {
    /// `None` when the wallet's balances could not be fetched.
    pub wallet_value: Option<f64>,
    pub staked_value: f64,
    pub pending_rewards: f64,
    pub total_value: f64,
}

impl PortfolioSummary {
    pub fn new(holdings: Option<&[BalanceRecord]>, positions: &[Position]) -> Self {
        let wallet_value = holdings.map(total_value);
        let staked_value = positions.iter().map(|p| p.deposited_usd).sum();
        let pending_rewards = positions.iter().map(|p| p.earned_usd).sum();

        PortfolioSummary {
            wallet_value,
            staked_value,
            pending_rewards,
            total_value: wallet_value.unwrap_or(0.0) + staked_value + pending_rewards,
        }
    }
}

/// Placeholder positions until staking contracts are wired in.
pub fn placeholder_positions() -> Vec<Position> {
    vec![
        Position {
            pool: "eth-staking",
            deposited_usd: 2000.0,
            apy: 12.5,
            earned_usd: 42.35,
        },
        Position {
            pool: "usdc-lending",
            deposited_usd: 3500.0,
            apy: 8.2,
            earned_usd: 28.70,
        },
    ]
}
