use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct YieldOpportunity {
    pub pool: &'static str,
    pub apy: f64,
    pub tvl: &'static str,
    pub risk: RiskLevel,
}

#[derive(Debug, Clone)]
pub struct Pool {
    pub id: &'static str,
    pub name: &'static str,
}

// Placeholder data; nothing here is read from a contract.
static OPPORTUNITIES: [YieldOpportunity; 4] = [
    YieldOpportunity {
        pool: "eth-staking",
        apy: 12.5,
        tvl: "$45.2M",
        risk: RiskLevel::Low,
    },
    YieldOpportunity {
        pool: "usdc-lending",
        apy: 8.2,
        tvl: "$120.5M",
        risk: RiskLevel::Low,
    },
    YieldOpportunity {
        pool: "eth-usdc-lp",
        apy: 15.8,
        tvl: "$32.1M",
        risk: RiskLevel::Medium,
    },
    YieldOpportunity {
        pool: "wbtc-eth-lp",
        apy: 22.3,
        tvl: "$18.7M",
        risk: RiskLevel::Medium,
    },
];

static POOLS: [Pool; 3] = [
    Pool {
        id: "eth-staking",
        name: "ETH Staking",
    },
    Pool {
        id: "usdc-lending",
        name: "USDC Lending",
    },
    Pool {
        id: "eth-usdc-lp",
        name: "ETH-USDC LP",
    },
];

pub fn opportunities() -> &'static [YieldOpportunity] {
    &OPPORTUNITIES
}

pub fn find_pool(id: &str) -> Option<&'static Pool> {
    POOLS.iter().find(|p| p.id == id)
}

/// Opportunities with `apy >= min_apy`, in table order.
pub fn filter_by_min_apy(
    opportunities: &[YieldOpportunity],
    min_apy: Option<f64>,
) -> Vec<YieldOpportunity> {
    opportunities
        .iter()
        .filter(|o| min_apy.is_none_or(|min| o.apy >= min))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_filter_keeps_everything() {
        assert_eq!(filter_by_min_apy(opportunities(), None).len(), 4);
        assert_eq!(filter_by_min_apy(opportunities(), Some(0.0)).len(), 4);
    }

    #[test]
    fn test_min_apy_is_inclusive() {
        let pools: Vec<&str> = filter_by_min_apy(opportunities(), Some(12.5))
            .iter()
            .map(|o| o.pool)
            .collect();
        assert_eq!(pools, vec!["eth-staking", "eth-usdc-lp", "wbtc-eth-lp"]);

        assert!(filter_by_min_apy(opportunities(), Some(50.0)).is_empty());
    }

    #[test]
    fn test_find_pool() {
        let pool = find_pool("usdc-lending").unwrap();
        assert_eq!(pool.name, "USDC Lending");
        assert!(find_pool("wbtc-eth-lp").is_none());
        assert_eq!(find_pool("eth-usdc-lp").unwrap().name, "ETH-USDC LP");
    }
}
