use crate::error::{KatanaError, Result};
use crate::tokens::{TokenCatalog, TokenDescriptor};
use alloy_primitives::utils::format_units;
use alloy_primitives::{Address, U256};
use futures::future::join_all;
use std::future::Future;
use tracing::{debug, info};

/// Read-only balance queries against some chain backend.
pub trait BalanceSource {
    fn native_balance(&self, wallet: Address) -> impl Future<Output = anyhow::Result<U256>>;

    fn token_balance(
        &self,
        token: Address,
        wallet: Address,
    ) -> impl Future<Output = anyhow::Result<U256>>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct BalanceRecord {
    pub symbol: String,
    pub name: String,
    pub raw: U256,
    pub amount: String,
    pub usd_value: f64,
}

impl BalanceRecord {
    /// Returns `None` for a zero balance; zero holdings are never reported.
    pub fn from_raw(token: &TokenDescriptor, raw: U256) -> Option<Self> {
        if raw.is_zero() {
            return None;
        }

        let amount = format_amount(raw, token.decimals);
        let usd_value = estimate_usd(&amount, token.price_usd);

        Some(BalanceRecord {
            symbol: token.symbol.clone(),
            name: token.name.clone(),
            raw,
            amount,
            usd_value,
        })
    }
}

/// Renders `raw / 10^decimals` without rounding. Trailing zeros are trimmed,
/// keeping at least two fractional digits when the token has them.
pub fn format_amount(raw: U256, decimals: u8) -> String {
    let formatted = match format_units(raw, decimals) {
        Ok(formatted) => formatted,
        Err(_) => return raw.to_string(),
    };
    let (integer, fraction) = formatted
        .split_once('.')
        .unwrap_or((formatted.as_str(), ""));

    let min_fraction = if decimals >= 2 { 2 } else { 0 };
    let mut fraction = fraction.trim_end_matches('0').to_string();
    while fraction.len() < min_fraction {
        fraction.push('0');
    }

    if fraction.is_empty() {
        integer.to_string()
    } else {
        format!("{integer}.{fraction}")
    }
}

fn estimate_usd(amount: &str, price_usd: Option<f64>) -> f64 {
    match price_usd {
        Some(price) => amount.parse::<f64>().unwrap_or(0.0) * price,
        None => 0.0,
    }
}

/// Highest USD value first. Stable, so equal values keep catalog order.
pub fn sort_by_value(records: &mut [BalanceRecord]) {
    records.sort_by(|a, b| b.usd_value.total_cmp(&a.usd_value));
}

pub fn total_value(records: &[BalanceRecord]) -> f64 {
    records.iter().map(|r| r.usd_value).sum()
}

/// Fetches every non-zero holding of `wallet` across the catalog.
///
/// The native balance is queried first and its failure is an error. ERC20
/// balances are then queried concurrently; a token whose call fails is left
/// out of the result.
pub async fn fetch_holdings<S: BalanceSource>(
    source: &S,
    catalog: &TokenCatalog,
    wallet: Address,
) -> Result<Vec<BalanceRecord>> {
    let mut records = Vec::new();

    if let Some(native) = catalog.native() {
        let raw = source
            .native_balance(wallet)
            .await
            .map_err(|e| KatanaError::NativeBalance {
                wallet,
                reason: e.to_string(),
            })?;
        records.extend(BalanceRecord::from_raw(native, raw));
    }

    let tokens: Vec<&TokenDescriptor> = catalog.erc20_tokens().collect();
    let results = join_all(
        tokens
            .iter()
            .map(|token| source.token_balance(token.address, wallet)),
    )
    .await;

    let mut skipped = 0;
    for (token, result) in tokens.into_iter().zip(results) {
        match result {
            Ok(raw) => records.extend(BalanceRecord::from_raw(token, raw)),
            Err(e) => {
                skipped += 1;
                debug!("Skipping {} balance: {}", token.symbol, e);
            }
        }
    }

    sort_by_value(&mut records);
    info!(
        "Found {} non-zero holding(s) for {:?}, {} token query failure(s) skipped",
        records.len(),
        wallet,
        skipped
    );

    Ok(records)
}

/// Single-token lookup. Unlike [`fetch_holdings`], a failed call is reported
/// since the caller asked for this token specifically.
pub async fn fetch_token_holding<S: BalanceSource>(
    source: &S,
    token: &TokenDescriptor,
    wallet: Address,
) -> Result<Option<BalanceRecord>> {
    let raw = if token.is_native() {
        source
            .native_balance(wallet)
            .await
            .map_err(|e| KatanaError::NativeBalance {
                wallet,
                reason: e.to_string(),
            })?
    } else {
        source
            .token_balance(token.address, wallet)
            .await
            .map_err(|e| KatanaError::TokenBalance {
                symbol: token.symbol.clone(),
                reason: e.to_string(),
            })?
    };

    Ok(BalanceRecord::from_raw(token, raw))
}

/// Last known holdings shown when no endpoint can be reached.
pub fn cached_holdings(catalog: &TokenCatalog) -> Vec<BalanceRecord> {
    let cached = [
        ("ETH", U256::from(2_452_100_000_000_000_000u128)),
        ("USDC", U256::from(5_230_000_000u64)),
    ];

    let mut records: Vec<BalanceRecord> = cached
        .iter()
        .filter_map(|(symbol, raw)| {
            catalog
                .find_by_symbol(symbol)
                .and_then(|token| BalanceRecord::from_raw(token, *raw))
        })
        .collect();
    sort_by_value(&mut records);
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;
    use anyhow::anyhow;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Barrier;

    const WALLET: Address = address!("0x00000000000000000000000000000000000000aa");
    const TOKEN_A: Address = address!("0x0000000000000000000000000000000000000a01");
    const TOKEN_B: Address = address!("0x0000000000000000000000000000000000000b02");
    const TOKEN_C: Address = address!("0x0000000000000000000000000000000000000c03");

    /// `None` entries simulate a failing RPC call.
    #[derive(Default)]
    struct MockSource {
        native: Option<U256>,
        tokens: HashMap<Address, Option<U256>>,
        barrier: Option<Arc<Barrier>>,
    }

    impl BalanceSource for MockSource {
        async fn native_balance(&self, _wallet: Address) -> anyhow::Result<U256> {
            self.native.ok_or_else(|| anyhow!("execution reverted"))
        }

        async fn token_balance(&self, token: Address, _wallet: Address) -> anyhow::Result<U256> {
            if let Some(barrier) = &self.barrier {
                barrier.wait().await;
            }
            match self.tokens.get(&token) {
                Some(Some(raw)) => Ok(*raw),
                _ => Err(anyhow!("no contract code at {token:?}")),
            }
        }
    }

    fn catalog() -> TokenCatalog {
        TokenCatalog::new(vec![
            TokenDescriptor::new(Address::ZERO, "ETH", "Ether", 18).with_price(2000.0),
            TokenDescriptor::new(TOKEN_A, "USDC", "USD Coin", 6).with_price(1.0),
            TokenDescriptor::new(TOKEN_B, "DAI", "Dai Stablecoin", 18).with_price(1.0),
            TokenDescriptor::new(TOKEN_C, "KAT", "Katana", 18),
        ])
    }

    fn eth(whole_hundredths: u64) -> U256 {
        U256::from(whole_hundredths) * U256::from(10u64).pow(U256::from(16))
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(eth(245), 18), "2.45");
        assert_eq!(format_amount(U256::from(5_230_000_000u64), 6), "5230.00");
        assert_eq!(format_amount(U256::from(1u64), 18), "0.000000000000000001");
        assert_eq!(format_amount(U256::from(123_456u64), 6), "0.123456");
        assert_eq!(format_amount(U256::from(150u64), 2), "1.50");
        assert_eq!(format_amount(U256::from(15u64), 1), "1.5");
        assert_eq!(format_amount(U256::from(10u64), 1), "1");
        assert_eq!(format_amount(U256::from(42u64), 0), "42");
    }

    #[test]
    fn test_format_amount_does_not_round() {
        assert_eq!(format_amount(U256::from(1_999_999u64), 6), "1.999999");
        assert_eq!(format_amount(U256::MAX, 18).split('.').count(), 2);
    }

    #[test]
    fn test_format_amount_out_of_range_decimals_falls_back_to_raw() {
        assert_eq!(format_amount(U256::from(42u64), 80), "42");
    }

    #[test]
    fn test_zero_balance_has_no_record() {
        let token = TokenDescriptor::new(TOKEN_A, "USDC", "USD Coin", 6).with_price(1.0);
        assert!(BalanceRecord::from_raw(&token, U256::ZERO).is_none());
    }

    #[test]
    fn test_unpriced_token_is_worth_zero() {
        let token = TokenDescriptor::new(TOKEN_C, "KAT", "Katana", 18);
        let record = BalanceRecord::from_raw(&token, eth(100)).unwrap();
        assert_eq!(record.amount, "1.00");
        assert_eq!(record.usd_value, 0.0);
    }

    #[tokio::test]
    async fn test_holdings_sorted_by_usd_value() {
        let source = MockSource {
            native: Some(eth(245)),
            tokens: HashMap::from([(TOKEN_A, Some(U256::from(5_230_000_000u64)))]),
            ..Default::default()
        };

        let records = fetch_holdings(&source, &catalog(), WALLET).await.unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].symbol, "USDC");
        assert_eq!(records[0].amount, "5230.00");
        assert!((records[0].usd_value - 5230.0).abs() < 1e-9);
        assert_eq!(records[1].symbol, "ETH");
        assert_eq!(records[1].amount, "2.45");
        assert!((records[1].usd_value - 4900.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_failed_and_zero_tokens_are_omitted() {
        let source = MockSource {
            native: Some(U256::ZERO),
            tokens: HashMap::from([
                (TOKEN_A, Some(U256::ZERO)),
                (TOKEN_B, None),
                (TOKEN_C, Some(eth(300))),
            ]),
            ..Default::default()
        };

        let records = fetch_holdings(&source, &catalog(), WALLET).await.unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].symbol, "KAT");
        assert_eq!(records[0].usd_value, 0.0);
    }

    #[tokio::test]
    async fn test_unpriced_tokens_sort_last() {
        let source = MockSource {
            native: Some(eth(1)),
            tokens: HashMap::from([
                (TOKEN_A, Some(U256::from(30_000_000u64))),
                (TOKEN_B, Some(eth(150))),
                (TOKEN_C, Some(eth(1_000_000))),
            ]),
            ..Default::default()
        };

        let records = fetch_holdings(&source, &catalog(), WALLET).await.unwrap();

        let symbols: Vec<&str> = records.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["USDC", "ETH", "DAI", "KAT"]);
        for pair in records.windows(2) {
            assert!(pair[0].usd_value >= pair[1].usd_value);
        }
    }

    #[tokio::test]
    async fn test_native_failure_is_reported() {
        let source = MockSource {
            native: None,
            tokens: HashMap::from([(TOKEN_A, Some(U256::from(1_000_000u64)))]),
            ..Default::default()
        };

        let err = fetch_holdings(&source, &catalog(), WALLET)
            .await
            .unwrap_err();

        assert!(matches!(err, KatanaError::NativeBalance { wallet, .. } if wallet == WALLET));
    }

    #[tokio::test]
    async fn test_token_queries_run_concurrently() {
        // Each token call blocks until all three are in flight.
        let source = MockSource {
            native: Some(U256::ZERO),
            tokens: HashMap::from([
                (TOKEN_A, Some(U256::from(1_000_000u64))),
                (TOKEN_B, Some(eth(100))),
                (TOKEN_C, None),
            ]),
            barrier: Some(Arc::new(Barrier::new(3))),
        };

        let records = tokio::time::timeout(
            Duration::from_secs(5),
            fetch_holdings(&source, &catalog(), WALLET),
        )
        .await
        .expect("token queries should not run one at a time")
        .unwrap();

        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn test_single_token_holding() {
        let catalog = catalog();
        let source = MockSource {
            native: Some(eth(245)),
            tokens: HashMap::from([(TOKEN_A, Some(U256::ZERO)), (TOKEN_B, None)]),
            ..Default::default()
        };

        let eth_token = catalog.find_by_symbol("eth").unwrap();
        let record = fetch_token_holding(&source, eth_token, WALLET)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.amount, "2.45");

        let usdc = catalog.find_by_symbol("USDC").unwrap();
        assert!(
            fetch_token_holding(&source, usdc, WALLET)
                .await
                .unwrap()
                .is_none()
        );

        let dai = catalog.find_by_symbol("DAI").unwrap();
        let err = fetch_token_holding(&source, dai, WALLET).await.unwrap_err();
        assert!(matches!(err, KatanaError::TokenBalance { ref symbol, .. } if symbol == "DAI"));
    }

    #[test]
    fn test_cached_holdings() {
        let records = cached_holdings(&TokenCatalog::katana());
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].symbol, "USDC");
        assert_eq!(records[1].symbol, "ETH");
        assert_eq!(records[1].amount, "2.4521");
        assert!((total_value(&records) - (5230.0 + 4904.2)).abs() < 1e-6);
    }
}
