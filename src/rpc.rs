use crate::balances::BalanceSource;
use crate::erc20::IERC20;
use crate::error::{KatanaError, Result};
use alloy::providers::fillers::FillProvider;
use alloy::providers::{Provider, ProviderBuilder};
use alloy_primitives::{Address, U256};
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

type AlloyFullProvider = FillProvider<
    alloy::providers::fillers::JoinFill<
        alloy::providers::Identity,
        alloy::providers::fillers::JoinFill<
            alloy::providers::fillers::GasFiller,
            alloy::providers::fillers::JoinFill<
                alloy::providers::fillers::BlobGasFiller,
                alloy::providers::fillers::JoinFill<
                    alloy::providers::fillers::NonceFiller,
                    alloy::providers::fillers::ChainIdFiller,
                >,
            >,
        >,
    >,
    alloy::providers::RootProvider,
>;

/// An endpoint that answered its liveness probe.
#[derive(Debug)]
pub struct LiveEndpoint<T> {
    pub url: String,
    pub value: T,
}

/// Tries each candidate once, in order, and returns the first whose probe
/// succeeds within `probe_timeout`. Individual failures are logged and skipped.
pub async fn probe_endpoints<T, F, Fut>(
    rpc_urls: &[String],
    probe_timeout: Duration,
    mut probe: F,
) -> Result<LiveEndpoint<T>>
where
    F: FnMut(&str) -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    if rpc_urls.is_empty() {
        return Err(KatanaError::NoEndpoints);
    }

    for url in rpc_urls {
        debug!("Probing RPC endpoint {}", url);
        match timeout(probe_timeout, probe(url)).await {
            Ok(Ok(value)) => {
                return Ok(LiveEndpoint {
                    url: url.clone(),
                    value,
                });
            }
            Ok(Err(e)) => {
                warn!("RPC error on {}: {}, trying next endpoint", url, e);
            }
            Err(_) => {
                warn!(
                    "Liveness probe timeout after {} seconds on {}, trying next endpoint",
                    probe_timeout.as_secs_f64(),
                    url
                );
            }
        }
    }

    Err(KatanaError::Unreachable {
        attempted: rpc_urls.len(),
    })
}

/// Token metadata as reported by the contract itself.
#[derive(Debug, Clone, Default)]
pub struct OnChainMetadata {
    pub symbol: Option<String>,
    pub decimals: Option<u8>,
}

/// Read-only connection to the first reachable node.
#[derive(Clone)]
pub struct RpcClient {
    provider: AlloyFullProvider,
    url: String,
    probed_block: u64,
}

impl RpcClient {
    pub async fn connect(rpc_urls: &[String], probe_timeout: Duration) -> Result<Self> {
        let live = probe_endpoints(rpc_urls, probe_timeout, |url| {
            let url = url.to_string();
            async move {
                let parsed_url = url
                    .parse()
                    .map_err(|_| anyhow::anyhow!("Invalid RPC URL: {}", url))?;
                let provider: AlloyFullProvider = ProviderBuilder::new().connect_http(parsed_url);
                let block_number = provider.get_block_number().await?;
                Ok((provider, block_number))
            }
        })
        .await?;

        let (provider, probed_block) = live.value;
        info!("Connected to {} at block {}", live.url, probed_block);

        Ok(RpcClient {
            provider,
            url: live.url,
            probed_block,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Block height seen by the liveness probe.
    pub fn probed_block(&self) -> u64 {
        self.probed_block
    }

    pub async fn chain_id(&self) -> anyhow::Result<u64> {
        Ok(self.provider.get_chain_id().await?)
    }

    pub async fn latest_block(&self) -> anyhow::Result<u64> {
        Ok(self.provider.get_block_number().await?)
    }

    pub async fn token_metadata(&self, token: Address) -> OnChainMetadata {
        let contract = IERC20::new(token, &self.provider);

        let symbol = match contract.symbol().call().await {
            Ok(symbol) => Some(symbol),
            Err(e) => {
                warn!("Failed to fetch token symbol for {:?}: {}", token, e);
                None
            }
        };

        let decimals = match contract.decimals().call().await {
            Ok(decimals) => Some(decimals),
            Err(e) => {
                warn!("Failed to fetch token decimals for {:?}: {}", token, e);
                None
            }
        };

        OnChainMetadata { symbol, decimals }
    }
}

impl BalanceSource for RpcClient {
    async fn native_balance(&self, wallet: Address) -> anyhow::Result<U256> {
        Ok(self.provider.get_balance(wallet).await?)
    }

    async fn token_balance(&self, token: Address, wallet: Address) -> anyhow::Result<U256> {
        let contract = IERC20::new(token, &self.provider);
        Ok(contract.balanceOf(wallet).call().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn urls(list: &[&str]) -> Vec<String> {
        list.iter().map(|u| u.to_string()).collect()
    }

    #[tokio::test]
    async fn test_first_live_endpoint_wins() {
        let probed = RefCell::new(Vec::new());
        let candidates = urls(&["http://down", "http://up", "http://also-up"]);

        let live = probe_endpoints(&candidates, Duration::from_secs(1), |url| {
            probed.borrow_mut().push(url.to_string());
            let up = url.contains("up");
            async move {
                if up {
                    Ok(7u64)
                } else {
                    Err(anyhow::anyhow!("connection refused"))
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(live.url, "http://up");
        assert_eq!(live.value, 7);
        assert_eq!(*probed.borrow(), urls(&["http://down", "http://up"]));
    }

    #[tokio::test]
    async fn test_hanging_endpoint_times_out() {
        let candidates = urls(&["http://hangs", "http://fast"]);

        let live = probe_endpoints(&candidates, Duration::from_millis(50), |url| {
            let hangs = url.contains("hangs");
            async move {
                if hangs {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                }
                Ok(if hangs { "hangs" } else { "fast" })
            }
        })
        .await
        .unwrap();

        assert_eq!(live.url, "http://fast");
        assert_eq!(live.value, "fast");
    }

    #[tokio::test]
    async fn test_all_endpoints_down() {
        let candidates = urls(&["http://a", "http://b"]);

        let err = probe_endpoints(&candidates, Duration::from_secs(1), |_| async {
            Err::<(), _>(anyhow::anyhow!("malformed response"))
        })
        .await
        .unwrap_err();

        assert!(matches!(err, KatanaError::Unreachable { attempted: 2 }));
    }

    #[tokio::test]
    async fn test_no_endpoints() {
        let err = probe_endpoints(&[], Duration::from_secs(1), |_| async { Ok(()) })
            .await
            .unwrap_err();
        assert!(matches!(err, KatanaError::NoEndpoints));
    }

    #[tokio::test]
    async fn test_connect_rejects_unparseable_urls() {
        let err = RpcClient::connect(&urls(&["not a url", "::"]), Duration::from_secs(1))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, KatanaError::Unreachable { attempted: 2 }));
    }
}
