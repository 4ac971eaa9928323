use crate::error::{KatanaError, Result};
use std::time::Duration;

pub const NETWORK_NAME: &str = "Katana";
pub const KATANA_CHAIN_ID: u64 = 747474;
pub const DEFAULT_RPC_URL: &str = "https://rpc.katana.network";
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct Config {
    /// Primary endpoint first, then fallbacks in the order given.
    pub rpc_urls: Vec<String>,
    pub wallet: Option<String>,
    pub probe_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let primary = lookup("KATANA_RPC_URL")
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| DEFAULT_RPC_URL.to_string());

        let mut rpc_urls = vec![primary];
        if let Some(fallbacks) = lookup("KATANA_RPC_FALLBACK_URLS") {
            for url in fallbacks.split(',').map(str::trim).filter(|u| !u.is_empty()) {
                if !rpc_urls.iter().any(|existing| existing == url) {
                    rpc_urls.push(url.to_string());
                }
            }
        }

        let wallet = lookup("KATANA_WALLET")
            .map(|w| w.trim().to_string())
            .filter(|w| !w.is_empty());

        let probe_timeout = match lookup("KATANA_PROBE_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = raw.trim().parse().map_err(|_| {
                    KatanaError::InvalidConfig(format!(
                        "KATANA_PROBE_TIMEOUT_SECS must be a whole number of seconds, got {raw:?}"
                    ))
                })?;
                if secs == 0 {
                    return Err(KatanaError::InvalidConfig(
                        "KATANA_PROBE_TIMEOUT_SECS must be greater than zero".to_string(),
                    ));
                }
                Duration::from_secs(secs)
            }
            None => Duration::from_secs(DEFAULT_PROBE_TIMEOUT_SECS),
        };

        Ok(Config {
            rpc_urls,
            wallet,
            probe_timeout,
        })
    }

    /// The `--wallet` flag wins over `KATANA_WALLET`.
    pub fn resolve_wallet(&self, flag: Option<String>) -> Option<String> {
        flag.filter(|w| !w.trim().is_empty())
            .or_else(|| self.wallet.clone())
    }
}
