use crate::balances::{BalanceRecord, cached_holdings, fetch_holdings, fetch_token_holding};
use crate::config::{Config, KATANA_CHAIN_ID, NETWORK_NAME};
use crate::error::KatanaError;
use crate::portfolio::{PortfolioSummary, Position, placeholder_positions};
use crate::query::formatters::{
    OutputFormat, format_holdings, format_network_info, format_portfolio_json, format_positions,
    format_summary, format_token_checks, format_token_holding, format_yields,
};
use crate::rpc::{OnChainMetadata, RpcClient};
use crate::tokens::{TokenCatalog, TokenDescriptor};
use crate::yields::{filter_by_min_apy, opportunities};
use alloy_primitives::Address;
use anyhow::Result;
use futures::future::join_all;
use std::str::FromStr;
use tracing::{info, warn};

pub const NO_WALLET_MESSAGE: &str = "No wallet configured. Set KATANA_WALLET env var.";

#[derive(Debug, Clone)]
pub struct NetworkInfo {
    pub network: &'static str,
    pub expected_chain_id: u64,
    pub endpoint: Option<String>,
    pub chain_id: Option<u64>,
    pub latest_block: Option<u64>,
    pub candidates: usize,
}

impl NetworkInfo {
    pub fn is_healthy(&self) -> bool {
        self.endpoint.is_some() && self.chain_id == Some(self.expected_chain_id)
    }

    pub fn status(&self) -> String {
        match (&self.endpoint, self.chain_id) {
            (None, _) => "unreachable".to_string(),
            (Some(_), None) => "connected (chain id unavailable)".to_string(),
            (Some(_), Some(id)) if id != self.expected_chain_id => {
                format!("connected (unexpected chain id {id})")
            }
            (Some(_), Some(_)) => "connected".to_string(),
        }
    }
}

/// A catalog entry alongside what its contract reports, if it was reachable.
#[derive(Debug, Clone)]
pub struct TokenCheck {
    pub token: TokenDescriptor,
    pub onchain: Option<OnChainMetadata>,
}

impl TokenCheck {
    pub fn status(&self) -> String {
        if self.token.is_native() {
            return "native asset".to_string();
        }
        let Some(meta) = &self.onchain else {
            return "unverified".to_string();
        };
        if meta.symbol.is_none() && meta.decimals.is_none() {
            return "no ERC20 response".to_string();
        }

        let mut problems = Vec::new();
        if let Some(decimals) = meta.decimals {
            if decimals != self.token.decimals {
                problems.push(format!("decimals {decimals} on-chain"));
            }
        }
        if let Some(symbol) = &meta.symbol {
            if !symbol.eq_ignore_ascii_case(&self.token.symbol) {
                problems.push(format!("symbol {symbol} on-chain"));
            }
        }

        if problems.is_empty() {
            "ok".to_string()
        } else {
            format!("mismatch: {}", problems.join(", "))
        }
    }
}

pub fn parse_wallet(wallet: &str) -> Result<Address, KatanaError> {
    Address::from_str(wallet.trim()).map_err(|_| KatanaError::InvalidWallet(wallet.to_string()))
}

/// A failed connection is not fatal for display commands; callers fall back
/// to cached output.
async fn connect_or_fallback(config: &Config) -> Option<RpcClient> {
    match RpcClient::connect(&config.rpc_urls, config.probe_timeout).await {
        Ok(client) => Some(client),
        Err(e) => {
            warn!("Connection failed: {}", e);
            eprintln!("Error fetching balances: {e}");
            eprintln!("Falling back to cached data...");
            None
        }
    }
}

/// Live holdings, or the cached set with `true` when no endpoint answered.
async fn load_holdings(
    config: &Config,
    catalog: &TokenCatalog,
    wallet: Address,
) -> Result<(Vec<BalanceRecord>, bool), KatanaError> {
    match connect_or_fallback(config).await {
        Some(client) => Ok((fetch_holdings(&client, catalog, wallet).await?, false)),
        None => Ok((cached_holdings(catalog), true)),
    }
}

/// One token's holding, live or from the cache (`true`). A cached lookup
/// without a record means the balance is unknown, not zero.
async fn load_token_holding(
    config: &Config,
    catalog: &TokenCatalog,
    token: &TokenDescriptor,
    wallet: Address,
) -> Result<(Option<BalanceRecord>, bool), KatanaError> {
    match connect_or_fallback(config).await {
        Some(client) => Ok((fetch_token_holding(&client, token, wallet).await?, false)),
        None => {
            let record = cached_holdings(catalog)
                .into_iter()
                .find(|r| r.symbol == token.symbol);
            Ok((record, true))
        }
    }
}

fn resolve_token<'a>(
    catalog: &'a TokenCatalog,
    symbol: &str,
) -> Result<&'a TokenDescriptor, KatanaError> {
    catalog
        .find_by_symbol(symbol)
        .ok_or_else(|| KatanaError::UnknownToken(symbol.to_string()))
}

pub async fn cmd_balance(
    config: &Config,
    catalog: &TokenCatalog,
    wallet: Option<String>,
    token: Option<String>,
    format: &OutputFormat,
) -> Result<()> {
    let Some(wallet) = config.resolve_wallet(wallet) else {
        println!("{NO_WALLET_MESSAGE}");
        return Ok(());
    };
    let wallet = parse_wallet(&wallet)?;

    let output = match token {
        Some(symbol) => {
            let token = match resolve_token(catalog, &symbol) {
                Ok(token) => token,
                Err(e) => {
                    println!("{e}");
                    return Ok(());
                }
            };

            let (record, cached) = load_token_holding(config, catalog, token, wallet).await?;
            format_token_holding(token, record.as_ref(), cached, format)
        }
        None => {
            let (records, _) = load_holdings(config, catalog, wallet).await?;
            format_holdings(&records, format)
        }
    };

    println!("{output}");
    Ok(())
}

pub fn cmd_yields(min_apy: Option<f64>, format: &OutputFormat) -> Result<()> {
    let matching = filter_by_min_apy(opportunities(), min_apy);
    info!("{} yield opportunities match", matching.len());

    let output = format_yields(&matching, format);
    println!("{output}");

    Ok(())
}

#[derive(Debug, Clone)]
pub struct PortfolioView {
    /// `None` when the wallet's balances could not be fetched.
    pub holdings: Option<Vec<BalanceRecord>>,
    pub cached: bool,
    pub positions: Vec<Position>,
    pub summary: PortfolioSummary,
}

impl PortfolioView {
    pub fn new(holdings: Option<Vec<BalanceRecord>>, cached: bool) -> Self {
        let positions = placeholder_positions();
        let summary = PortfolioSummary::new(holdings.as_deref(), &positions);
        PortfolioView {
            holdings,
            cached,
            positions,
            summary,
        }
    }
}

/// A failed balance query still yields the positions and summary, with the
/// wallet value left unknown.
async fn load_portfolio(
    config: &Config,
    catalog: &TokenCatalog,
    wallet: Address,
) -> PortfolioView {
    match load_holdings(config, catalog, wallet).await {
        Ok((holdings, cached)) => PortfolioView::new(Some(holdings), cached),
        Err(e) => {
            warn!("Portfolio balances unavailable: {}", e);
            eprintln!("Error fetching balances: {e}");
            PortfolioView::new(None, false)
        }
    }
}

pub async fn cmd_portfolio(
    config: &Config,
    catalog: &TokenCatalog,
    wallet: Option<String>,
    format: &OutputFormat,
) -> Result<()> {
    let Some(wallet) = config.resolve_wallet(wallet) else {
        println!("{NO_WALLET_MESSAGE}");
        return Ok(());
    };
    let wallet = parse_wallet(&wallet)?;

    let view = load_portfolio(config, catalog, wallet).await;
    let holdings = view.holdings.as_deref();

    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                format_portfolio_json(holdings, &view.positions, &view.summary, view.cached)
            );
        }
        OutputFormat::Table => {
            println!("Wallet Holdings");
            match holdings {
                Some(holdings) => println!("{}", format_holdings(holdings, format)),
                None => println!("Wallet balances unavailable."),
            }
            println!("\nActive Positions");
            println!("{}", format_positions(&view.positions, format));
            println!("\nSummary");
            println!("{}", format_summary(&view.summary, format));
        }
        OutputFormat::Csv => {
            if let Some(holdings) = holdings {
                println!("{}", format_holdings(holdings, format));
            }
            println!("{}", format_positions(&view.positions, format));
            println!("{}", format_summary(&view.summary, format));
        }
    }

    Ok(())
}

pub async fn cmd_info(config: &Config, format: &OutputFormat) -> Result<()> {
    let mut info = NetworkInfo {
        network: NETWORK_NAME,
        expected_chain_id: KATANA_CHAIN_ID,
        endpoint: None,
        chain_id: None,
        latest_block: None,
        candidates: config.rpc_urls.len(),
    };

    match RpcClient::connect(&config.rpc_urls, config.probe_timeout).await {
        Ok(client) => {
            info.endpoint = Some(client.url().to_string());
            info.chain_id = match client.chain_id().await {
                Ok(id) => Some(id),
                Err(e) => {
                    warn!("Failed to fetch chain id: {}", e);
                    None
                }
            };
            info.latest_block = match client.latest_block().await {
                Ok(block) => Some(block),
                Err(e) => {
                    warn!("Failed to fetch latest block: {}", e);
                    Some(client.probed_block())
                }
            };
        }
        Err(e) => warn!("Connection failed: {}", e),
    }

    let output = format_network_info(&info, format);
    println!("{output}");

    Ok(())
}

pub async fn cmd_tokens(
    config: &Config,
    catalog: &TokenCatalog,
    format: &OutputFormat,
) -> Result<()> {
    let checks = match RpcClient::connect(&config.rpc_urls, config.probe_timeout).await {
        Ok(client) => {
            let client = &client;
            let metadata = join_all(catalog.tokens().iter().map(|token| async move {
                if token.is_native() {
                    None
                } else {
                    Some(client.token_metadata(token.address).await)
                }
            }))
            .await;

            catalog
                .tokens()
                .iter()
                .cloned()
                .zip(metadata)
                .map(|(token, onchain)| TokenCheck { token, onchain })
                .collect::<Vec<_>>()
        }
        Err(e) => {
            warn!("Connection failed, showing catalog unverified: {}", e);
            catalog
                .tokens()
                .iter()
                .cloned()
                .map(|token| TokenCheck {
                    token,
                    onchain: None,
                })
                .collect()
        }
    };

    let output = format_token_checks(&checks, format);
    println!("{output}");

    Ok(())
}
