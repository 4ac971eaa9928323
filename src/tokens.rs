use alloy_primitives::{Address, address};

/// A fungible asset known to the CLI. `Address::ZERO` marks the chain's native asset.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenDescriptor {
    pub address: Address,
    pub symbol: String,
    pub name: String,
    pub decimals: u8,
    pub price_usd: Option<f64>,
}

impl TokenDescriptor {
    pub fn new(address: Address, symbol: &str, name: &str, decimals: u8) -> Self {
        Self {
            address,
            symbol: symbol.to_string(),
            name: name.to_string(),
            decimals,
            price_usd: None,
        }
    }

    pub fn with_price(mut self, price_usd: f64) -> Self {
        self.price_usd = Some(price_usd);
        self
    }

    pub fn is_native(&self) -> bool {
        self.address == Address::ZERO
    }
}

/// Immutable token table, built once at startup and passed to whoever needs it.
#[derive(Debug, Clone)]
pub struct TokenCatalog {
    tokens: Vec<TokenDescriptor>,
}

impl TokenCatalog {
    pub fn new(tokens: Vec<TokenDescriptor>) -> Self {
        Self { tokens }
    }

    pub fn katana() -> Self {
        Self::new(vec![
            TokenDescriptor::new(Address::ZERO, "ETH", "Ether", 18).with_price(2000.0),
            TokenDescriptor::new(
                address!("0x4200000000000000000000000000000000000006"),
                "WETH",
                "Wrapped Ether",
                18,
            )
            .with_price(2000.0),
            TokenDescriptor::new(
                address!("0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913"),
                "USDC",
                "USD Coin",
                6,
            )
            .with_price(1.0),
            TokenDescriptor::new(
                address!("0x94b008aA00579c1307B0EF2c499aD98a8ce58e58"),
                "USDT",
                "Tether USD",
                6,
            )
            .with_price(1.0),
            TokenDescriptor::new(
                address!("0xDA10009cBd5D07dd0CeCc66161FC93D7c9000da1"),
                "DAI",
                "Dai Stablecoin",
                18,
            )
            .with_price(1.0),
        ])
    }

    pub fn tokens(&self) -> &[TokenDescriptor] {
        &self.tokens
    }

    pub fn native(&self) -> Option<&TokenDescriptor> {
        self.tokens.iter().find(|t| t.is_native())
    }

    pub fn erc20_tokens(&self) -> impl Iterator<Item = &TokenDescriptor> {
        self.tokens.iter().filter(|t| !t.is_native())
    }

    pub fn find_by_symbol(&self, symbol: &str) -> Option<&TokenDescriptor> {
        self.tokens
            .iter()
            .find(|t| t.symbol.eq_ignore_ascii_case(symbol))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_katana_catalog() {
        let catalog = TokenCatalog::katana();
        assert_eq!(catalog.tokens().len(), 5);

        let native = catalog.native().unwrap();
        assert_eq!(native.symbol, "ETH");
        assert_eq!(native.decimals, 18);
        assert_eq!(catalog.erc20_tokens().count(), 4);
        assert!(catalog.erc20_tokens().all(|t| !t.is_native()));
    }

    #[test]
    fn test_find_by_symbol_ignores_case() {
        let catalog = TokenCatalog::katana();
        assert_eq!(catalog.find_by_symbol("usdc").unwrap().decimals, 6);
        assert_eq!(catalog.find_by_symbol("Weth").unwrap().symbol, "WETH");
        assert!(catalog.find_by_symbol("WBTC").is_none());
    }
}
