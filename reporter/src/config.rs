//! Reporter configuration.
//!
//! Values come from the environment in the binary and from builders in
//! tests and embedding code.

use serde::{Deserialize, Serialize};
use serum_book_sdk::client::config::DEFAULT_RPC_URL;
use serum_book_sdk::{ClientConfig, MarketRegistry};
use solana_sdk::pubkey::Pubkey;

/// Environment variable holding the JSON-RPC endpoint.
pub const ENV_RPC_URL: &str = "SOLANA_RPC_URL";

/// Environment variable holding the market address or registry name.
pub const ENV_MARKET: &str = "SERUM_MARKET";

/// Environment variable holding the number of levels reported per side.
pub const ENV_DEPTH: &str = "BOOK_DEPTH";

/// Environment variable holding the poll interval in milliseconds.
pub const ENV_POLL_INTERVAL: &str = "POLL_INTERVAL_MS";

/// Environment variable holding the RPC retry budget.
pub const ENV_MAX_RETRIES: &str = "MAX_RETRIES";

/// Environment variable holding the path of a market registry JSON file.
pub const ENV_MARKETS_FILE: &str = "MARKETS_FILE";

/// Configuration for the reporter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReporterConfig {
    /// Market to report, as a base58 address or a registry name.
    pub market: String,

    /// JSON-RPC endpoint.
    pub rpc_url: String,

    /// Levels reported per side.
    pub depth: usize,

    /// Poll interval in milliseconds.
    pub poll_interval_ms: u64,

    /// Retries for failed RPC requests.
    pub max_retries: u32,

    /// Optional registry file used to resolve market names.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markets_file: Option<String>,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            market: String::new(),
            rpc_url: DEFAULT_RPC_URL.to_string(),
            depth: 10,
            poll_interval_ms: 5_000,
            max_retries: 3,
            markets_file: None,
        }
    }
}

impl ReporterConfig {
    /// Creates a new configuration for the given market.
    #[must_use]
    pub fn with_market(market: impl Into<String>) -> Self {
        Self {
            market: market.into(),
            ..Default::default()
        }
    }

    /// Sets the RPC endpoint.
    #[must_use]
    pub fn with_rpc_url(mut self, rpc_url: impl Into<String>) -> Self {
        self.rpc_url = rpc_url.into();
        self
    }

    /// Sets the number of levels reported per side.
    #[must_use]
    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    /// Sets the poll interval.
    #[must_use]
    pub fn with_poll_interval(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    /// Sets the maximum retries.
    #[must_use]
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Sets the registry file.
    #[must_use]
    pub fn with_markets_file(mut self, path: impl Into<String>) -> Self {
        self.markets_file = Some(path.into());
        self
    }

    /// Reads the configuration from process environment variables, keeping
    /// defaults for unset ones.
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric variable does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the configuration through `lookup`, keeping defaults for
    /// missing keys.
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric value does not parse.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(market) = lookup(ENV_MARKET) {
            config.market = market;
        }
        if let Some(rpc_url) = lookup(ENV_RPC_URL) {
            config.rpc_url = rpc_url;
        }
        if let Some(depth) = lookup(ENV_DEPTH) {
            config.depth = parse_var(ENV_DEPTH, &depth)?;
        }
        if let Some(interval) = lookup(ENV_POLL_INTERVAL) {
            config.poll_interval_ms = parse_var(ENV_POLL_INTERVAL, &interval)?;
        }
        if let Some(retries) = lookup(ENV_MAX_RETRIES) {
            config.max_retries = parse_var(ENV_MAX_RETRIES, &retries)?;
        }
        config.markets_file = lookup(ENV_MARKETS_FILE);
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.market.trim().is_empty() {
            return Err(ConfigError::MissingMarket);
        }

        if self.depth == 0 {
            return Err(ConfigError::InvalidDepth);
        }

        if self.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidPollInterval);
        }

        self.client_config()
            .validate()
            .map_err(|e| ConfigError::InvalidRpcUrl(e.to_string()))
    }

    /// Builds the RPC client configuration.
    #[must_use]
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new(self.rpc_url.clone())
            .with_max_retries(self.max_retries)
            .with_user_agent(format!(
                "serum-book-reporter/{}",
                env!("CARGO_PKG_VERSION")
            ))
    }

    /// Parses the market as a base58 address.
    ///
    /// # Errors
    ///
    /// Returns an error if the market is not a 32-byte base58 string.
    pub fn parse_market(&self) -> Result<Pubkey, ConfigError> {
        let market = self.market.trim();
        let bytes = bs58::decode(market)
            .into_vec()
            .map_err(|_| ConfigError::InvalidMarketAddress(market.to_string()))?;

        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| ConfigError::InvalidMarketAddress(market.to_string()))?;
        Ok(Pubkey::new_from_array(arr))
    }

    /// Resolves the market to an address, falling back to a registry name
    /// lookup when it is not an address.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::UnknownMarket` if the market is neither an
    /// address nor a registry name.
    pub fn resolve_market(&self, registry: Option<&MarketRegistry>) -> Result<Pubkey, ConfigError> {
        match self.parse_market() {
            Ok(address) => Ok(address),
            Err(err) => registry
                .and_then(|registry| registry.by_name(self.market.trim()))
                .map(|entry| entry.address)
                .ok_or(match registry {
                    Some(_) => ConfigError::UnknownMarket(self.market.clone()),
                    None => err,
                }),
        }
    }

    /// Loads the registry file, if one is configured.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Registry` if the file cannot be read or parsed.
    pub fn load_registry(&self) -> Result<Option<MarketRegistry>, ConfigError> {
        let Some(path) = &self.markets_file else {
            return Ok(None);
        };
        let json = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Registry(format!("{}: {}", path, e)))?;
        MarketRegistry::from_json(&json)
            .map(Some)
            .map_err(|e| ConfigError::Registry(format!("{}: {}", path, e)))
    }
}

fn parse_var<T: std::str::FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        name,
        value: value.to_string(),
    })
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// No market configured.
    #[error("market must be set")]
    MissingMarket,

    /// Invalid depth.
    #[error("depth must be > 0")]
    InvalidDepth,

    /// Invalid poll interval.
    #[error("poll_interval_ms must be > 0")]
    InvalidPollInterval,

    /// Invalid RPC endpoint.
    #[error("invalid rpc url: {0}")]
    InvalidRpcUrl(String),

    /// Invalid market address.
    #[error("invalid market address: {0}")]
    InvalidMarketAddress(String),

    /// Market name not present in the registry.
    #[error("unknown market: {0}")]
    UnknownMarket(String),

    /// Registry file could not be loaded.
    #[error("registry: {0}")]
    Registry(String),

    /// An environment value did not parse.
    #[error("invalid value for {name}: {value}")]
    InvalidValue {
        /// Variable name.
        name: &'static str,
        /// Raw value.
        value: String,
    },
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    const SOL_USDC: &str = "9wFFyRfZBsuAha4YcuxcXLKwMxJR43S7fPfQLusDBzvT";

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_config_default() {
        let config = ReporterConfig::default();
        assert!(config.market.is_empty());
        assert_eq!(config.rpc_url, DEFAULT_RPC_URL);
        assert_eq!(config.depth, 10);
        assert_eq!(config.poll_interval_ms, 5_000);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.validate(), Err(ConfigError::MissingMarket));
    }

    #[test]
    fn test_config_builder() {
        let config = ReporterConfig::with_market(SOL_USDC)
            .with_rpc_url("http://127.0.0.1:8899")
            .with_depth(3)
            .with_poll_interval(250)
            .with_max_retries(1)
            .with_markets_file("markets.json");

        assert_eq!(config.depth, 3);
        assert_eq!(config.poll_interval_ms, 250);
        assert_eq!(config.markets_file.as_deref(), Some("markets.json"));
        assert!(config.validate().is_ok());

        let client = config.client_config();
        assert_eq!(client.rpc_url, "http://127.0.0.1:8899");
        assert_eq!(client.max_retries, 1);
        assert!(client.user_agent.starts_with("serum-book-reporter/"));
    }

    #[test]
    fn test_config_validate_rejects() {
        let base = ReporterConfig::with_market(SOL_USDC);
        assert_eq!(
            base.clone().with_depth(0).validate(),
            Err(ConfigError::InvalidDepth)
        );
        assert_eq!(
            base.clone().with_poll_interval(0).validate(),
            Err(ConfigError::InvalidPollInterval)
        );
        assert!(matches!(
            base.with_rpc_url("localhost:8899").validate(),
            Err(ConfigError::InvalidRpcUrl(_))
        ));
    }

    #[test]
    fn test_from_lookup() {
        let config = ReporterConfig::from_lookup(lookup(&[
            (ENV_MARKET, "SOL/USDC"),
            (ENV_RPC_URL, "http://localhost:8899"),
            (ENV_DEPTH, "5"),
            (ENV_POLL_INTERVAL, " 1000 "),
            (ENV_MAX_RETRIES, "0"),
        ]))
        .expect("config");

        assert_eq!(config.market, "SOL/USDC");
        assert_eq!(config.rpc_url, "http://localhost:8899");
        assert_eq!(config.depth, 5);
        assert_eq!(config.poll_interval_ms, 1_000);
        assert_eq!(config.max_retries, 0);
        assert!(config.markets_file.is_none());
    }

    #[test]
    fn test_from_lookup_bad_number() {
        let err = ReporterConfig::from_lookup(lookup(&[(ENV_DEPTH, "ten")])).expect_err("depth");
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                name: ENV_DEPTH,
                value: "ten".to_string(),
            }
        );
        assert_eq!(err.to_string(), "invalid value for BOOK_DEPTH: ten");
    }

    #[test]
    fn test_parse_market() {
        let config = ReporterConfig::with_market(SOL_USDC);
        assert_eq!(
            config.parse_market().expect("address").to_string(),
            SOL_USDC
        );

        let short = ReporterConfig::with_market("3yFwqXBfZY4jBVUafQ1YEXw189y2dN3V");
        assert!(matches!(
            short.parse_market(),
            Err(ConfigError::InvalidMarketAddress(_))
        ));

        let not_base58 = ReporterConfig::with_market("SOL/USDC");
        assert!(matches!(
            not_base58.parse_market(),
            Err(ConfigError::InvalidMarketAddress(_))
        ));
    }

    #[test]
    fn test_resolve_market_by_name() {
        let registry = MarketRegistry::from_json(&format!(
            r#"[{{"address": "{}", "name": "SOL/USDC", "programId": "9xQeWvG816bUx9EPjHmaT23yvVM2ZWbrrpZb9PusVFin"}}]"#,
            SOL_USDC
        ))
        .expect("registry");

        let by_name = ReporterConfig::with_market("SOL/USDC");
        assert_eq!(
            by_name
                .resolve_market(Some(&registry))
                .expect("resolved")
                .to_string(),
            SOL_USDC
        );

        let unknown = ReporterConfig::with_market("BTC/USDC");
        assert_eq!(
            unknown.resolve_market(Some(&registry)),
            Err(ConfigError::UnknownMarket("BTC/USDC".to_string()))
        );
        assert!(matches!(
            unknown.resolve_market(None),
            Err(ConfigError::InvalidMarketAddress(_))
        ));
    }

    #[test]
    fn test_load_registry_missing_file() {
        assert_eq!(ReporterConfig::default().load_registry(), Ok(None));

        let config = ReporterConfig::default().with_markets_file("/nonexistent/markets.json");
        assert!(matches!(
            config.load_registry(),
            Err(ConfigError::Registry(_))
        ));
    }

    #[test]
    fn test_config_serde() {
        let config = ReporterConfig::with_market(SOL_USDC).with_depth(4);
        let json = serde_json::to_string(&config).expect("serialize");
        assert!(!json.contains("markets_file"));
        let parsed: ReporterConfig = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, config);
    }
}
