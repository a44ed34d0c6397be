use std::collections::HashMap;

use chain_client::{NetworkConfig, TokenRegistry};

/// Default per-network settings, used whenever the matching environment
/// variable isn't set. Mirrors the original service's hardcoded
/// `SUPPORTED_NETWORKS` fallback table.
const DEFAULT_NETWORKS: &[(&str, &str, u64, &str)] = &[
    ("hedera", "https://mainnet.hashio.io/api", 295, "0x0000000000000000000000000000000000000000"),
    ("ethereum", "https://eth.llamarpc.com", 1, "0x0000000000000000000000000000000000000000"),
    ("polygon", "https://polygon-rpc.com", 137, "0x0000000000000000000000000000000000000000"),
    ("bsc", "https://bsc-dataseed.binance.org", 56, "0x0000000000000000000000000000000000000000"),
    ("celo", "https://forno.celo.org", 42220, "0x0000000000000000000000000000000000000000"),
    ("base", "https://mainnet.base.org", 8453, "0x0000000000000000000000000000000000000000"),
];

/// Service configuration, loaded once at startup from the process
/// environment (after `dotenvy::dotenv()` has merged in a `.env` file, if
/// present).
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub activity_log_path: Option<String>,
    pub settlement_sync: bool,
    pub settlement_sync_timeout_secs: u64,
    pub signer_private_key: String,
    pub production: bool,
    /// When false, the service settles trades itself ("engine-signed mode")
    /// even if neither party attached a signature. When true (the default),
    /// an order with no signed trades is left `awaiting_client_signatures`.
    pub require_client_signatures: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8000),
            activity_log_path: std::env::var("ACTIVITY_LOG_PATH")
                .ok()
                .or_else(|| Some("orderbook_activity.jsonl".to_string())),
            settlement_sync: std::env::var("SETTLEMENT_SYNC")
                .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
                .unwrap_or(true),
            settlement_sync_timeout_secs: std::env::var("SETTLEMENT_SYNC_TIMEOUT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8),
            signer_private_key: std::env::var("PRIVATE_KEY")
                .map_err(|_| anyhow::anyhow!("PRIVATE_KEY must be set"))?,
            production: std::env::var("ENVIRONMENT")
                .map(|v| v.eq_ignore_ascii_case("production"))
                .unwrap_or(false),
            require_client_signatures: std::env::var("REQUIRE_CLIENT_SIGNATURES")
                .map(|v| !(v.eq_ignore_ascii_case("false") || v == "0"))
                .unwrap_or(true),
        })
    }

    /// Builds the token registry from `WEB3_PROVIDER_<CHAIN>` /
    /// `WEB3_CHAIN_ID_<CHAIN>` / `TRADE_SETTLE_CONTRACT_ADDRESS_<CHAIN>` /
    /// `<CHAIN>_<SYMBOL>_TOKEN_ADDRESS` environment variables, falling back
    /// to `DEFAULT_NETWORKS` per field when unset. A legacy flat
    /// `USDT`/`HBAR` address map is read from `LEGACY_USDT_ADDRESS` /
    /// `LEGACY_HBAR_ADDRESS`.
    pub fn build_token_registry(&self) -> TokenRegistry {
        let mut networks = HashMap::new();
        for (key, default_rpc, default_chain_id, default_contract) in DEFAULT_NETWORKS {
            let upper = key.to_uppercase();
            let rpc_url = std::env::var(format!("WEB3_PROVIDER_{upper}")).unwrap_or_else(|_| default_rpc.to_string());
            let chain_id = std::env::var(format!("WEB3_CHAIN_ID_{upper}"))
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(*default_chain_id);
            let contract_address = std::env::var(format!("TRADE_SETTLE_CONTRACT_ADDRESS_{upper}"))
                .unwrap_or_else(|_| default_contract.to_string());

            let mut tokens = HashMap::new();
            for symbol in ["USDT", "HBAR"] {
                if let Ok(address) = std::env::var(format!("{upper}_{symbol}_TOKEN_ADDRESS")) {
                    tokens.insert(symbol.to_string(), address);
                }
            }

            networks.insert(
                key.to_string(),
                NetworkConfig {
                    rpc_url,
                    chain_id,
                    contract_address,
                    tokens,
                },
            );
        }

        let mut legacy = HashMap::new();
        if let Ok(address) = std::env::var("LEGACY_USDT_ADDRESS") {
            legacy.insert("USDT".to_string(), address);
        }
        if let Ok(address) = std::env::var("LEGACY_HBAR_ADDRESS") {
            legacy.insert("HBAR".to_string(), address);
        }

        TokenRegistry::new(networks, legacy)
    }
}
