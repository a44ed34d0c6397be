use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ChainClientError;

/// Per-network RPC endpoint, chain id, settlement contract address, and the
/// token symbol -> address map for that network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub rpc_url: String,
    pub chain_id: u64,
    pub contract_address: String,
    pub tokens: HashMap<String, String>,
}

/// The set of supported networks, mirroring the original `SUPPORTED_NETWORKS`
/// table (hedera, ethereum, polygon, bsc, celo, base), plus a legacy flat
/// symbol -> address map used when a network's own table is missing an
/// entry. Decimal fallbacks default to `USDT: 6`, `HBAR: 18`, else `18`.
pub struct TokenRegistry {
    networks: HashMap<String, NetworkConfig>,
    legacy_token_addresses: HashMap<String, String>,
}

impl TokenRegistry {
    pub fn new(
        networks: HashMap<String, NetworkConfig>,
        legacy_token_addresses: HashMap<String, String>,
    ) -> Self {
        Self {
            networks,
            legacy_token_addresses,
        }
    }

    pub fn network(&self, network_key: &str) -> Result<&NetworkConfig, ChainClientError> {
        self.networks
            .get(network_key)
            .ok_or_else(|| ChainClientError::UnknownNetwork(network_key.to_string()))
    }

    pub fn network_keys(&self) -> impl Iterator<Item = &String> {
        self.networks.keys()
    }

    /// Resolves a token's address on `network_key`, falling back to the
    /// legacy flat map if the network's own table doesn't list it.
    pub fn token_address(&self, network_key: &str, symbol: &str) -> Result<&str, ChainClientError> {
        let network = self.network(network_key)?;
        if let Some(address) = network.tokens.get(symbol) {
            return Ok(address.as_str());
        }
        self.legacy_token_addresses
            .get(symbol)
            .map(String::as_str)
            .ok_or_else(|| ChainClientError::UnknownToken {
                network: network_key.to_string(),
                token: symbol.to_string(),
            })
    }

    /// Fallback decimals used when the chain can't be reached to ask, or
    /// while validating before any RPC call is made.
    pub fn decimals_fallback(symbol: &str) -> u32 {
        match symbol {
            "USDT" => 6,
            "HBAR" => 18,
            _ => 18,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_registry() -> TokenRegistry {
        let mut hedera_tokens = HashMap::new();
        hedera_tokens.insert("HBAR".to_string(), "0xHBAR".to_string());

        let mut networks = HashMap::new();
        networks.insert(
            "hedera".to_string(),
            NetworkConfig {
                rpc_url: "https://hedera.example".to_string(),
                chain_id: 295,
                contract_address: "0xSettlement".to_string(),
                tokens: hedera_tokens,
            },
        );

        let mut legacy = HashMap::new();
        legacy.insert("USDT".to_string(), "0xLegacyUsdt".to_string());

        TokenRegistry::new(networks, legacy)
    }

    #[test]
    fn resolves_network_specific_token() {
        let registry = sample_registry();
        assert_eq!(registry.token_address("hedera", "HBAR").unwrap(), "0xHBAR");
    }

    #[test]
    fn falls_back_to_legacy_map() {
        let registry = sample_registry();
        assert_eq!(registry.token_address("hedera", "USDT").unwrap(), "0xLegacyUsdt");
    }

    #[test]
    fn unknown_token_on_known_network_errors() {
        let registry = sample_registry();
        let err = registry.token_address("hedera", "DOGE").unwrap_err();
        assert_eq!(err.kind(), "unknown_token");
    }

    #[test]
    fn decimals_fallback_table() {
        assert_eq!(TokenRegistry::decimals_fallback("USDT"), 6);
        assert_eq!(TokenRegistry::decimals_fallback("HBAR"), 18);
        assert_eq!(TokenRegistry::decimals_fallback("ETH"), 18);
    }
}
