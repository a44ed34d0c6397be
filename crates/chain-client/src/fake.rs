use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::client::{ChainClient, SettleParams, SettleReceipt};
use crate::error::ChainClientError;
use crate::escrow::EscrowBalance;

/// Deterministic in-memory `ChainClient` for `validator` and `settlement`
/// tests. Balances, nonces, decimals, owner and signer addresses are all
/// seeded by the test and never touch a network.
#[derive(Default)]
pub struct FakeChainClient {
    balances: Mutex<HashMap<(String, String, String), EscrowBalance>>,
    nonces: Mutex<HashMap<(String, String), u64>>,
    decimals: Mutex<HashMap<String, u32>>,
    owners: Mutex<HashMap<String, String>>,
    signers: Mutex<HashMap<String, String>>,
    /// When set, every settlement call for this network fails with
    /// `Revert`, letting tests exercise partial-failure handling.
    pub fail_settlement_on: Mutex<Option<String>>,
}

impl FakeChainClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_balance(&self, network: &str, account: &str, token: &str, total: Decimal, locked: Decimal) {
        self.balances.lock().unwrap().insert(
            (network.to_string(), account.to_string(), token.to_string()),
            EscrowBalance::new(total, locked),
        );
    }

    pub fn seed_decimals(&self, token: &str, decimals: u32) {
        self.decimals.lock().unwrap().insert(token.to_string(), decimals);
    }

    pub fn seed_owner(&self, network: &str, owner: &str) {
        self.owners.lock().unwrap().insert(network.to_string(), owner.to_string());
    }

    pub fn seed_signer(&self, network: &str, signer: &str) {
        self.signers.lock().unwrap().insert(network.to_string(), signer.to_string());
    }

    pub fn fail_settlement_for(&self, network: &str) {
        *self.fail_settlement_on.lock().unwrap() = Some(network.to_string());
    }
}

#[async_trait]
impl ChainClient for FakeChainClient {
    async fn get_token_decimals(&self, _network: &str, symbol: &str) -> Result<u32, ChainClientError> {
        Ok(self
            .decimals
            .lock()
            .unwrap()
            .get(symbol)
            .copied()
            .unwrap_or_else(|| crate::registry::TokenRegistry::decimals_fallback(symbol)))
    }

    async fn check_escrow_balance(
        &self,
        network: &str,
        account: &str,
        token: &str,
    ) -> Result<EscrowBalance, ChainClientError> {
        Ok(self
            .balances
            .lock()
            .unwrap()
            .get(&(network.to_string(), account.to_string(), token.to_string()))
            .copied()
            .unwrap_or(EscrowBalance::new(Decimal::ZERO, Decimal::ZERO)))
    }

    async fn lock_escrow_for_order(
        &self,
        network: &str,
        account: &str,
        token: &str,
        amount: Decimal,
        _order_id: u64,
    ) -> Result<(), ChainClientError> {
        let key = (network.to_string(), account.to_string(), token.to_string());
        let mut balances = self.balances.lock().unwrap();
        let current = balances
            .get(&key)
            .copied()
            .unwrap_or(EscrowBalance::new(Decimal::ZERO, Decimal::ZERO));
        let updated = current.lock(amount).ok_or_else(|| ChainClientError::Revert {
            network: network.to_string(),
            reason: "insufficient available balance".to_string(),
        })?;
        balances.insert(key, updated);
        Ok(())
    }

    async fn settle_cross_chain_trade(
        &self,
        network: &str,
        params: SettleParams,
    ) -> Result<SettleReceipt, ChainClientError> {
        if self.fail_settlement_on.lock().unwrap().as_deref() == Some(network) {
            return Err(ChainClientError::Revert {
                network: network.to_string(),
                reason: "simulated settlement failure".to_string(),
            });
        }
        Ok(SettleReceipt {
            tx_hash: format!("0xfake-{}-{}", network, params.order_id),
            success: true,
        })
    }

    async fn get_user_nonce(&self, network: &str, account: &str) -> Result<u64, ChainClientError> {
        let mut nonces = self.nonces.lock().unwrap();
        let entry = nonces
            .entry((network.to_string(), account.to_string()))
            .or_insert(0);
        let current = *entry;
        *entry += 1;
        Ok(current)
    }

    async fn get_contract_owner(&self, network: &str) -> Result<String, ChainClientError> {
        Ok(self
            .owners
            .lock()
            .unwrap()
            .get(network)
            .cloned()
            .unwrap_or_else(|| "0xOWNER".to_string()))
    }

    async fn get_signer_address(&self, network: &str) -> Result<String, ChainClientError> {
        Ok(self
            .signers
            .lock()
            .unwrap()
            .get(network)
            .cloned()
            .unwrap_or_else(|| "0xOWNER".to_string()))
    }

    async fn mint_token(
        &self,
        network: &str,
        account: &str,
        token: &str,
        amount: Decimal,
    ) -> Result<(), ChainClientError> {
        let key = (network.to_string(), account.to_string(), token.to_string());
        let mut balances = self.balances.lock().unwrap();
        let current = balances
            .get(&key)
            .copied()
            .unwrap_or(EscrowBalance::new(Decimal::ZERO, Decimal::ZERO));
        balances.insert(key, EscrowBalance::new(current.total + amount, current.locked));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn seeded_balance_round_trips() {
        let client = FakeChainClient::new();
        client.seed_balance("hedera", "0xabc", "HBAR", Decimal::from(100), Decimal::from(10));
        let balance = client.check_escrow_balance("hedera", "0xabc", "HBAR").await.unwrap();
        assert_eq!(balance.available, Decimal::from(90));
    }

    #[tokio::test]
    async fn lock_rejects_over_available() {
        let client = FakeChainClient::new();
        client.seed_balance("hedera", "0xabc", "HBAR", Decimal::from(100), Decimal::from(95));
        let err = client
            .lock_escrow_for_order("hedera", "0xabc", "HBAR", Decimal::from(10), 1)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "revert");
    }

    #[tokio::test]
    async fn nonce_increments() {
        let client = FakeChainClient::new();
        let a = client.get_user_nonce("hedera", "0xabc").await.unwrap();
        let b = client.get_user_nonce("hedera", "0xabc").await.unwrap();
        assert_eq!(a, 0);
        assert_eq!(b, 1);
    }
}
