use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ChainClientError;
use crate::escrow::EscrowBalance;

/// Parameters for one leg of a cross-chain trade settlement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettleParams {
    pub order_id: u64,
    pub party1: String,
    pub party2: String,
    pub token: String,
    pub amount: Decimal,
    pub nonce: u64,
    /// True for the source-chain leg (escrow release), false for the
    /// destination-chain leg (counter-asset delivery).
    pub is_source_chain: bool,
}

/// Result of a single settlement leg call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettleReceipt {
    pub tx_hash: String,
    pub success: bool,
}

/// Everything the orderbook service needs from a chain: escrow reads, token
/// metadata, nonces, and the settlement contract calls themselves.
/// Implemented once against real RPC (`EthersChainClient`) and once as an
/// in-memory fake for tests.
#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn get_token_decimals(&self, network: &str, symbol: &str) -> Result<u32, ChainClientError>;

    async fn check_escrow_balance(
        &self,
        network: &str,
        account: &str,
        token: &str,
    ) -> Result<EscrowBalance, ChainClientError>;

    async fn lock_escrow_for_order(
        &self,
        network: &str,
        account: &str,
        token: &str,
        amount: Decimal,
        order_id: u64,
    ) -> Result<(), ChainClientError>;

    async fn settle_cross_chain_trade(
        &self,
        network: &str,
        params: SettleParams,
    ) -> Result<SettleReceipt, ChainClientError>;

    async fn get_user_nonce(&self, network: &str, account: &str) -> Result<u64, ChainClientError>;

    async fn get_contract_owner(&self, network: &str) -> Result<String, ChainClientError>;

    async fn get_signer_address(&self, network: &str) -> Result<String, ChainClientError>;

    /// Mints test tokens to `account`. Non-production: real networks don't
    /// expose this, and implementations should refuse outside a sandbox.
    async fn mint_token(
        &self,
        network: &str,
        account: &str,
        token: &str,
        amount: Decimal,
    ) -> Result<(), ChainClientError>;
}
