use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chain_client::{ChainClient, SettleParams, TokenRegistry};
use exchange_core::{Trade, TradeParty};
use tokio::sync::Mutex;

use crate::result::{LegResult, OrderSettlementResult, TradeSettlementResult};

const MAX_LEG_ATTEMPTS: u32 = 3;
const LEG_BACKOFF_SECS: f64 = 0.75;
pub const DEFAULT_SYNC_TIMEOUT: Duration = Duration::from_secs(8);

/// What a synchronous settlement call returned: a finished result, or a
/// reason it's still in flight in the background.
#[derive(Debug)]
pub enum SettlementExecution {
    Settled(OrderSettlementResult),
    Pending { reason: String },
}

/// Drives both legs of cross-chain settlement for a set of trades.
///
/// Idempotency key is `(order_id, party1, party2, is_source)`: a retried
/// call for the same leg returns the cached receipt instead of resubmitting
/// to the chain, so a client retry after a dropped response can't double
/// spend.
pub struct SettlementCoordinator<C: ChainClient> {
    client: Arc<C>,
    registry: Arc<TokenRegistry>,
    idempotency_cache: Mutex<HashMap<String, LegResult>>,
}

impl<C: ChainClient + 'static> SettlementCoordinator<C> {
    pub fn new(client: Arc<C>, registry: Arc<TokenRegistry>) -> Self {
        Self {
            client,
            registry,
            idempotency_cache: Mutex::new(HashMap::new()),
        }
    }

    fn idempotency_key(order_id: u64, party1: &str, party2: &str, is_source: bool) -> String {
        format!("{order_id}:{party1}:{party2}:{is_source}")
    }

    /// The token and amount a given party leg gives up: the base asset for
    /// an ask, `quantity * price` of the quote asset for a bid.
    fn leg_asset(trade: &Trade, party: &TradeParty) -> (String, rust_decimal::Decimal) {
        match party.side {
            exchange_core::Side::Ask => (trade.base.clone(), trade.quantity),
            exchange_core::Side::Bid => (trade.quote.clone(), trade.quantity * trade.price),
        }
    }

    /// Settles one leg with retry, checking the caller is the contract's
    /// authorized signer before the first attempt. `owner` is whichever
    /// party's funds this leg locks and releases — the seller (`party1`)
    /// for the source leg, the buyer (`party2`) for the destination leg.
    async fn settle_leg(
        &self,
        network: &str,
        order_id: u64,
        token: &str,
        amount: rust_decimal::Decimal,
        owner: &TradeParty,
        party1: &TradeParty,
        party2: &TradeParty,
        is_source: bool,
    ) -> LegResult {
        let key = Self::idempotency_key(order_id, &party1.address, &party2.address, is_source);
        if let Some(cached) = self.idempotency_cache.lock().await.get(&key).cloned() {
            return cached;
        }

        let contract_owner = match self.client.get_contract_owner(network).await {
            Ok(owner) => owner,
            Err(err) => return LegResult::failed(format!("owner lookup failed: {err}")),
        };
        let signer = match self.client.get_signer_address(network).await {
            Ok(signer) => signer,
            Err(err) => return LegResult::failed(format!("signer lookup failed: {err}")),
        };
        if !contract_owner.eq_ignore_ascii_case(&signer) {
            return LegResult::failed("unauthorized_signer");
        }

        let nonce = match self.client.get_user_nonce(network, &owner.address).await {
            Ok(nonce) => nonce,
            Err(err) => return LegResult::failed(format!("nonce lookup failed: {err}")),
        };

        if let Err(err) = self
            .client
            .lock_escrow_for_order(network, &owner.address, token, amount, order_id)
            .await
        {
            return LegResult::failed(format!("escrow lock failed: {err}"));
        }
        match self.client.check_escrow_balance(network, &owner.address, token).await {
            Ok(balance) if balance.locked >= amount => {}
            Ok(_) => return LegResult::failed("insufficient_locked_balance"),
            Err(err) => return LegResult::failed(format!("escrow verify failed: {err}")),
        }

        let params = SettleParams {
            order_id,
            party1: party1.address.clone(),
            party2: party2.address.clone(),
            token: token.to_string(),
            amount,
            nonce,
            is_source_chain: is_source,
        };

        let mut last_error = None;
        for attempt in 0..MAX_LEG_ATTEMPTS {
            match self.client.settle_cross_chain_trade(network, params.clone()).await {
                Ok(receipt) if receipt.success => {
                    let result = LegResult::ok(receipt.tx_hash);
                    self.idempotency_cache.lock().await.insert(key, result.clone());
                    return result;
                }
                Ok(receipt) => {
                    last_error = Some(format!("settlement rejected: {}", receipt.tx_hash));
                }
                Err(err) if !err.is_retryable() => {
                    return LegResult::failed(format!("settlement failed: {err}"));
                }
                Err(err) => {
                    tracing::warn!(network, order_id, attempt, error = %err, "settlement leg failed, retrying");
                    last_error = Some(err.to_string());
                }
            }
            if attempt + 1 < MAX_LEG_ATTEMPTS {
                tokio::time::sleep(Duration::from_secs_f64(LEG_BACKOFF_SECS * (attempt as f64 + 1.0))).await;
            }
        }

        LegResult::failed(last_error.unwrap_or_else(|| "settlement failed".to_string()))
    }

    /// Settles one trade's two legs. A missing network configuration for
    /// either party fails that trade without touching the chain, and does
    /// not abort the rest of the order's trades.
    pub async fn settle_trade(&self, order_id: u64, trade: &Trade) -> TradeSettlementResult {
        // Normalize so `party1` is always the seller (ask side), regardless
        // of which one was the resting maker in the match.
        let (party1, party2) = if trade.party1.side == exchange_core::Side::Bid {
            (&trade.party2, &trade.party1)
        } else {
            (&trade.party1, &trade.party2)
        };
        let trade = &Trade {
            party1: party1.clone(),
            party2: party2.clone(),
            ..trade.clone()
        };

        let source_network = &trade.party1.from_network;
        let dest_network = &trade.party2.from_network;

        if self.registry.network(source_network).is_err() || self.registry.network(dest_network).is_err() {
            let failure = LegResult::failed("network configuration not found");
            return TradeSettlementResult {
                success: false,
                source_chain: failure.clone(),
                destination_chain: failure,
            };
        }

        let source_chain_id = self.registry.network(source_network).unwrap().chain_id;
        let dest_chain_id = self.registry.network(dest_network).unwrap().chain_id;
        let same_chain = source_chain_id == dest_chain_id;

        // Each leg releases whichever asset that party was giving up: the
        // base asset for an ask, `quantity * price` of the quote asset for
        // a bid.
        let (party1_token, party1_amount) = Self::leg_asset(trade, &trade.party1);
        let (party2_token, party2_amount) = Self::leg_asset(trade, &trade.party2);

        let source_result = self
            .settle_leg(
                source_network,
                order_id,
                &party1_token,
                party1_amount,
                &trade.party1,
                &trade.party1,
                &trade.party2,
                true,
            )
            .await;

        let dest_result = if same_chain {
            LegResult::skipped_same_chain()
        } else {
            self.settle_leg(
                dest_network,
                order_id,
                &party2_token,
                party2_amount,
                &trade.party2,
                &trade.party1,
                &trade.party2,
                false,
            )
            .await
        };

        TradeSettlementResult {
            success: source_result.success && dest_result.success,
            source_chain: source_result,
            destination_chain: dest_result,
        }
    }

    /// Settles every trade produced by an order, aggregating results.
    pub async fn settle_order(&self, order_id: u64, trades: &[Trade]) -> OrderSettlementResult {
        let mut settlement_results = Vec::with_capacity(trades.len());
        for trade in trades {
            settlement_results.push(self.settle_trade(order_id, trade).await);
        }
        let successful_settlements = settlement_results.iter().filter(|r| r.success).count();

        OrderSettlementResult {
            settled: true,
            total_trades: trades.len(),
            successful_settlements,
            settlement_results,
            reason: None,
        }
    }

    /// Runs `settle_order` under `timeout`. On timeout, continues settling
    /// in the background and returns `Pending { reason: "timeout" }`
    /// immediately; the caller already has its HTTP response to send.
    pub async fn settle_order_sync(
        self: Arc<Self>,
        order_id: u64,
        trades: Vec<Trade>,
        timeout: Duration,
    ) -> SettlementExecution {
        if trades.is_empty() {
            return SettlementExecution::Settled(OrderSettlementResult {
                settled: false,
                settlement_results: Vec::new(),
                total_trades: 0,
                successful_settlements: 0,
                reason: Some("awaiting_client_signatures".to_string()),
            });
        }

        let coordinator = self.clone();
        let trades_for_task = trades.clone();
        let task = tokio::spawn(async move { coordinator.settle_order(order_id, &trades_for_task).await });

        match tokio::time::timeout(timeout, task).await {
            Ok(Ok(result)) => SettlementExecution::Settled(result),
            Ok(Err(join_err)) => SettlementExecution::Pending {
                reason: format!("settlement task panicked: {join_err}"),
            },
            Err(_) => {
                tracing::warn!(order_id, "settlement did not finish within the sync timeout, continuing in background");
                SettlementExecution::Pending {
                    reason: "timeout".to_string(),
                }
            }
        }
    }

    /// Fires settlement in the background without waiting at all, for
    /// orders submitted in fully-async mode.
    pub fn settle_order_async(self: Arc<Self>, order_id: u64, trades: Vec<Trade>) -> SettlementExecution {
        let coordinator = self;
        tokio::spawn(async move {
            let result = coordinator.settle_order(order_id, &trades).await;
            tracing::info!(order_id, successful = result.successful_settlements, total = result.total_trades, "background settlement finished");
        });
        SettlementExecution::Pending {
            reason: "processing_async".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chain_client::{FakeChainClient, NetworkConfig};
    use exchange_core::Side;
    use std::collections::HashMap;

    fn registry() -> Arc<TokenRegistry> {
        let mut networks = HashMap::new();
        networks.insert(
            "hedera".to_string(),
            NetworkConfig {
                rpc_url: "https://hedera.example".to_string(),
                chain_id: 295,
                contract_address: "0xSettlement".to_string(),
                tokens: HashMap::new(),
            },
        );
        networks.insert(
            "polygon".to_string(),
            NetworkConfig {
                rpc_url: "https://polygon.example".to_string(),
                chain_id: 137,
                contract_address: "0xSettlement2".to_string(),
                tokens: HashMap::new(),
            },
        );
        Arc::new(TokenRegistry::new(networks, HashMap::new()))
    }

    fn party(address: &str, side: Side, network: &str) -> TradeParty {
        TradeParty {
            address: address.to_string(),
            side,
            order_id: 1,
            price: rust_decimal::Decimal::from(100),
            key_ref: None,
            from_network: network.to_string(),
            to_network: network.to_string(),
            receive_wallet: address.to_string(),
        }
    }

    fn seed_escrow(client: &FakeChainClient, network: &str) {
        client.seed_balance(network, "0xseller", "BTC", rust_decimal::Decimal::from(10), rust_decimal::Decimal::ZERO);
        client.seed_balance(
            network,
            "0xbuyer",
            "USDT",
            rust_decimal::Decimal::from(1000),
            rust_decimal::Decimal::ZERO,
        );
    }

    fn trade(party1_network: &str, party2_network: &str) -> Trade {
        Trade {
            timestamp: 1,
            time: 1,
            base: "BTC".to_string(),
            quote: "USDT".to_string(),
            price: rust_decimal::Decimal::from(100),
            quantity: rust_decimal::Decimal::from(2),
            party1: party("0xseller", Side::Ask, party1_network),
            party2: party("0xbuyer", Side::Bid, party2_network),
            signature1: None,
            signature2: None,
        }
    }

    #[tokio::test]
    async fn cross_chain_trade_settles_both_legs() {
        let client = Arc::new(FakeChainClient::new());
        client.seed_owner("hedera", "0xowner");
        client.seed_signer("hedera", "0xowner");
        client.seed_owner("polygon", "0xowner");
        client.seed_signer("polygon", "0xowner");
        seed_escrow(&client, "hedera");
        seed_escrow(&client, "polygon");

        let coordinator = SettlementCoordinator::new(client, registry());
        let result = coordinator.settle_trade(1, &trade("hedera", "polygon")).await;

        assert!(result.success);
        assert!(!result.source_chain.skipped);
        assert!(!result.destination_chain.skipped);
    }

    #[tokio::test]
    async fn same_chain_trade_skips_destination_leg() {
        let client = Arc::new(FakeChainClient::new());
        client.seed_owner("hedera", "0xowner");
        client.seed_signer("hedera", "0xowner");
        seed_escrow(&client, "hedera");

        let coordinator = SettlementCoordinator::new(client, registry());
        let result = coordinator.settle_trade(1, &trade("hedera", "hedera")).await;

        assert!(result.success);
        assert!(result.destination_chain.skipped);
        assert_eq!(
            result.destination_chain.reason.as_deref(),
            Some("same_chain_single_leg")
        );
    }

    #[tokio::test]
    async fn unauthorized_signer_fails_the_leg() {
        let client = Arc::new(FakeChainClient::new());
        client.seed_owner("hedera", "0xowner");
        client.seed_signer("hedera", "0xsomeone_else");

        let coordinator = SettlementCoordinator::new(client, registry());
        let result = coordinator.settle_trade(1, &trade("hedera", "hedera")).await;

        assert!(!result.success);
        assert_eq!(result.source_chain.error.as_deref(), Some("unauthorized_signer"));
    }

    #[tokio::test]
    async fn missing_network_config_fails_trade_without_panicking() {
        let client = Arc::new(FakeChainClient::new());
        let coordinator = SettlementCoordinator::new(client, registry());
        let result = coordinator.settle_trade(1, &trade("hedera", "unknown_chain")).await;

        assert!(!result.success);
        assert_eq!(
            result.source_chain.error.as_deref(),
            Some("network configuration not found")
        );
    }

    #[tokio::test]
    async fn partial_failure_across_trades_does_not_abort_the_order() {
        let client = Arc::new(FakeChainClient::new());
        client.seed_owner("hedera", "0xowner");
        client.seed_signer("hedera", "0xowner");
        client.seed_owner("polygon", "0xowner");
        client.seed_signer("polygon", "0xowner");
        seed_escrow(&client, "hedera");
        seed_escrow(&client, "polygon");
        client.fail_settlement_for("polygon");

        let coordinator = Arc::new(SettlementCoordinator::new(client, registry()));
        let trades = vec![trade("hedera", "hedera"), trade("hedera", "polygon")];
        let result = coordinator.settle_order(1, &trades).await;

        assert_eq!(result.total_trades, 2);
        assert_eq!(result.successful_settlements, 1);
    }

    #[tokio::test]
    async fn empty_trade_list_reports_awaiting_signatures() {
        let client = Arc::new(FakeChainClient::new());
        let coordinator = Arc::new(SettlementCoordinator::new(client, registry()));
        let execution = coordinator.settle_order_sync(1, Vec::new(), Duration::from_secs(1)).await;
        match execution {
            SettlementExecution::Settled(result) => {
                assert!(!result.settled);
                assert_eq!(result.reason.as_deref(), Some("awaiting_client_signatures"));
            }
            SettlementExecution::Pending { .. } => panic!("expected an immediate result"),
        }
    }
}
