use std::sync::Arc;
use std::time::Duration;

use chain_client::ChainClient;
use exchange_core::{Order, Side};
use rust_decimal::Decimal;

use crate::result::ValidationResult;

const MAX_DECIMALS_ATTEMPTS: u32 = 3;
const MAX_ESCROW_ATTEMPTS: u32 = 4;
const RETRY_BACKOFF_SECS: f64 = 0.5;

/// Resolves the chain/token an order obligates its submitter on and checks
/// that escrow covers it, retrying transient RPC failures before failing
/// closed.
pub struct Validator<C: ChainClient> {
    client: Arc<C>,
}

impl<C: ChainClient> Validator<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self { client }
    }

    /// Which token and how much an order obligates its submitter for, per
    /// side: an ask locks the base asset it's selling; a bid locks
    /// `quantity * price` of the quote asset it's paying with. Both are
    /// escrowed on the order's `from_network`.
    fn obligation(order: &Order) -> (String, Decimal) {
        match order.side {
            Side::Ask => (order.base.clone(), order.quantity),
            Side::Bid => (order.quote.clone(), order.quantity * order.price),
        }
    }

    async fn resolve_decimals(&self, network: &str, token: &str) -> u32 {
        for attempt in 0..MAX_DECIMALS_ATTEMPTS {
            match self.client.get_token_decimals(network, token).await {
                Ok(decimals) => return decimals,
                Err(err) if !err.is_retryable() => {
                    tracing::warn!(network, token, error = %err, "get_token_decimals failed fatally, using fallback");
                    return chain_client::TokenRegistry::decimals_fallback(token);
                }
                Err(err) => {
                    tracing::warn!(
                        network,
                        token,
                        attempt,
                        error = %err,
                        "get_token_decimals failed, retrying"
                    );
                    if attempt + 1 < MAX_DECIMALS_ATTEMPTS {
                        tokio::time::sleep(Duration::from_secs_f64(
                            RETRY_BACKOFF_SECS * (attempt as f64 + 1.0),
                        ))
                        .await;
                    }
                }
            }
        }
        chain_client::TokenRegistry::decimals_fallback(token)
    }

    pub async fn validate_order(&self, order: &Order) -> ValidationResult {
        let (token, required_amount) = Self::obligation(order);
        let network_key = order.from_network.clone();

        // Decimals aren't used in the comparison itself (both sides are
        // already in human units), but a live decimals() call doubles as an
        // early signal that the token contract is reachable on this chain.
        let _decimals = self.resolve_decimals(&network_key, &token).await;

        let mut last_error = None;
        for attempt in 0..MAX_ESCROW_ATTEMPTS {
            match self
                .client
                .check_escrow_balance(&network_key, &order.account, &token)
                .await
            {
                Ok(balance) => {
                    if balance.available >= required_amount {
                        return ValidationResult {
                            valid: true,
                            reason: None,
                            network_key,
                            token,
                            required_amount,
                            available: balance.available,
                        };
                    }
                    return ValidationResult {
                        valid: false,
                        reason: Some("insufficient_escrow".to_string()),
                        network_key,
                        token,
                        required_amount,
                        available: balance.available,
                    };
                }
                Err(err) if !err.is_retryable() => {
                    return ValidationResult::reject(
                        network_key,
                        token,
                        format!("escrow_check_failed: {err}"),
                    );
                }
                Err(err) => {
                    tracing::warn!(
                        network = %network_key,
                        token,
                        attempt,
                        error = %err,
                        "check_escrow_balance failed, retrying"
                    );
                    last_error = Some(err);
                    if attempt + 1 < MAX_ESCROW_ATTEMPTS {
                        tokio::time::sleep(Duration::from_secs_f64(
                            RETRY_BACKOFF_SECS * (attempt as f64 + 1.0),
                        ))
                        .await;
                    }
                }
            }
        }

        let reason = last_error
            .map(|err| format!("escrow_check_failed: {err}"))
            .unwrap_or_else(|| "escrow_check_failed".to_string());
        ValidationResult::reject(network_key, token, reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chain_client::FakeChainClient;
    use exchange_core::OrderType;

    fn order(side: Side, price: i64, quantity: i64) -> Order {
        Order {
            order_id: 0,
            account: "0xabc".to_string(),
            side,
            order_type: OrderType::Limit,
            price: Decimal::from(price),
            quantity: Decimal::from(quantity),
            base: "BTC".to_string(),
            quote: "USDT".to_string(),
            from_network: "hedera".to_string(),
            to_network: "polygon".to_string(),
            receive_wallet: "0xabc".to_string(),
            timestamp: 1,
            signature: None,
        }
    }

    #[tokio::test]
    async fn ask_requires_base_asset_quantity() {
        let fake = Arc::new(FakeChainClient::new());
        fake.seed_balance("hedera", "0xabc", "BTC", Decimal::from(10), Decimal::ZERO);
        let validator = Validator::new(fake);

        let result = validator.validate_order(&order(Side::Ask, 100, 5)).await;
        assert!(result.valid);
        assert_eq!(result.token, "BTC");
        assert_eq!(result.required_amount, Decimal::from(5));
    }

    #[tokio::test]
    async fn bid_requires_quantity_times_price_in_quote_asset() {
        let fake = Arc::new(FakeChainClient::new());
        fake.seed_balance("hedera", "0xabc", "USDT", Decimal::from(1000), Decimal::ZERO);
        let validator = Validator::new(fake);

        let result = validator.validate_order(&order(Side::Bid, 100, 5)).await;
        assert!(result.valid);
        assert_eq!(result.token, "USDT");
        assert_eq!(result.required_amount, Decimal::from(500));
    }

    #[tokio::test]
    async fn insufficient_escrow_is_rejected() {
        let fake = Arc::new(FakeChainClient::new());
        fake.seed_balance("hedera", "0xabc", "USDT", Decimal::from(100), Decimal::ZERO);
        let validator = Validator::new(fake);

        let result = validator.validate_order(&order(Side::Bid, 100, 5)).await;
        assert!(!result.valid);
        assert_eq!(result.reason.as_deref(), Some("insufficient_escrow"));
    }
}
