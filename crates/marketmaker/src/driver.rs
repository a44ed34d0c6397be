use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use exchange_core::{Order, OrderBook, OrderType, Side};
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::{Mutex, Notify};

use crate::error::DriverError;
use crate::price_source::PriceSource;
use crate::types::{BotCommand, BotConfig, CommandResponse};

const TICK_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BotState {
    Idle,
    Running,
    Stopping,
}

/// Runs the 60-second quote loop for one account: resolve a reference
/// price, compute a bid/ask spread around it, cancel the previous tick's
/// quotes, and place new ones.
pub struct MarketMakerDriver<P: PriceSource> {
    price_source: Arc<P>,
    book: Arc<StdMutex<OrderBook>>,
    state: Mutex<BotState>,
    config: Mutex<Option<BotConfig>>,
    current_orders: Mutex<Vec<u64>>,
    stop_notify: Notify,
}

impl<P: PriceSource + 'static> MarketMakerDriver<P> {
    pub fn new(price_source: Arc<P>, book: Arc<StdMutex<OrderBook>>) -> Arc<Self> {
        Arc::new(Self {
            price_source,
            book,
            state: Mutex::new(BotState::Idle),
            config: Mutex::new(None),
            current_orders: Mutex::new(Vec::new()),
            stop_notify: Notify::new(),
        })
    }

    pub async fn state(&self) -> BotState {
        *self.state.lock().await
    }

    pub async fn handle_command(self: &Arc<Self>, command: BotCommand) -> Result<CommandResponse, DriverError> {
        match command {
            BotCommand::Start(config) => self.start(config).await,
            BotCommand::Stop => self.stop().await,
            BotCommand::Status => Ok(CommandResponse {
                state: self.state().await,
                message: None,
            }),
            BotCommand::Register => self.register().await,
            BotCommand::Cancel => self.cancel().await,
            BotCommand::Modify { spread_percentage } => self.modify_spread(spread_percentage).await,
        }
    }

    async fn start(self: &Arc<Self>, config: BotConfig) -> Result<CommandResponse, DriverError> {
        let mut state = self.state.lock().await;
        if *state == BotState::Running {
            return Err(DriverError::AlreadyRunning);
        }
        *state = BotState::Running;
        *self.config.lock().await = Some(config);
        drop(state);

        let driver = self.clone();
        tokio::spawn(async move { driver.run_loop().await });

        Ok(CommandResponse {
            state: BotState::Running,
            message: None,
        })
    }

    async fn stop(self: &Arc<Self>) -> Result<CommandResponse, DriverError> {
        let mut state = self.state.lock().await;
        if *state != BotState::Running {
            return Err(DriverError::NotRunning);
        }
        *state = BotState::Stopping;
        drop(state);

        self.stop_notify.notify_waiters();
        self.cancel_all_quotes().await;

        *self.state.lock().await = BotState::Idle;
        Ok(CommandResponse {
            state: BotState::Idle,
            message: None,
        })
    }

    /// Forces an immediate quote update, without waiting for the next tick.
    async fn register(self: &Arc<Self>) -> Result<CommandResponse, DriverError> {
        if self.state().await != BotState::Running {
            return Err(DriverError::NotRunning);
        }
        self.tick().await;
        Ok(CommandResponse {
            state: self.state().await,
            message: Some("quotes refreshed".to_string()),
        })
    }

    /// Cancels every order currently resting from this bot's last tick.
    async fn cancel(&self) -> Result<CommandResponse, DriverError> {
        if self.state().await != BotState::Running {
            return Err(DriverError::NotRunning);
        }
        self.cancel_all_quotes().await;
        Ok(CommandResponse {
            state: self.state().await,
            message: Some("orders cancelled".to_string()),
        })
    }

    async fn modify_spread(&self, spread_percentage: Decimal) -> Result<CommandResponse, DriverError> {
        let mut config = self.config.lock().await;
        match config.as_mut() {
            Some(config) => {
                config.spread_percentage = spread_percentage;
                Ok(CommandResponse {
                    state: self.state().await,
                    message: None,
                })
            }
            None => Err(DriverError::NotRunning),
        }
    }

    fn cancel_in_book(&self, order_id: u64, side: Side) {
        let mut book = self.book.lock().expect("order book lock poisoned");
        let _ = book.cancel_order(side, order_id);
    }

    async fn cancel_all_quotes(&self) {
        let mut orders = self.current_orders.lock().await;
        for order_id in orders.drain(..) {
            self.cancel_in_book(order_id, Side::Bid);
            self.cancel_in_book(order_id, Side::Ask);
        }
    }

    async fn run_loop(self: Arc<Self>) {
        loop {
            tokio::select! {
                _ = tokio::time::sleep(TICK_INTERVAL) => {}
                _ = self.stop_notify.notified() => break,
            }
            if self.state().await != BotState::Running {
                break;
            }
            self.tick().await;
        }
    }

    async fn tick(&self) {
        let config = {
            let guard = self.config.lock().await;
            match guard.clone() {
                Some(config) => config,
                None => return,
            }
        };

        let reference_price = match self.resolve_reference_price(&config).await {
            Ok(price) => price,
            Err(err) => {
                tracing::warn!(account = %config.account, error = %err, "skipping market-maker tick: no reference price");
                return;
            }
        };

        let (bid_price, ask_price) = calculate_market_prices(reference_price, config.spread_percentage);
        self.cancel_all_quotes().await;

        let mut new_orders = Vec::with_capacity(2);
        let now = self.next_timestamp();
        for (side, price) in [(Side::Bid, bid_price), (Side::Ask, ask_price)] {
            let order = Order {
                order_id: 0,
                account: config.account.clone(),
                side,
                order_type: OrderType::Limit,
                price,
                quantity: config.quantity,
                base: config.base_asset.clone(),
                quote: config.quote_asset.clone(),
                from_network: config.from_network.clone(),
                to_network: config.to_network.clone(),
                receive_wallet: config.account.clone(),
                timestamp: now,
                signature: None,
            };
            let outcome = self.book.lock().expect("order book lock poisoned").process_order(order);
            if outcome.resting_order_id != exchange_core::NO_RESTING_ORDER {
                new_orders.push(outcome.resting_order_id);
            }
        }
        *self.current_orders.lock().await = new_orders;
    }

    fn next_timestamp(&self) -> u64 {
        // Matching is deterministic and never reads the clock; the driver is
        // the one caller that legitimately needs "now" to stamp its quotes.
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }

    async fn resolve_reference_price(&self, config: &BotConfig) -> Result<Decimal, DriverError> {
        if let Some(price) = config.reference_price {
            return Ok(price);
        }
        if let Ok(price) = self
            .price_source
            .reference_price(&config.base_asset, &config.quote_asset)
            .await
        {
            return Ok(price);
        }
        self.local_reference_price()
    }

    fn local_reference_price(&self) -> Result<Decimal, DriverError> {
        // Offset applied when only one side of the book has resting
        // liquidity, so the bot still quotes a sane two-sided market
        // instead of erroring out.
        let one_sided_offset_percent = Decimal::new(1, 3); // 0.001
        let book = self.book.lock().expect("order book lock poisoned");
        match (book.best_bid(), book.best_ask()) {
            (Some(bid), Some(ask)) => Ok((bid + ask) / Decimal::from(2)),
            (Some(bid), None) => Ok(bid + bid * one_sided_offset_percent),
            (None, Some(ask)) => Ok(ask - ask * one_sided_offset_percent),
            (None, None) => Err(DriverError::NoReferencePrice),
        }
    }
}

/// `bid = reference - spread/2`, `ask = reference + spread/2`, where
/// `spread = reference * spread_percentage / 100`.
pub fn calculate_market_prices(reference_price: Decimal, spread_percentage: Decimal) -> (Decimal, Decimal) {
    let spread = reference_price * spread_percentage / Decimal::from(100);
    let half = spread / Decimal::from(2);
    (reference_price - half, reference_price + half)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::price_source::PriceSourceError;
    use async_trait::async_trait;

    struct FixedPrice(Option<Decimal>);

    #[async_trait]
    impl PriceSource for FixedPrice {
        async fn reference_price(&self, _base: &str, _quote: &str) -> Result<Decimal, PriceSourceError> {
            self.0.ok_or_else(|| PriceSourceError::NoPrice("BTC".into(), "USDT".into()))
        }
    }

    #[test]
    fn spread_calculation_matches_original_formula() {
        let (bid, ask) = calculate_market_prices(Decimal::from(100), Decimal::new(5, 1));
        assert_eq!(bid, Decimal::new(9975, 2)); // 99.75
        assert_eq!(ask, Decimal::new(10025, 2)); // 100.25
    }

    #[tokio::test]
    async fn manual_override_takes_priority_over_upstream() {
        let book = Arc::new(StdMutex::new(OrderBook::new("BTC_USDT")));
        let driver = MarketMakerDriver::new(Arc::new(FixedPrice(Some(Decimal::from(50)))), book);
        let config = BotConfig {
            account: "0xmm".to_string(),
            base_asset: "BTC".to_string(),
            quote_asset: "USDT".to_string(),
            quantity: Decimal::from(1),
            spread_percentage: Decimal::new(5, 1),
            reference_price: Some(Decimal::from(200)),
            from_network: "hedera".to_string(),
            to_network: "hedera".to_string(),
        };
        let price = driver.resolve_reference_price(&config).await.unwrap();
        assert_eq!(price, Decimal::from(200));
    }

    #[tokio::test]
    async fn falls_back_to_local_book_mid_when_upstream_unavailable() {
        let book = Arc::new(StdMutex::new(OrderBook::new("BTC_USDT")));
        {
            let mut book = book.lock().unwrap();
            book.process_order(Order {
                order_id: 0,
                account: "s1".to_string(),
                side: Side::Ask,
                order_type: OrderType::Limit,
                price: Decimal::from(110),
                quantity: Decimal::from(1),
                base: "BTC".to_string(),
                quote: "USDT".to_string(),
                from_network: "hedera".to_string(),
                to_network: "hedera".to_string(),
                receive_wallet: "s1".to_string(),
                timestamp: 1,
                signature: None,
            });
            book.process_order(Order {
                order_id: 0,
                account: "b1".to_string(),
                side: Side::Bid,
                order_type: OrderType::Limit,
                price: Decimal::from(90),
                quantity: Decimal::from(1),
                base: "BTC".to_string(),
                quote: "USDT".to_string(),
                from_network: "hedera".to_string(),
                to_network: "hedera".to_string(),
                receive_wallet: "b1".to_string(),
                timestamp: 1,
                signature: None,
            });
        }

        let driver = MarketMakerDriver::new(Arc::new(FixedPrice(None)), book);
        let config = BotConfig {
            account: "0xmm".to_string(),
            base_asset: "BTC".to_string(),
            quote_asset: "USDT".to_string(),
            quantity: Decimal::from(1),
            spread_percentage: Decimal::new(5, 1),
            reference_price: None,
            from_network: "hedera".to_string(),
            to_network: "hedera".to_string(),
        };
        let price = driver.resolve_reference_price(&config).await.unwrap();
        assert_eq!(price, Decimal::from(100));
    }

    #[tokio::test]
    async fn start_twice_is_rejected() {
        let book = Arc::new(StdMutex::new(OrderBook::new("BTC_USDT")));
        let driver = MarketMakerDriver::new(Arc::new(FixedPrice(Some(Decimal::from(100)))), book);
        let config = BotConfig {
            account: "0xmm".to_string(),
            base_asset: "BTC".to_string(),
            quote_asset: "USDT".to_string(),
            quantity: Decimal::from(1),
            spread_percentage: Decimal::new(5, 1),
            reference_price: Some(Decimal::from(100)),
            from_network: "hedera".to_string(),
            to_network: "hedera".to_string(),
        };
        driver.handle_command(BotCommand::Start(config.clone())).await.unwrap();
        let err = driver.handle_command(BotCommand::Start(config)).await.unwrap_err();
        assert!(matches!(err, DriverError::AlreadyRunning));
    }

    #[tokio::test]
    async fn register_places_quotes_immediately_and_cancel_clears_them() {
        let book = Arc::new(StdMutex::new(OrderBook::new("BTC_USDT")));
        let driver = MarketMakerDriver::new(Arc::new(FixedPrice(Some(Decimal::from(100)))), book.clone());
        let config = BotConfig {
            account: "0xmm".to_string(),
            base_asset: "BTC".to_string(),
            quote_asset: "USDT".to_string(),
            quantity: Decimal::from(1),
            spread_percentage: Decimal::new(5, 1),
            reference_price: Some(Decimal::from(100)),
            from_network: "hedera".to_string(),
            to_network: "hedera".to_string(),
        };
        driver.handle_command(BotCommand::Start(config)).await.unwrap();
        driver.handle_command(BotCommand::Register).await.unwrap();
        assert_eq!(driver.current_orders.lock().await.len(), 2);

        driver.handle_command(BotCommand::Cancel).await.unwrap();
        assert!(driver.current_orders.lock().await.is_empty());
    }

    #[tokio::test]
    async fn register_and_cancel_require_a_running_bot() {
        let book = Arc::new(StdMutex::new(OrderBook::new("BTC_USDT")));
        let driver = MarketMakerDriver::new(Arc::new(FixedPrice(Some(Decimal::from(100)))), book);
        assert!(matches!(
            driver.handle_command(BotCommand::Register).await.unwrap_err(),
            DriverError::NotRunning
        ));
        assert!(matches!(
            driver.handle_command(BotCommand::Cancel).await.unwrap_err(),
            DriverError::NotRunning
        ));
    }
}
