use std::collections::{BTreeMap, HashMap, VecDeque};

use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::OrderBookError;
use crate::types::{Order, OrderId, OrderType, Side, Trade, TradeParty, NO_RESTING_ORDER};

/// Orders resting at one price, in strict arrival order (FIFO).
#[derive(Debug, Default, Clone, Serialize)]
pub struct PriceLevel {
    pub orders: VecDeque<Order>,
}

impl PriceLevel {
    fn total_quantity(&self) -> Decimal {
        self.orders.iter().map(|o| o.quantity).sum()
    }
}

/// A snapshot of one side of the book, ordered for display (best price first).
#[derive(Debug, Serialize)]
pub struct LevelSnapshot {
    pub price: Decimal,
    pub quantity: Decimal,
    pub order_count: usize,
}

#[derive(Debug, Serialize)]
pub struct BookSnapshot {
    pub symbol: String,
    pub bids: Vec<LevelSnapshot>,
    pub asks: Vec<LevelSnapshot>,
}

/// Outcome of submitting a taker order to the book.
#[derive(Debug)]
pub struct MatchOutcome {
    pub trades: Vec<Trade>,
    /// `NO_RESTING_ORDER` (0) if the order fully filled or was a market order
    /// that didn't rest.
    pub resting_order_id: OrderId,
}

/// A single-symbol, price-time priority order book.
///
/// Bids are indexed descending (best = highest price), asks ascending
/// (best = lowest price). Determinism holds because FIFO arrival order is
/// preserved by insertion into `VecDeque`, and matching never reads the
/// clock — callers pass `timestamp` in.
pub struct OrderBook {
    pub symbol: String,
    bids: BTreeMap<Decimal, PriceLevel>,
    asks: BTreeMap<Decimal, PriceLevel>,
    /// order_id -> (side, price) for O(log P) cancellation.
    index: HashMap<OrderId, (Side, Decimal)>,
    next_order_id: OrderId,
}

impl OrderBook {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            index: HashMap::new(),
            next_order_id: 1,
        }
    }

    pub fn best_bid(&self) -> Option<Decimal> {
        self.bids.keys().next_back().copied()
    }

    pub fn best_ask(&self) -> Option<Decimal> {
        self.asks.keys().next().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    fn side_book_mut(&mut self, side: Side) -> &mut BTreeMap<Decimal, PriceLevel> {
        match side {
            Side::Bid => &mut self.bids,
            Side::Ask => &mut self.asks,
        }
    }

    fn side_book(&self, side: Side) -> &BTreeMap<Decimal, PriceLevel> {
        match side {
            Side::Bid => &self.bids,
            Side::Ask => &self.asks,
        }
    }

    /// Best opposite-side price for `side`, i.e. the price a taker on `side`
    /// would need to cross.
    fn best_opposite(&self, side: Side) -> Option<Decimal> {
        match side.opposite() {
            Side::Bid => self.best_bid(),
            Side::Ask => self.best_ask(),
        }
    }

    /// Runs the match phase for `taker`, then (for limit orders with
    /// remaining quantity) the rest phase. Returns the produced trades and
    /// the resting order id, if any.
    pub fn process_order(&mut self, mut taker: Order) -> MatchOutcome {
        let mut trades = Vec::new();
        let opposite_side = taker.side.opposite();

        while taker.quantity > Decimal::ZERO {
            let Some(best_price) = self.best_opposite(taker.side) else {
                break;
            };
            if !taker.crosses(best_price) {
                break;
            }

            let opposite_book = self.side_book_mut(opposite_side);
            let level = opposite_book
                .get_mut(&best_price)
                .expect("best price must have a level");

            let maker = level.orders.front_mut().expect("non-empty level");
            let fill = taker.quantity.min(maker.quantity);

            let trade = Trade {
                timestamp: taker.timestamp,
                time: taker.timestamp,
                base: taker.base.clone(),
                quote: taker.quote.clone(),
                price: maker.price,
                quantity: fill,
                party1: trade_party(maker),
                party2: trade_party(&taker),
                signature1: maker.signature.clone(),
                signature2: taker.signature.clone(),
            };

            maker.quantity -= fill;
            taker.quantity -= fill;

            if maker.quantity == Decimal::ZERO {
                let filled = level.orders.pop_front().expect("front exists");
                self.index.remove(&filled.order_id);
                if level.orders.is_empty() {
                    opposite_book.remove(&best_price);
                }
            }

            trades.push(trade);
        }

        let resting_order_id = if taker.quantity > Decimal::ZERO && taker.order_type == OrderType::Limit {
            let id = self.next_order_id;
            self.next_order_id += 1;
            taker.order_id = id;

            let price = taker.price;
            let side = taker.side;
            self.side_book_mut(side)
                .entry(price)
                .or_default()
                .orders
                .push_back(taker);
            self.index.insert(id, (side, price));
            id
        } else {
            NO_RESTING_ORDER
        };

        MatchOutcome {
            trades,
            resting_order_id,
        }
    }

    /// Cancels a resting order. Errors if `order_id` doesn't exist on `side`
    /// (cancelling a non-existent or already-filled id is an error, not a
    /// no-op).
    pub fn cancel_order(&mut self, side: Side, order_id: OrderId) -> Result<Order, OrderBookError> {
        let Some(&(indexed_side, price)) = self.index.get(&order_id) else {
            return Err(OrderBookError::OrderNotFound { order_id });
        };
        if indexed_side != side {
            return Err(OrderBookError::OrderNotFound { order_id });
        }

        let book = self.side_book_mut(side);
        let level = book.get_mut(&price).ok_or(OrderBookError::OrderNotFound { order_id })?;
        let pos = level
            .orders
            .iter()
            .position(|o| o.order_id == order_id)
            .ok_or(OrderBookError::OrderNotFound { order_id })?;
        let removed = level
            .orders
            .remove(pos)
            .expect("position was just located");

        if level.orders.is_empty() {
            book.remove(&price);
        }
        self.index.remove(&order_id);

        Ok(removed)
    }

    pub fn get_order(&self, order_id: OrderId) -> Option<&Order> {
        let &(side, price) = self.index.get(&order_id)?;
        self.side_book(side)
            .get(&price)?
            .orders
            .iter()
            .find(|o| o.order_id == order_id)
    }

    /// All resting orders belonging to `account`, across both sides.
    pub fn orders_for_account<'a>(&'a self, account: &'a str) -> impl Iterator<Item = &'a Order> + 'a {
        self.bids
            .values()
            .chain(self.asks.values())
            .flat_map(|level| level.orders.iter())
            .filter(move |o| o.account == account)
    }

    pub fn snapshot(&self) -> BookSnapshot {
        let to_levels = |book: &BTreeMap<Decimal, PriceLevel>, descending: bool| {
            let mut levels: Vec<LevelSnapshot> = book
                .iter()
                .map(|(price, level)| LevelSnapshot {
                    price: *price,
                    quantity: level.total_quantity(),
                    order_count: level.orders.len(),
                })
                .collect();
            if descending {
                levels.reverse();
            }
            levels
        };

        BookSnapshot {
            symbol: self.symbol.clone(),
            bids: to_levels(&self.bids, true),
            asks: to_levels(&self.asks, false),
        }
    }
}

fn trade_party(order: &Order) -> TradeParty {
    TradeParty {
        address: order.account.clone(),
        side: order.side,
        order_id: order.order_id,
        price: order.price,
        key_ref: order.signature.clone(),
        from_network: order.from_network.clone(),
        to_network: order.to_network.clone(),
        receive_wallet: order.receive_wallet.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(
        account: &str,
        side: Side,
        order_type: OrderType,
        price: i64,
        quantity: i64,
        timestamp: u64,
    ) -> Order {
        Order {
            order_id: 0,
            account: account.to_string(),
            side,
            order_type,
            price: Decimal::from(price),
            quantity: Decimal::from(quantity),
            base: "BTC".to_string(),
            quote: "USDT".to_string(),
            from_network: "hedera".to_string(),
            to_network: "polygon".to_string(),
            receive_wallet: account.to_string(),
            timestamp,
            signature: None,
        }
    }

    #[test]
    fn single_cross() {
        let mut book = OrderBook::new("BTC_USDT");
        let ask = order("seller", Side::Ask, OrderType::Limit, 100, 5, 1);
        let outcome = book.process_order(ask);
        assert!(outcome.trades.is_empty());
        assert_ne!(outcome.resting_order_id, 0);

        let bid = order("buyer", Side::Bid, OrderType::Limit, 100, 3, 2);
        let outcome = book.process_order(bid);
        assert_eq!(outcome.trades.len(), 1);
        assert_eq!(outcome.trades[0].quantity, Decimal::from(3));
        assert_eq!(outcome.trades[0].price, Decimal::from(100));
        assert_eq!(outcome.resting_order_id, 0);

        let resting = book.get_order(1).expect("ask still resting");
        assert_eq!(resting.quantity, Decimal::from(2));
    }

    #[test]
    fn fifo_at_same_price() {
        let mut book = OrderBook::new("BTC_USDT");
        book.process_order(order("s1", Side::Ask, OrderType::Limit, 100, 2, 1));
        book.process_order(order("s2", Side::Ask, OrderType::Limit, 100, 2, 2));

        let outcome = book.process_order(order("buyer", Side::Bid, OrderType::Limit, 100, 3, 3));
        assert_eq!(outcome.trades.len(), 2);
        assert_eq!(outcome.trades[0].party1.address, "s1");
        assert_eq!(outcome.trades[0].quantity, Decimal::from(2));
        assert_eq!(outcome.trades[1].party1.address, "s2");
        assert_eq!(outcome.trades[1].quantity, Decimal::from(1));

        let resting = book.get_order(2).expect("s2 partially filled, still resting");
        assert_eq!(resting.quantity, Decimal::from(1));
    }

    #[test]
    fn price_improvement() {
        let mut book = OrderBook::new("BTC_USDT");
        book.process_order(order("s1", Side::Ask, OrderType::Limit, 100, 5, 1));
        book.process_order(order("s2", Side::Ask, OrderType::Limit, 101, 5, 2));

        let outcome = book.process_order(order("buyer", Side::Bid, OrderType::Limit, 101, 7, 3));
        assert_eq!(outcome.trades.len(), 2);
        assert_eq!(outcome.trades[0].price, Decimal::from(100));
        assert_eq!(outcome.trades[0].quantity, Decimal::from(5));
        assert_eq!(outcome.trades[1].price, Decimal::from(101));
        assert_eq!(outcome.trades[1].quantity, Decimal::from(2));

        assert_eq!(book.best_ask(), Some(Decimal::from(101)));
        let resting = book.get_order(2).unwrap();
        assert_eq!(resting.quantity, Decimal::from(3));
    }

    #[test]
    fn market_order_against_empty_side_does_not_rest() {
        let mut book = OrderBook::new("BTC_USDT");
        let outcome = book.process_order(order("buyer", Side::Bid, OrderType::Market, 0, 5, 1));
        assert!(outcome.trades.is_empty());
        assert_eq!(outcome.resting_order_id, 0);
        assert!(book.is_empty());
    }

    #[test]
    fn cancel_removes_order_and_empty_level() {
        let mut book = OrderBook::new("BTC_USDT");
        book.process_order(order("s1", Side::Ask, OrderType::Limit, 100, 5, 1));
        let cancelled = book.cancel_order(Side::Ask, 1).expect("order exists");
        assert_eq!(cancelled.account, "s1");
        assert!(book.is_empty());
        assert_eq!(book.best_ask(), None);
    }

    #[test]
    fn cancel_unknown_order_is_error() {
        let mut book = OrderBook::new("BTC_USDT");
        let err = book.cancel_order(Side::Ask, 42).unwrap_err();
        assert!(matches!(err, OrderBookError::OrderNotFound { order_id: 42 }));
    }

    #[test]
    fn place_then_cancel_restores_book() {
        let mut book = OrderBook::new("BTC_USDT");
        book.process_order(order("s1", Side::Ask, OrderType::Limit, 100, 5, 1));
        let before = book.snapshot();
        book.process_order(order("s2", Side::Ask, OrderType::Limit, 101, 2, 2));
        book.cancel_order(Side::Ask, 2).unwrap();
        let after = book.snapshot();
        assert_eq!(
            serde_json::to_string(&before).unwrap(),
            serde_json::to_string(&after).unwrap()
        );
    }

    #[test]
    fn quantity_equal_to_remaining_removes_level() {
        let mut book = OrderBook::new("BTC_USDT");
        book.process_order(order("s1", Side::Ask, OrderType::Limit, 100, 5, 1));
        let outcome = book.process_order(order("buyer", Side::Bid, OrderType::Limit, 100, 5, 2));
        assert_eq!(outcome.trades.len(), 1);
        assert_eq!(book.best_ask(), None);
    }
}
