//! Matching engine core: order/trade types, the per-symbol order book, and the
//! append-only activity log. Everything here is pure and deterministic — no
//! wall-clock reads, no I/O inside matching. Callers supply timestamps.

pub mod activity;
pub mod book;
pub mod error;
pub mod types;

pub use activity::{ActivityLog, ActivityRecord};
pub use book::{MatchOutcome, OrderBook};
pub use error::OrderBookError;
pub use types::{Order, OrderId, OrderType, Side, Symbol, Trade, TradeParty, NO_RESTING_ORDER};
