use thiserror::Error;

use crate::types::OrderId;

/// Errors produced by the matching engine itself. Settlement, validation and
/// chain errors live in their own crates.
#[derive(Debug, Error)]
pub enum OrderBookError {
    #[error("order {order_id} not found or already filled")]
    OrderNotFound { order_id: OrderId },

    #[error("unknown symbol {symbol}")]
    UnknownSymbol { symbol: String },
}
