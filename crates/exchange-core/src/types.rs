use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Order identifier assigned by the book on rest. `0` is reserved: it marks
/// "no resting order" for taker orders that filled completely or never rested.
pub type OrderId = u64;

pub const NO_RESTING_ORDER: OrderId = 0;

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Bid,
    Ask,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Bid => Side::Ask,
            Side::Ask => Side::Bid,
        }
    }
}

/// Order type. `Market` ignores `price` in matching comparisons and never rests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Limit,
    Market,
}

/// A trading pair, canonicalized as `BASE_QUOTE`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Symbol {
    pub base: String,
    pub quote: String,
}

impl Symbol {
    pub fn new(base: impl Into<String>, quote: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            quote: quote.into(),
        }
    }

    pub fn canonical(&self) -> String {
        format!("{}_{}", self.base, self.quote)
    }

    pub fn parse(canonical: &str) -> Option<Self> {
        let (base, quote) = canonical.split_once('_')?;
        Some(Self::new(base, quote))
    }
}

/// A submitted or resting order.
///
/// `from_network` is where the submitter's funds are escrowed (the source
/// chain of the order); `to_network` is where they receive the counter-asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    #[serde(default)]
    pub order_id: OrderId,
    pub account: String,
    pub side: Side,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    pub price: Decimal,
    pub quantity: Decimal,
    pub base: String,
    pub quote: String,
    pub from_network: String,
    pub to_network: String,
    pub receive_wallet: String,
    pub timestamp: u64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub signature: Option<String>,
}

impl Order {
    pub fn symbol(&self) -> Symbol {
        Symbol::new(self.base.clone(), self.quote.clone())
    }

    /// Whether this order's price crosses `other_price` on `other_price`'s side,
    /// i.e. whether a resting order at `other_price` on the opposite side would
    /// trade against this order. Market orders cross unconditionally.
    pub fn crosses(&self, other_price: Decimal) -> bool {
        match self.order_type {
            OrderType::Market => true,
            OrderType::Limit => match self.side {
                Side::Bid => other_price <= self.price,
                Side::Ask => other_price >= self.price,
            },
        }
    }
}

/// One side of a trade: who it was, on which side, and where their assets
/// live and are destined.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeParty {
    pub address: String,
    pub side: Side,
    pub order_id: OrderId,
    pub price: Decimal,
    /// Opaque reference to whatever will authorize this party's leg of
    /// settlement (e.g. a signer key id). Never a raw secret.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub key_ref: Option<String>,
    pub from_network: String,
    pub to_network: String,
    pub receive_wallet: String,
}

/// A single fill produced by the matching engine. `price` is always the
/// maker's price; `quantity` is `min(taker_remaining, maker_remaining)` at
/// the moment of the match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub timestamp: u64,
    pub time: u64,
    pub base: String,
    pub quote: String,
    pub price: Decimal,
    pub quantity: Decimal,
    pub party1: TradeParty,
    pub party2: TradeParty,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub signature1: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub signature2: Option<String>,
}
