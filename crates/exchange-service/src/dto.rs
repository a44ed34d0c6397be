use exchange_core::{Order, OrderType, Side, Trade};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Wire shape for `POST /api/register_order`. The server assigns
/// `order_id` and `timestamp`; everything else comes from the client.
#[derive(Debug, Deserialize)]
pub struct RegisterOrderRequest {
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
    #[serde(default)]
    pub receive_wallet: Option<String>,
    #[serde(default)]
    pub signature: Option<String>,
}

impl RegisterOrderRequest {
    pub fn into_order(self, timestamp: u64) -> Order {
        let receive_wallet = self.receive_wallet.unwrap_or_else(|| self.account.clone());
        Order {
            order_id: 0,
            account: self.account,
            side: self.side,
            order_type: self.order_type,
            price: self.price,
            quantity: self.quantity,
            base: self.base,
            quote: self.quote,
            from_network: self.from_network,
            to_network: self.to_network,
            receive_wallet,
            timestamp,
            signature: self.signature,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CancelOrderRequest {
    pub symbol: String,
    pub side: Side,
    pub order_id: u64,
}

#[derive(Debug, Deserialize)]
pub struct OrderHistoryQuery {
    pub symbol: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct TradesQuery {
    pub symbol: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct OrderbookQuery {
    pub symbol: String,
}

#[derive(Debug, Deserialize)]
pub struct SettlementAddressQuery {
    pub network: String,
}

#[derive(Debug, Deserialize)]
pub struct CheckFundsQuery {
    pub account: String,
    pub symbol: String,
    pub asset: String,
}

#[derive(Debug, Serialize)]
pub struct CheckFundsResponse {
    pub status_code: u8,
    pub account: String,
    pub asset: String,
    pub locked: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct SettleTradesRequest {
    pub order_id: u64,
    pub trades: Vec<Trade>,
}

#[derive(Debug, Deserialize)]
pub struct FaucetRequest {
    pub network: String,
    pub account: String,
    pub token: String,
    pub amount: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct PriceQuery {
    pub base: String,
    pub quote: String,
}

#[derive(Debug, Deserialize)]
pub struct KlineQuery {
    pub base: String,
    pub quote: String,
    #[serde(default = "default_interval")]
    pub interval: String,
}

fn default_interval() -> String {
    "1m".to_string()
}
