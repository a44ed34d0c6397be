use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chain_client::ChainClient;
use exchange_core::activity::ActivityRecord;
use exchange_core::Side;
use marketmaker::{BotCommand, BotConfig, PriceSource};
use serde_json::{json, Value};
use settlement::SettlementExecution;

use crate::dto::{
    CancelOrderRequest, CheckFundsQuery, CheckFundsResponse, FaucetRequest, KlineQuery, OrderHistoryQuery,
    OrderbookQuery, PriceQuery, RegisterOrderRequest, SettleTradesRequest, SettlementAddressQuery, TradesQuery,
};
use crate::error::ApiError;
use crate::state::Engine;

fn now_secs() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}

fn symbol_key(base: &str, quote: &str) -> String {
    format!("{base}_{quote}")
}

pub async fn register_order<C: ChainClient + 'static>(
    State(engine): State<Arc<Engine<C>>>,
    Json(request): Json<RegisterOrderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let order = request.into_order(now_secs());
    let symbol = symbol_key(&order.base, &order.quote);

    let validation = engine.validator.validate_order(&order).await;
    if !validation.valid {
        return Err(ApiError::bad_request(
            validation.reason.unwrap_or_else(|| "validation_failed".to_string()),
        ));
    }

    let outcome = engine.book(&symbol).lock().expect("book lock poisoned").process_order(order.clone());

    engine.activity.record(ActivityRecord {
        kind: "order_placed".to_string(),
        timestamp: order.timestamp,
        symbol: Some(symbol.clone()),
        data: json!({
            "order_id": outcome.resting_order_id,
            "account": order.account,
            "side": order.side,
        }),
    });

    for trade in &outcome.trades {
        engine.activity.record(ActivityRecord {
            kind: "trade_executed".to_string(),
            timestamp: trade.timestamp,
            symbol: Some(symbol.clone()),
            data: serde_json::to_value(trade).unwrap_or(Value::Null),
        });
    }

    let has_any_signature = outcome
        .trades
        .iter()
        .any(|t| t.signature1.is_some() || t.signature2.is_some());
    // Engine-signed mode settles trades the operator's own key is authorized
    // to move even without a per-trade client signature.
    let awaiting_signatures = engine.config.require_client_signatures && !has_any_signature;

    let settlement = if outcome.trades.is_empty() || awaiting_signatures {
        json!({ "settled": false, "reason": "awaiting_client_signatures" })
    } else if engine.config.settlement_sync {
        let timeout = std::time::Duration::from_secs(engine.config.settlement_sync_timeout_secs);
        match engine
            .settlement
            .clone()
            .settle_order_sync(outcome.resting_order_id, outcome.trades.clone(), timeout)
            .await
        {
            SettlementExecution::Settled(result) => serde_json::to_value(result).unwrap_or(Value::Null),
            SettlementExecution::Pending { reason } => json!({ "settled": false, "reason": reason }),
        }
    } else {
        match engine
            .settlement
            .clone()
            .settle_order_async(outcome.resting_order_id, outcome.trades.clone())
        {
            SettlementExecution::Pending { reason } => json!({ "settled": false, "reason": reason }),
            SettlementExecution::Settled(result) => serde_json::to_value(result).unwrap_or(Value::Null),
        }
    };

    Ok(Json(json!({
        "status_code": 1,
        "order_id": outcome.resting_order_id,
        "trades": outcome.trades,
        "settlement": settlement,
    })))
}

pub async fn cancel_order<C: ChainClient + 'static>(
    State(engine): State<Arc<Engine<C>>>,
    Json(request): Json<CancelOrderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let cancelled = engine
        .book(&request.symbol)
        .lock()
        .expect("book lock poisoned")
        .cancel_order(request.side, request.order_id)?;

    engine.activity.record(ActivityRecord {
        kind: "order_cancelled".to_string(),
        timestamp: now_secs(),
        symbol: Some(request.symbol),
        data: json!({ "order_id": request.order_id, "account": cancelled.account }),
    });

    Ok(Json(json!({ "status_code": 1, "cancelled": true, "order_id": request.order_id })))
}

pub async fn get_order<C: ChainClient + 'static>(
    State(engine): State<Arc<Engine<C>>>,
    Path(order_id): Path<u64>,
    Query(query): Query<OrderbookQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let book = engine.book(&query.symbol);
    let book = book.lock().expect("book lock poisoned");
    let order = book
        .get_order(order_id)
        .ok_or_else(|| ApiError::not_found(format!("order {order_id} not found")))?;
    Ok(Json(json!({ "status_code": 1, "order": order })))
}

pub async fn get_orderbook<C: ChainClient + 'static>(
    State(engine): State<Arc<Engine<C>>>,
    Query(query): Query<OrderbookQuery>,
) -> impl IntoResponse {
    let book = engine.book(&query.symbol);
    let snapshot = book.lock().expect("book lock poisoned").snapshot();
    Json(json!({ "status_code": 1, "orderbook": snapshot }))
}

pub async fn get_trades<C: ChainClient + 'static>(
    State(engine): State<Arc<Engine<C>>>,
    Query(query): Query<TradesQuery>,
) -> impl IntoResponse {
    let limit = query.limit.unwrap_or(100);
    let mut records = engine.activity.recent(1000, query.symbol.as_deref());
    records.retain(|r| r.kind == "trade_executed");
    let start = records.len().saturating_sub(limit);
    Json(json!({ "status_code": 1, "trades": records[start..].to_vec() }))
}

pub async fn order_history<C: ChainClient + 'static>(
    State(engine): State<Arc<Engine<C>>>,
    Query(query): Query<OrderHistoryQuery>,
) -> impl IntoResponse {
    let limit = query.limit.unwrap_or(200);
    let mut records = engine.activity.recent(1000, query.symbol.as_deref());
    records.retain(|r| matches!(r.kind.as_str(), "order_placed" | "order_cancelled" | "trade_executed"));
    let start = records.len().saturating_sub(limit);
    Json(json!({ "status_code": 1, "history": records[start..].to_vec() }))
}

pub async fn get_settlement_address<C: ChainClient + 'static>(
    State(engine): State<Arc<Engine<C>>>,
    Query(query): Query<SettlementAddressQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let address = engine.chain_client.get_signer_address(&query.network).await?;
    Ok(Json(json!({ "status_code": 1, "data": { "settlement_address": address } })))
}

pub async fn get_networks<C: ChainClient + 'static>(State(engine): State<Arc<Engine<C>>>) -> impl IntoResponse {
    let networks: Vec<&String> = engine.registry.network_keys().collect();
    Json(json!({ "status_code": 1, "networks": networks }))
}

pub async fn check_available_funds<C: ChainClient + 'static>(
    State(engine): State<Arc<Engine<C>>>,
    Query(query): Query<CheckFundsQuery>,
) -> impl IntoResponse {
    let book = engine.book(&query.symbol);
    let book = book.lock().expect("book lock poisoned");
    let mut locked = rust_decimal::Decimal::ZERO;
    for order in book.orders_for_account(&query.account) {
        match order.side {
            Side::Ask if order.base == query.asset => locked += order.quantity,
            Side::Bid if order.quote == query.asset => locked += order.quantity * order.price,
            _ => {}
        }
    }
    Json(CheckFundsResponse {
        status_code: 1,
        account: query.account,
        asset: query.asset,
        locked,
    })
}

/// Manually (re-)triggers settlement for a given order's trades, for the
/// client that already has client-side signatures attached and wants the
/// server to retry without re-registering the order.
pub async fn settle_trades<C: ChainClient + 'static>(
    State(engine): State<Arc<Engine<C>>>,
    Json(request): Json<SettleTradesRequest>,
) -> impl IntoResponse {
    let result = engine.settlement.settle_order(request.order_id, &request.trades).await;
    let status_code = if result.settled { 1 } else { 0 };
    Json(json!({ "status_code": status_code, "settlement_info": result }))
}

pub async fn settlement_health<C: ChainClient + 'static>(State(engine): State<Arc<Engine<C>>>) -> impl IntoResponse {
    let mut statuses = serde_json::Map::new();
    let mut all_connected = true;
    for network in engine.registry.network_keys() {
        let reachable = engine.chain_client.get_contract_owner(network).await.is_ok();
        all_connected &= reachable;
        statuses.insert(network.clone(), json!(reachable));
    }
    Json(json!({
        "status_code": 1,
        "status": if all_connected { "ok" } else { "degraded" },
        "web3_connected": statuses,
    }))
}

pub async fn faucet<C: ChainClient + 'static>(
    State(engine): State<Arc<Engine<C>>>,
    Json(request): Json<FaucetRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if engine.config.production {
        return Err(ApiError::bad_request("faucet is disabled in production"));
    }
    engine
        .chain_client
        .mint_token(&request.network, &request.account, &request.token, request.amount)
        .await?;
    Ok(Json(json!({ "status_code": 1, "result": { "minted": true } })))
}

pub async fn price(Query(query): Query<PriceQuery>) -> Result<impl IntoResponse, ApiError> {
    let source = marketmaker::GateioPriceSource::new();
    let price = source
        .reference_price(&query.base, &query.quote)
        .await
        .map_err(|err| ApiError::internal(err))?;
    Ok(Json(json!({ "status_code": 1, "base": query.base, "quote": query.quote, "price": price })))
}

pub async fn kline(Query(query): Query<KlineQuery>) -> Result<impl IntoResponse, ApiError> {
    let pair = format!("{}_{}", query.base.to_uppercase(), query.quote.to_uppercase());
    let url = format!(
        "https://api.gateio.ws/api/v4/spot/candlesticks?currency_pair={pair}&interval={}",
        query.interval
    );
    let body: Value = reqwest::get(&url)
        .await
        .map_err(|err| ApiError::internal(err))?
        .json()
        .await
        .map_err(|err| ApiError::internal(err))?;
    Ok(Json(body))
}

/// Dispatches bot control commands. Mirrors the original's flat
/// `{action, account, ...}` request shape rather than an internally
/// tagged enum, since every action needs `account` to find its driver.
pub async fn bot_command<C: ChainClient + 'static>(
    State(engine): State<Arc<Engine<C>>>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, ApiError> {
    let action = body
        .get("action")
        .and_then(Value::as_str)
        .ok_or_else(|| ApiError::bad_request("missing action"))?;
    let account = body
        .get("account")
        .and_then(Value::as_str)
        .ok_or_else(|| ApiError::bad_request("missing account"))?
        .to_string();

    let response = match action {
        "start" => {
            let config: BotConfig =
                serde_json::from_value(body.clone()).map_err(|err| ApiError::bad_request(err.to_string()))?;
            let symbol = symbol_key(&config.base_asset, &config.quote_asset);
            let driver = engine.market_maker(&account, &symbol);
            driver
                .handle_command(BotCommand::Start(config))
                .await
                .map_err(|err| ApiError::bad_request(err.to_string()))?
        }
        "stop" | "status" | "register" | "cancel" => {
            let driver = engine
                .existing_market_maker(&account)
                .ok_or_else(|| ApiError::not_found("no bot running for this account"))?;
            let command = match action {
                "stop" => BotCommand::Stop,
                "status" => BotCommand::Status,
                "register" => BotCommand::Register,
                _ => BotCommand::Cancel,
            };
            driver
                .handle_command(command)
                .await
                .map_err(|err| ApiError::bad_request(err.to_string()))?
        }
        "modify" => {
            let spread_percentage = body
                .get("spread_percentage")
                .and_then(Value::as_str)
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| ApiError::bad_request("missing spread_percentage"))?;
            let driver = engine
                .existing_market_maker(&account)
                .ok_or_else(|| ApiError::not_found("no bot running for this account"))?;
            driver
                .handle_command(BotCommand::Modify { spread_percentage })
                .await
                .map_err(|err| ApiError::bad_request(err.to_string()))?
        }
        other => return Err(ApiError::bad_request(format!("unknown action {other}"))),
    };

    Ok(Json(json!({ "status_code": 1, "state": response.state, "message": response.message })))
}

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status_code": 1, "status": "ok" })))
}
