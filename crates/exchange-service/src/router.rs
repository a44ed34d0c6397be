use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use chain_client::ChainClient;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::Engine;

/// Builds the full HTTP router. CORS is permissive (`Any` origin, method,
/// and header) to match the original service, which ran behind no
/// authentication of its own and expected callers from arbitrary origins.
pub fn build_router<C: ChainClient + 'static>(engine: Arc<Engine<C>>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/register_order", post(handlers::register_order::<C>))
        .route("/api/cancel_order", post(handlers::cancel_order::<C>))
        .route("/api/order/{order_id}", get(handlers::get_order::<C>))
        .route("/api/orderbook", get(handlers::get_orderbook::<C>))
        .route("/api/trades", get(handlers::get_trades::<C>))
        .route("/api/order_history", get(handlers::order_history::<C>))
        .route("/api/get_settlement_address", get(handlers::get_settlement_address::<C>))
        .route("/api/networks", get(handlers::get_networks::<C>))
        .route("/api/check_available_funds", get(handlers::check_available_funds::<C>))
        .route("/api/settle_trades", post(handlers::settle_trades::<C>))
        .route("/api/settlement_health", get(handlers::settlement_health::<C>))
        .route("/api/faucet", post(handlers::faucet::<C>))
        .route("/api/price", get(handlers::price))
        .route("/api/kline", get(handlers::kline))
        .route("/bot/command", post(handlers::bot_command::<C>))
        .route("/healthz", get(handlers::health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(engine)
}
