mod config;
mod dto;
mod error;
mod handlers;
mod router;
mod state;

use std::sync::Arc;

use chain_client::EthersChainClient;
use ethers::signers::LocalWallet;

use config::Config;
use state::Engine;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if dotenvy::dotenv().is_err() {
        eprintln!("no .env file found, continuing with process environment only");
    }

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::from_env()?;
    let registry = Arc::new(config.build_token_registry());

    let wallet: LocalWallet = config
        .signer_private_key
        .parse()
        .map_err(|err| anyhow::anyhow!("invalid PRIVATE_KEY: {err}"))?;
    let chain_client = Arc::new(EthersChainClient::new(registry.clone(), wallet));

    let host = config.host.clone();
    let port = config.port;
    let engine = Arc::new(Engine::new(config, registry, chain_client));

    let app = router::build_router(engine);

    let addr = format!("{host}:{port}");
    tracing::info!(%addr, "starting exchange service");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
