//! PharmaTrace backend — entry point.
//!
//! Serves the REST API over the party / catalog / inventory / order store
//! and, when configured, anchors orders on the supply-chain contract
//! through the chain-bridge service.

mod api;
mod cache;
mod chain;
mod config;
mod db;
mod errors;
mod models;
mod orders;

use std::sync::Arc;

use axum::{routing::get, Router};
use reqwest::Client;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use api::ApiState;
use cache::InventoryCache;
use chain::ChainBridge;
use config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging (RUST_LOG controls verbosity).
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Load optional .env file (ignored if missing).
    let _ = dotenvy::dotenv();

    // Load config from environment.
    let config = Config::from_env().map_err(|e| anyhow::anyhow!("{e}"))?;

    // Set up the SQLite connection pool and run migrations.
    let pool = db::init_pool(&config.database_url).await?;

    // HTTP client shared with the chain bridge.
    let client = Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()?;

    let bridge = match (&config.chain_rpc_url, &config.contract_address) {
        (Some(rpc_url), Some(contract)) => {
            info!("Chain bridge enabled — contract: {contract}");
            Some(ChainBridge::new(client, rpc_url.clone(), contract.clone()))
        }
        _ => {
            info!("Chain bridge disabled; orders will not be anchored");
            None
        }
    };

    let state = Arc::new(ApiState {
        pool,
        cache: InventoryCache::new(),
        bridge,
    });

    let app = Router::new()
        .route("/health", get(api::health))
        .route("/parties", get(api::parties::list).post(api::parties::register))
        .route(
            "/parties/:address",
            get(api::parties::get_one).put(api::parties::update),
        )
        .route(
            "/products",
            get(api::products::list).post(api::products::create),
        )
        .route(
            "/products/:id",
            get(api::products::get_one)
                .put(api::products::update)
                .delete(api::products::delete_one),
        )
        .route(
            "/inventory",
            get(api::inventory::list)
                .post(api::inventory::create)
                .put(api::inventory::update)
                .delete(api::inventory::delete_one),
        )
        .route("/orders", get(api::orders::list).post(api::orders::create))
        .route(
            "/orders/:id",
            get(api::orders::get_one)
                .put(api::orders::update)
                .patch(api::orders::patch_chain),
        )
        .route("/orders/:id/chain", get(api::orders::chain_view))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{}", config.api_port);
    info!("API listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
