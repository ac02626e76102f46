mod app_state;
mod card;
mod config;
mod crypto;
mod db;
mod handlers;
mod shortener;

use axum::{
    routing::{get, patch},
    Router,
};
use clap::Parser;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use app_state::AppState;
use card::CardProvisioner;
use config::Config;
use db::init_pool;
use handlers::{cards, tap};

fn app(state: AppState) -> Router {
    Router::new()
        // Customer tap endpoint
        .route("/c/{uid}", get(tap::tap_card))
        // Card management endpoints
        .route("/api/cards", get(cards::list_cards).post(cards::create_card))
        .route("/api/cards/{id}", get(cards::get_card).delete(cards::delete_card))
        .route("/api/cards/{id}/verify", get(cards::verify_card))
        .route("/api/cards/{id}/status", patch(cards::update_status))
        // Add middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
        )
        // Add shared state
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nfc_card_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse configuration; missing secrets abort here
    let config = Arc::new(Config::parse());

    // Validate sealing secrets before touching anything else
    let cipher = config.cipher_service()?;
    let provisioner = Arc::new(CardProvisioner::new(
        cipher,
        config.default_merchant_name.clone(),
    ));

    // Initialize database
    let pool = init_pool(&config.database_url).await?;

    if config.gmb_review_link.is_none() {
        tracing::warn!("GMB review link not configured; cards need an explicit gmbUrl to redirect");
    }

    let shortener = shortener::from_settings(
        config.bitly_access_token.as_deref(),
        &config.bitly_api_url,
    )?;

    // Create shared state
    let state = AppState {
        pool,
        config: config.clone(),
        provisioner,
        shortener,
    };

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.socket_addr()).await?;

    tracing::info!("Server running on {}", config.socket_addr());

    axum::serve(listener, app(state)).await?;

    Ok(())
}
