//! Supply Desk - chat dialogue for filing supply requests
//!
//! A Rust service implementing a per-conversation state machine that walks a
//! user through building a request and hands the result to procurement.

mod api;
mod attachments;
mod calendar;
mod config;
mod request;
mod runtime;
mod session;
mod state_machine;

use api::{create_router, AppState, HttpTransport};
use config::AppConfig;
use runtime::{FlowExecutor, FlowRuntime, HttpBlobStore, SheetFormatter, WebhookNotifier};
use session::SessionStore;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "supply_desk=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let config = AppConfig::from_env()?;
    if config.destinations.is_empty() {
        tracing::warn!("No destinations configured. Set SUPPLY_DESK_DESTINATIONS.");
    } else {
        tracing::info!(
            destinations = ?config.destinations.iter().map(|d| d.id.as_str()).collect::<Vec<_>>(),
            "Destinations loaded"
        );
    }

    // Collaborators
    let transport = Arc::new(HttpTransport::new());
    let store = Arc::new(SessionStore::new());
    let blobs = HttpBlobStore::new(&config.blob_base_url, config.notify_timeout)?;
    let notifier = WebhookNotifier::new(blobs, config.notify_timeout)?;

    let executor = FlowExecutor::new(
        Arc::clone(&store),
        Arc::clone(&transport),
        SheetFormatter::new(),
        notifier,
        Arc::clone(&config.destinations),
    );
    let runtime = Arc::new(FlowRuntime::new(executor));
    tokio::spawn(async move { runtime.run().await });

    // Create router
    let state = AppState::new(transport, store);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Supply Desk server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
