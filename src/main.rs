mod auth;
mod clients;
mod config;
mod docs;
mod handlers;
mod hub;
mod models;
mod routes;
mod services;

use std::panic;
use std::sync::Arc;

use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use clients::pubsub_client::PubSubClient;
use config::Config;
use docs::ApiDoc;
use hub::dispatcher::MessageDispatcher;
use routes::create_api_routes;

/// Shared application state: the message dispatcher owning the core
/// registries, plus the pub-sub client used for token issuance.
pub struct AppState {
    pub dispatcher: MessageDispatcher,
    pub pubsub: Arc<PubSubClient>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Set panic hook for better error messages
    panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
    }));

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            // Default to info level, but allow debug for our app
            "colabri_hub=debug,tower_http=debug,axum::rejection=trace,info".into()
        }))
        .init();

    info!("Starting server...");

    // Load configuration
    let app_config = Config::load().unwrap_or_else(|e| {
        error!("Failed to load configuration: {}", e);
        warn!("Using default configuration");
        Config::default()
    });
    config::init_config(app_config.clone());

    // Construct the pub-sub client and the dispatcher owning the core
    // registries. Everything is built here, at startup, and handed down by
    // reference through the router state.
    let pubsub = Arc::new(PubSubClient::new(&app_config));
    let dispatcher = MessageDispatcher::new(pubsub.clone());
    let state = Arc::new(AppState { dispatcher, pubsub });

    // Create API routes
    let api_routes = create_api_routes(state);

    // Combine all routes
    let app_routes = Router::new()
        // Mount API routes
        .nest("/api", api_routes)
        // Mount Swagger UI
        .merge(SwaggerUi::new("/swagger").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Add tracing layer
        .layer(TraceLayer::new_for_http());

    // Start the HTTP server
    let listener = tokio::net::TcpListener::bind(app_config.server_address())
        .await
        .unwrap_or_else(|_| panic!("Failed to bind to {}", app_config.server_address()));

    info!("🚀 Server running on http://{}", app_config.server_address());
    info!(
        "📡 Relaying through pub-sub hub '{}' at {}",
        app_config.pubsub_hub, app_config.pubsub_endpoint
    );
    info!(
        "📚 Swagger UI available at http://{}/swagger",
        app_config.server_address()
    );

    axum::serve(listener, app_routes)
        .await
        .expect("Server failed to start");
}
