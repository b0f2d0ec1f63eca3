use axum::{
    http::HeaderValue,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::handlers::{
    diagnostics, group_host, group_offline, handle_transport_event, health_check, lobby_snapshot,
    negotiate, ready_check,
};
use crate::routes::auth_middleware::auth_middleware;
use crate::{config, AppState};

/// Create API routes
pub fn create_api_routes(state: Arc<AppState>) -> Router {
    let public = Router::<Arc<AppState>>::new()
        .route("/health", get(health_check))
        .route("/ready", get(ready_check))
        .route("/events", post(handle_transport_event))
        .route("/groups/:group/lobby", get(lobby_snapshot))
        .route("/groups/:group/offline", post(group_offline));

    let authed = Router::<Arc<AppState>>::new()
        .route("/negotiate", get(negotiate))
        .route("/groups/:group/host", post(group_host))
        .route("/v1/diagnostics", get(diagnostics))
        .route_layer(middleware::from_fn(auth_middleware)); // Applies to all routes added above

    Router::new()
        .merge(public)
        .merge(authed)
        .layer(cors_layer())
        .with_state(state)
}

fn cors_layer() -> CorsLayer {
    match &config::get_config().cors_origins {
        Some(origins) => {
            let parsed: Vec<HeaderValue> = origins
                .split(',')
                .filter_map(|origin| origin.trim().parse().ok())
                .collect();
            CorsLayer::new()
                .allow_origin(parsed)
                .allow_methods(Any)
                .allow_headers(Any)
        }
        None => CorsLayer::permissive(),
    }
}
