use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::auth::require_auth;
use super::handlers;
use crate::AppState;

pub fn create_router(state: AppState) -> Router {
    let public = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/metrics", get(handlers::metrics::render));

    let protected = Router::new()
        // Events
        .route("/api/events", get(handlers::events::list).delete(handlers::events::clear))
        // Wallets
        .route("/api/wallets", get(handlers::wallets::list))
        .route("/api/wallets/:address", get(handlers::wallets::detail))
        // Settings
        .route("/api/config", get(handlers::settings::get_config).put(handlers::settings::update_config))
        .route("/api/filter", get(handlers::settings::get_filter).put(handlers::settings::update_filter))
        .route(
            "/api/notifications",
            get(handlers::settings::get_notifications).put(handlers::settings::update_notifications),
        )
        .route("/api/notifications/test", post(handlers::settings::send_test))
        // Database
        .route("/api/db/info", get(handlers::database::info))
        // Live stream
        .route("/ws", get(handlers::ws::handler))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    public
        .merge(protected)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
