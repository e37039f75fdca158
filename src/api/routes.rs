//! API Routes
//!
//! Configures the Axum router with the cache and premium endpoints.

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    cancel_handler, check_vpn_handler, delete_handler, get_handler, get_multiple_handler,
    health_handler, keys_handler, plans_handler, set_handler, set_multiple_handler,
    stats_handler, status_handler, subscribe_handler, validate_card_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /health` - Health check endpoint
/// - `PUT /cache/set`, `GET /cache/get/:key`, `DELETE /cache/del/:key`
/// - `GET /cache/keys`, `POST /cache/mset`, `POST /cache/mget`, `GET /cache/stats`
/// - `GET /premium/plans` - Price table and entitlements
/// - `POST /premium/validate-card`, `POST /premium/check-vpn`
/// - `POST /premium/subscribe`, `GET /premium/status/:user_id`,
///   `POST /premium/cancel/:user_id`
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: Logs all requests
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let cache = Router::new()
        .route("/set", put(set_handler))
        .route("/get/:key", get(get_handler))
        .route("/del/:key", delete(delete_handler))
        .route("/keys", get(keys_handler))
        .route("/mset", post(set_multiple_handler))
        .route("/mget", post(get_multiple_handler))
        .route("/stats", get(stats_handler));

    let premium = Router::new()
        .route("/plans", get(plans_handler))
        .route("/validate-card", post(validate_card_handler))
        .route("/check-vpn", post(check_vpn_handler))
        .route("/subscribe", post(subscribe_handler))
        .route("/status/:user_id", get(status_handler))
        .route("/cancel/:user_id", post(cancel_handler));

    Router::new()
        .route("/health", get(health_handler))
        .nest("/cache", cache)
        .nest("/premium", premium)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
