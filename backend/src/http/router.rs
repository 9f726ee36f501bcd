//! Router configuration for the HTTP API.
//!
//! Sets up the catalog routes and the middleware stack (request ids,
//! tracing, CORS, compression).

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderName,
    routing::get,
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use super::handlers;
use super::state::AppState;

/// Product payloads are small; anything larger is rejected before parsing.
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Create the main application router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    // Permissive CORS; tighten per deployment.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers(Any);

    let request_id = HeaderName::from_static("x-request-id");

    let products = Router::new()
        .route(
            "/",
            get(handlers::list_products).post(handlers::create_product),
        )
        .route("/brands", get(handlers::list_brands))
        .route("/types", get(handlers::list_types))
        .route(
            "/{id}",
            get(handlers::get_product)
                .put(handlers::update_product)
                .delete(handlers::delete_product),
        );

    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api/products", products)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CompressionLayer::new())
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
        .layer(cors)
        .with_state(state)
}
