use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::{handlers, middleware::metrics_middleware, prefetch, resolve};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // API routes
    let api_routes = Router::new()
        // Health, config and metrics
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        .route("/metrics", get(handlers::get_metrics))
        // Resolution
        .route("/resolve/episode", post(resolve::resolve_episode))
        .route("/resolve/movie", post(resolve::resolve_movie))
        // Cache warm-up
        .route("/prefetch/catalog", post(prefetch::prefetch_catalog))
        .route("/prefetch/series", post(prefetch::prefetch_series))
        .route_layer(middleware::from_fn(metrics_middleware))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
}
