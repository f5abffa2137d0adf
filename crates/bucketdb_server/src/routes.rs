//! HTTP route definitions

use crate::{handlers, middleware, AppState};
use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::get,
    Router,
};
use std::sync::Arc;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

/// Creates the router, with the API mounted under `/api`.
///
/// There is no blanket request timeout: dropping a handler future would not
/// stop a write already running on the blocking pool. Writes are bounded by
/// the writer-slot wait in [`AppState::write`] instead; reads never block.
pub fn create_router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route(
            "/v1/buckets",
            get(handlers::list_buckets).post(handlers::create_bucket),
        )
        .route(
            "/v1/buckets/{name}",
            get(handlers::list_keys)
                .post(handlers::add_item)
                .delete(handlers::delete_bucket),
        )
        .route(
            "/v1/buckets/{name}/{key}",
            get(handlers::get_item)
                .put(handlers::update_item)
                .delete(handlers::delete_item),
        );

    Router::new()
        .nest("/api", api)
        .fallback(handlers::not_found)
        .layer(axum_middleware::from_fn(middleware::require_json_content_type))
        .layer(DefaultBodyLimit::max(state.config.max_body_size))
        .layer(CatchPanicLayer::custom(middleware::handle_panic))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
