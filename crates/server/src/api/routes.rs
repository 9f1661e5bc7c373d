use axum::{
    body::Body,
    extract::DefaultBodyLimit,
    http::Request,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::info_span;

use super::middleware::{metrics_middleware, request_id_middleware, REQUEST_ID_HEADER};
use super::{convert, handlers};
use crate::state::AppState;

/// Room for multipart boundaries and the options part on top of the file.
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

pub fn create_router(state: Arc<AppState>) -> Router {
    let body_limit = usize::try_from(state.config().convert.max_file_size)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD);

    // API routes
    let api_routes = Router::new()
        // Conversion
        .route(
            "/convert/{format_pair}",
            post(convert::convert).layer(DefaultBodyLimit::max(body_limit)),
        )
        // Configuration and circuit breakers
        .route("/config", get(handlers::get_config))
        .route("/circuit", get(handlers::list_circuits))
        .route("/circuit/{format_pair}/reset", post(handlers::reset_circuit));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/health/ready", get(handlers::readiness))
        .route("/metrics", get(handlers::metrics))
        .nest("/api", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_id_middleware))
                .layer(
                    TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                        let request_id = request
                            .headers()
                            .get(&REQUEST_ID_HEADER)
                            .and_then(|v| v.to_str().ok())
                            .unwrap_or("-");
                        info_span!(
                            "http_request",
                            method = %request.method(),
                            uri = %request.uri(),
                            request_id,
                        )
                    }),
                )
                .layer(middleware::from_fn(metrics_middleware)),
        )
        .with_state(state)
}
