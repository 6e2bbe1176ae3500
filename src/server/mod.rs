//! HTTP surface: the analysis API, a health check and static assets.

mod assets;
mod error;
mod mime;
mod routes;

pub use error::{ApiError, ServerError};

use crate::app::AppState;
use axum::extract::{DefaultBodyLimit, Request};
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

pub fn router(state: Arc<AppState>, max_body_bytes: usize) -> Router {
    Router::new()
        .route(
            "/api/analyze",
            post(routes::analyze_handler).fallback(routes::method_not_allowed),
        )
        .route(
            "/api/health",
            get(routes::health_handler).fallback(routes::method_not_allowed),
        )
        .fallback(assets::serve_asset)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(CorsLayer::permissive())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(middleware::map_request(strip_client_request_id))
        .with_state(state)
}

/// Correlation ids are always minted here, never taken from the client.
async fn strip_client_request_id(mut request: Request) -> Request {
    request.headers_mut().remove("x-request-id");
    request
}

pub async fn serve(
    state: Arc<AppState>,
    addr: SocketAddr,
    max_body_bytes: usize,
) -> Result<(), ServerError> {
    info!(%addr, "Binding HTTP server");
    info!("Serving static files from {}", state.static_root().display());

    let app = router(state, max_body_bytes);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;
    info!(%addr, "HTTP server ready to accept connections");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(ServerError::Serve)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
