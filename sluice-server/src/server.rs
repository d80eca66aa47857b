//! Router assembly and server entry point.

use axum::Router;
use axum::extract::Request;
use axum::http::{Method, StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use sluice_core::config::SluiceConfig;
use sluice_core::engine::StreamEngineHandle;
use tower_http::cors::{Any, CorsLayer};

use crate::handlers;

/// Shared state for every handler.
#[derive(Clone)]
pub struct AppState {
    /// Handle to the engine actor.
    pub engine: StreamEngineHandle,
    /// Runtime configuration.
    pub config: SluiceConfig,
}

/// Builds the control API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/status/check", get(handlers::status_check))
        .route("/start/{info_hash}", get(handlers::start_torrent))
        .route("/status/{info_hash}", get(handlers::torrent_status))
        .route("/pause/{info_hash}", get(handlers::pause_torrent))
        .route("/stop/{info_hash}", get(handlers::stop_torrent))
        .route("/network/metered", get(handlers::set_metered))
        .route("/proxy/{info_hash}", get(handlers::proxy_stream))
        .fallback(handlers::not_found)
        .layer(middleware::from_fn(answer_preflight))
        .layer(cors_layer())
        .with_state(state)
}

/// Binds the listener and serves until the task is cancelled.
///
/// # Errors
/// - `std::io::Error` - bind or accept failure
pub async fn run_server(state: AppState) -> std::io::Result<()> {
    let addr = std::net::SocketAddr::new(state.config.api.host, state.config.api.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "control API listening");
    axum::serve(listener, router(state)).await
}

/// Permissive CORS for the embedding player shell.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::RANGE, header::CONTENT_TYPE])
}

/// Answers any `OPTIONS` request with an empty 200 before routing, so
/// preflights succeed on every path, known or not.
async fn answer_preflight(request: Request, next: Next) -> Response {
    if request.method() == Method::OPTIONS {
        return StatusCode::OK.into_response();
    }
    next.run(request).await
}
