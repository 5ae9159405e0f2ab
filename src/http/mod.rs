//! Axum HTTP surface.
//!
//! ## URL layout (prefix defaults to `/chatbot`)
//!
//! ```text
//! GET    /                                  → welcome message
//! POST   {prefix}/update-content            — form: module_title, key_prefix?, content_parts*
//! GET    {prefix}/get-content               — query: module_title?
//! DELETE {prefix}/delete-content/{title}    — query: key?
//! PUT    {prefix}/edit-content              — form: module_title, key, new_value
//! POST   {prefix}/ask-question              — form: query
//! GET    {prefix}/metrics                   — request counters + latency histograms
//! ```
//!
//! Forms may be urlencoded or multipart. Every failure, including extractor
//! rejections and unknown routes, answers with `{"status": false, "detail"}`.

mod api;
mod error;
mod extract;

pub use error::ApiError;

use axum::{
    Router,
    http::{HeaderValue, Method},
    middleware,
    routing::{delete, get, post, put},
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{AllowHeaders, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::error::AppError;
use crate::gateway::Gateway;
use crate::metrics::{self, Metrics};

// ── Shared request state ──────────────────────────────────────────────────────

/// Router state injected into every handler via [`axum::extract::State`].
///
/// Cheap to clone — all fields are reference-counted.
#[derive(Debug, Clone)]
pub struct AppState {
    pub gateway: Gateway,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(gateway: Gateway, metrics: Metrics) -> Self {
        Self { gateway, metrics }
    }
}

// ── Router ────────────────────────────────────────────────────────────────────

/// Build the full router: content and question routes under `path_prefix`,
/// the welcome route at `/`, metrics, CORS and request tracing.
pub fn build_router(state: AppState, server: &ServerConfig) -> Router {
    let routes = Router::new()
        .route("/update-content",               post(api::update_content))
        .route("/get-content",                  get(api::get_content))
        .route("/delete-content/{module_title}", delete(api::delete_content))
        .route("/edit-content",                 put(api::edit_content))
        .route("/ask-question",                 post(api::ask_question))
        .route("/metrics",                      get(api::metrics));

    let routes = if server.path_prefix.is_empty() {
        routes
    } else {
        Router::new().nest(&server.path_prefix, routes)
    };

    Router::new()
        .route("/", get(api::root))
        .merge(routes)
        .route_layer(middleware::from_fn_with_state(state.metrics.clone(), metrics::track))
        .fallback(api::not_found)
        .with_state(state)
        .layer(build_cors(&server.cors_origins))
        .layer(TraceLayer::new_for_http())
}

/// Permissive CORS: any header, the methods the API uses, and either any
/// origin (empty list) or exactly the configured ones.
fn build_cors(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(AllowHeaders::any());

    if origins.is_empty() {
        return cors.allow_origin(Any);
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    cors.allow_origin(parsed)
}

// ── Server loop ───────────────────────────────────────────────────────────────

/// Bind `server.bind` and serve `router` until `shutdown` is cancelled.
pub async fn serve(router: Router, server: &ServerConfig, shutdown: CancellationToken) -> Result<(), AppError> {
    let listener = TcpListener::bind(&server.bind)
        .await
        .map_err(|e| AppError::Server(format!("bind failed on {}: {e}", server.bind)))?;

    let local = listener
        .local_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| server.bind.clone());
    info!(bind = %local, prefix = %server.path_prefix, "http server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    info!("http server shut down");
    Ok(())
}
