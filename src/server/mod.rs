//! Catalog serving API
//!
//! - `GET /links`: the persisted catalog as JSON, with permissive CORS headers
//! - `OPTIONS /links`: CORS preflight
//! - anything else: files from the static directory

use crate::config::ServerConfig;
use crate::LinkError;
use axum::{
    extract::State,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;

#[derive(Debug, Clone)]
pub struct AppState {
    pub catalog_path: PathBuf,
}

impl AppState {
    pub fn new(catalog_path: impl Into<PathBuf>) -> Self {
        Self {
            catalog_path: catalog_path.into(),
        }
    }
}

/// Builds the router
///
/// # Arguments
///
/// * `state` - Where the catalog file lives
/// * `static_dir` - Directory served for every path other than `/links`
pub fn app(state: AppState, static_dir: impl Into<PathBuf>) -> Router {
    Router::new()
        .route("/links", get(links_handler).options(preflight_handler))
        .fallback_service(ServeDir::new(static_dir.into()))
        .with_state(Arc::new(state))
}

/// Binds `config.bind` and serves until the process exits
pub async fn serve(
    config: &ServerConfig,
    catalog_path: impl Into<PathBuf>,
) -> Result<(), LinkError> {
    let listener = TcpListener::bind(&config.bind).await?;
    tracing::info!("Serving catalog on http://{}", listener.local_addr()?);

    axum::serve(listener, app(AppState::new(catalog_path), &config.static_dir)).await?;
    Ok(())
}

async fn links_handler(State(state): State<Arc<AppState>>) -> Response {
    let bytes = match tokio::fs::read(&state.catalog_path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!("Unable to open {}: {}", state.catalog_path.display(), e);
            return server_error("Unable to open links.json");
        }
    };

    let links: serde_json::Value = match serde_json::from_slice(&bytes) {
        Ok(links) => links,
        Err(e) => {
            tracing::warn!("Unable to parse {}: {}", state.catalog_path.display(), e);
            return server_error("Unable to parse links.json");
        }
    };

    with_cors(Json(links).into_response())
}

async fn preflight_handler() -> Response {
    with_cors(StatusCode::OK.into_response())
}

fn server_error(message: &'static str) -> Response {
    with_cors((StatusCode::INTERNAL_SERVER_ERROR, message).into_response())
}

fn with_cors(mut resp: Response) -> Response {
    let headers = resp.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
    resp
}
