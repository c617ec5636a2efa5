//! HTTP facade
//!
//! Maps each session operation to an axum route. All routes are nested
//! under the configured prefix (`/api` by default).

mod handlers;
mod response;

use std::future::Future;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::routing::{delete, get, post, put};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub use response::{
    ApiError, ChangeDirectoryResponse, ConnectResponse, ErrorBody, ListResponse,
    OperationResponse, STATUS_SUCCESS,
};

use crate::config::Config;
use crate::error::Result;
use crate::session::SessionManager;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<SessionManager>,
}

/// Build the full application router
pub fn router(config: &Config, manager: Arc<SessionManager>) -> Router {
    let api = Router::new()
        .route("/", get(handlers::root))
        .route("/ftp/connect", post(handlers::connect))
        .route("/ftp/disconnect/:session_id", post(handlers::disconnect))
        .route("/ftp/list/:session_id", get(handlers::list))
        .route("/ftp/upload/:session_id", post(handlers::upload))
        .route("/ftp/download/:session_id/:filename", get(handlers::download))
        .route("/ftp/change-directory/:session_id", post(handlers::change_directory))
        .route("/ftp/create-directory/:session_id", post(handlers::create_directory))
        .route("/ftp/rename/:session_id", put(handlers::rename))
        .route("/ftp/delete/:session_id/:name", delete(handlers::delete))
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .with_state(AppState { manager });

    let prefix = config.normalized_prefix();
    let app = if prefix.is_empty() {
        api
    } else {
        Router::new().nest(prefix, api)
    };

    app.layer(cors_layer(config))
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(config: &Config) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if config.allows_any_origin() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

/// Serve the API on an already-bound listener until `shutdown` resolves
pub async fn serve<F>(
    listener: TcpListener,
    config: &Config,
    manager: Arc<SessionManager>,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    info!(
        "FTP gateway listening on http://{}{}",
        listener.local_addr()?,
        config.normalized_prefix()
    );

    axum::serve(listener, router(config, manager))
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
