//! Route configuration and setup

use crate::auth::middleware::auth_middleware;
use crate::handlers;
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tubely_core::constants::{MAX_THUMBNAIL_UPLOAD_BYTES, MAX_VIDEO_UPLOAD_BYTES};
use tubely_core::{Config, StorageBackend};

/// Headroom for multipart boundaries and part headers on top of the file itself
const MULTIPART_OVERHEAD_BYTES: u64 = 1024 * 1024;

fn body_limit(max_file_bytes: u64) -> usize {
    usize::try_from(max_file_bytes + MULTIPART_OVERHEAD_BYTES).unwrap_or(usize::MAX)
}

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router<()>, anyhow::Error> {
    let cors = setup_cors(config)?;

    let public_routes = public_routes();
    let protected_routes = protected_routes().layer(axum::middleware::from_fn_with_state(
        state.jwt.clone(),
        auth_middleware,
    ));

    let mut app = public_routes
        .merge(protected_routes)
        .route(
            "/openapi.json",
            get(|| async { Json(crate::api_doc::get_openapi_spec()) }),
        )
        .with_state(state);

    if config.storage_backend() == StorageBackend::Local {
        if let Some(path) = config.local_storage_path() {
            tracing::info!(path = %path, "Serving local media under /media");
            app = app.nest_service("/media", ServeDir::new(path));
        }
    }

    Ok(app.layer(cors).layer(TraceLayer::new_for_http()))
}

fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route(
            "/thumbnails/{id}",
            get(handlers::thumbnail_get::get_thumbnail),
        )
}

fn protected_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/videos",
            post(handlers::videos::create_video).get(handlers::videos::list_videos),
        )
        .route(
            "/videos/{id}",
            get(handlers::videos::get_video).delete(handlers::videos::delete_video),
        )
        .route(
            "/videos/{id}/upload",
            post(handlers::video_upload::upload_video)
                .layer::<_, std::convert::Infallible>(DefaultBodyLimit::disable())
                .layer(RequestBodyLimitLayer::new(body_limit(MAX_VIDEO_UPLOAD_BYTES))),
        )
        .route(
            "/videos/{id}/thumbnail",
            post(handlers::thumbnail_upload::upload_thumbnail)
                .layer::<_, std::convert::Infallible>(DefaultBodyLimit::disable())
                .layer(RequestBodyLimitLayer::new(body_limit(
                    MAX_THUMBNAIL_UPLOAD_BYTES,
                ))),
        )
}

/// Setup CORS configuration
fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let cors = if config.cors_origins().contains(&"*".to_string()) {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
            .allow_headers(Any)
    } else {
        let origins = config
            .cors_origins()
            .iter()
            .map(|o| o.parse::<HeaderValue>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| anyhow::anyhow!("Invalid CORS origin: {}", e))?;

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
            .allow_headers(Any)
    };
    Ok(cors)
}
