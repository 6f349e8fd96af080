//! REST API layer built on Axum.
//!
//! Provides the collection lifecycle, upload, import and search endpoints used
//! by the browser client, plus health and Prometheus metrics. Uploaded assets
//! are served back as static files under [`config::UPLOAD_ROUTE`]. Any other
//! path falls through to the browser client's build directory, with
//! `index.html` answering unknown client-side routes.

/// API error types mapped to HTTP status codes.
pub mod errors;
/// HTTP request handlers and application state.
pub mod handlers;
/// Prometheus metrics recording.
pub mod metrics;
/// Request and response data transfer objects.
pub mod models;

use axum::error_handling::HandleErrorLayer;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderName, HeaderValue, Request, StatusCode};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{middleware, Router};
use handlers::AppState;
use picsearch_core::config;
use std::time::{Duration, Instant};
use tower::buffer::BufferLayer;
use tower::limit::ConcurrencyLimitLayer;
use tower::timeout::TimeoutLayer;
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::Instrument;

async fn request_id_middleware(
    req: Request<axum::body::Body>,
    next: middleware::Next,
) -> Response {
    let request_id = uuid::Uuid::new_v4().to_string();
    let span = tracing::info_span!("request", request_id = %request_id);
    async move {
        let mut response = next.run(req).await;
        if let Ok(value) = HeaderValue::from_str(&request_id) {
            response
                .headers_mut()
                .insert(HeaderName::from_static("x-request-id"), value);
        }
        response
    }
    .instrument(span)
    .await
}

async fn security_headers_middleware(
    req: Request<axum::body::Body>,
    next: middleware::Next,
) -> Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();
    headers.insert(
        HeaderName::from_static("x-content-type-options"),
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(
        HeaderName::from_static("referrer-policy"),
        HeaderValue::from_static("no-referrer"),
    );
    response
}

async fn metrics_middleware(req: Request<axum::body::Body>, next: middleware::Next) -> Response {
    let method = req.method().to_string();
    // Collapse file paths so every served file does not get its own series.
    let path = match req.uri().path() {
        p if p.starts_with(config::UPLOAD_ROUTE) => config::UPLOAD_ROUTE.to_string(),
        p if p.starts_with("/api/") || p == "/health" || p == "/metrics" => p.to_string(),
        _ => "/static".to_string(),
    };
    let start = Instant::now();
    let response = next.run(req).await;
    metrics::record_request(&method, &path, response.status().as_u16(), start.elapsed());
    response
}

/// Builds the Axum router with all routes and middleware layers.
///
/// The middleware stack (outermost to innermost):
/// Concurrency limit → Timeout → Body limit → CORS → Trace → Compression →
/// Security headers → Request ID → Metrics.
pub fn create_router(state: AppState) -> Router {
    let assets = ServeDir::new(state.assets.root());
    let client = ServeDir::new(&state.static_dir)
        .fallback(ServeFile::new(state.static_dir.join("index.html")));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics_endpoint))
        .route("/api/instanceCreate", post(handlers::instance_create))
        .route("/api/uploadImageFiles", post(handlers::upload_image_files))
        .route("/api/onPicImport", post(handlers::on_pic_import))
        .route("/api/picSearchByText", post(handlers::pic_search_by_text))
        .route("/api/picSearchByImg", post(handlers::pic_search_by_img))
        .route("/api/instanceDelete", post(handlers::instance_delete))
        .nest_service(config::UPLOAD_ROUTE, assets)
        .fallback_service(client)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(DefaultBodyLimit::max(config::MAX_REQUEST_BODY_BYTES))
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(|err: tower::BoxError| async move {
                    if err.is::<tower::timeout::error::Elapsed>() {
                        StatusCode::REQUEST_TIMEOUT
                    } else {
                        StatusCode::SERVICE_UNAVAILABLE
                    }
                }))
                .layer(BufferLayer::new(1024))
                .layer(ConcurrencyLimitLayer::new(config::MAX_CONCURRENT_REQUESTS))
                .layer(TimeoutLayer::new(Duration::from_secs(
                    config::REQUEST_TIMEOUT_SECS,
                ))),
        )
        .with_state(state)
}
