//! songbook-api library
//!
//! Song catalog HTTP API: routing → service → SQL repository.

use std::time::Duration;

use axum::error_handling::HandleErrorLayer;
use axum::extract::DefaultBodyLimit;
use axum::{BoxError, Router};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod cli;
pub mod db;
pub mod error;
pub mod pagination;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use crate::db::SongRepository;
use crate::services::{MusicInfoClient, SongService};

/// Request body size limit (1 MiB)
pub const MAX_BODY_BYTES: usize = 1 << 20;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Song operations
    pub songs: SongService,
    /// Per-request timeout applied by the router
    pub request_timeout: Duration,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    /// Create new application state
    ///
    /// Song creation skips the details lookup when `music_info` is `None`.
    pub fn new(
        db: SqlitePool,
        music_info: Option<MusicInfoClient>,
        request_timeout: Duration,
    ) -> Self {
        let songs = SongService::new(SongRepository::new(db.clone()), music_info);
        Self {
            db,
            songs,
            request_timeout,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let request_timeout = state.request_timeout;

    let routes = Router::new()
        .merge(api::song_routes())
        .merge(api::health_routes())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES));

    with_request_timeout(routes, request_timeout)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Fail requests that run longer than `timeout` with a 408 error envelope
pub fn with_request_timeout<S>(router: Router<S>, timeout: Duration) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(
        ServiceBuilder::new()
            .layer(HandleErrorLayer::new(handle_middleware_error))
            .timeout(timeout),
    )
}

async fn handle_middleware_error(err: BoxError) -> ApiError {
    if err.is::<tower::timeout::error::Elapsed>() {
        ApiError::Timeout
    } else {
        ApiError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::routing::get;
    use tower::util::ServiceExt;

    fn delayed_app(delay: Duration, timeout: Duration) -> Router {
        with_request_timeout(
            Router::new().route(
                "/slow",
                get(move || async move {
                    tokio::time::sleep(delay).await;
                    "done"
                }),
            ),
            timeout,
        )
    }

    fn slow_request() -> Request<Body> {
        Request::builder().uri("/slow").body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_timeout_renders_error_envelope() {
        let app = delayed_app(Duration::from_millis(500), Duration::from_millis(20));

        let response = app.oneshot(slow_request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["code"], "TIMEOUT");
        assert_eq!(body["error"]["message"], "Request timed out");
    }

    #[tokio::test]
    async fn test_fast_request_passes_through() {
        let app = delayed_app(Duration::from_millis(1), Duration::from_secs(5));

        let response = app.oneshot(slow_request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
