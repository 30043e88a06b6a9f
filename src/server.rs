//! HTTP transport for the two pagination strategies.
//!
//! Query parameters arrive as strings and are validated here; the strategies
//! only ever see integers. Store calls block, so each request runs its
//! paginator on the blocking pool under a cancellation token that fires if the
//! request future is dropped (client went away).

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{MatchedPath, Query, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::{net::TcpListener, task};
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use crate::error::PageError;
use crate::pagination::{CursorPaginator, OffsetPaginator};
use crate::store::RecordStore;
use crate::telemetry::RequestMetrics;

/// Errors that stop the HTTP server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Binding or serving on the listener failed.
    #[error("failed to bind listener: {0}")]
    Io(#[from] std::io::Error),
}

/// Shared handler state; cheap to clone.
#[derive(Clone)]
pub struct AppState {
    cursor: CursorPaginator,
    offset: OffsetPaginator,
    metrics: RequestMetrics,
}

impl AppState {
    /// Builds both paginators over `store` with a fresh metrics registry.
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            cursor: CursorPaginator::new(store.clone()),
            offset: OffsetPaginator::new(store),
            metrics: RequestMetrics::new(),
        }
    }

    /// Registry behind `GET /metrics`.
    pub fn metrics(&self) -> &RequestMetrics {
        &self.metrics
    }
}

/// Binds `addr` and serves until ctrl-c.
pub async fn serve(addr: SocketAddr, state: AppState) -> Result<(), ServerError> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "pagination server listening");
    axum::serve(listener, build_router(state).into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

/// All routes, with request metrics on the `/users` endpoints.
pub fn build_router(state: AppState) -> Router {
    let users = Router::new()
        .route("/users/cursor-based", get(cursor_handler))
        .route("/users/limit-offset", get(offset_handler))
        .route_layer(middleware::from_fn_with_state(state.clone(), track_request));
    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .merge(users)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn track_request(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_owned())
        .unwrap_or_else(|| request.uri().path().to_owned());
    let started = Instant::now();
    let response = next.run(request).await;
    state
        .metrics
        .observe(&route, response.status().as_u16(), started.elapsed());
    response
}

async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

async fn index_handler() -> &'static str {
    "Hello Paginators are ready"
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

async fn cursor_handler(
    State(state): State<AppState>,
    Query(params): Query<CursorParams>,
) -> Result<Response, AppError> {
    let cursor =
        parse_param(params.cursor.as_deref()).ok_or(AppError::BadParam("invalid cursor param"))?;
    let limit =
        parse_param(params.limit.as_deref()).ok_or(AppError::BadParam("invalid limit param"))?;
    let paginator = state.cursor;
    let page = run_paginator(move |cancel| paginator.retrieve(cursor, limit, &cancel)).await?;
    Ok(success(page))
}

async fn offset_handler(
    State(state): State<AppState>,
    Query(params): Query<OffsetParams>,
) -> Result<Response, AppError> {
    let page =
        parse_param(params.page.as_deref()).ok_or(AppError::BadParam("invalid page"))?;
    let limit =
        parse_param(params.limit.as_deref()).ok_or(AppError::BadParam("invalid limit"))?;
    let paginator = state.offset;
    let result = run_paginator(move |cancel| paginator.retrieve(page, limit, &cancel)).await?;
    Ok(success(result))
}

/// Runs a blocking paginator call, cancelling it if this future is dropped.
async fn run_paginator<T, F>(call: F) -> Result<T, AppError>
where
    T: Send + 'static,
    F: FnOnce(CancellationToken) -> Result<T, PageError> + Send + 'static,
{
    let cancel = CancellationToken::new();
    let guard = cancel.clone().drop_guard();
    let outcome = task::spawn_blocking(move || call(cancel)).await;
    guard.disarm();
    Ok(outcome??)
}

fn parse_param(raw: Option<&str>) -> Option<i64> {
    raw?.trim().parse().ok()
}

fn success<T: Serialize>(data: T) -> Response {
    let body = Envelope {
        data: Some(data),
        error: String::new(),
        success: "retrieved successfully".into(),
    };
    (StatusCode::OK, Json(body)).into_response()
}

#[derive(Debug, Default, Deserialize)]
struct CursorParams {
    cursor: Option<String>,
    limit: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct OffsetParams {
    page: Option<String>,
    limit: Option<String>,
}

/// Response body shared by every `/users` route.
#[derive(Debug, Serialize)]
struct Envelope<T> {
    data: Option<T>,
    #[serde(skip_serializing_if = "String::is_empty")]
    error: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    success: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Debug, Error)]
enum AppError {
    #[error("{0}")]
    BadParam(&'static str),
    #[error(transparent)]
    Page(#[from] PageError),
    #[error("internal task failure: {0}")]
    Join(#[from] task::JoinError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::BadParam(msg) => (StatusCode::BAD_REQUEST, (*msg).to_string()),
            AppError::Page(err) if err.is_client_fault() => {
                (StatusCode::BAD_REQUEST, err.to_string())
            }
            AppError::Page(err) => {
                if err.store_error().is_some_and(|e| e.is_cancelled()) {
                    tracing::debug!(%err, "request cancelled");
                } else {
                    tracing::error!(%err, "page retrieval failed");
                }
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "something went wrong, please try again".to_string(),
                )
            }
            AppError::Join(err) => {
                tracing::error!(%err, "paginator task failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "something went wrong, please try again".to_string(),
                )
            }
        };
        let body = Envelope::<()> {
            data: None,
            error: message,
            success: String::new(),
        };
        (status, Json(body)).into_response()
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutdown signal received"),
        Err(err) => tracing::error!(?err, "failed to listen for shutdown signal"),
    }
}
