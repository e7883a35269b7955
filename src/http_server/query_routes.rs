//! Query HTTP Routes
//!
//! The filter endpoint streams NDJSON: `fetching` markers, one
//! `processed` marker per match, and a terminal `data` object. Requests
//! that fail validation or find no data are answered with a plain JSON
//! error before any streaming begins. If the client disconnects
//! mid-stream, the dropped receiver closes the event channel and the
//! scan cancels instead of running to completion.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures_util::stream;
use serde::Serialize;
use serde_json::json;
use tokio::sync::mpsc;

use crate::scanner::{RecordScanner, ScanError, ScanEvent, ScanRequest};
use crate::store::TreeStore;

/// Channel depth between the scanner and the response body
const EVENT_BUFFER: usize = 64;

// ==================
// Shared State
// ==================

/// Query state shared across handlers
pub struct QueryState {
    pub store: Arc<dyn TreeStore>,
    pub cutover: i64,
}

impl QueryState {
    pub fn new(store: Arc<dyn TreeStore>, cutover: i64) -> Self {
        Self { store, cutover }
    }
}

// ==================
// Response Types
// ==================

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,
}

// ==================
// Routes
// ==================

/// Create query routes
pub fn query_routes(state: Arc<QueryState>) -> Router {
    Router::new()
        .route("/query", post(query_handler))
        .with_state(state)
}

/// Health check routes
pub fn health_routes() -> Router {
    Router::new().route("/health", get(health_handler))
}

// ==================
// Handlers
// ==================

async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "service": "cohortq" }))
}

async fn query_handler(
    State(state): State<Arc<QueryState>>,
    Json(request): Json<ScanRequest>,
) -> Response {
    let scanner = RecordScanner::new(Arc::clone(&state.store), state.cutover);

    // validation and roster discovery happen before streaming so
    // rejections still get a proper status code
    let prepared = match scanner.prepare(&request).await {
        Ok(prepared) => prepared,
        Err(err) => return error_response(&err),
    };

    let (tx, rx) = mpsc::channel::<ScanEvent>(EVENT_BUFFER);
    tokio::spawn(async move {
        prepared.run(&tx).await;
    });

    let body = Body::from_stream(stream::unfold(rx, |mut rx| async move {
        let event = rx.recv().await?;
        Some((Ok::<_, Infallible>(event.to_ndjson()), rx))
    }));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/x-ndjson")
        .body(body)
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

fn error_response(err: &ScanError) -> Response {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
            code: err.status_code(),
            position: err.position(),
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_shape() {
        let err = ScanError::InvalidExpression {
            reason: "expression is empty".to_string(),
            position: 1,
        };
        let response = error_response(&err);
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = error_response(&ScanError::Unexpected("boom".to_string()));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_error_body_carries_position() {
        let body = ErrorResponse {
            error: "invalid expression at position 3: adjacent".to_string(),
            code: 400,
            position: Some(3),
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["position"], 3);

        let body = ErrorResponse {
            error: "no survey data found for this filter".to_string(),
            code: 400,
            position: None,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert!(value.get("position").is_none());
    }
}
