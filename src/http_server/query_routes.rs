//! Progressive Query Routes
//!
//! - `POST /start` `{aggregate, column?, session?}` -> Estimate
//! - `POST /refine` `{session?}` -> Estimate
//! - `GET /estimate?session=` -> last Estimate
//! - `GET /history?session=` -> every Estimate so far
//! - `POST /sessions` -> new session id
//! - `DELETE /session?session=` -> 204, whether or not it existed
//!
//! The session can also come from the `x-aqp-session` header. Without one,
//! requests share the default session, giving one active query per server.
//! `/start_query` and `/refine_query` are accepted as aliases.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::errors::{ApiError, ApiResult};
use crate::engine::{Estimate, SessionRegistry, DEFAULT_SESSION};

/// Header carrying the session id
pub const SESSION_HEADER: &str = "x-aqp-session";

// ==================
// Request/Response Types
// ==================

#[derive(Debug, Deserialize)]
pub struct StartRequest {
    #[serde(alias = "aggregate_function")]
    pub aggregate: String,
    #[serde(default, alias = "column_name")]
    pub column: Option<String>,
    #[serde(default)]
    pub session: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RefineRequest {
    #[serde(default)]
    pub session: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SessionQuery {
    #[serde(default)]
    pub session: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub session: String,
    pub points: Vec<Estimate>,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session: String,
}

// ==================
// Routes
// ==================

/// Create query routes
pub fn query_routes(registry: Arc<SessionRegistry>) -> Router {
    Router::new()
        .route("/start", post(start_handler))
        .route("/start_query", post(start_handler))
        .route("/refine", post(refine_handler))
        .route("/refine_query", post(refine_handler))
        .route("/estimate", get(estimate_handler))
        .route("/history", get(history_handler))
        .route("/sessions", post(create_session_handler))
        .route("/session", delete(close_session_handler))
        .with_state(registry)
}

/// Explicit id wins over the header, the header over the default
fn resolve_session(headers: &HeaderMap, explicit: Option<String>) -> String {
    explicit
        .filter(|s| !s.is_empty())
        .or_else(|| {
            headers
                .get(SESSION_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        })
        .unwrap_or_else(|| DEFAULT_SESSION.to_string())
}

// ==================
// Handlers
// ==================

async fn start_handler(
    State(registry): State<Arc<SessionRegistry>>,
    headers: HeaderMap,
    Json(request): Json<StartRequest>,
) -> ApiResult<Json<Estimate>> {
    let session = resolve_session(&headers, request.session);
    let estimate = registry
        .start(&session, &request.aggregate, request.column.as_deref())
        .await?;
    Ok(Json(estimate))
}

async fn refine_handler(
    State(registry): State<Arc<SessionRegistry>>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<Estimate>> {
    let request = parse_refine_body(&body)?;
    let session = resolve_session(&headers, request.session);
    Ok(Json(registry.refine(&session).await?))
}

async fn estimate_handler(
    State(registry): State<Arc<SessionRegistry>>,
    headers: HeaderMap,
    Query(query): Query<SessionQuery>,
) -> ApiResult<Json<Estimate>> {
    let session = resolve_session(&headers, query.session);
    Ok(Json(registry.estimate(&session).await?))
}

async fn history_handler(
    State(registry): State<Arc<SessionRegistry>>,
    headers: HeaderMap,
    Query(query): Query<SessionQuery>,
) -> ApiResult<Json<HistoryResponse>> {
    let session = resolve_session(&headers, query.session);
    let points = registry.history(&session).await?;
    Ok(Json(HistoryResponse { session, points }))
}

async fn create_session_handler(
    State(registry): State<Arc<SessionRegistry>>,
) -> ApiResult<(StatusCode, Json<SessionResponse>)> {
    let session = registry.create_session()?;
    Ok((StatusCode::CREATED, Json(SessionResponse { session })))
}

async fn close_session_handler(
    State(registry): State<Arc<SessionRegistry>>,
    headers: HeaderMap,
    Query(query): Query<SessionQuery>,
) -> ApiResult<StatusCode> {
    let session = resolve_session(&headers, query.session);
    registry.close(&session)?;
    Ok(StatusCode::NO_CONTENT)
}

/// An empty body means the default request; anything else must parse
fn parse_refine_body(body: &[u8]) -> ApiResult<RefineRequest> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(RefineRequest::default());
    }
    serde_json::from_slice(body).map_err(|e| ApiError::InvalidBody(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_resolve_session_precedence() {
        let mut headers = HeaderMap::new();
        assert_eq!(resolve_session(&headers, None), DEFAULT_SESSION);

        headers.insert(SESSION_HEADER, HeaderValue::from_static("from-header"));
        assert_eq!(resolve_session(&headers, None), "from-header");
        assert_eq!(
            resolve_session(&headers, Some("explicit".into())),
            "explicit"
        );
        assert_eq!(resolve_session(&headers, Some(String::new())), "from-header");
    }

    #[test]
    fn test_refine_body_parsing() {
        assert!(parse_refine_body(b"").unwrap().session.is_none());
        assert!(parse_refine_body(b"  \n").unwrap().session.is_none());
        assert_eq!(
            parse_refine_body(br#"{"session": "abc"}"#).unwrap().session.as_deref(),
            Some("abc")
        );
        assert!(matches!(
            parse_refine_body(br#"{"session": 5}"#),
            Err(ApiError::InvalidBody(_))
        ));
        assert!(matches!(parse_refine_body(b"{"), Err(ApiError::InvalidBody(_))));
    }

    #[test]
    fn test_start_request_aliases() {
        let request: StartRequest = serde_json::from_str(
            r#"{"aggregate_function": "AVG", "column_name": "fare_amount"}"#,
        )
        .unwrap();
        assert_eq!(request.aggregate, "AVG");
        assert_eq!(request.column.as_deref(), Some("fare_amount"));

        let request: StartRequest =
            serde_json::from_str(r#"{"aggregate": "COUNT", "column": null}"#).unwrap();
        assert!(request.column.is_none());
    }
}
