//! Shared route helpers
//!
//! JSON envelope responses in the shape clients expect
//! (`{success, message?, data?}`), body parsing with size limits, and the
//! authenticate step every `/api/*` route runs first.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde::{Deserialize, Serialize};

use crate::auth::extract_token_from_header;
use crate::db::schemas::UserDoc;
use crate::server::AppState;
use crate::types::{BursarError, Result};

pub type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

/// Default request body cap for JSON endpoints that carry no file payload
pub const DEFAULT_BODY_LIMIT: usize = 16 * 1024;

// =============================================================================
// Response builders
// =============================================================================

#[derive(Serialize)]
struct DataEnvelope<'a, T: Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
    data: &'a T,
}

#[derive(Serialize)]
struct ErrorEnvelope {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    required: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    available: Option<i64>,
}

pub fn full_body(data: impl Into<Bytes>) -> BoxBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed()
}

pub fn empty_body() -> BoxBody {
    Full::new(Bytes::new())
        .map_err(|never| match never {})
        .boxed()
}

pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<BoxBody> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, OPTIONS")
        .header("Access-Control-Allow-Headers", "Content-Type, Authorization")
        .body(full_body(json))
        .unwrap()
}

/// 200 with `{success: true, data}`
pub fn ok_data<T: Serialize>(data: &T) -> Response<BoxBody> {
    json_response(
        StatusCode::OK,
        &DataEnvelope {
            success: true,
            message: None,
            data,
        },
    )
}

/// 200 with `{success: true, message, data}`
pub fn ok_message_data<T: Serialize>(message: &str, data: &T) -> Response<BoxBody> {
    json_response(
        StatusCode::OK,
        &DataEnvelope {
            success: true,
            message: Some(message),
            data,
        },
    )
}

/// 201 with `{success: true, message, data}`
pub fn created_message_data<T: Serialize>(message: &str, data: &T) -> Response<BoxBody> {
    json_response(
        StatusCode::CREATED,
        &DataEnvelope {
            success: true,
            message: Some(message),
            data,
        },
    )
}

/// Map a domain error to its HTTP response
pub fn error_response(err: BursarError) -> Response<BoxBody> {
    let status = err.status_code();
    let (required, available) = match &err {
        BursarError::InsufficientTokens {
            required,
            available,
        } => (Some(*required), Some(*available)),
        _ => (None, None),
    };

    let message = match &err {
        BursarError::InsufficientTokens { .. } => "Insufficient tokens".to_string(),
        // Internal details stay out of client responses
        BursarError::Database(_)
        | BursarError::Storage(_)
        | BursarError::Predictor(_)
        | BursarError::Config(_)
        | BursarError::Internal(_)
            if status == StatusCode::INTERNAL_SERVER_ERROR =>
        {
            tracing::error!(error = %err, "Request failed");
            "Internal server error".to_string()
        }
        other => other.to_string(),
    };

    json_response(
        status,
        &ErrorEnvelope {
            success: false,
            message,
            required,
            available,
        },
    )
}

/// CORS preflight response
pub fn cors_preflight() -> Response<BoxBody> {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, OPTIONS")
        .header("Access-Control-Allow-Headers", "Content-Type, Authorization")
        .header("Access-Control-Max-Age", "86400")
        .body(empty_body())
        .unwrap()
}

/// 405 for known paths hit with the wrong method
pub fn method_not_allowed() -> Response<BoxBody> {
    json_response(
        StatusCode::METHOD_NOT_ALLOWED,
        &ErrorEnvelope {
            success: false,
            message: "Method not allowed".into(),
            required: None,
            available: None,
        },
    )
}

/// 404 with the offending path
pub fn not_found(path: &str) -> Response<BoxBody> {
    let body = serde_json::json!({
        "success": false,
        "message": "Route not found",
        "path": path,
    });
    json_response(StatusCode::NOT_FOUND, &body)
}

// =============================================================================
// Request parsing
// =============================================================================

/// Read and deserialize a JSON body, bounded by `limit` bytes
pub async fn parse_json_body<T: for<'de> Deserialize<'de>>(
    req: Request<Incoming>,
    limit: usize,
) -> Result<T> {
    let body = req
        .collect()
        .await
        .map_err(|e| BursarError::Http(format!("Failed to read body: {}", e)))?;

    let bytes = body.to_bytes();
    if bytes.len() > limit {
        return Err(BursarError::Validation("Request body too large".into()));
    }

    serde_json::from_slice(&bytes)
        .map_err(|e| BursarError::Validation(format!("Invalid JSON body: {}", e)))
}

/// Extract a query parameter, percent-decoded
pub fn query_param(query: Option<&str>, key: &str) -> Option<String> {
    query.and_then(|q| {
        q.split('&').find_map(|pair| {
            let (k, v) = pair.split_once('=')?;
            if k == key && !v.is_empty() {
                Some(urlencoding::decode(v).ok()?.into_owned())
            } else {
                None
            }
        })
    })
}

/// Verify the bearer token and resolve the caller to a user row,
/// provisioning on first sight
pub async fn authenticate(req: &Request<Incoming>, state: &AppState) -> Result<UserDoc> {
    let header = req
        .headers()
        .get(hyper::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| BursarError::Unauthorized("No authorization token provided".into()))?;

    let token = extract_token_from_header(header)
        .ok_or_else(|| BursarError::Unauthorized("No authorization token provided".into()))?;

    let identity = state.identity.verify(token)?;
    state
        .ledger
        .resolve_identity(&identity, state.args.admin_email.as_deref())
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_param() {
        let q = Some("subject=Mathematics&topic=Linear%20Algebra&contentType=video");
        assert_eq!(query_param(q, "subject").as_deref(), Some("Mathematics"));
        assert_eq!(query_param(q, "topic").as_deref(), Some("Linear Algebra"));
        assert_eq!(query_param(q, "contentType").as_deref(), Some("video"));
        assert_eq!(query_param(q, "missing"), None);
        assert_eq!(query_param(None, "subject"), None);
        assert_eq!(query_param(Some("subject="), "subject"), None);
    }

    #[test]
    fn test_error_response_statuses() {
        let resp = error_response(BursarError::NotFound("Content not found".into()));
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = error_response(BursarError::Conflict("Content already purchased".into()));
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let resp = error_response(BursarError::InsufficientTokens {
            required: 15,
            available: 10,
        });
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = error_response(BursarError::Database("connection reset".into()));
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
