//! Request utilities for HTTP endpoints.

use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::{body::Bytes, Request, Response};
use serde::Serialize;
use tokio::time;

use crate::router::RouterError;
use blog_store::{ObjectId, StoreError};

/// Helper function to read request body with timeout and size limit
pub async fn read_request_body_with_timeout(
    req: Request<hyper::body::Incoming>,
    timeout_ms: u64,
    max_bytes: usize,
) -> Result<Bytes, RouterError> {
    let timeout_duration = time::Duration::from_millis(timeout_ms);
    let limited = Limited::new(req.into_body(), max_bytes);
    let body = time::timeout(timeout_duration, limited.collect())
        .await
        .map_err(|_| RouterError::Timeout)?
        .map_err(|e| {
            if e.downcast_ref::<LengthLimitError>().is_some() {
                RouterError::PayloadTooLarge(format!("Request body exceeds {} bytes", max_bytes))
            } else {
                RouterError::InternalError(format!("Failed to read request body: {}", e))
            }
        })?;
    Ok(body.to_bytes())
}

/// Parses a request body as JSON.
pub fn parse_json_body<T: serde::de::DeserializeOwned>(body: &[u8]) -> Result<T, RouterError> {
    serde_json::from_slice(body)
        .map_err(|e| RouterError::BadRequest(format!("Failed to parse request: {}", e)))
}

/// Parses the `{id}` path segment.
pub fn parse_post_id(raw: &str) -> Result<ObjectId, RouterError> {
    raw.parse().map_err(map_store_error_to_router_error)
}

/// Map StoreError to appropriate RouterError
pub fn map_store_error_to_router_error(e: StoreError) -> RouterError {
    match e {
        StoreError::DocumentNotFound { .. } => RouterError::NotFound(e.to_string()),
        e if e.is_client_error() => RouterError::BadRequest(e.to_string()),
        _ => RouterError::InternalError(format!("Store error: {}", e)),
    }
}

/// Helper to build JSON HTTP response with proper error handling
pub fn build_json_response<T: Serialize>(
    status: u16,
    body: &T,
) -> Result<Response<Bytes>, RouterError> {
    let json = serde_json::to_vec(body)
        .map_err(|e| RouterError::InternalError(format!("Failed to serialize response: {}", e)))?;
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Bytes::from(json))
        .map_err(|e| RouterError::InternalError(format!("Failed to build response: {}", e)))
}

/// Helper to build empty HTTP response (for 204 No Content)
pub fn build_empty_response(status: u16) -> Result<Response<Bytes>, RouterError> {
    Response::builder()
        .status(status)
        .body(Bytes::new())
        .map_err(|e| RouterError::InternalError(format!("Failed to build response: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_store_error_to_router_error() {
        let not_found = StoreError::DocumentNotFound {
            collection: "blogposts".to_string(),
            id: "5a1f2b3c4d5e6f7081920a1b".to_string(),
        };
        assert!(matches!(
            map_store_error_to_router_error(not_found),
            RouterError::NotFound(_)
        ));

        let client_errors = vec![
            StoreError::InvalidId("x".to_string()),
            StoreError::MissingField("title"),
            StoreError::Validation("bad".to_string()),
        ];
        for error in client_errors {
            match map_store_error_to_router_error(error.clone()) {
                RouterError::BadRequest(msg) => assert_eq!(msg, error.to_string()),
                other => panic!("Expected BadRequest for {:?}, got {:?}", error, other),
            }
        }

        let server_errors = vec![
            StoreError::LockPoisoned,
            StoreError::IoError("disk".to_string()),
            StoreError::SerializationError("bad".to_string()),
        ];
        for error in server_errors {
            match map_store_error_to_router_error(error.clone()) {
                RouterError::InternalError(msg) => assert!(msg.contains("Store error")),
                other => panic!("Expected InternalError for {:?}, got {:?}", error, other),
            }
        }
    }

    #[test]
    fn test_parse_post_id() {
        assert!(parse_post_id("5a1f2b3c4d5e6f7081920a1b").is_ok());
        assert!(matches!(
            parse_post_id("42"),
            Err(RouterError::BadRequest(_))
        ));
    }

    #[test]
    fn test_parse_json_body() {
        let value: serde_json::Value = parse_json_body(br#"{"a": 1}"#).unwrap();
        assert_eq!(value["a"], 1);
        assert!(matches!(
            parse_json_body::<serde_json::Value>(b"{oops"),
            Err(RouterError::BadRequest(_))
        ));
    }

    #[test]
    fn test_empty_response_has_no_body() {
        let response = build_empty_response(204).unwrap();
        assert_eq!(response.status(), 204);
        assert!(response.body().is_empty());
    }
}
