//! Response types and helpers for HTTP endpoints.

use serde::{Deserialize, Serialize};

use blog_store::BlogPost;

/// Body of `GET /posts`.
#[derive(Debug, Serialize, Deserialize)]
pub struct PostList {
    pub posts: Vec<BlogPost>,
}

/// Error payload: status code, message and optional details.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    /// HTTP status code, as a string
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Body of every non-2xx response: `{"success": false, "error": {...}}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ApiError,
}

/// Builds the error body for `status`.
pub fn error_response(
    status: u16,
    message: impl Into<String>,
    details: Option<String>,
) -> ErrorResponse {
    ErrorResponse {
        success: false,
        error: ApiError {
            code: status.to_string(),
            message: message.into(),
            details,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_body_shape() {
        let body = serde_json::to_value(error_response(404, "Post not found", None)).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "success": false,
                "error": {"code": "404", "message": "Post not found"}
            })
        );
    }
}
