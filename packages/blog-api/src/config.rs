//! API configuration.

use blog_store::POSTS_COLLECTION;

/// HTTP layer configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Collection backing the `/posts` resource
    pub collection: String,
    /// Request body read timeout in milliseconds
    pub request_timeout_ms: u64,
    /// Maximum accepted request body size in bytes
    pub max_body_bytes: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            collection: POSTS_COLLECTION.to_string(),
            request_timeout_ms: 5000, // 5 seconds default
            max_body_bytes: 64 * 1024,
        }
    }
}
