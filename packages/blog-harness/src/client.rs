//! HTTP client for the `/posts` resource.

use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use blog_store::{BlogPostPatch, NewBlogPost, ObjectId};

/// Resource client errors.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Client could not be constructed
    #[error("Failed to build HTTP client: {0}")]
    Build(String),

    /// Request never produced a response
    #[error("{method} {url} failed: {source}")]
    Transport {
        method: Method,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Server answered with a non-2xx status
    #[error("{method} {path} returned {status}: {body}")]
    UnexpectedStatus {
        method: Method,
        path: String,
        status: StatusCode,
        body: String,
    },

    /// Body was not the expected JSON
    #[error("Failed to decode response body: {0}")]
    Decode(String),
}

impl ClientError {
    /// Status code of a non-2xx response.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::UnexpectedStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// A completed 2xx exchange.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub method: Method,
    pub path: String,
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl ApiResponse {
    /// Decodes the body.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ClientError> {
        serde_json::from_slice(&self.body).map_err(|e| {
            ClientError::Decode(format!("{} {}: {}", self.method, self.path, e))
        })
    }

    pub fn json_value(&self) -> Result<Value, ClientError> {
        self.json()
    }

    /// Body as lossy UTF-8, for error messages.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// "GET /posts" style label.
    pub fn label(&self) -> String {
        format!("{} {}", self.method, self.path)
    }
}

/// Thin wrapper issuing one request per verb against `/posts`.
#[derive(Debug, Clone)]
pub struct PostsClient {
    http: reqwest::Client,
    base_url: String,
}

impl PostsClient {
    /// Creates a client for `base_url` (e.g. `http://127.0.0.1:8080`).
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Build(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET /posts`
    pub async fn list(&self) -> Result<ApiResponse, ClientError> {
        self.send(Method::GET, "/posts".to_string(), None).await
    }

    /// `GET /posts/{id}`
    pub async fn get(&self, id: &ObjectId) -> Result<ApiResponse, ClientError> {
        self.send(Method::GET, member_path(id), None).await
    }

    /// `POST /posts`
    pub async fn create(&self, post: &NewBlogPost) -> Result<ApiResponse, ClientError> {
        let body = to_json(post)?;
        self.send(Method::POST, "/posts".to_string(), Some(body)).await
    }

    /// `PUT /posts/{id}`; the body always carries the target `id`.
    pub async fn update(
        &self,
        id: &ObjectId,
        fields: &BlogPostPatch,
    ) -> Result<ApiResponse, ClientError> {
        let mut patch = fields.clone();
        patch.id.get_or_insert(*id);
        let body = to_json(&patch)?;
        self.send(Method::PUT, member_path(id), Some(body)).await
    }

    /// `DELETE /posts/{id}`
    pub async fn remove(&self, id: &ObjectId) -> Result<ApiResponse, ClientError> {
        self.send(Method::DELETE, member_path(id), None).await
    }

    async fn send(
        &self,
        method: Method,
        path: String,
        body: Option<Value>,
    ) -> Result<ApiResponse, ClientError> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.http.request(method.clone(), &url);
        if let Some(body) = &body {
            request = request.json(body);
        }

        let transport = |source| ClientError::Transport {
            method: method.clone(),
            url: url.clone(),
            source,
        };
        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.bytes().await.map_err(transport)?;
        tracing::debug!("{} {} -> {}", method, path, status);

        if !status.is_success() {
            return Err(ClientError::UnexpectedStatus {
                method,
                path,
                status,
                body: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }

        Ok(ApiResponse {
            method,
            path,
            status,
            headers,
            body: bytes.to_vec(),
        })
    }
}

fn member_path(id: &ObjectId) -> String {
    format!("/posts/{}", id)
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value, ClientError> {
    serde_json::to_value(value).map_err(|e| ClientError::Decode(e.to_string()))
}
