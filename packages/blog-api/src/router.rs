//! Matchit routing configuration.

use std::sync::Arc;

use hyper::{body::Bytes, Method, Request, Response};
use matchit::Router as MatchitRouter;
use thiserror::Error;

use crate::config::ApiConfig;
use crate::handlers;
use blog_store::Database;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Backing store
    pub db: Arc<Database>,
    /// API configuration
    pub config: Arc<ApiConfig>,
}

/// HTTP request router.
pub struct Router {
    inner: MatchitRouter<RouteHandler>,
    state: AppState,
}

impl Router {
    /// Creates a router serving the posts resource.
    pub fn new(db: Arc<Database>, config: ApiConfig) -> Self {
        let mut router = MatchitRouter::new();

        router
            .insert("/posts", RouteHandler::Collection)
            .expect("Failed to insert /posts route");
        router
            .insert("/posts/{id}", RouteHandler::Member)
            .expect("Failed to insert /posts/{id} route");

        Self {
            inner: router,
            state: AppState {
                db,
                config: Arc::new(config),
            },
        }
    }

    /// Shared state handed to handlers.
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Routes an incoming request to the appropriate handler.
    ///
    /// # Returns
    /// `Result<Response<Bytes>, RouterError>`; errors are turned into JSON
    /// error responses by the server.
    pub async fn route(
        &self,
        req: Request<hyper::body::Incoming>,
    ) -> Result<Response<Bytes>, RouterError> {
        let path = req.uri().path().to_string();

        let (handler, id) = match self.inner.at(&path) {
            Ok(matched) => (*matched.value, matched.params.get("id").map(str::to_string)),
            Err(_) => {
                return Err(RouterError::NotFound(format!("No route found for {}", path)));
            }
        };

        let state = self.state.clone();
        let method = req.method().clone();
        tracing::debug!("{} {}", method, path);

        match (handler, id) {
            (RouteHandler::Collection, _) => match method {
                Method::GET => handlers::list_posts(state).await,
                Method::POST => handlers::create_post(req, state).await,
                _ => Err(RouterError::MethodNotAllowed),
            },
            (RouteHandler::Member, Some(id)) => match method {
                Method::GET => handlers::read_post(&id, state).await,
                Method::PUT => handlers::update_post(req, &id, state).await,
                Method::DELETE => handlers::delete_post(&id, state).await,
                _ => Err(RouterError::MethodNotAllowed),
            },
            (RouteHandler::Member, None) => {
                Err(RouterError::BadRequest("missing post id".to_string()))
            }
        }
    }
}

/// Route handler kind.
#[derive(Debug, Clone, Copy)]
enum RouteHandler {
    Collection,
    Member,
}

/// Router error type.
#[derive(Debug, Error)]
pub enum RouterError {
    #[error("Method Not Allowed")]
    MethodNotAllowed,
    #[error("Internal Error: {0}")]
    InternalError(String),
    #[error("Request Timeout")]
    Timeout,
    #[error("Bad Request: {0}")]
    BadRequest(String),
    #[error("Not Found: {0}")]
    NotFound(String),
    #[error("Payload Too Large: {0}")]
    PayloadTooLarge(String),
}

impl RouterError {
    /// HTTP status code for this error.
    pub fn status(&self) -> u16 {
        match self {
            RouterError::MethodNotAllowed => 405,
            RouterError::InternalError(_) => 500,
            RouterError::Timeout => 408,
            RouterError::BadRequest(_) => 400,
            RouterError::NotFound(_) => 404,
            RouterError::PayloadTooLarge(_) => 413,
        }
    }
}

impl From<RouterError> for Response<Bytes> {
    fn from(err: RouterError) -> Self {
        let status = err.status();
        let message = match &err {
            RouterError::MethodNotAllowed => "Method Not Allowed".to_string(),
            RouterError::Timeout => "Request Timeout".to_string(),
            RouterError::InternalError(msg)
            | RouterError::BadRequest(msg)
            | RouterError::NotFound(msg)
            | RouterError::PayloadTooLarge(msg) => msg.clone(),
        };

        let error_response = handlers::error_response(status, message, None);
        let body = serde_json::to_vec(&error_response)
            .unwrap_or_else(|e| format!("{{\"success\":false,\"error\":{{\"code\":\"500\",\"message\":\"Failed to serialize error: {}\",\"details\":null}}}}", e).into_bytes());

        Response::builder()
            .status(status)
            .header("Content-Type", "application/json")
            .body(Bytes::from(body))
            .unwrap_or_else(|_| {
                let mut fallback = Response::new(Bytes::from("Internal Server Error"));
                *fallback.status_mut() = hyper::StatusCode::INTERNAL_SERVER_ERROR;
                fallback
            })
    }
}
