//! Posts resource handlers.

use hyper::{body::Bytes, Request, Response};

use crate::router::{AppState, RouterError};
use blog_store::{BlogPostPatch, NewBlogPost, Posts};

use super::request_utils::{
    build_empty_response, build_json_response, map_store_error_to_router_error, parse_json_body,
    parse_post_id, read_request_body_with_timeout,
};
use super::response::PostList;

/// Lists all posts.
///
/// # Endpoint
/// `GET /posts`
///
/// # Response
/// - **200 OK**
/// ```json
/// {
///   "posts": [
///     {"id": "5a1f...", "author": {"firstName": "Danny", "lastName": "Di Giulio"},
///      "title": "I AM THE BEST", "content": "hi"}
///   ]
/// }
/// ```
pub async fn list_posts(state: AppState) -> Result<Response<Bytes>, RouterError> {
    let posts = Posts::in_collection(&state.db, &state.config.collection)
        .find_all()
        .map_err(map_store_error_to_router_error)?;
    build_json_response(200, &PostList { posts })
}

/// Creates a post.
///
/// # Endpoint
/// `POST /posts`
///
/// # Request Body
/// ```json
/// {
///   "author": {"firstName": "Danny", "lastName": "Di Giulio"},
///   "title": "I AM THE BEST",
///   "content": "hi"
/// }
/// ```
///
/// # Response
/// - **201 Created**: the stored post including its assigned `id`, with a
///   `Location` header pointing at the member resource
///
/// # Errors
/// - **400 Bad Request**: body is not JSON, or `title`, `content` or `author` is missing
/// - **413 Payload Too Large**: body exceeds the configured limit
///
/// # Example
/// ```bash
/// curl -X POST http://localhost:8080/posts \
///   -H "Content-Type: application/json" \
///   -d '{"author": {"firstName": "Danny", "lastName": "Di Giulio"}, "title": "I AM THE BEST", "content": "hi"}'
/// ```
pub async fn create_post(
    req: Request<hyper::body::Incoming>,
    state: AppState,
) -> Result<Response<Bytes>, RouterError> {
    let body = read_request_body_with_timeout(
        req,
        state.config.request_timeout_ms,
        state.config.max_body_bytes,
    )
    .await?;
    let value: serde_json::Value = parse_json_body(&body)?;
    let new_post = NewBlogPost::from_value(&value).map_err(map_store_error_to_router_error)?;

    let post = Posts::in_collection(&state.db, &state.config.collection)
        .create(new_post)
        .map_err(map_store_error_to_router_error)?;
    tracing::debug!("Created post {}", post.id);

    let mut response = build_json_response(201, &post)?;
    let location = format!("/posts/{}", post.id)
        .parse()
        .map_err(|e| RouterError::InternalError(format!("Invalid location header: {}", e)))?;
    response.headers_mut().insert(hyper::header::LOCATION, location);
    Ok(response)
}

/// Reads one post.
///
/// # Endpoint
/// `GET /posts/{id}`
///
/// # Errors
/// - **400 Bad Request**: `id` is not a 24 character hex string
/// - **404 Not Found**: no post with that id
pub async fn read_post(id: &str, state: AppState) -> Result<Response<Bytes>, RouterError> {
    let id = parse_post_id(id)?;
    let post = Posts::in_collection(&state.db, &state.config.collection)
        .find_by_id(&id)
        .map_err(map_store_error_to_router_error)?;
    build_json_response(200, &post)
}

/// Updates any subset of `title`, `content` and `author`.
///
/// # Endpoint
/// `PUT /posts/{id}`
///
/// # Response
/// - **204 No Content**
///
/// # Errors
/// - **400 Bad Request**: body `id` differs from the path id, or body is malformed
/// - **404 Not Found**: no post with that id
pub async fn update_post(
    req: Request<hyper::body::Incoming>,
    id: &str,
    state: AppState,
) -> Result<Response<Bytes>, RouterError> {
    let id = parse_post_id(id)?;
    let body = read_request_body_with_timeout(
        req,
        state.config.request_timeout_ms,
        state.config.max_body_bytes,
    )
    .await?;
    let patch: BlogPostPatch = parse_json_body(&body)?;
    if patch.is_empty() {
        tracing::debug!("Update of post {} carries no updatable fields", id);
    }

    Posts::in_collection(&state.db, &state.config.collection)
        .update(&id, patch)
        .map_err(map_store_error_to_router_error)?;
    build_empty_response(204)
}

/// Deletes one post.
///
/// # Endpoint
/// `DELETE /posts/{id}`
///
/// # Response
/// - **204 No Content**
///
/// # Errors
/// - **404 Not Found**: no post with that id
pub async fn delete_post(id: &str, state: AppState) -> Result<Response<Bytes>, RouterError> {
    let id = parse_post_id(id)?;
    Posts::in_collection(&state.db, &state.config.collection)
        .delete(&id)
        .map_err(map_store_error_to_router_error)?;
    tracing::debug!("Deleted post {}", id);
    build_empty_response(204)
}
