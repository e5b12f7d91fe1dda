//! HTTP endpoint implementations for the posts resource.

mod posts;
mod request_utils;
mod response;

pub use posts::{create_post, delete_post, list_posts, read_post, update_post};
pub use request_utils::{map_store_error_to_router_error, parse_post_id};
pub use response::{error_response, ApiError, ErrorResponse, PostList};
