//! REST API server for blog posts.
//!
//! Exposes the `/posts` collection and `/posts/{id}` member resources over
//! hyper, routed with matchit, backed by a `blog_store::Database`.

pub mod config;
pub mod handlers;
pub mod router;
pub mod server;

pub use config::ApiConfig;
pub use router::{AppState, Router, RouterError};
pub use server::{RunningServer, Server};
