//! Document store for the blog service.
//!
//! Provides named collections of JSON documents keyed by ObjectId-style
//! identifiers, bulk import with drop semantics, whole-database drop,
//! optional snapshot persistence, and the blog post model layer.

pub mod config;
pub mod database;
pub mod document;
pub mod error;
pub mod import;
pub mod model;
pub mod object_id;
pub mod persistence;
pub mod posts;

pub use database::Database;
pub use error::StoreError;
pub use model::{Author, BlogPost, BlogPostPatch, NewBlogPost};
pub use object_id::ObjectId;
pub use posts::{Posts, POSTS_COLLECTION};
