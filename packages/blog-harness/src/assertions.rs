//! Response and post-condition checks.
//!
//! Every check returns a descriptive [`AssertionError`] naming what
//! diverged, never a bare boolean.

use serde_json::Value;
use thiserror::Error;

use blog_store::{BlogPost, BlogPostPatch, NewBlogPost, ObjectId, StoreError};

use crate::client::ApiResponse;

/// Fields every post representation must carry.
pub const POST_FIELDS: [&str; 4] = ["id", "author", "title", "content"];

/// CRUD operation under test, with its expected success status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    List,
    Read,
    Create,
    Update,
    Delete,
}

impl Operation {
    pub fn expected_status(self) -> u16 {
        match self {
            Operation::List | Operation::Read => 200,
            Operation::Create => 201,
            Operation::Update | Operation::Delete => 204,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Operation::List => "list",
            Operation::Read => "read",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }
}

/// A failed check.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssertionError {
    #[error("{context}: expected status {expected}, got {actual} (body: {body})")]
    Status {
        context: String,
        expected: u16,
        actual: u16,
        body: String,
    },

    #[error("{context}: missing field '{field}'")]
    MissingField { context: String, field: String },

    #[error("{context}: field '{field}' expected {expected}, got {actual}")]
    FieldMismatch {
        context: String,
        field: String,
        expected: String,
        actual: String,
    },

    #[error("{context}: expected {expected} record(s), got {actual}")]
    Count {
        context: String,
        expected: usize,
        actual: usize,
    },

    #[error("{context}: expected at least {minimum} record(s), got {actual}")]
    TooFew {
        context: String,
        minimum: usize,
        actual: usize,
    },

    #[error("{context}: expected record {id} to be gone, but the store still has it")]
    StillPresent { context: String, id: String },

    #[error("{context}: header '{header}' expected {expected}, got {actual}")]
    Header {
        context: String,
        header: String,
        expected: String,
        actual: String,
    },

    #[error("{context}: {reason}")]
    Malformed { context: String, reason: String },
}

/// Status matches the operation's expected code.
pub fn expect_status(operation: Operation, response: &ApiResponse) -> Result<(), AssertionError> {
    let expected = operation.expected_status();
    let actual = response.status.as_u16();
    if actual != expected {
        return Err(AssertionError::Status {
            context: response.label(),
            expected,
            actual,
            body: response.text(),
        });
    }
    Ok(())
}

/// Response declares a JSON body.
pub fn expect_json_content_type(response: &ApiResponse) -> Result<(), AssertionError> {
    let actual = response.header("content-type").unwrap_or("<none>");
    if !actual.starts_with("application/json") {
        return Err(AssertionError::Header {
            context: response.label(),
            header: "content-type".to_string(),
            expected: "application/json".to_string(),
            actual: actual.to_string(),
        });
    }
    Ok(())
}

/// Response body is empty, as for 204 responses.
pub fn expect_empty_body(response: &ApiResponse) -> Result<(), AssertionError> {
    if !response.body.is_empty() {
        return Err(AssertionError::FieldMismatch {
            context: response.label(),
            field: "body".to_string(),
            expected: "<empty>".to_string(),
            actual: response.text(),
        });
    }
    Ok(())
}

/// JSON object contains every named field.
pub fn expect_fields(context: &str, value: &Value, fields: &[&str]) -> Result<(), AssertionError> {
    let object = value.as_object().ok_or_else(|| AssertionError::Malformed {
        context: context.to_string(),
        reason: format!("expected a JSON object, got {}", value),
    })?;
    for field in fields {
        if object.get(*field).map_or(true, Value::is_null) {
            return Err(AssertionError::MissingField {
                context: context.to_string(),
                field: field.to_string(),
            });
        }
    }
    Ok(())
}

/// Checks a post representation's shape and decodes it.
pub fn expect_post(context: &str, value: &Value) -> Result<BlogPost, AssertionError> {
    expect_fields(context, value, &POST_FIELDS)?;
    serde_json::from_value(value.clone()).map_err(|e| AssertionError::Malformed {
        context: context.to_string(),
        reason: e.to_string(),
    })
}

/// Extracts the `posts` array of a list response.
pub fn expect_post_list(response: &ApiResponse) -> Result<Vec<Value>, AssertionError> {
    let context = response.label();
    let body = response.json_value().map_err(|e| AssertionError::Malformed {
        context: context.clone(),
        reason: e.to_string(),
    })?;
    match body.get("posts") {
        Some(Value::Array(items)) => Ok(items.clone()),
        Some(other) => Err(AssertionError::Malformed {
            context,
            reason: format!("'posts' must be an array, got {}", other),
        }),
        None => Err(AssertionError::MissingField {
            context,
            field: "posts".to_string(),
        }),
    }
}

/// API view and stored record agree on id, author, title and content.
pub fn expect_post_matches(
    context: &str,
    api: &BlogPost,
    stored: &BlogPost,
) -> Result<(), AssertionError> {
    compare(context, "id", &stored.id, &api.id)?;
    compare(context, "author", &stored.author, &api.author)?;
    compare(context, "title", &stored.title, &api.title)?;
    compare(context, "content", &stored.content, &api.content)
}

/// A created post carries exactly the submitted values.
pub fn expect_matches_input(
    context: &str,
    post: &BlogPost,
    input: &NewBlogPost,
) -> Result<(), AssertionError> {
    compare(context, "author", &input.author, &post.author)?;
    compare(context, "title", &input.title, &post.title)?;
    compare(context, "content", &input.content, &post.content)
}

/// Patched fields took the new values; every other field kept its old one.
pub fn expect_patch_applied(
    context: &str,
    before: &BlogPost,
    after: &BlogPost,
    patch: &BlogPostPatch,
) -> Result<(), AssertionError> {
    compare(context, "id", &before.id, &after.id)?;
    compare(
        context,
        "author",
        patch.author.as_ref().unwrap_or(&before.author),
        &after.author,
    )?;
    compare(
        context,
        "title",
        patch.title.as_ref().unwrap_or(&before.title),
        &after.title,
    )?;
    compare(
        context,
        "content",
        patch.content.as_ref().unwrap_or(&before.content),
        &after.content,
    )
}

pub fn expect_count(context: &str, expected: usize, actual: usize) -> Result<(), AssertionError> {
    if expected != actual {
        return Err(AssertionError::Count {
            context: context.to_string(),
            expected,
            actual,
        });
    }
    Ok(())
}

pub fn expect_at_least(context: &str, minimum: usize, actual: usize) -> Result<(), AssertionError> {
    if actual < minimum {
        return Err(AssertionError::TooFew {
            context: context.to_string(),
            minimum,
            actual,
        });
    }
    Ok(())
}

/// A store lookup for `id` reports "not found".
pub fn expect_absent(
    context: &str,
    id: &ObjectId,
    lookup: Result<BlogPost, StoreError>,
) -> Result<(), AssertionError> {
    match lookup {
        Err(StoreError::DocumentNotFound { .. }) => Ok(()),
        Ok(_) => Err(AssertionError::StillPresent {
            context: context.to_string(),
            id: id.to_hex(),
        }),
        Err(other) => Err(AssertionError::Malformed {
            context: context.to_string(),
            reason: format!("store lookup of {} failed: {}", id, other),
        }),
    }
}

fn compare<T>(context: &str, field: &str, expected: &T, actual: &T) -> Result<(), AssertionError>
where
    T: PartialEq + serde::Serialize,
{
    if expected != actual {
        return Err(AssertionError::FieldMismatch {
            context: context.to_string(),
            field: field.to_string(),
            expected: render(expected),
            actual: render(actual),
        });
    }
    Ok(())
}

fn render<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "<unserializable>".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use blog_store::Author;
    use reqwest::header::HeaderMap;
    use reqwest::{Method, StatusCode};
    use serde_json::json;

    fn response(status: u16, body: &str) -> ApiResponse {
        ApiResponse {
            method: Method::POST,
            path: "/posts".to_string(),
            status: StatusCode::from_u16(status).unwrap(),
            headers: HeaderMap::new(),
            body: body.as_bytes().to_vec(),
        }
    }

    fn post(title: &str) -> BlogPost {
        BlogPost {
            id: "5a1f2b3c4d5e6f7081920a1b".parse().unwrap(),
            author: Author::new("Danny", "Di Giulio"),
            title: title.to_string(),
            content: "hi".to_string(),
        }
    }

    #[test]
    fn test_status_mismatch_reports_expected_and_actual() {
        let err = expect_status(Operation::Create, &response(200, "{}")).unwrap_err();
        assert_eq!(
            err,
            AssertionError::Status {
                context: "POST /posts".to_string(),
                expected: 201,
                actual: 200,
                body: "{}".to_string(),
            }
        );
        assert!(expect_status(Operation::Create, &response(201, "")).is_ok());
        assert_eq!(Operation::Delete.expected_status(), 204);
    }

    #[test]
    fn test_missing_field_is_named() {
        let value = json!({"id": "x", "title": "t", "content": "c"});
        let err = expect_fields("GET /posts", &value, &POST_FIELDS).unwrap_err();
        assert!(err.to_string().contains("'author'"));
        assert!(expect_fields("GET /posts", &json!([1]), &POST_FIELDS).is_err());
    }

    #[test]
    fn test_post_mismatch_shows_both_values() {
        let err = expect_post_matches("store", &post("api"), &post("stored")).unwrap_err();
        match err {
            AssertionError::FieldMismatch {
                field,
                expected,
                actual,
                ..
            } => {
                assert_eq!(field, "title");
                assert_eq!(expected, "\"stored\"");
                assert_eq!(actual, "\"api\"");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_patch_applied_detects_collateral_changes() {
        let before = post("old");
        let mut after = post("Dr. DooLittle");
        let patch = BlogPostPatch::default().title("Dr. DooLittle");
        assert!(expect_patch_applied("update", &before, &after, &patch).is_ok());

        after.content = "changed behind our back".to_string();
        let err = expect_patch_applied("update", &before, &after, &patch).unwrap_err();
        assert!(matches!(err, AssertionError::FieldMismatch { ref field, .. } if field == "content"));
    }

    #[test]
    fn test_absent_and_counts() {
        let id = post("x").id;
        let gone = Err(StoreError::DocumentNotFound {
            collection: "blogposts".to_string(),
            id: id.to_hex(),
        });
        assert!(expect_absent("delete", &id, gone).is_ok());
        assert!(matches!(
            expect_absent("delete", &id, Ok(post("x"))),
            Err(AssertionError::StillPresent { .. })
        ));
        assert!(expect_count("list", 2, 2).is_ok());
        assert!(expect_count("list", 2, 3).is_err());
        assert!(expect_at_least("list", 1, 0).is_err());
    }

    #[test]
    fn test_post_list_requires_posts_field() {
        let mut listed = response(200, r#"{"restaurants": []}"#);
        listed.method = Method::GET;
        let err = expect_post_list(&listed).unwrap_err();
        assert_eq!(
            err,
            AssertionError::MissingField {
                context: "GET /posts".to_string(),
                field: "posts".to_string(),
            }
        );
    }
}
