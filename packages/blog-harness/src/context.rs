//! Per-scenario state.

use std::collections::BTreeMap;

use blog_store::{BlogPost, ObjectId};

use crate::client::ApiResponse;
use crate::error::HarnessError;

/// State owned by one running scenario: the records it was seeded with,
/// the last response it received, and identifiers captured along the way.
/// Dropped when the scenario ends.
#[derive(Debug)]
pub struct TestContext {
    scenario: String,
    seeded: Vec<BlogPost>,
    last_response: Option<ApiResponse>,
    captured: BTreeMap<String, ObjectId>,
}

impl TestContext {
    pub fn new(scenario: impl Into<String>, seeded: Vec<BlogPost>) -> Self {
        Self {
            scenario: scenario.into(),
            seeded,
            last_response: None,
            captured: BTreeMap::new(),
        }
    }

    pub fn scenario(&self) -> &str {
        &self.scenario
    }

    /// Records seeded before the scenario body ran, in fixture order.
    pub fn seeded(&self) -> &[BlogPost] {
        &self.seeded
    }

    pub fn seeded_count(&self) -> usize {
        self.seeded.len()
    }

    /// First seeded record, the default target of member operations.
    pub fn first_seeded(&self) -> Result<&BlogPost, HarnessError> {
        self.seeded.first().ok_or_else(|| HarnessError::Fixture {
            path: self.scenario.clone().into(),
            reason: "scenario needs at least one seeded post".to_string(),
        })
    }

    /// Stores a response and returns a reference to it.
    pub fn record(&mut self, response: ApiResponse) -> &ApiResponse {
        self.last_response.insert(response)
    }

    pub fn last_response(&self) -> Result<&ApiResponse, HarnessError> {
        self.last_response.as_ref().ok_or(HarnessError::NoResponse)
    }

    pub fn capture(&mut self, name: impl Into<String>, id: ObjectId) {
        self.captured.insert(name.into(), id);
    }

    pub fn captured(&self, name: &str) -> Result<ObjectId, HarnessError> {
        self.captured
            .get(name)
            .copied()
            .ok_or_else(|| HarnessError::MissingCapture(name.to_string()))
    }
}
