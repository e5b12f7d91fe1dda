//! Harness error types.

use std::path::PathBuf;

use thiserror::Error;

use blog_store::StoreError;

use crate::assertions::AssertionError;
use crate::client::ClientError;
use crate::orchestrator::SuiteState;

/// Errors raised while running a suite.
#[derive(Error, Debug)]
pub enum HarnessError {
    /// Application or database could not be brought up; aborts the suite
    #[error("Setup failed: {0}")]
    Setup(String),

    /// Application did not shut down cleanly
    #[error("Shutdown failed: {0}")]
    Shutdown(String),

    /// Bulk import reported a failure
    #[error("Seeding '{collection}' from {} failed: {source}", path.display())]
    Seed {
        collection: String,
        path: PathBuf,
        #[source]
        source: StoreError,
    },

    /// Import succeeded but the store holds a different number of records
    #[error("Seeded {actual} record(s) into '{collection}', fixture holds {expected}")]
    SeedCount {
        collection: String,
        expected: usize,
        actual: usize,
    },

    /// Fixture file is unusable
    #[error("Fixture {}: {reason}", path.display())]
    Fixture { path: PathBuf, reason: String },

    /// Store could not be cleared after a scenario
    #[error("Teardown failed: {0}")]
    Teardown(#[source] StoreError),

    /// Earlier teardown failure; the scenario was not run
    #[error("Skipped, isolation broken by an earlier teardown failure: {0}")]
    IsolationBroken(String),

    /// Operation not valid in the suite's current state
    #[error("Invalid suite state: expected {expected:?}, was {actual:?}")]
    InvalidState {
        expected: SuiteState,
        actual: SuiteState,
    },

    /// No identifier captured under the given name
    #[error("No value captured under '{0}'")]
    MissingCapture(String),

    /// Scenario body ran before any response was recorded
    #[error("No response recorded yet")]
    NoResponse,

    /// Direct store read failed
    #[error("Store read failed: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Assertion(#[from] AssertionError),

    /// At least one scenario failed
    #[error("{failed} of {total} scenario(s) failed")]
    SuiteFailed { failed: usize, total: usize },
}
