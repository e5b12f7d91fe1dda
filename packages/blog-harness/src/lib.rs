//! End-to-end harness for the posts API.
//!
//! A [`Suite`] starts the application once against a dedicated test
//! database, then runs each [`Scenario`] as seed → execute → teardown,
//! with teardown guaranteed even when the scenario body fails. Scenarios
//! talk to the server through [`PostsClient`], check results with the
//! functions in [`assertions`], and cross-check every claim against an
//! independent read from the store.

pub mod assertions;
pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod fixture;
pub mod orchestrator;
pub mod report;
pub mod scenario;

pub use client::{ApiResponse, ClientError, PostsClient};
pub use config::HarnessConfig;
pub use context::TestContext;
pub use error::HarnessError;
pub use fixture::{BulkImport, FixtureLoader, SeedFixture};
pub use orchestrator::{run_all, ScenarioPhase, Suite, SuiteState};
pub use report::{ScenarioOutcome, SuiteReport};
pub use scenario::{default_scenarios, sample_post, Exercise, Scenario, ScenarioEnv};
