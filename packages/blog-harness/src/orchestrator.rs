//! Suite lifecycle and per-scenario sequencing.
//!
//! ```text
//! Suite:    NotStarted --start--> Running --stop--> Stopped
//! Scenario: Seeded --> Executing --> TornDown
//! ```
//!
//! Teardown runs after every scenario, whatever the outcome of seeding
//! or of the body. A failed teardown
//! leaves later scenarios without a clean store, so they are skipped and
//! reported as such.

use std::sync::Arc;
use std::time::{Duration, Instant};

use blog_api::{ApiConfig, Router, RunningServer, Server};
use blog_store::config::StoreConfig;
use blog_store::{Database, Posts};

use crate::client::PostsClient;
use crate::config::HarnessConfig;
use crate::context::TestContext;
use crate::error::HarnessError;
use crate::fixture::{BulkImport, FixtureLoader, SeedFixture};
use crate::report::{ScenarioOutcome, SuiteReport};
use crate::scenario::{Scenario, ScenarioEnv};

/// Suite lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuiteState {
    NotStarted,
    Running,
    Stopped,
}

/// Phases a scenario passed through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioPhase {
    Seeded,
    Executing,
    TornDown,
}

/// Poll interval while waiting for the application to answer.
const STARTUP_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// One application instance shared by a sequence of scenarios.
pub struct Suite {
    config: HarnessConfig,
    state: SuiteState,
    db: Option<Arc<Database>>,
    importer: Option<Arc<dyn BulkImport>>,
    server: Option<RunningServer>,
    client: Option<PostsClient>,
    isolation_broken: Option<String>,
}

impl Suite {
    /// Creates a suite that opens its own database on [`Suite::start`].
    pub fn new(config: HarnessConfig) -> Self {
        Self {
            config,
            state: SuiteState::NotStarted,
            db: None,
            importer: None,
            server: None,
            client: None,
            isolation_broken: None,
        }
    }

    /// Creates a suite over an existing database. Its name must match
    /// the configured test database.
    pub fn with_database(config: HarnessConfig, db: Arc<Database>) -> Self {
        let mut suite = Self::new(config);
        suite.db = Some(db);
        suite
    }

    /// Seeds and tears down through `importer` instead of the database.
    pub fn with_importer(mut self, importer: Arc<dyn BulkImport>) -> Self {
        self.importer = Some(importer);
        self
    }

    pub fn state(&self) -> SuiteState {
        self.state
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Database the application is serving, once started.
    pub fn database(&self) -> Option<&Arc<Database>> {
        self.db.as_ref()
    }

    pub fn client(&self) -> Option<&PostsClient> {
        self.client.as_ref()
    }

    pub fn base_url(&self) -> Option<String> {
        self.server.as_ref().map(RunningServer::base_url)
    }

    /// Why later scenarios are being skipped, if they are.
    pub fn isolation_broken(&self) -> Option<&str> {
        self.isolation_broken.as_deref()
    }

    /// Connects to the test database, launches the application and waits
    /// until it answers.
    ///
    /// # Errors
    /// `Setup` on any failure; the suite stays `NotStarted`.
    pub async fn start(&mut self) -> Result<(), HarnessError> {
        self.expect_state(SuiteState::NotStarted)?;
        self.config.validate()?;

        let db = match self.db.take() {
            Some(db) if db.name() != self.config.database => {
                return Err(HarnessError::Setup(format!(
                    "database '{}' does not match configured test database '{}'",
                    db.name(),
                    self.config.database
                )));
            }
            Some(db) => db,
            None => {
                let store_config = StoreConfig {
                    name: self.config.database.clone(),
                    data_dir: self.config.data_dir.clone(),
                    ..Default::default()
                };
                let db = Database::open(store_config).map_err(|e| {
                    HarnessError::Setup(format!(
                        "failed to open database '{}': {}",
                        self.config.database, e
                    ))
                })?;
                Arc::new(db)
            }
        };

        // Leftovers from an aborted run would skew every count
        db.drop_database().map_err(|e| {
            HarnessError::Setup(format!("failed to clear '{}': {}", db.name(), e))
        })?;

        let api_config = ApiConfig {
            collection: self.config.collection.clone(),
            ..Default::default()
        };
        let router = Router::new(db.clone(), api_config);
        let server = Server::bind(self.config.bind_addr, router)
            .await
            .map_err(|e| {
                HarnessError::Setup(format!("failed to bind {}: {}", self.config.bind_addr, e))
            })?;
        let server = server
            .spawn()
            .map_err(|e| HarnessError::Setup(format!("failed to start server: {}", e)))?;

        let client = PostsClient::new(
            server.base_url(),
            Duration::from_millis(self.config.request_timeout_ms),
        )
        .map_err(|e| HarnessError::Setup(e.to_string()))?;

        wait_until_ready(&client, Duration::from_millis(self.config.startup_timeout_ms)).await?;

        tracing::info!(
            "Suite started against '{}' at {}",
            db.name(),
            server.base_url()
        );
        self.db = Some(db);
        self.server = Some(server);
        self.client = Some(client);
        self.state = SuiteState::Running;
        Ok(())
    }

    /// Runs one scenario: seed, execute, then always tear down.
    ///
    /// Never returns an error; every failure lands in the outcome.
    pub async fn run_scenario(&mut self, scenario: &Scenario) -> ScenarioOutcome {
        let started = Instant::now();
        let mut outcome = ScenarioOutcome::new(scenario.name.clone());

        if let Err(e) = self.expect_state(SuiteState::Running) {
            outcome.failure = Some(e);
            return outcome.finish(started);
        }
        if let Some(reason) = &self.isolation_broken {
            tracing::warn!("Skipping '{}': isolation broken", scenario.name);
            outcome.failure = Some(HarnessError::IsolationBroken(reason.clone()));
            return outcome.finish(started);
        }
        let (db, client) = match (&self.db, &self.client) {
            (Some(db), Some(client)) => (db.clone(), client.clone()),
            _ => {
                outcome.failure = Some(HarnessError::Setup(
                    "suite is running without a database or client".to_string(),
                ));
                return outcome.finish(started);
            }
        };

        let store: Arc<dyn BulkImport> = match &self.importer {
            Some(importer) => importer.clone(),
            None => db.clone() as Arc<dyn BulkImport>,
        };

        tracing::info!("Running scenario '{}'", scenario.name);
        let teardown = match SeedFixture::load(&scenario.fixture) {
            Ok(fixture) => {
                let loader = FixtureLoader::new(store, self.config.collection.clone(), fixture);
                let result = self
                    .seed_and_execute(scenario, &db, &client, &loader, &mut outcome)
                    .await;
                outcome.failure = result.err();
                loader.teardown()
            }
            Err(e) => {
                outcome.failure = Some(e);
                store.drop_all().map_err(HarnessError::Teardown)
            }
        };

        match teardown {
            Ok(()) => outcome.phases.push(ScenarioPhase::TornDown),
            Err(e) => {
                tracing::error!(
                    "Teardown after '{}' failed, skipping remaining scenarios: {}",
                    scenario.name,
                    e
                );
                self.isolation_broken = Some(format!("teardown after '{}': {}", scenario.name, e));
                outcome.teardown_failure = Some(e);
            }
        }

        let outcome = outcome.finish(started);
        if outcome.passed() {
            tracing::info!("Scenario '{}' passed", scenario.name);
        } else if let Some(failure) = &outcome.failure {
            tracing::warn!("Scenario '{}' failed: {}", scenario.name, failure);
        }
        outcome
    }

    async fn seed_and_execute(
        &self,
        scenario: &Scenario,
        db: &Database,
        client: &PostsClient,
        loader: &FixtureLoader,
        outcome: &mut ScenarioOutcome,
    ) -> Result<(), HarnessError> {
        loader.seed()?;
        outcome.phases.push(ScenarioPhase::Seeded);

        let posts = Posts::in_collection(db, &self.config.collection);
        let seeded = posts.find_all()?;
        let mut ctx = TestContext::new(scenario.name.clone(), seeded);

        outcome.phases.push(ScenarioPhase::Executing);
        let env = ScenarioEnv {
            client,
            posts,
            loader,
        };
        scenario.execute(&env, &mut ctx).await
    }

    /// Runs scenarios in order and collects their outcomes.
    pub async fn run(&mut self, scenarios: &[Scenario]) -> Result<SuiteReport, HarnessError> {
        self.expect_state(SuiteState::Running)?;
        let mut report = SuiteReport::new(self.config.database.clone());
        for scenario in scenarios {
            report.outcomes.push(self.run_scenario(scenario).await);
        }
        Ok(report)
    }

    /// Shuts the application down.
    pub async fn stop(&mut self) -> Result<(), HarnessError> {
        self.expect_state(SuiteState::Running)?;
        self.state = SuiteState::Stopped;
        self.client = None;
        if let Some(server) = self.server.take() {
            server
                .shutdown()
                .await
                .map_err(|e| HarnessError::Shutdown(e.to_string()))?;
        }
        tracing::info!("Suite stopped");
        Ok(())
    }

    fn expect_state(&self, expected: SuiteState) -> Result<(), HarnessError> {
        if self.state != expected {
            return Err(HarnessError::InvalidState {
                expected,
                actual: self.state,
            });
        }
        Ok(())
    }
}

impl Drop for Suite {
    fn drop(&mut self) {
        if self.state == SuiteState::Running {
            tracing::warn!("Suite dropped while running; server shut down without waiting");
        }
    }
}

/// Starts a suite, runs `scenarios`, and stops it again.
///
/// The suite is stopped even when a scenario fails; a setup failure
/// aborts before any scenario runs.
pub async fn run_all(
    config: HarnessConfig,
    scenarios: &[Scenario],
) -> Result<SuiteReport, HarnessError> {
    let mut suite = Suite::new(config);
    suite.start().await?;
    let report = suite.run(scenarios).await;
    suite.stop().await?;
    report
}

async fn wait_until_ready(client: &PostsClient, timeout: Duration) -> Result<(), HarnessError> {
    let deadline = Instant::now() + timeout;
    loop {
        match client.list().await {
            Ok(_) => return Ok(()),
            Err(e) if Instant::now() >= deadline => {
                return Err(HarnessError::Setup(format!(
                    "application did not answer within {:?}: {}",
                    timeout, e
                )));
            }
            Err(e) => {
                tracing::debug!("Waiting for application: {}", e);
                tokio::time::sleep(STARTUP_POLL_INTERVAL).await;
            }
        }
    }
}
