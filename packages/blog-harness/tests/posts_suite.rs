//! End-to-end runs of the harness against a live in-process server.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use blog_harness::{
    default_scenarios, run_all, sample_post, BulkImport, Exercise, HarnessConfig, HarnessError,
    Scenario, ScenarioPhase, Suite, SuiteState,
};
use blog_store::config::{StoreConfig, PRODUCTION_DATABASE};
use blog_store::{BlogPostPatch, Database, ObjectId, StoreError};

const ALL_PHASES: [ScenarioPhase; 3] = [
    ScenarioPhase::Seeded,
    ScenarioPhase::Executing,
    ScenarioPhase::TornDown,
];

/// Delegates to a real database; import and teardown can be made to fail.
struct ControlledStore {
    db: Arc<Database>,
    fail_import: AtomicBool,
    fail_teardown: AtomicBool,
}

impl ControlledStore {
    fn new(db: Arc<Database>) -> Self {
        Self {
            db,
            fail_import: AtomicBool::new(false),
            fail_teardown: AtomicBool::new(false),
        }
    }
}

impl BulkImport for ControlledStore {
    fn import_replacing(&self, collection: &str, path: &Path) -> Result<usize, StoreError> {
        if self.fail_import.load(Ordering::SeqCst) {
            return Err(StoreError::Import {
                path: path.to_path_buf(),
                record: 0,
                reason: "connection refused".to_string(),
            });
        }
        self.db.as_ref().import_replacing(collection, path)
    }

    fn count(&self, collection: &str) -> Result<usize, StoreError> {
        self.db.count(collection)
    }

    fn drop_collection(&self, collection: &str) -> Result<(), StoreError> {
        BulkImport::drop_collection(self.db.as_ref(), collection)
    }

    fn drop_all(&self) -> Result<(), StoreError> {
        if self.fail_teardown.load(Ordering::SeqCst) {
            return Err(StoreError::IoError("permission denied".to_string()));
        }
        self.db.drop_database()
    }
}

fn controlled_suite() -> (Suite, Arc<Database>, Arc<ControlledStore>) {
    let config = HarnessConfig::default();
    let db = Arc::new(Database::new(StoreConfig::in_memory(config.database.clone())));
    let store = Arc::new(ControlledStore::new(db.clone()));
    let suite = Suite::with_database(config, db.clone()).with_importer(store.clone());
    (suite, db, store)
}

#[tokio::test]
async fn default_scenarios_pass() -> anyhow::Result<()> {
    let config = HarnessConfig::default();
    let scenarios = default_scenarios(&config);
    let report = run_all(config, &scenarios).await?;

    assert_eq!(report.outcomes.len(), scenarios.len());
    for outcome in &report.outcomes {
        assert!(outcome.passed(), "{}", report);
        assert_eq!(outcome.phases, ALL_PHASES);
    }
    report.into_result()?;
    Ok(())
}

#[tokio::test]
async fn every_scenario_starts_from_fixture_only() -> anyhow::Result<()> {
    let (mut suite, db, _) = controlled_suite();
    suite.start().await?;
    let config = suite.config().clone();
    let single = config.fixture_path("single-post.json");

    // Create adds a second post; the next scenario must see only the fixture again
    let create = Scenario::new("create", &single, Exercise::Create(sample_post()));
    let list = Scenario::new("list", &single, Exercise::ListAll);
    let report = suite.run(&[create, list]).await?;
    report.into_result()?;

    assert_eq!(db.count(&config.collection)?, 0);
    suite.stop().await?;
    Ok(())
}

#[tokio::test]
async fn import_failure_fails_scenario_and_still_tears_down() -> anyhow::Result<()> {
    let (mut suite, db, store) = controlled_suite();
    suite.start().await?;
    let config = suite.config().clone();
    let seed = config.fixture_path(&config.default_fixture);

    store.fail_import.store(true, Ordering::SeqCst);
    let outcome = suite
        .run_scenario(&Scenario::new("seed fails", &seed, Exercise::ListAll))
        .await;
    assert!(matches!(outcome.failure, Some(HarnessError::Seed { .. })));
    assert!(outcome
        .failure
        .as_ref()
        .map_or(false, |e| e.to_string().contains("connection refused")));
    assert_eq!(outcome.phases, vec![ScenarioPhase::TornDown]);
    assert_eq!(db.count(&config.collection)?, 0);

    // Isolation held, so the next scenario runs normally
    store.fail_import.store(false, Ordering::SeqCst);
    let outcome = suite
        .run_scenario(&Scenario::new("list", &seed, Exercise::ListAll))
        .await;
    assert!(outcome.passed(), "{:?}", outcome.failure);

    suite.stop().await?;
    Ok(())
}

#[tokio::test]
async fn malformed_fixture_is_reported() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let broken = dir.path().join("broken.json");
    std::fs::write(&broken, "{\"title\": \"ok\"\nnot json at all\n")?;

    let (mut suite, _, _) = controlled_suite();
    suite.start().await?;
    let outcome = suite
        .run_scenario(&Scenario::new("broken fixture", &broken, Exercise::ListAll))
        .await;
    assert!(matches!(outcome.failure, Some(HarnessError::Fixture { .. })));
    assert!(outcome.reached(ScenarioPhase::TornDown));
    assert!(!outcome.reached(ScenarioPhase::Executing));
    suite.stop().await?;
    Ok(())
}

#[tokio::test]
async fn rejected_request_fails_scenario_with_status() -> anyhow::Result<()> {
    let (mut suite, db, _) = controlled_suite();
    suite.start().await?;
    let config = suite.config().clone();
    let seed = config.fixture_path(&config.default_fixture);

    // Body id differs from the path id, so the API must refuse the update
    let patch = BlogPostPatch::default()
        .title("Dr. DooLittle")
        .with_id(ObjectId::new());
    let outcome = suite
        .run_scenario(&Scenario::new("mismatched id", &seed, Exercise::Update(patch)))
        .await;
    match &outcome.failure {
        Some(HarnessError::Client(e)) => assert_eq!(e.status().map(|s| s.as_u16()), Some(400)),
        other => panic!("expected a 400 from the API, got {:?}", other),
    }
    assert_eq!(outcome.phases, ALL_PHASES);
    assert_eq!(db.count(&config.collection)?, 0);
    suite.stop().await?;
    Ok(())
}

#[tokio::test]
async fn teardown_failure_skips_remaining_scenarios() -> anyhow::Result<()> {
    let (mut suite, _, store) = controlled_suite();
    suite.start().await?;
    let config = suite.config().clone();
    let seed = config.fixture_path(&config.default_fixture);

    store.fail_teardown.store(true, Ordering::SeqCst);
    let scenarios = [
        Scenario::new("first", &seed, Exercise::ReadOne),
        Scenario::new("second", &seed, Exercise::ListAll),
    ];
    let report = suite.run(&scenarios).await?;

    let first = report.outcome("first").expect("first outcome");
    assert!(first.failure.is_none());
    assert!(matches!(
        first.teardown_failure,
        Some(HarnessError::Teardown(_))
    ));
    assert!(!first.passed());

    let second = report.outcome("second").expect("second outcome");
    assert!(second.skipped());
    assert!(second.phases.is_empty());
    assert!(suite.isolation_broken().is_some());
    assert_eq!(report.failed(), 2);

    suite.stop().await?;
    Ok(())
}

#[tokio::test]
async fn production_database_is_refused() {
    let config = HarnessConfig {
        database: PRODUCTION_DATABASE.to_string(),
        ..Default::default()
    };
    let mut suite = Suite::new(config);
    assert!(matches!(suite.start().await, Err(HarnessError::Setup(_))));
    assert_eq!(suite.state(), SuiteState::NotStarted);

    let outcome = suite
        .run_scenario(&Scenario::new("never", "unused.json", Exercise::ListAll))
        .await;
    assert!(matches!(
        outcome.failure,
        Some(HarnessError::InvalidState {
            expected: SuiteState::Running,
            actual: SuiteState::NotStarted,
        })
    ));
}

#[tokio::test]
async fn leftover_snapshot_is_cleared_on_start() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let config = HarnessConfig {
        data_dir: Some(dir.path().to_path_buf()),
        ..Default::default()
    };
    let manifest = dir.path().join(&config.database).join("manifest.json");

    // Simulate an aborted earlier run that left data behind
    let leftover = Database::new(StoreConfig {
        name: config.database.clone(),
        data_dir: config.data_dir.clone(),
        ..Default::default()
    });
    blog_store::Posts::in_collection(&leftover, &config.collection).create(sample_post())?;
    leftover.flush()?;
    assert!(manifest.exists());

    let mut suite = Suite::new(config.clone());
    suite.start().await?;
    let db = suite.database().expect("started suite has a database").clone();
    assert!(db.collection_names().is_empty());
    assert!(!manifest.exists());

    let seed = config.fixture_path(&config.default_fixture);
    let report = suite
        .run(&[Scenario::new("list", &seed, Exercise::ListAll)])
        .await?;
    report.into_result()?;
    suite.stop().await?;
    Ok(())
}

#[tokio::test]
async fn database_outside_data_dir_is_refused() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let data_dir = dir.path().join("data");
    let precious = dir.path().join("precious");
    std::fs::create_dir_all(&data_dir)?;
    std::fs::create_dir_all(&precious)?;
    std::fs::write(precious.join("keep.txt"), "important")?;

    let config = HarnessConfig {
        database: "../precious".to_string(),
        data_dir: Some(data_dir),
        ..Default::default()
    };
    let mut suite = Suite::new(config);
    assert!(matches!(suite.start().await, Err(HarnessError::Setup(_))));
    assert_eq!(suite.state(), SuiteState::NotStarted);
    assert!(precious.join("keep.txt").exists());
    Ok(())
}
