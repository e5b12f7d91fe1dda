//! Fixture Loader: seeds the store before a scenario and clears it after.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;

use blog_store::import::{parse_fixture, ImportMode};
use blog_store::{Database, NewBlogPost, Posts, StoreError};

use crate::error::HarnessError;

/// Bulk-import and drop operations the loader depends on.
pub trait BulkImport: Send + Sync {
    /// Drops `collection`, then imports every record in `path`.
    ///
    /// # Returns
    /// Number of records imported.
    fn import_replacing(&self, collection: &str, path: &Path) -> Result<usize, StoreError>;

    /// Number of records currently in `collection`.
    fn count(&self, collection: &str) -> Result<usize, StoreError>;

    fn drop_collection(&self, collection: &str) -> Result<(), StoreError>;

    /// Removes all persisted state. Must succeed on an already empty store.
    fn drop_all(&self) -> Result<(), StoreError>;
}

impl BulkImport for Database {
    fn import_replacing(&self, collection: &str, path: &Path) -> Result<usize, StoreError> {
        Posts::in_collection(self, collection)
            .import_file(path, ImportMode::Drop)
            .map(|report| report.imported)
    }

    fn count(&self, collection: &str) -> Result<usize, StoreError> {
        Database::count(self, collection)
    }

    fn drop_collection(&self, collection: &str) -> Result<(), StoreError> {
        Database::drop_collection(self, collection).map(|_| ())
    }

    fn drop_all(&self) -> Result<(), StoreError> {
        self.drop_database()
    }
}

/// A fixture file and the posts it holds, in file order.
#[derive(Debug, Clone)]
pub struct SeedFixture {
    path: PathBuf,
    posts: Vec<NewBlogPost>,
}

impl SeedFixture {
    /// Reads and validates a fixture file. Every record must be a complete post.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, HarnessError> {
        let path = path.into();
        let documents = parse_fixture(&path).map_err(|e| HarnessError::Fixture {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        let posts = documents
            .into_iter()
            .enumerate()
            .map(|(i, doc)| {
                NewBlogPost::from_value(&Value::Object(doc.fields)).map_err(|e| {
                    HarnessError::Fixture {
                        path: path.clone(),
                        reason: format!("record {}: {}", i + 1, e),
                    }
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { path, posts })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn posts(&self) -> &[NewBlogPost] {
        &self.posts
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }
}

/// Loads one fixture into one collection and clears the store afterwards.
pub struct FixtureLoader {
    store: Arc<dyn BulkImport>,
    collection: String,
    fixture: SeedFixture,
}

impl FixtureLoader {
    pub fn new(
        store: Arc<dyn BulkImport>,
        collection: impl Into<String>,
        fixture: SeedFixture,
    ) -> Self {
        Self {
            store,
            collection: collection.into(),
            fixture,
        }
    }

    pub fn fixture(&self) -> &SeedFixture {
        &self.fixture
    }

    /// Replaces the collection with the fixture's records.
    ///
    /// Either the collection ends up holding exactly the fixture, or it is
    /// dropped and the failure is returned.
    pub fn seed(&self) -> Result<usize, HarnessError> {
        tracing::info!(
            "Seeding '{}' from {}",
            self.collection,
            self.fixture.path.display()
        );

        let imported = match self
            .store
            .import_replacing(&self.collection, &self.fixture.path)
        {
            Ok(imported) => imported,
            Err(source) => {
                self.discard_partial();
                return Err(HarnessError::Seed {
                    collection: self.collection.clone(),
                    path: self.fixture.path.clone(),
                    source,
                });
            }
        };

        let stored = match self.store.count(&self.collection) {
            Ok(stored) => stored,
            Err(source) => {
                self.discard_partial();
                return Err(HarnessError::Seed {
                    collection: self.collection.clone(),
                    path: self.fixture.path.clone(),
                    source,
                });
            }
        };

        if imported != self.fixture.len() || stored != self.fixture.len() {
            self.discard_partial();
            return Err(HarnessError::SeedCount {
                collection: self.collection.clone(),
                expected: self.fixture.len(),
                actual: stored,
            });
        }

        tracing::debug!("Seeded {} record(s) into '{}'", stored, self.collection);
        Ok(stored)
    }

    /// Drops all persisted state. Safe to call on an empty store.
    pub fn teardown(&self) -> Result<(), HarnessError> {
        self.store.drop_all().map_err(|e| {
            tracing::error!("Teardown of '{}' failed: {}", self.collection, e);
            HarnessError::Teardown(e)
        })?;
        tracing::debug!("Tore down store after '{}'", self.collection);
        Ok(())
    }

    fn discard_partial(&self) {
        if let Err(e) = self.store.drop_collection(&self.collection) {
            tracing::error!(
                "Failed to discard partially seeded '{}': {}",
                self.collection,
                e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blog_store::config::StoreConfig;
    use std::sync::Mutex;

    fn fixture_path(name: &str) -> PathBuf {
        PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures")).join(name)
    }

    /// Imports into a real database, then misbehaves as configured.
    struct FlakyImport {
        db: Database,
        fail_import: bool,
        extra_records: usize,
        calls: Mutex<Vec<&'static str>>,
    }

    impl FlakyImport {
        fn new(fail_import: bool, extra_records: usize) -> Self {
            Self {
                db: Database::new(StoreConfig::in_memory("test-blog-app")),
                fail_import,
                extra_records,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl BulkImport for FlakyImport {
        fn import_replacing(&self, collection: &str, path: &Path) -> Result<usize, StoreError> {
            self.calls.lock().unwrap().push("import");
            let imported = self.db.import_replacing(collection, path)?;
            if self.fail_import {
                return Err(StoreError::Import {
                    path: path.to_path_buf(),
                    record: 0,
                    reason: "importer exited with status 1".to_string(),
                });
            }
            Ok(imported + self.extra_records)
        }

        fn count(&self, collection: &str) -> Result<usize, StoreError> {
            Ok(self.db.count(collection)? + self.extra_records)
        }

        fn drop_collection(&self, collection: &str) -> Result<(), StoreError> {
            self.calls.lock().unwrap().push("drop_collection");
            BulkImport::drop_collection(&self.db, collection)
        }

        fn drop_all(&self) -> Result<(), StoreError> {
            self.calls.lock().unwrap().push("drop_all");
            self.db.drop_database()
        }
    }

    #[test]
    fn test_seed_then_teardown() {
        let db = Arc::new(Database::new(StoreConfig::in_memory("test-blog-app")));
        let fixture = SeedFixture::load(fixture_path("seed-data.json")).unwrap();
        let expected = fixture.len();
        let loader = FixtureLoader::new(db.clone(), "blogposts", fixture);

        assert_eq!(loader.seed().unwrap(), expected);
        assert_eq!(loader.seed().unwrap(), expected);
        assert_eq!(db.count("blogposts").unwrap(), expected);

        loader.teardown().unwrap();
        assert_eq!(db.count("blogposts").unwrap(), 0);
        loader.teardown().unwrap();
    }

    #[test]
    fn test_import_failure_is_loud_and_leaves_nothing() {
        let store = Arc::new(FlakyImport::new(true, 0));
        let fixture = SeedFixture::load(fixture_path("seed-data.json")).unwrap();
        let loader = FixtureLoader::new(store.clone(), "blogposts", fixture);

        let err = loader.seed().unwrap_err();
        assert!(matches!(err, HarnessError::Seed { .. }));
        assert!(err.to_string().contains("importer exited with status 1"));
        assert_eq!(store.db.count("blogposts").unwrap(), 0);
        assert_eq!(store.calls(), vec!["import", "drop_collection"]);
    }

    #[test]
    fn test_count_mismatch_is_rejected() {
        let store = Arc::new(FlakyImport::new(false, 1));
        let fixture = SeedFixture::load(fixture_path("single-post.json")).unwrap();
        let loader = FixtureLoader::new(store.clone(), "blogposts", fixture);

        match loader.seed() {
            Err(HarnessError::SeedCount {
                expected, actual, ..
            }) => {
                assert_eq!(expected, 1);
                assert_eq!(actual, 2);
            }
            other => panic!("expected SeedCount, got {:?}", other),
        }
        assert_eq!(store.db.count("blogposts").unwrap(), 0);
    }

    #[test]
    fn test_fixture_records_must_be_complete_posts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("incomplete.json");
        std::fs::write(&path, r#"[{"title": "no author", "content": "x"}]"#).unwrap();

        match SeedFixture::load(&path) {
            Err(HarnessError::Fixture { reason, .. }) => {
                assert!(reason.contains("record 1"));
                assert!(reason.contains("author"));
            }
            other => panic!("expected fixture error, got {:?}", other),
        }
    }

    #[test]
    fn test_bundled_fixtures_parse() {
        let seed = SeedFixture::load(fixture_path("seed-data.json")).unwrap();
        assert!(seed.len() >= 3);
        let single = SeedFixture::load(fixture_path("single-post.json")).unwrap();
        assert_eq!(single.len(), 1);
        assert_eq!(single.posts()[0].title, "I AM THE BEST");
    }
}
