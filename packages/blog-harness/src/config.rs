//! Harness configuration.

use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use blog_store::config::{validate_name, PRODUCTION_DATABASE};
use blog_store::POSTS_COLLECTION;

use crate::error::HarnessError;

/// Environment variable naming the test database.
pub const TEST_DATABASE_ENV: &str = "BLOG_TEST_DATABASE";
/// Environment variable overriding the fixture directory.
pub const FIXTURES_DIR_ENV: &str = "BLOG_TEST_FIXTURES";
/// Environment variable enabling snapshot persistence for the test database.
pub const DATA_DIR_ENV: &str = "BLOG_TEST_DATA_DIR";

/// Default test database name.
pub const DEFAULT_TEST_DATABASE: &str = "test-blog-app";

/// Harness configuration.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Test database name, never the production one
    pub database: String,
    /// Collection backing the posts resource
    pub collection: String,
    /// Directory holding fixture files
    pub fixtures_dir: PathBuf,
    /// Default fixture file name inside `fixtures_dir`
    pub default_fixture: String,
    /// Address the application binds to (port 0 = ephemeral)
    pub bind_addr: SocketAddr,
    /// Snapshot directory for the test database (None = memory only)
    pub data_dir: Option<PathBuf>,
    /// How long suite start waits for the application to answer
    pub startup_timeout_ms: u64,
    /// Per-request timeout for the resource client
    pub request_timeout_ms: u64,
}

impl HarnessConfig {
    /// Defaults overlaid with `BLOG_TEST_DATABASE`, `BLOG_TEST_FIXTURES`
    /// and `BLOG_TEST_DATA_DIR`.
    pub fn from_env() -> Result<Self, HarnessError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`HarnessConfig::from_env`] with an explicit variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, HarnessError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(database) = lookup(TEST_DATABASE_ENV) {
            config.database = database;
        }
        if let Some(dir) = lookup(FIXTURES_DIR_ENV) {
            config.fixtures_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup(DATA_DIR_ENV) {
            config.data_dir = Some(PathBuf::from(dir));
        }
        config.validate()?;
        Ok(config)
    }

    /// Rejects configurations that could touch production data.
    pub fn validate(&self) -> Result<(), HarnessError> {
        let name = self.database.trim();
        if name.is_empty() {
            return Err(HarnessError::Setup("test database name is empty".to_string()));
        }
        if name == PRODUCTION_DATABASE {
            return Err(HarnessError::Setup(format!(
                "refusing to run against the production database '{}'",
                PRODUCTION_DATABASE
            )));
        }
        if self.collection.trim().is_empty() {
            return Err(HarnessError::Setup("collection name is empty".to_string()));
        }
        validate_name("database", &self.database)
            .and_then(|_| validate_name("collection", &self.collection))
            .map_err(|e| HarnessError::Setup(e.to_string()))
    }

    /// Full path of a fixture file.
    pub fn fixture_path(&self, name: &str) -> PathBuf {
        self.fixtures_dir.join(name)
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            database: DEFAULT_TEST_DATABASE.to_string(),
            collection: POSTS_COLLECTION.to_string(),
            fixtures_dir: PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures")),
            default_fixture: "seed-data.json".to_string(),
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 0)),
            data_dir: None,
            startup_timeout_ms: 5000,
            request_timeout_ms: 5000,
        }
    }
}
