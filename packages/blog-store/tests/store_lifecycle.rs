//! Store lifecycle tests: import, persistence, and drop.

use std::fs;

use ntest::timeout;
use tempfile::tempdir;

use blog_store::config::StoreConfig;
use blog_store::import::ImportMode;
use blog_store::{Author, Database, NewBlogPost, Posts, StoreError, POSTS_COLLECTION};

const SEED: &str = r#"
{"author": {"firstName": "Danny", "lastName": "Di Giulio"}, "title": "I AM THE BEST", "content": "hi"}
{"author": {"firstName": "Ada", "lastName": "Lovelace"}, "title": "Notes", "content": "engines"}
"#;

#[timeout(2000)]
#[test]
fn test_import_then_reopen_from_snapshot() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let seed_path = temp_dir.path().join("seed-data.json");
    fs::write(&seed_path, SEED)?;

    let config = StoreConfig {
        name: "test-blog-app".to_string(),
        data_dir: Some(temp_dir.path().join("data")),
        ..Default::default()
    };

    let db = Database::open(config.clone())?;
    let report = db.import_file(POSTS_COLLECTION, &seed_path, ImportMode::Drop)?;
    assert_eq!(report.imported, 2);
    Posts::new(&db).create(NewBlogPost::new(Author::new("Grace", "Hopper"), "Bugs", "moth"))?;
    db.flush()?;

    let reopened = Database::open(config)?;
    let posts = Posts::new(&reopened).find_all()?;
    assert_eq!(posts.len(), 3);
    assert_eq!(posts[0].title, "I AM THE BEST");
    assert_eq!(posts[2].author.full_name(), "Grace Hopper");
    Ok(())
}

#[timeout(2000)]
#[test]
fn test_failed_import_leaves_collection_untouched() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let good = temp_dir.path().join("good.json");
    let bad = temp_dir.path().join("bad.json");
    fs::write(&good, SEED)?;
    fs::write(&bad, "{\"title\": \"ok\"}\nnot json\n")?;

    let db = Database::new(StoreConfig::in_memory("test-blog-app"));
    db.import_file(POSTS_COLLECTION, &good, ImportMode::Drop)?;

    let err = db
        .import_file(POSTS_COLLECTION, &bad, ImportMode::Drop)
        .unwrap_err();
    assert!(matches!(err, StoreError::Import { record: 2, .. }));
    assert_eq!(db.count(POSTS_COLLECTION)?, 2);

    let missing = db.import_file(
        POSTS_COLLECTION,
        &temp_dir.path().join("missing.json"),
        ImportMode::Drop,
    );
    assert!(matches!(missing, Err(StoreError::IoError(_))));
    Ok(())
}

#[timeout(2000)]
#[test]
fn test_drop_database_removes_snapshots() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let config = StoreConfig {
        name: "test-blog-app".to_string(),
        data_dir: Some(temp_dir.path().to_path_buf()),
        ..Default::default()
    };
    let db = Database::open(config.clone())?;
    Posts::new(&db).create(NewBlogPost::new(Author::new("A", "B"), "t", "c"))?;
    db.flush()?;
    assert!(temp_dir.path().join("test-blog-app").exists());

    db.drop_database()?;
    db.drop_database()?;
    assert!(!temp_dir.path().join("test-blog-app").exists());
    assert!(Database::open(config)?.collection_names().is_empty());
    Ok(())
}

#[timeout(2000)]
#[test]
fn test_database_name_cannot_reach_outside_data_dir() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let data_dir = temp_dir.path().join("data");
    let precious = temp_dir.path().join("precious");
    fs::create_dir_all(&data_dir)?;
    fs::create_dir_all(&precious)?;
    fs::write(precious.join("keep.txt"), "important")?;

    let config = StoreConfig {
        name: "../precious".to_string(),
        data_dir: Some(data_dir),
        ..Default::default()
    };
    assert!(matches!(
        Database::open(config.clone()),
        Err(StoreError::Validation(_))
    ));

    let db = Database::new(config);
    assert!(matches!(db.drop_database(), Err(StoreError::Validation(_))));
    assert!(precious.join("keep.txt").exists());
    Ok(())
}

#[timeout(2000)]
#[test]
fn test_failed_flush_keeps_store_openable() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let config = StoreConfig {
        name: "test-blog-app".to_string(),
        data_dir: Some(temp_dir.path().to_path_buf()),
        persistence_max_retries: 0,
        ..Default::default()
    };
    let db = Database::open(config.clone())?;
    let posts = Posts::new(&db);
    posts.create(NewBlogPost::new(Author::new("A", "B"), "first", "c"))?;
    db.flush()?;

    // A directory squatting on the temp path makes the manifest write fail
    posts.create(NewBlogPost::new(Author::new("C", "D"), "second", "c"))?;
    let blocker = temp_dir.path().join("test-blog-app").join("manifest.json.tmp");
    fs::create_dir(&blocker)?;
    assert!(db.flush().is_err());

    let reopened = Database::open(config.clone())?;
    let titles: Vec<_> = Posts::new(&reopened)
        .find_all()?
        .into_iter()
        .map(|p| p.title)
        .collect();
    assert_eq!(titles, vec!["first".to_string()]);

    fs::remove_dir(&blocker)?;
    db.flush()?;
    assert_eq!(Posts::new(&Database::open(config)?).count()?, 2);
    Ok(())
}

#[timeout(2000)]
#[test]
fn test_posts_import_rejects_incomplete_records() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let good = temp_dir.path().join("good.json");
    let partial = temp_dir.path().join("partial.json");
    fs::write(&good, SEED)?;
    fs::write(&partial, "{\"title\":\"only title\"}\n")?;

    let db = Database::new(StoreConfig::in_memory("test-blog-app"));
    let posts = Posts::new(&db);
    posts.import_file(&good, ImportMode::Drop)?;

    let err = posts.import_file(&partial, ImportMode::Drop).unwrap_err();
    assert!(matches!(err, StoreError::Import { record: 1, .. }));
    assert!(err.to_string().contains("record 1"));
    assert_eq!(posts.find_all()?.len(), 2);
    Ok(())
}
