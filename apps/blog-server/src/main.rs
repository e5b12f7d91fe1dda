//! REST API server for blog posts.
//!
//! Opens the database (loading its snapshot when a data directory is
//! given), optionally bulk-imports a seed file, and serves `/posts` until
//! Ctrl+C. Snapshots are flushed periodically and once more on shutdown.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use blog_api::{ApiConfig, Router, Server};
use blog_store::config::{StoreConfig, PRODUCTION_DATABASE};
use blog_store::import::ImportMode;
use blog_store::{Database, Posts, StoreError, POSTS_COLLECTION};

/// Command-line arguments for the blog server.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value_t = 8080)]
    port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Database name
    #[arg(long, default_value = PRODUCTION_DATABASE)]
    database: String,

    /// Collection backing the posts resource
    #[arg(long, default_value = POSTS_COLLECTION)]
    collection: String,

    /// Data directory for snapshots
    #[arg(long, default_value = "./data")]
    data_dir: PathBuf,

    /// Keep everything in memory, never touch the data directory
    #[arg(long)]
    in_memory: bool,

    /// Fixture file to import into the collection at startup
    #[arg(long)]
    seed: Option<PathBuf>,

    /// Replace the collection with the seed file instead of appending to it
    #[arg(long)]
    seed_drop: bool,

    /// Request timeout in milliseconds
    #[arg(long, default_value_t = 5000)]
    request_timeout_ms: u64,

    /// Maximum request body size in bytes
    #[arg(long, default_value_t = 64 * 1024)]
    max_body_bytes: usize,

    /// Seconds between snapshot flushes
    #[arg(long, default_value_t = 5)]
    flush_interval_secs: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let store_config = StoreConfig {
        name: args.database.clone(),
        data_dir: (!args.in_memory).then(|| args.data_dir.clone()),
        ..Default::default()
    };

    let db = match Database::open(store_config) {
        Ok(db) => db,
        Err(StoreError::DataCorruption(msg)) => {
            tracing::error!("Snapshot corruption detected: {}", msg);
            tracing::error!("Database cannot start. Restore the data directory from backup.");
            std::process::exit(1);
        }
        Err(e) => return Err(e).context("Failed to open database"),
    };
    let db = Arc::new(db);

    if let Some(seed) = &args.seed {
        let mode = if args.seed_drop {
            ImportMode::Drop
        } else {
            ImportMode::Append
        };
        let report = Posts::in_collection(&db, &args.collection)
            .import_file(seed, mode)
            .with_context(|| format!("Failed to import {}", seed.display()))?;
        tracing::info!(
            "Seeded {} post(s) into '{}' ({} dropped)",
            report.imported,
            report.collection,
            report.dropped
        );
    }

    let api_config = ApiConfig {
        collection: args.collection.clone(),
        request_timeout_ms: args.request_timeout_ms,
        max_body_bytes: args.max_body_bytes,
    };
    let router = Router::new(db.clone(), api_config);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .context("Invalid host or port")?;
    let server = Server::bind(addr, router)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    println!("Starting blog server...");
    println!("  Address: http://{}", server.local_addr()?);
    println!("  Database: {}", args.database);
    println!("  Collection: {}", args.collection);
    if args.in_memory {
        println!("  Data directory: <in memory>");
    } else {
        println!("  Data directory: {}", args.data_dir.display());
    }
    println!("  Request timeout: {} ms", args.request_timeout_ms);

    let flush_db = db.clone();
    let flush_every = Duration::from_secs(args.flush_interval_secs.max(1));
    let flusher = tokio::spawn(async move {
        let mut interval = tokio::time::interval(flush_every);
        interval.tick().await;
        loop {
            interval.tick().await;
            if let Err(e) = flush_blocking(flush_db.clone()).await {
                tracing::error!("Periodic flush failed: {:#}", e);
            }
        }
    });

    server
        .serve_with_shutdown(async {
            if let Err(e) = signal::ctrl_c().await {
                tracing::error!("Failed to listen for ctrl_c: {}", e);
                std::future::pending::<()>().await;
            }
            println!("\nShutting down server...");
        })
        .await?;

    flusher.abort();
    let _ = flusher.await;
    flush_blocking(db).await.context("Final flush failed")?;
    tracing::info!("Shutdown complete");
    Ok(())
}

/// Writes a snapshot on the blocking pool so file I/O stays off the runtime threads.
async fn flush_blocking(db: Arc<Database>) -> anyhow::Result<()> {
    tokio::task::spawn_blocking(move || db.flush())
        .await
        .context("Flush task did not complete")??;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use blog_store::{Author, NewBlogPost};

    #[tokio::test]
    async fn test_flush_blocking_writes_snapshot() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let config = StoreConfig {
            name: "flush-check".to_string(),
            data_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        let db = Arc::new(Database::open(config.clone())?);
        Posts::new(&db).create(NewBlogPost::new(Author::new("A", "B"), "t", "c"))?;

        flush_blocking(db.clone()).await?;
        assert!(dir.path().join("flush-check").join("manifest.json").exists());
        assert_eq!(Posts::new(&Database::open(config)?).count()?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_flush_blocking_reports_store_errors() {
        let db = Arc::new(Database::new(StoreConfig {
            name: "../outside".to_string(),
            data_dir: Some(std::env::temp_dir()),
            ..Default::default()
        }));
        assert!(flush_blocking(db).await.is_err());
    }
}
