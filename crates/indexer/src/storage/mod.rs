//! Storage layer for the NetSepio indexer.
//!
//! This module provides:
//! - The [`EntityStore`] contract that transition functions are written against
//! - The [`CursorStore`] contract for indexer progress tracking
//! - [`Storage`], the SQLite backend (connection pooling, migrations, bounded calls)
//! - [`MemoryStore`], an in-process backend for tests and dry runs
//! - [`EntityReader`], the point-lookup interface offered to query layers

use anyhow::{Context, Result};
use async_trait::async_trait;
use netsepio_core::{AccountKey, Review, ReviewId, User};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::future::Future;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use crate::config::DatabaseConfig;

pub mod error;
pub mod memory;
pub mod reader;
pub mod review;
pub mod sync;
pub mod types;
pub mod user;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use reader::{EntityReader, ReadError};
pub use types::*;

/// Bound applied to every store call unless configured otherwise.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// Keyed persistence over the Review and User collections.
///
/// `load_*` never has side effects. `save_*` is a full-overwrite upsert:
/// every field of the entity replaces the stored version. There is no
/// atomicity across calls, so each save must leave the store valid on its own.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Load a review by token id.
    async fn load_review(&self, id: &ReviewId) -> StoreResult<Option<Review>>;

    /// Upsert a review.
    async fn save_review(&self, review: &Review) -> StoreResult<()>;

    /// All reviews whose `review_by` is `account`, in token id order.
    async fn reviews_by(&self, account: &AccountKey) -> StoreResult<Vec<Review>>;

    /// Load a user by normalized address.
    async fn load_user(&self, id: &AccountKey) -> StoreResult<Option<User>>;

    /// Upsert a user.
    async fn save_user(&self, user: &User) -> StoreResult<()>;

    /// Load a user, or build one with `factory` when none is stored.
    ///
    /// Nothing is persisted; callers decide whether the new entity is saved.
    async fn load_user_or_else<F>(&self, id: &AccountKey, factory: F) -> StoreResult<Loaded<User>>
    where
        F: FnOnce() -> User + Send,
    {
        Ok(match self.load_user(id).await? {
            Some(user) => Loaded::existing(user),
            None => Loaded::created(factory()),
        })
    }
}

/// Persistence of the singleton sync cursor.
#[async_trait]
pub trait CursorStore: Send + Sync {
    /// Get the current sync state.
    async fn get_sync_state(&self) -> StoreResult<SyncState>;

    /// Overwrite the sync state.
    async fn update_sync_state(&self, state: &SyncState) -> StoreResult<()>;
}

/// Database storage for the indexer.
///
/// Provides async access to SQLite database with connection pooling. Every
/// call is bounded by a timeout; an expired call surfaces as a retryable
/// [`StoreError::Timeout`].
#[derive(Debug, Clone)]
pub struct Storage {
    pool: SqlitePool,
    timeout: Duration,
}

impl Storage {
    /// Create a new storage instance with the given database URL.
    ///
    /// This will create the database file if it doesn't exist. Migrations are
    /// run separately with [`Storage::run_migrations`].
    ///
    /// # Arguments
    /// * `database_url` - SQLite database URL (e.g., "sqlite://netsepio.db")
    /// * `max_connections` - Pool ceiling (defaults to 5)
    /// * `min_connections` - Pool floor (defaults to 1)
    ///
    /// # Example
    /// ```no_run
    /// # use netsepio_indexer::storage::Storage;
    /// # async fn example() -> anyhow::Result<()> {
    /// let storage = Storage::new("sqlite://netsepio.db", None, None).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn new(
        database_url: &str,
        max_connections: Option<u32>,
        min_connections: Option<u32>,
    ) -> Result<Self> {
        Self::open(
            database_url,
            max_connections,
            min_connections,
            DEFAULT_STORE_TIMEOUT,
        )
        .await
    }

    /// Connect using the `[database]` configuration section.
    ///
    /// `timeout_ms` bounds both pool checkout and every store call.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        Self::open(
            &config.url,
            Some(config.max_connections),
            Some(config.min_connections),
            Duration::from_millis(config.timeout_ms),
        )
        .await
    }

    async fn open(
        database_url: &str,
        max_connections: Option<u32>,
        min_connections: Option<u32>,
        timeout: Duration,
    ) -> Result<Self> {
        info!("Connecting to database: {}", database_url);

        let options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("Invalid database URL: {}", database_url))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.unwrap_or(5))
            .min_connections(min_connections.unwrap_or(1))
            .acquire_timeout(timeout)
            .connect_with(options)
            .await
            .context("Failed to connect to database")?;

        info!("Database connection established");

        Ok(Self { pool, timeout })
    }

    /// Create a new storage instance with a specific file path.
    pub async fn new_with_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let database_url = format!("sqlite://{}", path.display());
        Self::new(&database_url, None, None).await
    }

    /// Bound applied to every store call.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run database migrations.
    ///
    /// This should be called once during initialization to ensure the schema is up to date.
    pub async fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations");

        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run migrations")?;

        info!("Migrations completed successfully");

        Ok(())
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the database connection pool.
    pub async fn close(&self) {
        info!("Closing database connection");
        self.pool.close().await;
    }

    /// Get database statistics.
    pub async fn stats(&self) -> StoreResult<DatabaseStats> {
        let review_count: i64 = self
            .bounded(
                "count_reviews",
                sqlx::query_scalar("SELECT COUNT(*) FROM reviews").fetch_one(&self.pool),
            )
            .await?;

        let deleted_review_count: i64 = self
            .bounded(
                "count_deleted_reviews",
                sqlx::query_scalar("SELECT COUNT(*) FROM reviews WHERE deleted = 1")
                    .fetch_one(&self.pool),
            )
            .await?;

        let user_count: i64 = self
            .bounded(
                "count_users",
                sqlx::query_scalar("SELECT COUNT(*) FROM users").fetch_one(&self.pool),
            )
            .await?;

        let sync_state = self.get_sync_state().await?;

        Ok(DatabaseStats {
            review_count: review_count as u64,
            deleted_review_count: deleted_review_count as u64,
            user_count: user_count as u64,
            last_block_number: sync_state.last_block_number,
            chain_id: sync_state.chain_id,
        })
    }

    /// Check database health.
    pub async fn health_check(&self) -> Result<()> {
        self.bounded("health_check", sqlx::query("SELECT 1").fetch_one(&self.pool))
            .await
            .context("Database health check failed")?;

        Ok(())
    }

    /// Run a driver future under the configured timeout, classifying failures.
    pub(crate) async fn bounded<T, F>(&self, op: &'static str, fut: F) -> StoreResult<T>
    where
        F: Future<Output = std::result::Result<T, sqlx::Error>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result.map_err(|e| StoreError::from_sqlx(op, e)),
            Err(_) => Err(StoreError::Timeout {
                op,
                after: self.timeout,
            }),
        }
    }
}

#[async_trait]
impl EntityStore for Storage {
    async fn load_review(&self, id: &ReviewId) -> StoreResult<Option<Review>> {
        self.fetch_review(id).await
    }

    async fn save_review(&self, review: &Review) -> StoreResult<()> {
        self.upsert_review(review).await
    }

    async fn reviews_by(&self, account: &AccountKey) -> StoreResult<Vec<Review>> {
        self.fetch_reviews_by(account).await
    }

    async fn load_user(&self, id: &AccountKey) -> StoreResult<Option<User>> {
        self.fetch_user(id).await
    }

    async fn save_user(&self, user: &User) -> StoreResult<()> {
        self.upsert_user(user).await
    }
}

#[async_trait]
impl CursorStore for Storage {
    async fn get_sync_state(&self) -> StoreResult<SyncState> {
        self.fetch_sync_state().await
    }

    async fn update_sync_state(&self, state: &SyncState) -> StoreResult<()> {
        self.write_sync_state(state).await
    }
}
