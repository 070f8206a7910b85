//! # Database Pool
//!
//! Opens the shop database and hands out repositories.
//!
//! ```text
//! DbConfig::new("warren.db") ──► Database::new ──► migrations
//!                                     │
//!                     db.rabbits() / db.orders() / db.stats() ...
//! ```
//!
//! The file runs in WAL mode so catalog reads are not blocked while an
//! order transaction holds the write lock. Foreign keys are switched on for
//! every connection; user deletion relies on them.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::{
    LoanRepository, OrderRepository, ProductRepository, RabbitRepository, StatsRepository,
    UserRepository,
};

// =============================================================================
// Configuration
// =============================================================================

/// Where the database lives and how large the pool may grow.
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub database_path: PathBuf,
    pub max_connections: u32,
    pub min_connections: u32,
    /// How long a handler waits for a free connection.
    pub connect_timeout: Duration,
    pub idle_timeout: Duration,
    pub run_migrations: bool,
}

impl DbConfig {
    /// File-backed database, created on first connect.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            run_migrations: true,
        }
    }

    /// Private in-memory database for tests.
    ///
    /// Each connection to `:memory:` opens a separate database, so the pool
    /// is held to exactly one.
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(":memory:"),
            max_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(3600),
            ..DbConfig::new(":memory:")
        }
    }
}

// =============================================================================
// Database
// =============================================================================

/// Main database handle providing repository access.
///
/// Cheap to clone (the pool is reference counted); the API keeps one in its
/// shared state and hands out repositories per request.
///
/// ## Usage in Handlers
/// ```rust,ignore
/// async fn get_rabbit(State(state): State<AppState>, Path(id): Path<i64>)
///     -> ApiResult<Json<Rabbit>>
/// {
///     state.db().rabbits().get_by_id(id).await?
///         .map(Json)
///         .ok_or_else(|| ApiError::not_found("Rabbit", id))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connects, applies the SQLite pragmas and runs pending migrations
    /// unless `run_migrations` is off.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(
            path = %config.database_path.display(),
            "Initializing database connection"
        );

        let connect_url = format!("sqlite://{}?mode=rwc", config.database_path.display());

        let connect_options = SqliteConnectOptions::from_str(&connect_url)
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            // SQLite has them disabled by default
            .foreign_keys(true)
            .create_if_missing(true);

        debug!("Connection options configured");

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(Some(config.idle_timeout))
            .connect_with(connect_options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        info!(
            max_connections = config.max_connections,
            "Database pool created"
        );

        let db = Database { pool };

        if config.run_migrations {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    /// Runs database migrations. Idempotent.
    pub async fn run_migrations(&self) -> DbResult<()> {
        info!("Running database migrations");
        migrations::run_migrations(&self.pool).await?;
        info!("Migrations complete");
        Ok(())
    }

    /// Returns `(total, applied)` migration counts.
    pub async fn migration_status(&self) -> DbResult<(usize, usize)> {
        migrations::migration_status(&self.pool).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn users(&self) -> UserRepository {
        UserRepository::new(self.pool.clone())
    }

    pub fn rabbits(&self) -> RabbitRepository {
        RabbitRepository::new(self.pool.clone())
    }

    pub fn products(&self) -> ProductRepository {
        ProductRepository::new(self.pool.clone())
    }

    pub fn orders(&self) -> OrderRepository {
        OrderRepository::new(self.pool.clone())
    }

    pub fn loans(&self) -> LoanRepository {
        LoanRepository::new(self.pool.clone())
    }

    pub fn stats(&self) -> StatsRepository {
        StatsRepository::new(self.pool.clone())
    }

    /// Waits for checked-out connections, then closes the pool.
    pub async fn close(&self) {
        info!("Closing database connection pool");
        self.pool.close().await;
    }

    /// `SELECT 1` against the pool; backs `/health/ready`.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_database() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        assert!(db.health_check().await);

        let (total, applied) = db.migration_status().await.unwrap();
        assert_eq!(total, applied);
        assert!(total >= 1);
    }

    #[test]
    fn test_in_memory_config_is_single_connection() {
        let config = DbConfig::in_memory();
        assert_eq!(config.max_connections, 1);
        assert_eq!(config.min_connections, 1);
        assert!(config.run_migrations);
        assert_eq!(DbConfig::new("warren.db").max_connections, 5);
    }

    #[tokio::test]
    async fn test_file_database_enforces_foreign_keys() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(DbConfig::new(dir.path().join("shop.db")))
            .await
            .unwrap();

        let orphan = sqlx::query(
            "INSERT INTO order_items (order_id, item_kind, item_id, name_snapshot,
                                      unit_price_cents, quantity, line_total_cents)
             VALUES (999, 'product', 1, 'Hay', 100, 1, 100)",
        )
        .execute(db.pool())
        .await;
        assert!(orphan.is_err());
        db.close().await;
    }

    #[tokio::test]
    async fn test_closed_pool_is_unhealthy() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.close().await;
        assert!(!db.health_check().await);
    }
}
