//! Pooled SQLite connection.

use forum_conf::DatabaseConfig;
use forum_core::exception::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow};
use std::str::FromStr;
use std::time::Duration;

/// Shared handle to the database. Cloning is cheap and shares the pool.
///
/// # Examples
///
/// ```
/// use forum_db::DatabaseConnection;
///
/// # #[tokio::main]
/// # async fn main() {
/// let db = DatabaseConnection::connect_memory().await.unwrap();
/// db.execute("CREATE TABLE t (id INTEGER PRIMARY KEY)").await.unwrap();
/// assert_eq!(db.execute("INSERT INTO t (id) VALUES (1)").await.unwrap(), 1);
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct DatabaseConnection {
	pool: SqlitePool,
	url: String,
}

impl DatabaseConnection {
	pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
		let url = config.to_url();
		let mut options = SqliteConnectOptions::from_str(&url)?
			.create_if_missing(true)
			.foreign_keys(true)
			.busy_timeout(Duration::from_millis(config.busy_timeout_ms));

		let pool_options = if config.is_memory() {
			// Every pooled connection to :memory: would be a separate database
			SqlitePoolOptions::new()
				.max_connections(1)
				.min_connections(1)
				.idle_timeout(None)
				.max_lifetime(None)
		} else {
			options = options.journal_mode(SqliteJournalMode::Wal);
			SqlitePoolOptions::new().max_connections(config.max_connections)
		};

		let pool = pool_options.connect_with(options).await?;
		tracing::debug!(url = %url, "database pool ready");

		Ok(Self { pool, url })
	}

	/// Private in-memory database
	pub async fn connect_memory() -> Result<Self> {
		Self::connect(&DatabaseConfig::memory()).await
	}

	pub fn pool(&self) -> &SqlitePool {
		&self.pool
	}

	pub fn url(&self) -> &str {
		&self.url
	}

	/// Run a statement, returning the number of affected rows
	pub async fn execute(&self, sql: &str) -> Result<u64> {
		Ok(sqlx::query(sql).execute(&self.pool).await?.rows_affected())
	}

	pub async fn fetch_all(&self, sql: &str) -> Result<Vec<SqliteRow>> {
		Ok(sqlx::query(sql).fetch_all(&self.pool).await?)
	}

	pub async fn fetch_optional(&self, sql: &str) -> Result<Option<SqliteRow>> {
		Ok(sqlx::query(sql).fetch_optional(&self.pool).await?)
	}

	/// Round-trip to the database
	pub async fn ping(&self) -> Result<()> {
		sqlx::query("SELECT 1").execute(&self.pool).await?;
		Ok(())
	}

	pub async fn close(&self) {
		self.pool.close().await;
	}
}

/// Whether `error` is a UNIQUE constraint failure
pub fn is_unique_violation(error: &sqlx::Error) -> bool {
	match error {
		sqlx::Error::Database(db) => db.is_unique_violation(),
		_ => false,
	}
}
