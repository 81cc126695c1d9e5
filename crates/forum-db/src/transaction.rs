//! # Transaction Management
//!
//! [`TransactionScope`] holds one pooled connection for the lifetime of a
//! transaction. Statements run through [`TransactionScope::connection`] and the
//! scope ends with an explicit [`commit`](TransactionScope::commit) or
//! [`rollback`](TransactionScope::rollback).
//!
//! ```rust
//! use forum_db::{DatabaseConnection, TransactionScope};
//!
//! # #[tokio::main]
//! # async fn main() -> forum_core::Result<()> {
//! let db = DatabaseConnection::connect_memory().await?;
//! db.execute("CREATE TABLE counters (n INTEGER NOT NULL)").await?;
//!
//! let mut tx = TransactionScope::begin_immediate(&db).await?;
//! sqlx::query("INSERT INTO counters (n) VALUES (1)")
//!     .execute(tx.connection()?)
//!     .await?;
//! tx.commit().await?;
//! # Ok(())
//! # }
//! ```
//!
//! A scope dropped while still active is rolled back before its connection
//! returns to the pool.

use crate::connection::DatabaseConnection;
use forum_core::exception::{Error, Result};
use sqlx::pool::PoolConnection;
use sqlx::{Sqlite, SqliteConnection};

/// SQLite locking mode taken by `BEGIN`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionMode {
	/// Locks are taken on first read or write
	Deferred,
	/// The write lock is taken immediately, so reads inside see no concurrent writer
	Immediate,
	Exclusive,
}

impl TransactionMode {
	pub fn to_sql(&self) -> &'static str {
		match self {
			TransactionMode::Deferred => "BEGIN DEFERRED",
			TransactionMode::Immediate => "BEGIN IMMEDIATE",
			TransactionMode::Exclusive => "BEGIN EXCLUSIVE",
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
	Active,
	Committed,
	RolledBack,
}

pub struct TransactionScope {
	conn: Option<PoolConnection<Sqlite>>,
	state: TransactionState,
	mode: TransactionMode,
}

impl TransactionScope {
	pub async fn begin(db: &DatabaseConnection) -> Result<Self> {
		Self::begin_with_mode(db, TransactionMode::Deferred).await
	}

	/// Begin with the write lock held from the start
	pub async fn begin_immediate(db: &DatabaseConnection) -> Result<Self> {
		Self::begin_with_mode(db, TransactionMode::Immediate).await
	}

	pub async fn begin_with_mode(db: &DatabaseConnection, mode: TransactionMode) -> Result<Self> {
		let mut conn = db.pool().acquire().await?;
		sqlx::query(mode.to_sql()).execute(&mut *conn).await?;
		tracing::trace!(?mode, "transaction started");

		Ok(Self {
			conn: Some(conn),
			state: TransactionState::Active,
			mode,
		})
	}

	pub fn state(&self) -> TransactionState {
		self.state
	}

	pub fn mode(&self) -> TransactionMode {
		self.mode
	}

	/// Connection to run statements on inside this transaction
	pub fn connection(&mut self) -> Result<&mut SqliteConnection> {
		match (self.state, self.conn.as_mut()) {
			(TransactionState::Active, Some(conn)) => Ok(&mut **conn),
			_ => Err(Error::Database(
				"transaction is no longer active".to_string(),
			)),
		}
	}

	pub async fn commit(mut self) -> Result<()> {
		self.finish("COMMIT", TransactionState::Committed).await
	}

	pub async fn rollback(mut self) -> Result<()> {
		self.finish("ROLLBACK", TransactionState::RolledBack).await
	}

	/// Commit if `result` is `Ok`, otherwise roll back and hand back the error.
	pub async fn complete<T>(self, result: Result<T>) -> Result<T> {
		match result {
			Ok(value) => {
				self.commit().await?;
				Ok(value)
			}
			Err(error) => {
				if let Err(rollback_error) = self.rollback().await {
					tracing::warn!(error = %rollback_error, "rollback after failure did not complete");
				}
				Err(error)
			}
		}
	}

	async fn finish(&mut self, sql: &str, state: TransactionState) -> Result<()> {
		let conn = self.connection()?;
		let result = sqlx::query(sql).execute(conn).await;
		match result {
			Ok(_) => {
				self.state = state;
				Ok(())
			}
			Err(e) => {
				// Leave the state Active so Drop still rolls back
				tracing::warn!(error = %e, statement = sql, "failed to end transaction");
				Err(e.into())
			}
		}
	}
}

/// An active scope sends `ROLLBACK` on a spawned task and the connection then
/// returns to the pool. The connection is detached and closed only when that
/// rollback fails or no runtime is available to run it.
impl Drop for TransactionScope {
	fn drop(&mut self) {
		if self.state != TransactionState::Active {
			return;
		}
		let Some(mut conn) = self.conn.take() else {
			return;
		};

		tracing::debug!("active transaction dropped, rolling back");
		match tokio::runtime::Handle::try_current() {
			Ok(handle) => {
				handle.spawn(async move {
					if let Err(e) = sqlx::query("ROLLBACK").execute(&mut *conn).await {
						tracing::warn!(error = %e, "rollback of dropped transaction failed");
						// Closing the connection discards the transaction
						drop(conn.detach());
					}
				});
			}
			Err(_) => drop(conn.detach()),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::{fixture, rstest};
	use sqlx::Row;

	#[fixture]
	async fn db() -> DatabaseConnection {
		let db = DatabaseConnection::connect_memory().await.unwrap();
		db.execute("CREATE TABLE items (name TEXT NOT NULL)").await.unwrap();
		db
	}

	async fn count(db: &DatabaseConnection) -> i64 {
		let row = db
			.fetch_optional("SELECT COUNT(*) AS n FROM items")
			.await
			.unwrap()
			.unwrap();
		row.get("n")
	}

	#[rstest]
	#[tokio::test]
	async fn test_commit_persists(#[future] db: DatabaseConnection) {
		let db = db.await;
		let mut tx = TransactionScope::begin_immediate(&db).await.unwrap();

		sqlx::query("INSERT INTO items (name) VALUES ('a')")
			.execute(tx.connection().unwrap())
			.await
			.unwrap();
		tx.commit().await.unwrap();

		assert_eq!(count(&db).await, 1);
	}

	#[rstest]
	#[tokio::test]
	async fn test_rollback_discards(#[future] db: DatabaseConnection) {
		let db = db.await;
		let mut tx = TransactionScope::begin(&db).await.unwrap();

		sqlx::query("INSERT INTO items (name) VALUES ('a')")
			.execute(tx.connection().unwrap())
			.await
			.unwrap();
		tx.rollback().await.unwrap();

		assert_eq!(count(&db).await, 0);
	}

	#[rstest]
	#[tokio::test]
	async fn test_drop_rolls_back_and_releases_connection(#[future] db: DatabaseConnection) {
		let db = db.await;
		{
			let mut tx = TransactionScope::begin_immediate(&db).await.unwrap();
			sqlx::query("INSERT INTO items (name) VALUES ('a')")
				.execute(tx.connection().unwrap())
				.await
				.unwrap();
		}

		// The single in-memory connection comes back after the rollback task runs.
		// A detached connection would take the in-memory database with it.
		assert_eq!(count(&db).await, 0);
		let tx = TransactionScope::begin_immediate(&db).await.unwrap();
		tx.commit().await.unwrap();
	}

	#[rstest]
	#[tokio::test]
	async fn test_complete_rolls_back_on_error(#[future] db: DatabaseConnection) {
		let db = db.await;
		let mut tx = TransactionScope::begin_immediate(&db).await.unwrap();
		sqlx::query("INSERT INTO items (name) VALUES ('a')")
			.execute(tx.connection().unwrap())
			.await
			.unwrap();

		let result: Result<()> = tx
			.complete(Err(Error::Forbidden("not yours".to_string())))
			.await;

		assert!(matches!(result, Err(Error::Forbidden(_))));
		assert_eq!(count(&db).await, 0);
	}

	#[rstest]
	fn test_mode_sql() {
		assert_eq!(TransactionMode::Immediate.to_sql(), "BEGIN IMMEDIATE");
		assert_eq!(TransactionMode::Deferred.to_sql(), "BEGIN DEFERRED");
	}
}
