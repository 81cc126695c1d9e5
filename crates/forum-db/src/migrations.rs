//! Schema migrations.
//!
//! Each app contributes an ordered list of [`Migration`]s. The [`Migrator`]
//! applies the ones not yet recorded in `forum_migrations`, each inside its own
//! immediate transaction together with its bookkeeping row.

use crate::connection::DatabaseConnection;
use crate::timestamp::now_millis;
use crate::transaction::TransactionScope;
use forum_core::exception::Result;
use sea_query::{Iden, Query, SqliteQueryBuilder};
use sqlx::Row;
use std::collections::HashSet;

#[derive(Iden)]
enum ForumMigrations {
	Table,
	App,
	Name,
	AppliedAt,
}

const CREATE_MIGRATIONS_TABLE: &str = "CREATE TABLE IF NOT EXISTS forum_migrations (
	id INTEGER PRIMARY KEY AUTOINCREMENT,
	app TEXT NOT NULL,
	name TEXT NOT NULL,
	applied_at BIGINT NOT NULL,
	UNIQUE (app, name)
)";

/// One named schema change, as a list of SQL statements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Migration {
	pub app_label: &'static str,
	pub name: &'static str,
	pub operations: &'static [&'static str],
}

impl Migration {
	pub const fn new(
		app_label: &'static str,
		name: &'static str,
		operations: &'static [&'static str],
	) -> Self {
		Self {
			app_label,
			name,
			operations,
		}
	}

	/// `app.name`, as printed by `migrate --plan`
	pub fn label(&self) -> String {
		format!("{}.{}", self.app_label, self.name)
	}
}

pub struct Migrator {
	db: DatabaseConnection,
	migrations: Vec<Migration>,
}

impl Migrator {
	pub fn new(db: DatabaseConnection) -> Self {
		Self {
			db,
			migrations: Vec::new(),
		}
	}

	/// Register migrations; they apply in registration order
	pub fn with_migrations(mut self, migrations: impl IntoIterator<Item = Migration>) -> Self {
		self.migrations.extend(migrations);
		self
	}

	async fn applied(&self) -> Result<HashSet<(String, String)>> {
		self.db.execute(CREATE_MIGRATIONS_TABLE).await?;

		let sql = Query::select()
			.columns([ForumMigrations::App, ForumMigrations::Name])
			.from(ForumMigrations::Table)
			.to_string(SqliteQueryBuilder);

		let rows = self.db.fetch_all(&sql).await?;
		rows.iter()
			.map(|row| Ok((row.try_get("app")?, row.try_get("name")?)))
			.collect()
	}

	/// Migrations not yet applied, in order
	pub async fn plan(&self) -> Result<Vec<Migration>> {
		let applied = self.applied().await?;
		Ok(self
			.migrations
			.iter()
			.filter(|m| !applied.contains(&(m.app_label.to_string(), m.name.to_string())))
			.copied()
			.collect())
	}

	/// Apply every pending migration, returning what was applied
	pub async fn migrate(&self) -> Result<Vec<Migration>> {
		let pending = self.plan().await?;

		for migration in &pending {
			let mut tx = TransactionScope::begin_immediate(&self.db).await?;
			for statement in migration.operations {
				sqlx::query(statement).execute(tx.connection()?).await?;
			}

			let record = Query::insert()
				.into_table(ForumMigrations::Table)
				.columns([
					ForumMigrations::App,
					ForumMigrations::Name,
					ForumMigrations::AppliedAt,
				])
				.values_panic([
					migration.app_label.into(),
					migration.name.into(),
					now_millis().into(),
				])
				.to_string(SqliteQueryBuilder);
			sqlx::query(&record).execute(tx.connection()?).await?;

			tx.commit().await?;
			tracing::info!(migration = %migration.label(), "applied migration");
		}

		Ok(pending)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	const FIRST: Migration = Migration::new(
		"notes",
		"0001_initial",
		&["CREATE TABLE notes (id INTEGER PRIMARY KEY, body TEXT NOT NULL)"],
	);
	const SECOND: Migration = Migration::new(
		"notes",
		"0002_add_title",
		&["ALTER TABLE notes ADD COLUMN title TEXT NOT NULL DEFAULT ''"],
	);
	const BROKEN: Migration = Migration::new(
		"notes",
		"0003_broken",
		&[
			"CREATE TABLE half_done (id INTEGER PRIMARY KEY)",
			"CREATE TABLE notes (id INTEGER PRIMARY KEY)",
		],
	);

	#[rstest]
	#[tokio::test]
	async fn test_migrate_applies_in_order_once() {
		// Arrange
		let db = DatabaseConnection::connect_memory().await.unwrap();
		let migrator = Migrator::new(db.clone()).with_migrations([FIRST, SECOND]);

		// Act
		let first_run = migrator.migrate().await.unwrap();
		let second_run = migrator.migrate().await.unwrap();

		// Assert
		assert_eq!(first_run, vec![FIRST, SECOND]);
		assert!(second_run.is_empty());
		db.execute("INSERT INTO notes (body, title) VALUES ('b', 't')")
			.await
			.unwrap();
	}

	#[rstest]
	#[tokio::test]
	async fn test_plan_lists_pending() {
		let db = DatabaseConnection::connect_memory().await.unwrap();
		Migrator::new(db.clone())
			.with_migrations([FIRST])
			.migrate()
			.await
			.unwrap();

		let plan = Migrator::new(db)
			.with_migrations([FIRST, SECOND])
			.plan()
			.await
			.unwrap();

		assert_eq!(plan, vec![SECOND]);
		assert_eq!(plan[0].label(), "notes.0002_add_title");
	}

	#[rstest]
	#[tokio::test]
	async fn test_failed_migration_leaves_no_trace() {
		let db = DatabaseConnection::connect_memory().await.unwrap();
		let migrator = Migrator::new(db.clone()).with_migrations([FIRST, BROKEN]);

		assert!(migrator.migrate().await.is_err());

		let plan = migrator.plan().await.unwrap();
		assert_eq!(plan, vec![BROKEN]);
		assert!(db.execute("INSERT INTO half_done (id) VALUES (1)").await.is_err());
	}
}
