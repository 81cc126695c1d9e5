//! Shared fixtures: a migrated database, users and a seeded question.

use forum_auth::{User, UserManager};
use forum_conf::DatabaseConfig;
use forum_db::{DatabaseConnection, Migrator};
use forum_qa::{Question, QuestionForm, QuestionManager};
use rstest::fixture;
use sqlx::Row;
use tempfile::TempDir;

/// Fresh in-memory database with the auth and forum schema
#[fixture]
pub async fn qa_db() -> DatabaseConnection {
	let db = DatabaseConnection::connect_memory()
		.await
		.expect("Failed to open in-memory database");
	Migrator::new(db.clone())
		.with_migrations(forum_qa::all_migrations())
		.migrate()
		.await
		.expect("Failed to apply migrations");
	db
}

/// Migrated database in a temporary file, pooled over several connections.
/// Keep the directory alive for as long as the database is used.
#[fixture]
pub async fn file_db() -> (TempDir, DatabaseConnection) {
	let dir = tempfile::tempdir().expect("Failed to create temp dir");
	let path = dir.path().join("forum.sqlite3");
	let db = DatabaseConnection::connect(&DatabaseConfig::sqlite(path.to_string_lossy().to_string()))
		.await
		.expect("Failed to open database file");
	Migrator::new(db.clone())
		.with_migrations(forum_qa::all_migrations())
		.migrate()
		.await
		.expect("Failed to apply migrations");
	(dir, db)
}

pub async fn create_user(db: &DatabaseConnection, username: &str) -> User {
	UserManager::new(db.clone())
		.get_or_create(username)
		.await
		.expect("Failed to create user")
		.0
}

pub async fn create_question(db: &DatabaseConnection, author: &User, title: &str) -> Question {
	QuestionManager::new(db.clone())
		.create(author, &QuestionForm::new(title, "Details", ["rust"]))
		.await
		.expect("Failed to create question")
}

/// `SELECT COUNT(*)` over `table` with a raw `condition`
pub async fn count_rows(db: &DatabaseConnection, table: &str, condition: &str) -> i64 {
	let sql = format!("SELECT COUNT(*) AS n FROM {} WHERE {}", table, condition);
	db.fetch_optional(&sql)
		.await
		.expect("Failed to count rows")
		.expect("COUNT returned no row")
		.get("n")
}
