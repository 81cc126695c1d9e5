//! Fixtures shared by the unit tests of this crate.

use forum_auth::{User, UserManager};
use forum_db::{DatabaseConnection, Migrator};

/// In-memory database with the auth and forum tables
pub(crate) async fn migrated_db() -> DatabaseConnection {
	let db = DatabaseConnection::connect_memory().await.unwrap();
	Migrator::new(db.clone())
		.with_migrations(crate::all_migrations())
		.migrate()
		.await
		.unwrap();
	db
}

pub(crate) async fn user(db: &DatabaseConnection, username: &str) -> User {
	UserManager::new(db.clone())
		.get_or_create(username)
		.await
		.unwrap()
		.0
}
