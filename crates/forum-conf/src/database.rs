//! Database configuration for settings

use serde::{Deserialize, Serialize};

/// Engine identifier for the SQLite backend, the only one the forum ships with.
pub const SQLITE_ENGINE: &str = "forum.db.backends.sqlite3";

/// Database configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
	/// Database engine/backend
	pub engine: String,

	/// Database file path, or `:memory:`
	pub name: String,

	/// Upper bound on pooled connections. In-memory databases always use one.
	pub max_connections: u32,

	/// How long a writer waits on a locked database before failing
	pub busy_timeout_ms: u64,
}

impl DatabaseConfig {
	/// Create a SQLite database configuration
	///
	/// # Examples
	///
	/// ```
	/// use forum_conf::DatabaseConfig;
	///
	/// let db = DatabaseConfig::sqlite("forum.sqlite3");
	///
	/// assert_eq!(db.name, "forum.sqlite3");
	/// assert!(!db.is_memory());
	/// ```
	pub fn sqlite(name: impl Into<String>) -> Self {
		Self {
			engine: SQLITE_ENGINE.to_string(),
			name: name.into(),
			max_connections: 5,
			busy_timeout_ms: 5_000,
		}
	}

	/// In-memory SQLite, used by tests
	pub fn memory() -> Self {
		Self::sqlite(":memory:")
	}

	pub fn is_memory(&self) -> bool {
		self.name == ":memory:"
	}

	/// Convert to a connection URL
	///
	/// # Examples
	///
	/// ```
	/// use forum_conf::DatabaseConfig;
	///
	/// assert_eq!(DatabaseConfig::memory().to_url(), "sqlite::memory:");
	/// assert_eq!(DatabaseConfig::sqlite("db.sqlite3").to_url(), "sqlite:db.sqlite3");
	/// ```
	pub fn to_url(&self) -> String {
		if self.is_memory() {
			"sqlite::memory:".to_string()
		} else {
			format!("sqlite:{}", self.name)
		}
	}
}

impl Default for DatabaseConfig {
	fn default() -> Self {
		Self::sqlite("db.sqlite3")
	}
}
