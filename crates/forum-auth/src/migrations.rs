use forum_db::Migration;

/// The `password` column only ever holds the unusable marker `!`; credentials
/// are checked upstream.
pub const MIGRATIONS: &[Migration] = &[Migration::new(
	"auth",
	"0001_initial",
	&["CREATE TABLE users (
		id INTEGER PRIMARY KEY AUTOINCREMENT,
		username VARCHAR(150) NOT NULL UNIQUE,
		password VARCHAR(128) NOT NULL DEFAULT '!',
		is_active BOOLEAN NOT NULL DEFAULT 1,
		date_joined BIGINT NOT NULL
	)"],
)];
