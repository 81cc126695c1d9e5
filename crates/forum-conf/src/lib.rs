//! Configuration for the forum.
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! environment variables carrying the `FORUM_` prefix.
//!
//! ```
//! use forum_conf::{Env, Settings};
//!
//! let env = Env::from_pairs([("FORUM_SERVER_PORT", "9000")]).with_prefix("FORUM_");
//! let settings = Settings::default().apply_env(&env).unwrap();
//! assert_eq!(settings.server.port, 9000);
//! ```

pub mod database;
pub mod env;
pub mod settings;

pub use database::DatabaseConfig;
pub use env::{Env, EnvError};
pub use settings::{AuthSettings, ForumSettings, ServerSettings, Settings, SettingsError};
