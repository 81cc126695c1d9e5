//! Project settings

use crate::database::{DatabaseConfig, SQLITE_ENGINE};
use crate::env::{Env, EnvError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Prefix for every settings override read from the environment.
pub const ENV_PREFIX: &str = "FORUM_";

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
	#[error("Failed to read settings file {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("Invalid settings file: {0}")]
	Toml(#[from] toml::de::Error),

	#[error(transparent)]
	Env(#[from] EnvError),

	#[error("Invalid setting '{key}': {reason}")]
	Invalid { key: String, reason: String },
}

/// Listener address for `runserver`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
	pub host: String,
	pub port: u16,
}

impl ServerSettings {
	pub fn address(&self) -> String {
		format!("{}:{}", self.host, self.port)
	}
}

impl Default for ServerSettings {
	fn default() -> Self {
		Self {
			host: "127.0.0.1".to_string(),
			port: 8000,
		}
	}
}

/// Upstream authentication contract
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
	/// Header carrying the authenticated username
	pub remote_user_header: String,
	/// Mirror unseen usernames into the local users table
	pub create_unknown_user: bool,
	/// Where anonymous users are sent for login-required pages
	pub login_url: String,
}

impl Default for AuthSettings {
	fn default() -> Self {
		Self {
			remote_user_header: "REMOTE_USER".to_string(),
			create_unknown_user: true,
			login_url: "/users/login/".to_string(),
		}
	}
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForumSettings {
	/// Attempts at a fresh random slug suffix before giving up
	pub slug_retry_attempts: u32,
}

impl Default for ForumSettings {
	fn default() -> Self {
		Self {
			slug_retry_attempts: 5,
		}
	}
}

/// All settings for a forum deployment.
///
/// # Examples
///
/// ```
/// use forum_conf::Settings;
///
/// let settings = Settings::from_toml_str(r#"
/// debug = true
///
/// [database]
/// name = "forum.sqlite3"
/// "#).unwrap();
///
/// assert!(settings.debug);
/// assert_eq!(settings.database.name, "forum.sqlite3");
/// assert_eq!(settings.server.port, 8000);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
	pub debug: bool,
	/// Default tracing filter when `RUST_LOG` is unset
	pub log_level: Option<String>,
	pub database: DatabaseConfig,
	pub server: ServerSettings,
	pub auth: AuthSettings,
	pub forum: ForumSettings,
}

impl Settings {
	/// Defaults, then the settings file (argument or `FORUM_SETTINGS_FILE`), then env.
	pub fn load(path: Option<&Path>, env: &Env) -> Result<Self, SettingsError> {
		let from_env = env.path_opt("SETTINGS_FILE")?;
		let file = path.map(Path::to_path_buf).or(from_env);

		let settings = match file {
			Some(file) => {
				tracing::debug!(path = %file.display(), "loading settings file");
				Self::from_file(&file)?
			}
			None => Self::default(),
		};

		let settings = settings.apply_env(env)?;
		settings.validate()?;
		Ok(settings)
	}

	/// Load with the process environment under the `FORUM_` prefix.
	pub fn from_environment(path: Option<&Path>) -> Result<Self, SettingsError> {
		Self::load(path, &Env::new().with_prefix(ENV_PREFIX))
	}

	pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
		let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
			path: path.to_path_buf(),
			source,
		})?;
		Self::from_toml_str(&content)
	}

	pub fn from_toml_str(content: &str) -> Result<Self, SettingsError> {
		Ok(toml::from_str(content)?)
	}

	/// Apply `<prefix>DEBUG`, `<prefix>DATABASE_NAME` and friends on top of `self`.
	pub fn apply_env(mut self, env: &Env) -> Result<Self, SettingsError> {
		if let Some(debug) = env.bool_opt("DEBUG")? {
			self.debug = debug;
		}
		if let Some(level) = env.str_opt("LOG_LEVEL")? {
			self.log_level = Some(level);
		}
		if let Some(name) = env.str_opt("DATABASE_NAME")? {
			self.database.name = name;
		}
		if let Some(max) = env.int_opt("DATABASE_MAX_CONNECTIONS")? {
			self.database.max_connections = to_u32("DATABASE_MAX_CONNECTIONS", max)?;
		}
		if let Some(host) = env.str_opt("SERVER_HOST")? {
			self.server.host = host;
		}
		if let Some(port) = env.int_opt("SERVER_PORT")? {
			self.server.port = u16::try_from(port).map_err(|_| SettingsError::Invalid {
				key: "SERVER_PORT".to_string(),
				reason: format!("{} is not a valid port", port),
			})?;
		}
		if let Some(header) = env.str_opt("REMOTE_USER_HEADER")? {
			self.auth.remote_user_header = header;
		}
		if let Some(create) = env.bool_opt("CREATE_UNKNOWN_USER")? {
			self.auth.create_unknown_user = create;
		}
		if let Some(url) = env.str_opt("LOGIN_URL")? {
			self.auth.login_url = url;
		}
		if let Some(attempts) = env.int_opt("SLUG_RETRY_ATTEMPTS")? {
			self.forum.slug_retry_attempts = to_u32("SLUG_RETRY_ATTEMPTS", attempts)?;
		}
		Ok(self)
	}

	pub fn validate(&self) -> Result<(), SettingsError> {
		if self.database.engine != SQLITE_ENGINE {
			return Err(invalid(
				"database.engine",
				format!("unsupported engine '{}'", self.database.engine),
			));
		}
		if self.database.name.trim().is_empty() {
			return Err(invalid("database.name", "must not be empty"));
		}
		if self.database.max_connections == 0 {
			return Err(invalid("database.max_connections", "must be at least 1"));
		}
		if self.auth.remote_user_header.trim().is_empty() {
			return Err(invalid("auth.remote_user_header", "must not be empty"));
		}
		if !self.auth.login_url.starts_with('/') {
			return Err(invalid("auth.login_url", "must be an absolute path"));
		}
		if self.forum.slug_retry_attempts == 0 {
			return Err(invalid("forum.slug_retry_attempts", "must be at least 1"));
		}
		Ok(())
	}
}

fn invalid(key: &str, reason: impl Into<String>) -> SettingsError {
	SettingsError::Invalid {
		key: key.to_string(),
		reason: reason.into(),
	}
}

fn to_u32(key: &str, value: i64) -> Result<u32, SettingsError> {
	u32::try_from(value).map_err(|_| invalid(key, format!("{} is out of range", value)))
}
