//! # Forum
//!
//! A question and answer forum: users ask tagged questions, answer them and
//! toggle up/down votes on both. Authentication is delegated to an upstream
//! layer that forwards the username in a trusted header.
//!
//! ## Crates
//!
//! - [`core`]: the shared error type
//! - [`conf`]: layered settings (defaults, TOML file, `FORUM_*` environment)
//! - [`http`], [`urls`], [`server`]: requests, routing and the hyper server
//! - [`db`]: the SQLite pool, transactions and migrations
//! - [`auth`]: remote-user authentication
//! - [`qa`]: questions, responses, tags and votes
//!
//! ## Quick Example
//!
//! ```rust,no_run
//! use forum::Application;
//! use forum::conf::Settings;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let app = Application::build(Settings::default()).await?;
//! app.migrate().await?;
//! # Ok(())
//! # }
//! ```

pub use forum_auth as auth;
pub use forum_conf as conf;
pub use forum_core as core;
pub use forum_db as db;
pub use forum_http as http;
pub use forum_qa as qa;
pub use forum_server as server;
pub use forum_urls as urls;

use forum_auth::{AuthenticationMiddleware, RemoteUserAuthentication, UserManager};
use forum_conf::Settings;
use forum_core::exception::{Error, Result};
use forum_db::{DatabaseConnection, Migration, Migrator};
use forum_http::{Handler, MiddlewareChain, Request, Response};
use forum_qa::ForumState;
use forum_server::LoggingMiddleware;
use forum_urls::Router;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// A configured forum: database, routes and the middleware stack.
#[derive(Clone)]
pub struct Application {
	settings: Settings,
	db: DatabaseConnection,
	router: Arc<Router>,
	handler: Arc<dyn Handler>,
}

impl Application {
	/// Connect to the configured database and assemble the application
	pub async fn build(settings: Settings) -> Result<Self> {
		let db = DatabaseConnection::connect(&settings.database).await?;
		Self::with_database(db, settings)
	}

	/// Assemble the application over an existing connection
	pub fn with_database(db: DatabaseConnection, settings: Settings) -> Result<Self> {
		let state = Arc::new(ForumState::new(db.clone(), &settings));
		let router = Arc::new(
			forum_qa::routes(state).map_err(|e| Error::Configuration(format!("invalid route: {}", e)))?,
		);

		let backend = RemoteUserAuthentication::new(UserManager::new(db.clone()))
			.with_header(settings.auth.remote_user_header.clone())
			.create_unknown_user(settings.auth.create_unknown_user);
		let chain = MiddlewareChain::new(router.clone())
			.with_middleware(Arc::new(LoggingMiddleware::new()))
			.with_middleware(Arc::new(AuthenticationMiddleware::new(Arc::new(backend))));

		tracing::debug!(routes = router.routes().len(), "application assembled");
		Ok(Self {
			settings,
			db,
			router,
			handler: Arc::new(chain),
		})
	}

	pub fn settings(&self) -> &Settings {
		&self.settings
	}

	pub fn database(&self) -> &DatabaseConnection {
		&self.db
	}

	pub fn router(&self) -> &Router {
		&self.router
	}

	/// The full middleware stack, ready to hand to the server
	pub fn handler(&self) -> Arc<dyn Handler> {
		self.handler.clone()
	}

	/// Run `request` through the stack. Errors become their JSON responses.
	pub async fn dispatch(&self, request: Request) -> Response {
		match self.handler.handle(request).await {
			Ok(response) => response,
			Err(error) => Response::from(error),
		}
	}

	pub fn migrator(&self) -> Migrator {
		Migrator::new(self.db.clone()).with_migrations(migrations())
	}

	/// Apply pending migrations, returning the ones applied
	pub async fn migrate(&self) -> Result<Vec<Migration>> {
		self.migrator().migrate().await
	}
}

/// Every migration of the forum, in dependency order
pub fn migrations() -> Vec<Migration> {
	forum_qa::all_migrations()
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins when set. Otherwise the filter is `settings.log_level`
/// (`info` when unset), raised to `debug` and `trace` by `verbosity`.
pub fn init_logging(settings: &Settings, verbosity: u8) {
	let filter = EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| EnvFilter::new(log_filter(settings.log_level.as_deref(), verbosity)));
	// A subscriber may already be installed, e.g. by a test harness
	let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn log_filter(configured: Option<&str>, verbosity: u8) -> String {
	match verbosity {
		0 => configured.unwrap_or("info").to_string(),
		1 => "debug".to_string(),
		_ => "trace".to_string(),
	}
}
