//! Everything a forum view needs, shared across requests.

use crate::queries::ForumQueries;
use crate::questions::QuestionManager;
use crate::responses::ResponseManager;
use crate::votes::VoteEngine;
use forum_conf::Settings;
use forum_db::DatabaseConnection;

#[derive(Clone, Debug)]
pub struct ForumState {
	pub db: DatabaseConnection,
	pub questions: QuestionManager,
	pub responses: ResponseManager,
	pub queries: ForumQueries,
	pub votes: VoteEngine,
	/// Where anonymous users are sent for login-required routes
	pub login_url: String,
}

impl ForumState {
	pub fn new(db: DatabaseConnection, settings: &Settings) -> Self {
		Self {
			questions: QuestionManager::new(db.clone())
				.with_slug_retry_attempts(settings.forum.slug_retry_attempts),
			responses: ResponseManager::new(db.clone()),
			queries: ForumQueries::new(db.clone()),
			votes: VoteEngine::new(db.clone()),
			login_url: settings.auth.login_url.clone(),
			db,
		}
	}
}
