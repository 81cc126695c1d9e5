//! # Forum Q&A
//!
//! Questions with tags, responses, and up/down vote toggles on both.
//!
//! - [`queries`]: read projections annotated with the viewer's votes
//! - [`votes`]: the vote toggle engine shared by questions and responses
//! - [`questions`], [`responses`]: owner-checked mutations
//! - [`views`], [`urls`]: the HTTP surface

pub mod forms;
pub mod migrations;
pub mod models;
pub mod queries;
pub mod questions;
pub mod responses;
pub mod state;
pub mod tags;
pub mod urls;
pub mod views;
pub mod votes;

#[cfg(test)]
mod test_support;

pub use forms::{QuestionForm, ResponseForm};
pub use migrations::MIGRATIONS;
pub use models::{AuthorRef, Question, QuestionView, Response, ResponseView, Tag};
pub use queries::ForumQueries;
pub use questions::QuestionManager;
pub use responses::ResponseManager;
pub use state::ForumState;
pub use tags::TagManager;
pub use urls::routes;
pub use votes::{
	QuestionTarget, ResponseTarget, Votable, VoteDirection, VoteEngine, VoteOutcome, VoteState,
};

use forum_db::Migration;

/// Migrations of the users table and the forum tables, in dependency order
pub fn all_migrations() -> Vec<Migration> {
	forum_auth::MIGRATIONS
		.iter()
		.chain(MIGRATIONS.iter())
		.copied()
		.collect()
}
