//! Read projections of questions and responses.
//!
//! Every listing joins the author's username, loads tags in one extra query
//! and, for an authenticated viewer, the viewer's votes in one more.

use crate::models::{
	AuthorRef, QuestionTags, QuestionView, Question, Questions, Response, ResponseView, Responses,
	Tag, Tags,
};
use crate::tags::TagManager;
use crate::votes::{QuestionTarget, ResponseTarget, VoteEngine, VoteState};
use forum_auth::{User, Users};
use forum_core::exception::Result;
use forum_db::DatabaseConnection;
use sea_query::{Expr, ExprTrait, Order, Query, SelectStatement, SqliteQueryBuilder};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use std::collections::HashMap;

#[derive(Clone, Debug)]
pub struct ForumQueries {
	db: DatabaseConnection,
	tags: TagManager,
	votes: VoteEngine,
}

impl ForumQueries {
	pub fn new(db: DatabaseConnection) -> Self {
		Self {
			tags: TagManager::new(db.clone()),
			votes: VoteEngine::new(db.clone()),
			db,
		}
	}

	/// All questions, newest first
	pub async fn list_questions(&self, viewer: Option<&User>) -> Result<Vec<QuestionView>> {
		self.questions(question_select(), viewer).await
	}

	/// Questions carrying a tag named exactly `tag`
	pub async fn list_questions_by_tag(&self, tag: &str, viewer: Option<&User>) -> Result<Vec<QuestionView>> {
		let tagged = Query::select()
			.column((QuestionTags::Table, QuestionTags::QuestionId))
			.from(QuestionTags::Table)
			.inner_join(
				Tags::Table,
				Expr::col((Tags::Table, Tags::Id)).equals((QuestionTags::Table, QuestionTags::TagId)),
			)
			.and_where(Expr::col((Tags::Table, Tags::Name)).eq(tag))
			.to_owned();
		let mut select = question_select();
		select.and_where(Expr::col((Questions::Table, Questions::Id)).in_subquery(tagged));
		self.questions(select, viewer).await
	}

	/// Questions asked by `author`, seen by the author
	pub async fn list_questions_by_author(&self, author: &User) -> Result<Vec<QuestionView>> {
		Ok(self
			.list_questions(Some(author))
			.await?
			.into_iter()
			.filter(|q| q.questioner.id == author.id)
			.collect())
	}

	/// The question at `slug`, if any
	pub async fn get_question(&self, slug: &str, viewer: Option<&User>) -> Result<Option<QuestionView>> {
		let mut select = question_select();
		select.and_where(Expr::col((Questions::Table, Questions::Slug)).eq(slug));
		Ok(self.questions(select, viewer).await?.into_iter().next())
	}

	/// Responses to `question_id`, oldest first
	pub async fn list_responses(&self, question_id: i64, viewer: Option<&User>) -> Result<Vec<ResponseView>> {
		let sql = Query::select()
			.columns(Response::COLUMNS.map(|c| (Responses::Table, c)))
			.column((Users::Table, Users::Username))
			.from(Responses::Table)
			.inner_join(
				Users::Table,
				Expr::col((Users::Table, Users::Id)).equals((Responses::Table, Responses::RespondentId)),
			)
			.and_where(Expr::col((Responses::Table, Responses::QuestionId)).eq(question_id))
			.order_by((Responses::Table, Responses::CreatedAt), Order::Asc)
			.order_by((Responses::Table, Responses::Id), Order::Asc)
			.to_string(SqliteQueryBuilder);

		let rows = self.db.fetch_all(&sql).await?;
		let responses = rows
			.iter()
			.map(|row| Ok((Response::from_row(row)?, username(row)?)))
			.collect::<Result<Vec<_>>>()?;

		let ids: Vec<i64> = responses.iter().map(|(r, _)| r.id).collect();
		let states = match viewer {
			Some(user) => Some(self.votes.states_for::<ResponseTarget>(user.id, &ids).await?),
			None => None,
		};

		Ok(responses
			.into_iter()
			.map(|(response, username)| {
				let (viewer_upvoted, viewer_downvoted) = viewer_flags(states.as_ref(), response.id);
				ResponseView {
					id: response.id,
					content: response.content,
					question_id: response.question_id,
					respondent: AuthorRef {
						id: response.respondent_id,
						username,
					},
					upvotes: response.upvotes,
					downvotes: response.downvotes,
					created_at: response.created_at,
					updated_at: response.updated_at,
					viewer_upvoted,
					viewer_downvoted,
				}
			})
			.collect())
	}

	/// Every tag, ordered by name
	pub async fn list_tags(&self) -> Result<Vec<Tag>> {
		self.tags.list().await
	}

	async fn questions(&self, select: SelectStatement, viewer: Option<&User>) -> Result<Vec<QuestionView>> {
		let sql = select.to_string(SqliteQueryBuilder);
		let rows = self.db.fetch_all(&sql).await?;
		let questions = rows
			.iter()
			.map(|row| Ok((Question::from_row(row)?, username(row)?)))
			.collect::<Result<Vec<_>>>()?;

		let ids: Vec<i64> = questions.iter().map(|(q, _)| q.id).collect();
		let mut tags = self.tags.for_questions(&ids).await?;
		let states = match viewer {
			Some(user) => Some(self.votes.states_for::<QuestionTarget>(user.id, &ids).await?),
			None => None,
		};

		Ok(questions
			.into_iter()
			.map(|(question, username)| {
				let (viewer_upvoted, viewer_downvoted) = viewer_flags(states.as_ref(), question.id);
				QuestionView {
					id: question.id,
					title: question.title,
					description: question.description,
					slug: question.slug,
					questioner: AuthorRef {
						id: question.questioner_id,
						username,
					},
					upvotes: question.upvotes,
					downvotes: question.downvotes,
					created_at: question.created_at,
					updated_at: question.updated_at,
					tags: tags.remove(&question.id).unwrap_or_default(),
					viewer_upvoted,
					viewer_downvoted,
				}
			})
			.collect())
	}
}

fn question_select() -> SelectStatement {
	Query::select()
		.columns(Question::COLUMNS.map(|c| (Questions::Table, c)))
		.column((Users::Table, Users::Username))
		.from(Questions::Table)
		.inner_join(
			Users::Table,
			Expr::col((Users::Table, Users::Id)).equals((Questions::Table, Questions::QuestionerId)),
		)
		.order_by((Questions::Table, Questions::CreatedAt), Order::Desc)
		.order_by((Questions::Table, Questions::Id), Order::Desc)
		.to_owned()
}

fn username(row: &SqliteRow) -> Result<String> {
	Ok(row.try_get("username")?)
}

/// Viewer fields: absent for anonymous viewers, otherwise from the stored vote
fn viewer_flags(states: Option<&HashMap<i64, VoteState>>, id: i64) -> (Option<bool>, Option<bool>) {
	match states {
		None => (None, None),
		Some(states) => {
			let state = states.get(&id).copied().unwrap_or_default();
			(Some(state.is_up()), Some(state.is_down()))
		}
	}
}
