//! Responses to questions and their owner-only edits.

use crate::forms::ResponseForm;
use crate::models::{Questions, Response, Responses};
use forum_auth::User;
use forum_core::exception::{Error, Result};
use forum_db::timestamp::{from_millis, now_millis};
use forum_db::{DatabaseConnection, TransactionScope};
use sea_query::{Expr, ExprTrait, Query, SqliteQueryBuilder};
use sqlx::{Row, SqliteConnection};

#[derive(Clone, Debug)]
pub struct ResponseManager {
	db: DatabaseConnection,
}

impl ResponseManager {
	pub fn new(db: DatabaseConnection) -> Self {
		Self { db }
	}

	pub async fn get(&self, id: i64) -> Result<Option<Response>> {
		let sql = Query::select()
			.columns(Response::COLUMNS)
			.from(Responses::Table)
			.and_where(Expr::col(Responses::Id).eq(id))
			.to_string(SqliteQueryBuilder);
		self.db
			.fetch_optional(&sql)
			.await?
			.as_ref()
			.map(Response::from_row)
			.transpose()
	}

	/// Slug of the question `question_id`, used to redirect back to it
	pub async fn question_slug(&self, question_id: i64) -> Result<String> {
		let sql = slug_query(question_id);
		let row = self
			.db
			.fetch_optional(&sql)
			.await?
			.ok_or_else(|| Error::NotFound(format!("question {}", question_id)))?;
		Ok(row.try_get("slug")?)
	}

	/// Answer question `question_id` as `author`
	pub async fn create(&self, author: &User, question_id: i64, form: &ResponseForm) -> Result<Response> {
		let mut tx = TransactionScope::begin_immediate(&self.db).await?;
		let result = async {
			question_slug_in(tx.connection()?, question_id).await?;
			form.clean()?;

			let now = now_millis();
			let sql = Query::insert()
				.into_table(Responses::Table)
				.columns([
					Responses::Content,
					Responses::RespondentId,
					Responses::QuestionId,
					Responses::CreatedAt,
					Responses::UpdatedAt,
				])
				.values_panic([
					form.content.as_str().into(),
					author.id.into(),
					question_id.into(),
					now.into(),
					now.into(),
				])
				.to_string(SqliteQueryBuilder);
			let done = sqlx::query(&sql).execute(tx.connection()?).await?;

			Ok::<_, Error>(Response {
				id: done.last_insert_rowid(),
				content: form.content.clone(),
				respondent_id: author.id,
				question_id,
				upvotes: 0,
				downvotes: 0,
				created_at: from_millis(now),
				updated_at: from_millis(now),
			})
		}
		.await;
		let response = tx.complete(result).await?;

		tracing::info!(response_id = response.id, question_id, author = %author.username, "response posted");
		Ok(response)
	}

	/// Replace the content of response `id`. Returns it with its question's slug.
	pub async fn update(&self, editor: &User, id: i64, form: &ResponseForm) -> Result<(Response, String)> {
		let mut tx = TransactionScope::begin_immediate(&self.db).await?;
		let result = async {
			let mut response = owned_response(tx.connection()?, editor, id, "edit").await?;
			form.clean()?;

			let now = now_millis();
			let sql = Query::update()
				.table(Responses::Table)
				.value(Responses::Content, form.content.as_str())
				.value(Responses::UpdatedAt, now)
				.and_where(Expr::col(Responses::Id).eq(id))
				.to_string(SqliteQueryBuilder);
			sqlx::query(&sql).execute(tx.connection()?).await?;
			let slug = question_slug_in(tx.connection()?, response.question_id).await?;

			response.content = form.content.clone();
			response.updated_at = from_millis(now);
			Ok::<_, Error>((response, slug))
		}
		.await;
		let (response, slug) = tx.complete(result).await?;

		tracing::info!(response_id = id, editor = %editor.username, "response updated");
		Ok((response, slug))
	}

	/// Delete response `id`. Returns its question's slug.
	pub async fn delete(&self, editor: &User, id: i64) -> Result<String> {
		let mut tx = TransactionScope::begin_immediate(&self.db).await?;
		let result = async {
			let response = owned_response(tx.connection()?, editor, id, "delete").await?;
			let slug = question_slug_in(tx.connection()?, response.question_id).await?;

			let sql = Query::delete()
				.from_table(Responses::Table)
				.and_where(Expr::col(Responses::Id).eq(id))
				.to_string(SqliteQueryBuilder);
			sqlx::query(&sql).execute(tx.connection()?).await?;
			Ok::<_, Error>(slug)
		}
		.await;
		let slug = tx.complete(result).await?;

		tracing::info!(response_id = id, editor = %editor.username, "response deleted");
		Ok(slug)
	}
}

fn slug_query(question_id: i64) -> String {
	Query::select()
		.column(Questions::Slug)
		.from(Questions::Table)
		.and_where(Expr::col(Questions::Id).eq(question_id))
		.to_string(SqliteQueryBuilder)
}

async fn question_slug_in(conn: &mut SqliteConnection, question_id: i64) -> Result<String> {
	let row = sqlx::query(&slug_query(question_id))
		.fetch_optional(conn)
		.await?
		.ok_or_else(|| Error::NotFound(format!("question {}", question_id)))?;
	Ok(row.try_get("slug")?)
}

async fn owned_response(
	conn: &mut SqliteConnection,
	editor: &User,
	id: i64,
	action: &str,
) -> Result<Response> {
	let sql = Query::select()
		.columns(Response::COLUMNS)
		.from(Responses::Table)
		.and_where(Expr::col(Responses::Id).eq(id))
		.to_string(SqliteQueryBuilder);
	let row = sqlx::query(&sql)
		.fetch_optional(conn)
		.await?
		.ok_or_else(|| Error::NotFound(format!("response {}", id)))?;
	let response = Response::from_row(&row)?;

	if response.respondent_id != editor.id {
		tracing::warn!(response_id = id, editor = %editor.username, action, "refused change by non-owner");
		return Err(Error::Forbidden(format!(
			"You are not authorized to {} this response.",
			action
		)));
	}
	Ok(response)
}
