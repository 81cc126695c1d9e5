//! Tag lookup and get-or-create.

use crate::models::{QuestionTags, Tag, Tags};
use forum_core::exception::{Error, Result};
use forum_db::DatabaseConnection;
use sea_query::{Expr, ExprTrait, OnConflict, Order, Query, SqliteQueryBuilder};
use sqlx::{Row, SqliteConnection};
use std::collections::HashMap;

#[derive(Clone, Debug)]
pub struct TagManager {
	db: DatabaseConnection,
}

impl TagManager {
	pub fn new(db: DatabaseConnection) -> Self {
		Self { db }
	}

	/// Every tag, ordered by name
	pub async fn list(&self) -> Result<Vec<Tag>> {
		let sql = Query::select()
			.columns([Tags::Id, Tags::Name])
			.from(Tags::Table)
			.order_by(Tags::Name, Order::Asc)
			.to_string(SqliteQueryBuilder);
		self.db.fetch_all(&sql).await?.iter().map(Tag::from_row).collect()
	}

	pub async fn get_by_name(&self, name: &str) -> Result<Option<Tag>> {
		let sql = Query::select()
			.columns([Tags::Id, Tags::Name])
			.from(Tags::Table)
			.and_where(Expr::col(Tags::Name).eq(name))
			.to_string(SqliteQueryBuilder);
		self.db
			.fetch_optional(&sql)
			.await?
			.as_ref()
			.map(Tag::from_row)
			.transpose()
	}

	/// Tags of each question in `question_ids`, ordered by name
	pub async fn for_questions(&self, question_ids: &[i64]) -> Result<HashMap<i64, Vec<Tag>>> {
		let mut by_question: HashMap<i64, Vec<Tag>> = HashMap::new();
		if question_ids.is_empty() {
			return Ok(by_question);
		}

		let sql = Query::select()
			.column((QuestionTags::Table, QuestionTags::QuestionId))
			.columns([(Tags::Table, Tags::Id), (Tags::Table, Tags::Name)])
			.from(QuestionTags::Table)
			.inner_join(
				Tags::Table,
				Expr::col((Tags::Table, Tags::Id)).equals((QuestionTags::Table, QuestionTags::TagId)),
			)
			.and_where(
				Expr::col((QuestionTags::Table, QuestionTags::QuestionId))
					.is_in(question_ids.iter().copied()),
			)
			.order_by((Tags::Table, Tags::Name), Order::Asc)
			.to_string(SqliteQueryBuilder);

		for row in self.db.fetch_all(&sql).await? {
			let question_id: i64 = row.try_get("question_id")?;
			by_question
				.entry(question_id)
				.or_default()
				.push(Tag::from_row(&row)?);
		}
		Ok(by_question)
	}
}

/// Resolve `names` to tags inside an open transaction, creating missing ones
pub(crate) async fn get_or_create_all(
	conn: &mut SqliteConnection,
	names: &[String],
) -> Result<Vec<Tag>> {
	let mut tags = Vec::with_capacity(names.len());
	for name in names {
		let insert = Query::insert()
			.into_table(Tags::Table)
			.columns([Tags::Name])
			.values_panic([name.as_str().into()])
			.on_conflict(OnConflict::column(Tags::Name).do_nothing().to_owned())
			.to_string(SqliteQueryBuilder);
		if sqlx::query(&insert).execute(&mut *conn).await?.rows_affected() == 1 {
			tracing::debug!(tag = %name, "created tag");
		}

		let select = Query::select()
			.columns([Tags::Id, Tags::Name])
			.from(Tags::Table)
			.and_where(Expr::col(Tags::Name).eq(name.as_str()))
			.to_string(SqliteQueryBuilder);
		let row = sqlx::query(&select)
			.fetch_optional(&mut *conn)
			.await?
			.ok_or_else(|| Error::Internal(format!("tag '{}' missing after insert", name)))?;
		tags.push(Tag::from_row(&row)?);
	}
	Ok(tags)
}

/// Replace the tag links of `question_id` with `tags`
pub(crate) async fn set_question_tags(
	conn: &mut SqliteConnection,
	question_id: i64,
	tags: &[Tag],
) -> Result<()> {
	let delete = Query::delete()
		.from_table(QuestionTags::Table)
		.and_where(Expr::col(QuestionTags::QuestionId).eq(question_id))
		.to_string(SqliteQueryBuilder);
	sqlx::query(&delete).execute(&mut *conn).await?;

	if tags.is_empty() {
		return Ok(());
	}

	let mut insert = Query::insert();
	insert
		.into_table(QuestionTags::Table)
		.columns([QuestionTags::QuestionId, QuestionTags::TagId]);
	for tag in tags {
		insert.values_panic([question_id.into(), tag.id.into()]);
	}
	let sql = insert.to_string(SqliteQueryBuilder);
	sqlx::query(&sql).execute(&mut *conn).await?;
	Ok(())
}
