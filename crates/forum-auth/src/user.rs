//! Local mirror of upstream identities.

use chrono::{DateTime, Utc};
use forum_core::exception::{Error, Result};
use forum_db::DatabaseConnection;
use forum_db::timestamp::{from_millis, now_millis};
use sea_query::{Expr, ExprTrait, Iden, OnConflict, Query, SelectStatement, SqliteQueryBuilder};
use serde::Serialize;
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

/// Same limit upstream identity providers commonly use for usernames
pub const USERNAME_MAX_LENGTH: usize = 150;

#[derive(Iden)]
pub enum Users {
	Table,
	Id,
	Username,
	IsActive,
	DateJoined,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
	pub id: i64,
	pub username: String,
	pub is_active: bool,
	pub date_joined: DateTime<Utc>,
}

impl User {
	fn from_row(row: &SqliteRow) -> Result<Self> {
		Ok(Self {
			id: row.try_get("id")?,
			username: row.try_get("username")?,
			is_active: row.try_get("is_active")?,
			date_joined: from_millis(row.try_get("date_joined")?),
		})
	}
}

/// Lookups and creation of [`User`] rows
#[derive(Clone, Debug)]
pub struct UserManager {
	db: DatabaseConnection,
}

impl UserManager {
	pub fn new(db: DatabaseConnection) -> Self {
		Self { db }
	}

	fn select() -> SelectStatement {
		Query::select()
			.columns([Users::Id, Users::Username, Users::IsActive, Users::DateJoined])
			.from(Users::Table)
			.to_owned()
	}

	pub async fn get(&self, id: i64) -> Result<Option<User>> {
		let sql = Self::select()
			.and_where(Expr::col(Users::Id).eq(id))
			.to_string(SqliteQueryBuilder);
		self.db
			.fetch_optional(&sql)
			.await?
			.as_ref()
			.map(User::from_row)
			.transpose()
	}

	pub async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
		let sql = Self::select()
			.and_where(Expr::col(Users::Username).eq(username))
			.to_string(SqliteQueryBuilder);
		self.db
			.fetch_optional(&sql)
			.await?
			.as_ref()
			.map(User::from_row)
			.transpose()
	}

	/// Fetch `username`, creating it first if unseen. The flag is true when created.
	///
	/// Concurrent first requests for the same name race on the UNIQUE
	/// constraint; the loser's insert is a no-op and both read the same row.
	pub async fn get_or_create(&self, username: &str) -> Result<(User, bool)> {
		validate_username(username)?;

		let sql = Query::insert()
			.into_table(Users::Table)
			.columns([Users::Username, Users::DateJoined])
			.values_panic([username.into(), now_millis().into()])
			.on_conflict(OnConflict::column(Users::Username).do_nothing().to_owned())
			.to_string(SqliteQueryBuilder);
		let created = self.db.execute(&sql).await? == 1;

		let user = self
			.get_by_username(username)
			.await?
			.ok_or_else(|| Error::Internal(format!("user '{}' vanished after insert", username)))?;

		if created {
			tracing::info!(user_id = user.id, username = %user.username, "mirrored new remote user");
		}
		Ok((user, created))
	}

	pub async fn set_active(&self, id: i64, active: bool) -> Result<()> {
		let sql = Query::update()
			.table(Users::Table)
			.value(Users::IsActive, active)
			.and_where(Expr::col(Users::Id).eq(id))
			.to_string(SqliteQueryBuilder);
		match self.db.execute(&sql).await? {
			0 => Err(Error::NotFound(format!("user {}", id))),
			_ => Ok(()),
		}
	}
}

fn validate_username(username: &str) -> Result<()> {
	if username.trim().is_empty() {
		return Err(Error::BadRequest("username must not be empty".to_string()));
	}
	if username.chars().count() > USERNAME_MAX_LENGTH {
		return Err(Error::BadRequest(format!(
			"username longer than {} characters",
			USERNAME_MAX_LENGTH
		)));
	}
	Ok(())
}
