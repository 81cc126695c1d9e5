//! # Vote toggles
//!
//! Each (voter, target) pair is in one of three states. Casting a vote in the
//! direction already held retracts it; casting the other direction flips it.
//!
//! | current | upvote | downvote |
//! |---------|--------|----------|
//! | none    | up     | down     |
//! | up      | none   | down     |
//! | down    | up     | none     |
//!
//! [`VoteEngine`] applies a cast in one `BEGIN IMMEDIATE` transaction and then
//! recounts the target's `upvotes`/`downvotes` from the vote table, so the
//! counters always equal the number of matching vote rows.

use crate::models::{QuestionVotes, Questions, ResponseVotes, Responses};
use forum_core::exception::{Error, Result};
use forum_db::{DatabaseConnection, TransactionScope};
use sea_query::{Expr, ExprTrait, Iden, OnConflict, Query, SqliteQueryBuilder};
use serde::Serialize;
use sqlx::{Row, SqliteConnection};
use std::collections::HashMap;

/// Something users can vote on.
///
/// The vote table holds one row per (voter, target) with a `vote` of `1` or
/// `-1`, unique on (voter, target). The target table carries the recounted
/// `upvotes` and `downvotes`.
pub trait Votable: Send + Sync + 'static {
	/// Name used in logs and errors
	const KIND: &'static str;

	type Target: Iden + Send + Sync + 'static;
	type Vote: Iden + Send + Sync + 'static;

	const TARGET_TABLE: Self::Target;
	const TARGET_ID: Self::Target;
	const UPVOTES: Self::Target;
	const DOWNVOTES: Self::Target;

	const VOTE_TABLE: Self::Vote;
	const VOTER: Self::Vote;
	/// Column of the vote table referencing the target
	const VOTE_TARGET: Self::Vote;
	const VOTE_VALUE: Self::Vote;
}

pub struct QuestionTarget;

impl Votable for QuestionTarget {
	const KIND: &'static str = "question";

	type Target = Questions;
	type Vote = QuestionVotes;

	const TARGET_TABLE: Questions = Questions::Table;
	const TARGET_ID: Questions = Questions::Id;
	const UPVOTES: Questions = Questions::Upvotes;
	const DOWNVOTES: Questions = Questions::Downvotes;

	const VOTE_TABLE: QuestionVotes = QuestionVotes::Table;
	const VOTER: QuestionVotes = QuestionVotes::UserId;
	const VOTE_TARGET: QuestionVotes = QuestionVotes::QuestionId;
	const VOTE_VALUE: QuestionVotes = QuestionVotes::Vote;
}

pub struct ResponseTarget;

impl Votable for ResponseTarget {
	const KIND: &'static str = "response";

	type Target = Responses;
	type Vote = ResponseVotes;

	const TARGET_TABLE: Responses = Responses::Table;
	const TARGET_ID: Responses = Responses::Id;
	const UPVOTES: Responses = Responses::Upvotes;
	const DOWNVOTES: Responses = Responses::Downvotes;

	const VOTE_TABLE: ResponseVotes = ResponseVotes::Table;
	const VOTER: ResponseVotes = ResponseVotes::UserId;
	const VOTE_TARGET: ResponseVotes = ResponseVotes::ResponseId;
	const VOTE_VALUE: ResponseVotes = ResponseVotes::Vote;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteDirection {
	Up,
	Down,
}

impl VoteDirection {
	/// Stored value of the vote row
	pub fn value(self) -> i64 {
		match self {
			VoteDirection::Up => 1,
			VoteDirection::Down => -1,
		}
	}
}

/// A voter's standing on one target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteState {
	#[default]
	None,
	Up,
	Down,
}

impl VoteState {
	fn from_stored(value: Option<i64>) -> Self {
		match value {
			Some(v) if v > 0 => VoteState::Up,
			Some(_) => VoteState::Down,
			None => VoteState::None,
		}
	}

	/// State after casting `direction`
	///
	/// # Examples
	///
	/// ```
	/// use forum_qa::votes::{VoteDirection, VoteState};
	///
	/// assert_eq!(VoteState::None.toggle(VoteDirection::Up), VoteState::Up);
	/// assert_eq!(VoteState::Up.toggle(VoteDirection::Up), VoteState::None);
	/// assert_eq!(VoteState::Down.toggle(VoteDirection::Up), VoteState::Up);
	/// ```
	pub fn toggle(self, direction: VoteDirection) -> Self {
		match (self, direction) {
			(VoteState::Up, VoteDirection::Up) | (VoteState::Down, VoteDirection::Down) => {
				VoteState::None
			}
			(_, VoteDirection::Up) => VoteState::Up,
			(_, VoteDirection::Down) => VoteState::Down,
		}
	}

	pub fn is_up(self) -> bool {
		self == VoteState::Up
	}

	pub fn is_down(self) -> bool {
		self == VoteState::Down
	}
}

/// Result of a cast: the transition and the target's recounted totals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VoteOutcome {
	pub previous: VoteState,
	pub current: VoteState,
	pub upvotes: i64,
	pub downvotes: i64,
}

#[derive(Clone, Debug)]
pub struct VoteEngine {
	db: DatabaseConnection,
}

impl VoteEngine {
	pub fn new(db: DatabaseConnection) -> Self {
		Self { db }
	}

	pub async fn cast_upvote<V: Votable>(&self, voter_id: i64, target_id: i64) -> Result<VoteOutcome> {
		self.cast::<V>(voter_id, target_id, VoteDirection::Up).await
	}

	pub async fn cast_downvote<V: Votable>(&self, voter_id: i64, target_id: i64) -> Result<VoteOutcome> {
		self.cast::<V>(voter_id, target_id, VoteDirection::Down).await
	}

	/// Apply one cast. A missing target is `NotFound` and nothing is written.
	pub async fn cast<V: Votable>(
		&self,
		voter_id: i64,
		target_id: i64,
		direction: VoteDirection,
	) -> Result<VoteOutcome> {
		let mut tx = TransactionScope::begin_immediate(&self.db).await?;

		if !target_exists::<V>(tx.connection()?, target_id).await? {
			tx.rollback().await?;
			return Err(Error::NotFound(format!("{} {}", V::KIND, target_id)));
		}

		let previous = read_state::<V>(tx.connection()?, voter_id, target_id).await?;
		let current = previous.toggle(direction);
		match current {
			VoteState::None => delete_vote::<V>(tx.connection()?, voter_id, target_id).await?,
			VoteState::Up | VoteState::Down => {
				upsert_vote::<V>(tx.connection()?, voter_id, target_id, direction).await?
			}
		}
		let (upvotes, downvotes) = recount::<V>(tx.connection()?, target_id).await?;
		tx.commit().await?;

		tracing::info!(
			kind = V::KIND,
			target_id,
			voter_id,
			?previous,
			?current,
			upvotes,
			downvotes,
			"vote toggled"
		);

		Ok(VoteOutcome {
			previous,
			current,
			upvotes,
			downvotes,
		})
	}

	/// Current state without changing anything
	pub async fn vote_state<V: Votable>(&self, voter_id: i64, target_id: i64) -> Result<VoteState> {
		let sql = state_query::<V>(voter_id, target_id);
		let row = self.db.fetch_optional(&sql).await?;
		Ok(VoteState::from_stored(
			row.map(|r| r.try_get::<i64, _>(V::VOTE_VALUE.unquoted())).transpose()?,
		))
	}

	/// States of `voter_id` on each of `target_ids`; targets without a vote are absent
	pub async fn states_for<V: Votable>(
		&self,
		voter_id: i64,
		target_ids: &[i64],
	) -> Result<HashMap<i64, VoteState>> {
		if target_ids.is_empty() {
			return Ok(HashMap::new());
		}
		let sql = Query::select()
			.columns([V::VOTE_TARGET, V::VOTE_VALUE])
			.from(V::VOTE_TABLE)
			.and_where(Expr::col(V::VOTER).eq(voter_id))
			.and_where(Expr::col(V::VOTE_TARGET).is_in(target_ids.iter().copied()))
			.to_string(SqliteQueryBuilder);

		self.db
			.fetch_all(&sql)
			.await?
			.iter()
			.map(|row| {
				let target: i64 = row.try_get(V::VOTE_TARGET.unquoted())?;
				let vote: i64 = row.try_get(V::VOTE_VALUE.unquoted())?;
				Ok((target, VoteState::from_stored(Some(vote))))
			})
			.collect()
	}
}

async fn target_exists<V: Votable>(conn: &mut SqliteConnection, target_id: i64) -> Result<bool> {
	let sql = Query::select()
		.column(V::TARGET_ID)
		.from(V::TARGET_TABLE)
		.and_where(Expr::col(V::TARGET_ID).eq(target_id))
		.to_string(SqliteQueryBuilder);
	Ok(sqlx::query(&sql).fetch_optional(conn).await?.is_some())
}

fn state_query<V: Votable>(voter_id: i64, target_id: i64) -> String {
	Query::select()
		.column(V::VOTE_VALUE)
		.from(V::VOTE_TABLE)
		.and_where(Expr::col(V::VOTER).eq(voter_id))
		.and_where(Expr::col(V::VOTE_TARGET).eq(target_id))
		.to_string(SqliteQueryBuilder)
}

async fn read_state<V: Votable>(
	conn: &mut SqliteConnection,
	voter_id: i64,
	target_id: i64,
) -> Result<VoteState> {
	let sql = state_query::<V>(voter_id, target_id);
	let row = sqlx::query(&sql).fetch_optional(conn).await?;
	Ok(VoteState::from_stored(
		row.map(|r| r.try_get::<i64, _>(V::VOTE_VALUE.unquoted())).transpose()?,
	))
}

async fn delete_vote<V: Votable>(conn: &mut SqliteConnection, voter_id: i64, target_id: i64) -> Result<()> {
	let sql = Query::delete()
		.from_table(V::VOTE_TABLE)
		.and_where(Expr::col(V::VOTER).eq(voter_id))
		.and_where(Expr::col(V::VOTE_TARGET).eq(target_id))
		.to_string(SqliteQueryBuilder);
	sqlx::query(&sql).execute(conn).await?;
	Ok(())
}

/// Insert or overwrite the (voter, target) row
async fn upsert_vote<V: Votable>(
	conn: &mut SqliteConnection,
	voter_id: i64,
	target_id: i64,
	direction: VoteDirection,
) -> Result<()> {
	let sql = Query::insert()
		.into_table(V::VOTE_TABLE)
		.columns([V::VOTER, V::VOTE_TARGET, V::VOTE_VALUE])
		.values_panic([voter_id.into(), target_id.into(), direction.value().into()])
		.on_conflict(
			OnConflict::columns([V::VOTER, V::VOTE_TARGET])
				.update_column(V::VOTE_VALUE)
				.to_owned(),
		)
		.to_string(SqliteQueryBuilder);
	sqlx::query(&sql).execute(conn).await?;
	Ok(())
}

/// Rewrite the target's counters from its vote rows and return them
async fn recount<V: Votable>(conn: &mut SqliteConnection, target_id: i64) -> Result<(i64, i64)> {
	let count = |vote: i64| {
		Expr::cust(format!(
			"(SELECT COUNT(*) FROM \"{}\" WHERE \"{}\" = {} AND \"{}\" = {})",
			V::VOTE_TABLE.unquoted(),
			V::VOTE_TARGET.unquoted(),
			target_id,
			V::VOTE_VALUE.unquoted(),
			vote
		))
	};
	let update = Query::update()
		.table(V::TARGET_TABLE)
		.value(V::UPVOTES, count(1))
		.value(V::DOWNVOTES, count(-1))
		.and_where(Expr::col(V::TARGET_ID).eq(target_id))
		.to_string(SqliteQueryBuilder);
	sqlx::query(&update).execute(&mut *conn).await?;

	let select = Query::select()
		.columns([V::UPVOTES, V::DOWNVOTES])
		.from(V::TARGET_TABLE)
		.and_where(Expr::col(V::TARGET_ID).eq(target_id))
		.to_string(SqliteQueryBuilder);
	let row = sqlx::query(&select).fetch_one(&mut *conn).await?;
	Ok((
		row.try_get(V::UPVOTES.unquoted())?,
		row.try_get(V::DOWNVOTES.unquoted())?,
	))
}
