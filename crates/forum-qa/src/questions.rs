//! Creating, editing and deleting questions.

use crate::forms::QuestionForm;
use crate::models::{Question, Questions, Tag};
use crate::tags::{self, TagManager};
use forum_auth::User;
use forum_core::exception::{Error, Result};
use forum_db::timestamp::{from_millis, now_millis};
use forum_db::{DatabaseConnection, TransactionScope, is_unique_violation};
use rand::Rng;
use sea_query::{Expr, ExprTrait, Query, SqliteQueryBuilder};
use sqlx::SqliteConnection;

/// Attempts at a unique slug before giving up with `Conflict`
pub const DEFAULT_SLUG_RETRY_ATTEMPTS: u32 = 5;

const SLUG_SUFFIX_MIN: u32 = 11_111_111;
const SLUG_SUFFIX_MAX: u32 = 99_999_999;

/// `slugify(title)-NNNNNNNN` with a random eight digit suffix.
///
/// A title with nothing to slugify yields `-NNNNNNNN`.
///
/// # Examples
///
/// ```
/// use forum_qa::questions::generate_slug;
///
/// let slug = generate_slug("How do lifetimes work?");
///
/// assert!(slug.starts_with("how-do-lifetimes-work-"));
/// assert_eq!(slug.len(), "how-do-lifetimes-work-".len() + 8);
/// ```
pub fn generate_slug(title: &str) -> String {
	let suffix = rand::thread_rng().gen_range(SLUG_SUFFIX_MIN..=SLUG_SUFFIX_MAX);
	format!("{}-{}", slug::slugify(title), suffix)
}

#[derive(Clone, Debug)]
pub struct QuestionManager {
	db: DatabaseConnection,
	tags: TagManager,
	slug_retry_attempts: u32,
	slug_generator: fn(&str) -> String,
}

impl QuestionManager {
	pub fn new(db: DatabaseConnection) -> Self {
		Self {
			tags: TagManager::new(db.clone()),
			db,
			slug_retry_attempts: DEFAULT_SLUG_RETRY_ATTEMPTS,
			slug_generator: generate_slug,
		}
	}

	pub fn with_slug_retry_attempts(mut self, attempts: u32) -> Self {
		self.slug_retry_attempts = Ord::max(attempts, 1);
		self
	}

	#[cfg(test)]
	fn with_slug_generator(mut self, generator: fn(&str) -> String) -> Self {
		self.slug_generator = generator;
		self
	}

	pub async fn get(&self, id: i64) -> Result<Option<Question>> {
		let sql = select()
			.and_where(Expr::col(Questions::Id).eq(id))
			.to_string(SqliteQueryBuilder);
		match self.db.fetch_optional(&sql).await? {
			Some(row) => Ok(Some(self.with_tags(Question::from_row(&row)?).await?)),
			None => Ok(None),
		}
	}

	pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Question>> {
		let sql = select()
			.and_where(Expr::col(Questions::Slug).eq(slug))
			.to_string(SqliteQueryBuilder);
		match self.db.fetch_optional(&sql).await? {
			Some(row) => Ok(Some(self.with_tags(Question::from_row(&row)?).await?)),
			None => Ok(None),
		}
	}

	async fn with_tags(&self, mut question: Question) -> Result<Question> {
		question.tags = self
			.tags
			.for_questions(&[question.id])
			.await?
			.remove(&question.id)
			.unwrap_or_default();
		Ok(question)
	}

	/// Store a new question by `author` with a fresh slug.
	///
	/// Tags are created on first use. A slug collision is retried with a new
	/// suffix; persistent collisions end in `Conflict`.
	pub async fn create(&self, author: &User, form: &QuestionForm) -> Result<Question> {
		form.clean()?;

		let mut tx = TransactionScope::begin_immediate(&self.db).await?;
		let result = self.insert(&mut tx, author, form).await;
		let question = tx.complete(result).await?;

		tracing::info!(
			question_id = question.id,
			slug = %question.slug,
			author = %author.username,
			"question created"
		);
		Ok(question)
	}

	async fn insert(
		&self,
		tx: &mut TransactionScope,
		author: &User,
		form: &QuestionForm,
	) -> Result<Question> {
		let mut tags = tags::get_or_create_all(tx.connection()?, &form.tags).await?;
		let now = now_millis();

		let mut attempt = 0;
		let (id, slug) = loop {
			attempt += 1;
			let slug = (self.slug_generator)(&form.title);
			let sql = Query::insert()
				.into_table(Questions::Table)
				.columns([
					Questions::Title,
					Questions::Description,
					Questions::QuestionerId,
					Questions::CreatedAt,
					Questions::UpdatedAt,
					Questions::Slug,
				])
				.values_panic([
					form.title.as_str().into(),
					form.description.as_str().into(),
					author.id.into(),
					now.into(),
					now.into(),
					slug.as_str().into(),
				])
				.to_string(SqliteQueryBuilder);

			match sqlx::query(&sql).execute(tx.connection()?).await {
				Ok(done) => break (done.last_insert_rowid(), slug),
				Err(e) if is_unique_violation(&e) => {
					if attempt >= self.slug_retry_attempts {
						return Err(Error::Conflict(format!(
							"no unique slug for '{}' after {} attempts",
							form.title, attempt
						)));
					}
					tracing::warn!(%slug, attempt, "slug collision, retrying");
				}
				Err(e) => return Err(e.into()),
			}
		};

		tags::set_question_tags(tx.connection()?, id, &tags).await?;
		tags.sort_by(|a, b| a.name.cmp(&b.name));

		Ok(Question {
			id,
			title: form.title.clone(),
			description: form.description.clone(),
			questioner_id: author.id,
			upvotes: 0,
			downvotes: 0,
			created_at: from_millis(now),
			updated_at: from_millis(now),
			slug,
			tags,
		})
	}

	/// Replace title, description and tags of the question at `slug`.
	///
	/// Only the questioner may edit. The slug never changes.
	pub async fn update(&self, editor: &User, slug: &str, form: &QuestionForm) -> Result<Question> {
		let mut tx = TransactionScope::begin_immediate(&self.db).await?;
		let result = self.apply_update(&mut tx, editor, slug, form).await;
		let question = tx.complete(result).await?;

		tracing::info!(question_id = question.id, %slug, editor = %editor.username, "question updated");
		Ok(question)
	}

	async fn apply_update(
		&self,
		tx: &mut TransactionScope,
		editor: &User,
		slug: &str,
		form: &QuestionForm,
	) -> Result<Question> {
		let mut question = owned_question(tx.connection()?, editor, slug, "edit").await?;
		form.clean()?;

		let now = now_millis();
		let sql = Query::update()
			.table(Questions::Table)
			.value(Questions::Title, form.title.as_str())
			.value(Questions::Description, form.description.as_str())
			.value(Questions::UpdatedAt, now)
			.and_where(Expr::col(Questions::Id).eq(question.id))
			.to_string(SqliteQueryBuilder);
		sqlx::query(&sql).execute(tx.connection()?).await?;

		let mut tags: Vec<Tag> = tags::get_or_create_all(tx.connection()?, &form.tags).await?;
		tags::set_question_tags(tx.connection()?, question.id, &tags).await?;
		tags.sort_by(|a, b| a.name.cmp(&b.name));

		question.title = form.title.clone();
		question.description = form.description.clone();
		question.updated_at = from_millis(now);
		question.tags = tags;
		Ok(question)
	}

	/// Delete the question at `slug` with its responses, votes and tag links.
	pub async fn delete(&self, editor: &User, slug: &str) -> Result<Question> {
		let mut tx = TransactionScope::begin_immediate(&self.db).await?;
		let result = async {
			let question = owned_question(tx.connection()?, editor, slug, "delete").await?;
			let sql = Query::delete()
				.from_table(Questions::Table)
				.and_where(Expr::col(Questions::Id).eq(question.id))
				.to_string(SqliteQueryBuilder);
			sqlx::query(&sql).execute(tx.connection()?).await?;
			Ok::<_, Error>(question)
		}
		.await;
		let question = tx.complete(result).await?;

		tracing::info!(question_id = question.id, %slug, editor = %editor.username, "question deleted");
		Ok(question)
	}
}

fn select() -> sea_query::SelectStatement {
	Query::select()
		.columns(Question::COLUMNS)
		.from(Questions::Table)
		.to_owned()
}

/// Load the question at `slug` for a change by `editor`: `NotFound` when
/// missing, `Forbidden` when `editor` did not ask it.
async fn owned_question(
	conn: &mut SqliteConnection,
	editor: &User,
	slug: &str,
	action: &str,
) -> Result<Question> {
	let sql = select()
		.and_where(Expr::col(Questions::Slug).eq(slug))
		.to_string(SqliteQueryBuilder);
	let row = sqlx::query(&sql)
		.fetch_optional(conn)
		.await?
		.ok_or_else(|| Error::NotFound(format!("question '{}'", slug)))?;
	let question = Question::from_row(&row)?;

	if question.questioner_id != editor.id {
		tracing::warn!(question_id = question.id, editor = %editor.username, action, "refused change by non-owner");
		return Err(Error::Forbidden(format!(
			"You are not allowed to {} this question.",
			action
		)));
	}
	Ok(question)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::test_support::{migrated_db, user};
	use rstest::rstest;
	use std::sync::atomic::{AtomicU32, Ordering};

	fn form(title: &str, tags: &[&str]) -> QuestionForm {
		QuestionForm::new(title, "Some details", tags.iter().copied())
	}

	#[rstest]
	fn test_slug_suffix_in_range() {
		for _ in 0..100 {
			let slug = generate_slug("Hello World");
			let (base, suffix) = slug.rsplit_once('-').unwrap();
			let suffix: u32 = suffix.parse().unwrap();

			assert_eq!(base, "hello-world");
			assert!((SLUG_SUFFIX_MIN..=SLUG_SUFFIX_MAX).contains(&suffix));
		}
	}

	#[rstest]
	fn test_slug_of_unsluggable_title() {
		let slug = generate_slug("???");

		let suffix = slug.strip_prefix('-').unwrap();
		assert_eq!(suffix.len(), 8);
		assert!(suffix.chars().all(|c| c.is_ascii_digit()));
	}

	#[rstest]
	#[tokio::test]
	async fn test_persistent_slug_collision_is_conflict() {
		// Arrange
		let db = migrated_db().await;
		let alice = user(&db, "alice").await;
		let manager = QuestionManager::new(db.clone())
			.with_slug_retry_attempts(3)
			.with_slug_generator(|_| "taken-12345678".to_string());
		let first = manager.create(&alice, &form("First", &["rust"])).await.unwrap();

		// Act
		let second = manager.create(&alice, &form("Second", &["fresh"])).await;

		// Assert
		assert_eq!(first.slug, "taken-12345678");
		assert!(matches!(second, Err(Error::Conflict(_))));
		let row = db
			.fetch_optional("SELECT COUNT(*) AS n FROM questions")
			.await
			.unwrap()
			.unwrap();
		assert_eq!(sqlx::Row::get::<i64, _>(&row, "n"), 1);
		assert!(TagManager::new(db).get_by_name("fresh").await.unwrap().is_none());
	}

	#[rstest]
	#[tokio::test]
	async fn test_slug_collision_retries_with_new_suffix() {
		static CALLS: AtomicU32 = AtomicU32::new(0);
		let db = migrated_db().await;
		let alice = user(&db, "alice").await;
		QuestionManager::new(db.clone())
			.with_slug_generator(|_| "same-11111111".to_string())
			.create(&alice, &form("Same", &["rust"]))
			.await
			.unwrap();
		let manager = QuestionManager::new(db).with_slug_generator(|_| {
			match CALLS.fetch_add(1, Ordering::SeqCst) {
				0 => "same-11111111".to_string(),
				_ => "same-22222222".to_string(),
			}
		});

		let created = manager.create(&alice, &form("Same", &["rust"])).await.unwrap();

		assert_eq!(created.slug, "same-22222222");
		assert_eq!(CALLS.load(Ordering::SeqCst), 2);
	}

	#[rstest]
	#[tokio::test]
	async fn test_create_then_fetch_by_slug() {
		// Arrange
		let db = migrated_db().await;
		let alice = user(&db, "alice").await;
		let manager = QuestionManager::new(db);

		// Act
		let created = manager.create(&alice, &form("Borrow checker", &["rust", "async"])).await.unwrap();
		let fetched = manager.get_by_slug(&created.slug).await.unwrap().unwrap();

		// Assert
		assert_eq!(fetched, created);
		assert_eq!(fetched.tag_names(), vec!["async", "rust"]);
		assert_eq!((fetched.upvotes, fetched.downvotes), (0, 0));
	}

	#[rstest]
	#[tokio::test]
	async fn test_create_rejects_invalid_form_without_writing() {
		let db = migrated_db().await;
		let alice = user(&db, "alice").await;
		let manager = QuestionManager::new(db.clone());

		let result = manager.create(&alice, &form("", &["rust"])).await;

		assert!(matches!(result, Err(Error::Validation(_))));
		assert!(TagManager::new(db).list().await.unwrap().is_empty());
	}

	#[rstest]
	#[tokio::test]
	async fn test_update_keeps_slug_and_replaces_tags() {
		let db = migrated_db().await;
		let alice = user(&db, "alice").await;
		let manager = QuestionManager::new(db);
		let created = manager.create(&alice, &form("Original", &["one", "two"])).await.unwrap();

		let updated = manager
			.update(&alice, &created.slug, &form("Renamed", &["three"]))
			.await
			.unwrap();

		assert_eq!(updated.slug, created.slug);
		assert_eq!(updated.title, "Renamed");
		assert_eq!(updated.tag_names(), vec!["three"]);
		assert!(updated.updated_at >= created.updated_at);
		let stored = manager.get(created.id).await.unwrap().unwrap();
		assert_eq!(stored.tag_names(), vec!["three"]);
	}

	#[rstest]
	#[tokio::test]
	async fn test_non_owner_cannot_update_or_delete() {
		// Arrange
		let db = migrated_db().await;
		let alice = user(&db, "alice").await;
		let mallory = user(&db, "mallory").await;
		let manager = QuestionManager::new(db);
		let created = manager.create(&alice, &form("Mine", &["rust"])).await.unwrap();

		// Act
		let update = manager.update(&mallory, &created.slug, &form("Hijacked", &["x"])).await;
		let delete = manager.delete(&mallory, &created.slug).await;

		// Assert
		assert!(matches!(update, Err(Error::Forbidden(_))));
		assert!(matches!(delete, Err(Error::Forbidden(_))));
		let stored = manager.get(created.id).await.unwrap().unwrap();
		assert_eq!(stored, created);
	}

	#[rstest]
	#[tokio::test]
	async fn test_missing_slug_is_not_found() {
		let db = migrated_db().await;
		let alice = user(&db, "alice").await;
		let manager = QuestionManager::new(db);

		assert!(matches!(
			manager.delete(&alice, "missing-12345678").await,
			Err(Error::NotFound(_))
		));
		assert!(manager.get_by_slug("missing-12345678").await.unwrap().is_none());
	}

	#[rstest]
	#[tokio::test]
	async fn test_forbidden_before_validation() {
		let db = migrated_db().await;
		let alice = user(&db, "alice").await;
		let bob = user(&db, "bob").await;
		let manager = QuestionManager::new(db);
		let created = manager.create(&alice, &form("Mine", &["rust"])).await.unwrap();

		let result = manager.update(&bob, &created.slug, &form("", &[])).await;

		assert!(matches!(result, Err(Error::Forbidden(_))));
	}
}
