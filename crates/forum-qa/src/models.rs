//! Table identifiers, stored rows and the read projections served to clients.

use chrono::{DateTime, Utc};
use forum_core::exception::Result;
use forum_db::timestamp::from_millis;
use sea_query::Iden;
use serde::Serialize;
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

#[derive(Iden)]
pub enum Tags {
	Table,
	Id,
	Name,
}

#[derive(Iden)]
pub enum Questions {
	Table,
	Id,
	Title,
	Description,
	QuestionerId,
	Upvotes,
	Downvotes,
	CreatedAt,
	UpdatedAt,
	Slug,
}

#[derive(Iden)]
pub enum QuestionTags {
	Table,
	QuestionId,
	TagId,
}

#[derive(Iden)]
pub enum Responses {
	Table,
	Id,
	Content,
	RespondentId,
	QuestionId,
	Upvotes,
	Downvotes,
	CreatedAt,
	UpdatedAt,
}

#[derive(Iden)]
pub enum QuestionVotes {
	Table,
	UserId,
	QuestionId,
	Vote,
}

#[derive(Iden)]
pub enum ResponseVotes {
	Table,
	UserId,
	ResponseId,
	Vote,
}

/// Maximum lengths enforced on submitted fields
pub const TITLE_MAX_LENGTH: u64 = 200;
pub const DESCRIPTION_MAX_LENGTH: u64 = 600;
pub const CONTENT_MAX_LENGTH: u64 = 600;
pub const TAG_NAME_MAX_LENGTH: u64 = 40;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tag {
	pub id: i64,
	pub name: String,
}

impl Tag {
	pub(crate) fn from_row(row: &SqliteRow) -> Result<Self> {
		Ok(Self {
			id: row.try_get("id")?,
			name: row.try_get("name")?,
		})
	}
}

/// A stored question with its tag set
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Question {
	pub id: i64,
	pub title: String,
	pub description: String,
	pub questioner_id: i64,
	pub upvotes: i64,
	pub downvotes: i64,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
	pub slug: String,
	pub tags: Vec<Tag>,
}

impl Question {
	/// Columns read by [`Question::from_row`]
	pub(crate) const COLUMNS: [Questions; 9] = [
		Questions::Id,
		Questions::Title,
		Questions::Description,
		Questions::QuestionerId,
		Questions::Upvotes,
		Questions::Downvotes,
		Questions::CreatedAt,
		Questions::UpdatedAt,
		Questions::Slug,
	];

	/// Tags are loaded separately and start empty
	pub(crate) fn from_row(row: &SqliteRow) -> Result<Self> {
		Ok(Self {
			id: row.try_get("id")?,
			title: row.try_get("title")?,
			description: row.try_get("description")?,
			questioner_id: row.try_get("questioner_id")?,
			upvotes: row.try_get("upvotes")?,
			downvotes: row.try_get("downvotes")?,
			created_at: from_millis(row.try_get("created_at")?),
			updated_at: from_millis(row.try_get("updated_at")?),
			slug: row.try_get("slug")?,
			tags: Vec::new(),
		})
	}

	pub fn tag_names(&self) -> Vec<&str> {
		self.tags.iter().map(|t| t.name.as_str()).collect()
	}
}

/// A stored response to a question
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Response {
	pub id: i64,
	pub content: String,
	pub respondent_id: i64,
	pub question_id: i64,
	pub upvotes: i64,
	pub downvotes: i64,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl Response {
	pub(crate) const COLUMNS: [Responses; 8] = [
		Responses::Id,
		Responses::Content,
		Responses::RespondentId,
		Responses::QuestionId,
		Responses::Upvotes,
		Responses::Downvotes,
		Responses::CreatedAt,
		Responses::UpdatedAt,
	];

	pub(crate) fn from_row(row: &SqliteRow) -> Result<Self> {
		Ok(Self {
			id: row.try_get("id")?,
			content: row.try_get("content")?,
			respondent_id: row.try_get("respondent_id")?,
			question_id: row.try_get("question_id")?,
			upvotes: row.try_get("upvotes")?,
			downvotes: row.try_get("downvotes")?,
			created_at: from_millis(row.try_get("created_at")?),
			updated_at: from_millis(row.try_get("updated_at")?),
		})
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorRef {
	pub id: i64,
	pub username: String,
}

/// A question as listed to a viewer.
///
/// `viewer_upvoted` and `viewer_downvoted` are only present for an
/// authenticated viewer and at most one of them is true.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionView {
	pub id: i64,
	pub title: String,
	pub description: String,
	pub slug: String,
	pub questioner: AuthorRef,
	pub upvotes: i64,
	pub downvotes: i64,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
	pub tags: Vec<Tag>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub viewer_upvoted: Option<bool>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub viewer_downvoted: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResponseView {
	pub id: i64,
	pub content: String,
	pub question_id: i64,
	pub respondent: AuthorRef,
	pub upvotes: i64,
	pub downvotes: i64,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub viewer_upvoted: Option<bool>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub viewer_downvoted: Option<bool>,
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	fn view(viewer_upvoted: Option<bool>, viewer_downvoted: Option<bool>) -> QuestionView {
		QuestionView {
			id: 1,
			title: "Borrowing".to_string(),
			description: "How?".to_string(),
			slug: "borrowing-12345678".to_string(),
			questioner: AuthorRef {
				id: 1,
				username: "alice".to_string(),
			},
			upvotes: 0,
			downvotes: 0,
			created_at: from_millis(0),
			updated_at: from_millis(0),
			tags: vec![],
			viewer_upvoted,
			viewer_downvoted,
		}
	}

	#[rstest]
	fn test_anonymous_view_omits_viewer_fields() {
		let json = serde_json::to_value(view(None, None)).unwrap();

		assert!(json.get("viewer_upvoted").is_none());
		assert!(json.get("viewer_downvoted").is_none());
	}

	#[rstest]
	fn test_authenticated_view_carries_viewer_fields() {
		let json = serde_json::to_value(view(Some(true), Some(false))).unwrap();

		assert_eq!(json["viewer_upvoted"], true);
		assert_eq!(json["viewer_downvoted"], false);
	}
}
