//! Submitted input for questions and responses.
//!
//! Forms are built from [`FormData`], trimmed, then checked with
//! `validator`. Failures come back as [`Error::Validation`] keyed by field.

use crate::models::TAG_NAME_MAX_LENGTH;
use forum_core::exception::{Error, FieldErrors, Result};
use forum_http::FormData;
use serde::Serialize;
use validator::{Validate, ValidationError, ValidationErrors};

const REQUIRED: &str = "This field is required.";

/// Title, description and tag names of a question
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Validate)]
pub struct QuestionForm {
	#[validate(length(min = 1, max = 200))]
	pub title: String,

	#[validate(length(min = 1, max = 600))]
	pub description: String,

	#[validate(length(min = 1))]
	pub tags: Vec<String>,
}

impl QuestionForm {
	pub fn new(
		title: impl Into<String>,
		description: impl Into<String>,
		tags: impl IntoIterator<Item = impl Into<String>>,
	) -> Self {
		Self {
			title: title.into().trim().to_string(),
			description: description.into().trim().to_string(),
			tags: normalize_tags(tags.into_iter().map(Into::into)),
		}
	}

	/// Read `title`, `description` and `tags` from a submission.
	///
	/// Tags come from repeated `tags` fields; a single value is also split on
	/// commas.
	pub fn from_form_data(form: &FormData) -> Self {
		let raw = form.get_all("tags");
		let tags: Vec<String> = match raw.as_slice() {
			[single] => single.split(',').map(str::to_string).collect(),
			many => many.iter().map(|t| t.to_string()).collect(),
		};
		Self::new(
			form.get("title").unwrap_or_default(),
			form.get("description").unwrap_or_default(),
			tags,
		)
	}

	/// Validate every field, collecting all failures
	pub fn clean(&self) -> Result<()> {
		let mut errors = match self.validate() {
			Ok(()) => FieldErrors::new(),
			Err(e) => field_errors(&e),
		};
		if let Some(tag) = self
			.tags
			.iter()
			.find(|t| t.chars().count() as u64 > TAG_NAME_MAX_LENGTH)
		{
			errors.add(
				"tags",
				format!(
					"Tag '{}' is longer than {} characters.",
					tag, TAG_NAME_MAX_LENGTH
				),
			);
		}
		errors.into_result()
	}
}

/// Content of a response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Validate)]
pub struct ResponseForm {
	#[validate(length(min = 1, max = 600))]
	pub content: String,
}

impl ResponseForm {
	pub fn new(content: impl Into<String>) -> Self {
		Self {
			content: content.into().trim().to_string(),
		}
	}

	pub fn from_form_data(form: &FormData) -> Self {
		Self::new(form.get("content").unwrap_or_default())
	}

	pub fn clean(&self) -> Result<()> {
		self.validate().map_err(|e| Error::Validation(field_errors(&e)))
	}
}

/// Trim, drop blanks and duplicates, keep first-seen order
fn normalize_tags(tags: impl Iterator<Item = String>) -> Vec<String> {
	let mut seen: Vec<String> = Vec::new();
	for tag in tags {
		let tag = tag.trim();
		if !tag.is_empty() && !seen.iter().any(|t| t == tag) {
			seen.push(tag.to_string());
		}
	}
	seen
}

fn field_errors(errors: &ValidationErrors) -> FieldErrors {
	let mut fields = FieldErrors::new();
	for (field, failures) in errors.field_errors() {
		for failure in failures.iter() {
			fields.add(field.to_string(), describe(failure));
		}
	}
	fields
}

fn describe(error: &ValidationError) -> String {
	if let Some(message) = &error.message {
		return message.to_string();
	}
	if error.code != "length" {
		return format!("Invalid value ({}).", error.code);
	}

	let max = error.params.get("max").and_then(|v| v.as_u64());
	let length = match error.params.get("value") {
		Some(serde_json::Value::String(s)) => s.chars().count() as u64,
		Some(serde_json::Value::Array(items)) => items.len() as u64,
		_ => 0,
	};
	match max {
		Some(max) if length > max => format!(
			"Ensure this value has at most {} characters (it has {}).",
			max, length
		),
		_ => REQUIRED.to_string(),
	}
}
