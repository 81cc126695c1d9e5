//! Error taxonomy for the forum.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Field name to list of messages, in stable field order.
///
/// # Examples
///
/// ```
/// use forum_core::FieldErrors;
///
/// let mut errors = FieldErrors::new();
/// errors.add("title", "This field is required.");
/// assert!(errors.contains("title"));
/// assert_eq!(errors.len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
	pub fn new() -> Self {
		Self::default()
	}

	/// Append a message for `field`.
	pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
		self.0.entry(field.into()).or_default().push(message.into());
	}

	pub fn contains(&self, field: &str) -> bool {
		self.0.contains_key(field)
	}

	pub fn get(&self, field: &str) -> Option<&[String]> {
		self.0.get(field).map(Vec::as_slice)
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
		self.0.iter()
	}

	/// Turn the collected messages into a result: `Ok` when nothing was recorded.
	pub fn into_result(self) -> Result<()> {
		if self.is_empty() {
			Ok(())
		} else {
			Err(Error::Validation(self))
		}
	}
}

impl fmt::Display for FieldErrors {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let mut first = true;
		for (field, messages) in &self.0 {
			if !first {
				write!(f, "; ")?;
			}
			first = false;
			write!(f, "{}: {}", field, messages.join(" "))?;
		}
		Ok(())
	}
}

/// Every failure a forum operation can report.
#[derive(Debug, Error)]
pub enum Error {
	#[error("Not found: {0}")]
	NotFound(String),

	#[error("Forbidden: {0}")]
	Forbidden(String),

	#[error("Validation failed: {0}")]
	Validation(FieldErrors),

	#[error("Authentication required: {0}")]
	Unauthenticated(String),

	#[error("Method not allowed: {0}")]
	MethodNotAllowed(String),

	#[error("Bad request: {0}")]
	BadRequest(String),

	#[error("Conflict: {0}")]
	Conflict(String),

	#[error("Database error: {0}")]
	Database(String),

	#[error("Serialization error: {0}")]
	Serialization(String),

	#[error("Configuration error: {0}")]
	Configuration(String),

	#[error("Internal error: {0}")]
	Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
	/// HTTP status code this error is reported with.
	pub fn status_code(&self) -> u16 {
		match self {
			Error::NotFound(_) => 404,
			Error::Forbidden(_) => 403,
			Error::Validation(_) | Error::BadRequest(_) => 400,
			Error::Unauthenticated(_) => 401,
			Error::MethodNotAllowed(_) => 405,
			Error::Conflict(_) => 409,
			Error::Database(_)
			| Error::Serialization(_)
			| Error::Configuration(_)
			| Error::Internal(_) => 500,
		}
	}

	pub fn is_server_error(&self) -> bool {
		self.status_code() >= 500
	}

	/// Message safe to show to a client. Server-side details stay in the logs.
	pub fn public_message(&self) -> String {
		if self.is_server_error() {
			"Internal server error".to_string()
		} else {
			self.to_string()
		}
	}
}

impl From<sqlx::Error> for Error {
	fn from(error: sqlx::Error) -> Self {
		match error {
			sqlx::Error::RowNotFound => Error::NotFound("row not found".to_string()),
			other => Error::Database(other.to_string()),
		}
	}
}

impl From<serde_json::Error> for Error {
	fn from(error: serde_json::Error) -> Self {
		Error::Serialization(error.to_string())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case(Error::NotFound("question".into()), 404)]
	#[case(Error::Forbidden("owner only".into()), 403)]
	#[case(Error::Validation(FieldErrors::new()), 400)]
	#[case(Error::BadRequest("bad body".into()), 400)]
	#[case(Error::Unauthenticated("login".into()), 401)]
	#[case(Error::MethodNotAllowed("GET".into()), 405)]
	#[case(Error::Conflict("slug".into()), 409)]
	#[case(Error::Database("locked".into()), 500)]
	fn test_status_codes(#[case] error: Error, #[case] expected: u16) {
		assert_eq!(error.status_code(), expected);
	}

	#[rstest]
	fn test_public_message_hides_database_details() {
		let error = Error::Database("no such table: questions".to_string());

		assert_eq!(error.public_message(), "Internal server error");
	}

	#[rstest]
	fn test_public_message_keeps_client_errors() {
		let error = Error::Forbidden("You are not allowed to edit this question.".to_string());

		assert!(error.public_message().contains("not allowed"));
	}

	#[rstest]
	fn test_field_errors_collects_messages_per_field() {
		let mut errors = FieldErrors::new();
		errors.add("title", "This field is required.");
		errors.add("title", "Too short.");
		errors.add("description", "Too long.");

		assert_eq!(errors.len(), 2);
		assert_eq!(errors.get("title").map(<[String]>::len), Some(2));
		assert_eq!(
			errors.to_string(),
			"description: Too long.; title: This field is required. Too short."
		);
	}

	#[rstest]
	fn test_into_result() {
		assert!(FieldErrors::new().into_result().is_ok());

		let mut errors = FieldErrors::new();
		errors.add("content", "This field is required.");
		assert!(matches!(errors.into_result(), Err(Error::Validation(_))));
	}

	#[rstest]
	fn test_row_not_found_maps_to_not_found() {
		let error: Error = sqlx::Error::RowNotFound.into();

		assert_eq!(error.status_code(), 404);
	}
}
