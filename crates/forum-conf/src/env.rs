//! Environment variable handling
//!
//! Typed lookups with an optional prefix. The variable source is either the
//! process environment or a fixed map, which keeps tests away from `set_var`.

use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Clone)]
enum Source {
	Process,
	Fixed(HashMap<String, String>),
}

/// Environment variable reader with prefix support
#[derive(Debug, Clone)]
pub struct Env {
	/// Optional prefix for environment variables (e.g., "FORUM_")
	pub prefix: Option<String>,
	source: Source,
}

impl Env {
	/// Read from the process environment
	pub fn new() -> Self {
		Self {
			prefix: None,
			source: Source::Process,
		}
	}

	/// Read from a fixed set of variables instead of the process environment
	pub fn from_pairs<I, K, V>(pairs: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		Self {
			prefix: None,
			source: Source::Fixed(
				pairs
					.into_iter()
					.map(|(k, v)| (k.into(), v.into()))
					.collect(),
			),
		}
	}

	/// Set a prefix for all lookups
	pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.prefix = Some(prefix.into());
		self
	}

	fn get_key_name(&self, key: &str) -> String {
		match &self.prefix {
			Some(prefix) => format!("{}{}", prefix, key),
			None => key.to_string(),
		}
	}

	fn lookup(&self, key: &str) -> Result<(String, Option<String>), EnvError> {
		let full_key = self.get_key_name(key);
		validate_env_var_name(&full_key)?;

		let value = match &self.source {
			Source::Process => std::env::var(&full_key).ok(),
			Source::Fixed(map) => map.get(&full_key).cloned(),
		};
		Ok((full_key, value))
	}

	/// Read a string value, `None` when unset
	pub fn str_opt(&self, key: &str) -> Result<Option<String>, EnvError> {
		Ok(self.lookup(key)?.1)
	}

	/// Read a string value with a default
	pub fn str_with_default(&self, key: &str, default: Option<&str>) -> Result<String, EnvError> {
		match self.lookup(key)? {
			(_, Some(val)) => Ok(val),
			(full_key, None) => default
				.map(str::to_string)
				.ok_or(EnvError::MissingVariable(full_key)),
		}
	}

	/// Read a boolean value, `None` when unset
	pub fn bool_opt(&self, key: &str) -> Result<Option<bool>, EnvError> {
		match self.lookup(key)? {
			(full_key, Some(val)) => parse_bool(&val)
				.map(Some)
				.map_err(|error| EnvError::ParseError {
					key: full_key,
					value_len: val.len(),
					error,
				}),
			(_, None) => Ok(None),
		}
	}

	/// Read an integer value, `None` when unset
	pub fn int_opt(&self, key: &str) -> Result<Option<i64>, EnvError> {
		match self.lookup(key)? {
			(full_key, Some(val)) => {
				val.trim()
					.parse::<i64>()
					.map(Some)
					.map_err(|e| EnvError::ParseError {
						key: full_key,
						value_len: val.len(),
						error: e.to_string(),
					})
			}
			(_, None) => Ok(None),
		}
	}

	/// Read a path value, `None` when unset
	pub fn path_opt(&self, key: &str) -> Result<Option<PathBuf>, EnvError> {
		Ok(self.lookup(key)?.1.map(PathBuf::from))
	}
}

impl Default for Env {
	fn default() -> Self {
		Self::new()
	}
}

/// Parse the usual spellings of a boolean flag.
pub fn parse_bool(value: &str) -> Result<bool, String> {
	match value.trim().to_ascii_lowercase().as_str() {
		"true" | "1" | "yes" | "on" | "y" => Ok(true),
		"false" | "0" | "no" | "off" | "n" | "" => Ok(false),
		other => Err(format!("not a boolean: '{}'", other)),
	}
}

/// Rejects names that are empty, contain control characters, or contain `=`.
pub fn validate_env_var_name(name: &str) -> Result<(), EnvError> {
	if name.is_empty() {
		return Err(EnvError::InvalidVariableName {
			name: name.to_string(),
			reason: "environment variable name must not be empty".to_string(),
		});
	}

	if let Some(pos) = name.find(|c: char| c.is_control()) {
		return Err(EnvError::InvalidVariableName {
			name: name.to_string(),
			reason: format!(
				"environment variable name contains control character at position {}",
				pos
			),
		});
	}

	if name.contains('=') {
		return Err(EnvError::InvalidVariableName {
			name: name.to_string(),
			reason: "environment variable name must not contain '='".to_string(),
		});
	}

	Ok(())
}

/// Environment variable errors
#[derive(Debug, thiserror::Error)]
pub enum EnvError {
	#[error("Missing environment variable: {0}")]
	MissingVariable(String),

	#[error("Failed to parse environment variable '{key}' (value length: {value_len}): {error}")]
	ParseError {
		key: String,
		/// Length of the original value, kept instead of the raw value
		value_len: usize,
		error: String,
	},

	#[error("Invalid environment variable name '{name}': {reason}")]
	InvalidVariableName { name: String, reason: String },
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_prefixed_lookup() {
		let env = Env::from_pairs([("FORUM_DEBUG", "true")]).with_prefix("FORUM_");

		assert_eq!(env.bool_opt("DEBUG").unwrap(), Some(true));
		assert_eq!(env.bool_opt("MISSING").unwrap(), None);
	}

	#[rstest]
	fn test_str_with_default() {
		let env = Env::from_pairs(Vec::<(String, String)>::new());

		assert_eq!(
			env.str_with_default("NONEXISTENT", Some("default")).unwrap(),
			"default"
		);
		assert!(matches!(
			env.str_with_default("NONEXISTENT", None),
			Err(EnvError::MissingVariable(_))
		));
	}

	#[rstest]
	#[case("true", true)]
	#[case("1", true)]
	#[case("Yes", true)]
	#[case("off", false)]
	#[case("0", false)]
	fn test_parse_bool(#[case] input: &str, #[case] expected: bool) {
		assert_eq!(parse_bool(input).unwrap(), expected);
	}

	#[rstest]
	fn test_int_parse_error_hides_value() {
		let env = Env::from_pairs([("PORT", "eighty")]);

		let error = env.int_opt("PORT").unwrap_err();

		let message = error.to_string();
		assert!(message.contains("PORT"));
		assert!(!message.contains("eighty"));
	}

	#[rstest]
	#[case("")]
	#[case("BAD=NAME")]
	#[case("BAD\nNAME")]
	fn test_invalid_names_rejected(#[case] name: &str) {
		assert!(validate_env_var_name(name).is_err());
	}
}
