//! Path pattern matching.

use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};
use std::collections::HashMap;

const MAX_PATTERN_LENGTH: usize = 1024;

const MAX_PATH_SEGMENTS: usize = 32;

const MAX_REGEX_SIZE: usize = 1 << 20; // 1 MiB

/// Characters escaped when a value is substituted into a path segment
const SEGMENT: &AsciiSet = &CONTROLS
	.add(b' ')
	.add(b'"')
	.add(b'#')
	.add(b'%')
	.add(b'/')
	.add(b'<')
	.add(b'>')
	.add(b'?')
	.add(b'`')
	.add(b'{')
	.add(b'}');

/// Errors raised while compiling a pattern
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatternError {
	#[error("pattern length {0} exceeds maximum of 1024 bytes")]
	TooLong(usize),

	#[error("pattern has {0} path segments, exceeding maximum of 32")]
	TooManySegments(usize),

	#[error("unknown converter '{0}'")]
	UnknownConverter(String),

	#[error("unterminated placeholder in '{0}'")]
	Unterminated(String),

	#[error("failed to compile pattern regex: {0}")]
	Regex(String),
}

/// A compiled route pattern such as `/question/{id:int}/upvote`.
///
/// # Examples
///
/// ```
/// use forum_urls::PathPattern;
///
/// let pattern = PathPattern::new("/question/{id:int}/upvote").unwrap();
///
/// let params = pattern.matches("/question/42/upvote/").unwrap();
/// assert_eq!(params.get("id"), Some(&"42".to_string()));
/// assert!(pattern.matches("/question/abc/upvote").is_none());
/// ```
#[derive(Debug, Clone)]
pub struct PathPattern {
	pattern: String,
	regex: regex::Regex,
	param_names: Vec<String>,
}

impl PathPattern {
	pub fn new(pattern: &str) -> Result<Self, PatternError> {
		if pattern.len() > MAX_PATTERN_LENGTH {
			return Err(PatternError::TooLong(pattern.len()));
		}

		let segment_count = pattern.split('/').count();
		if segment_count > MAX_PATH_SEGMENTS {
			return Err(PatternError::TooManySegments(segment_count));
		}

		let (regex_str, param_names) = Self::compile_pattern(pattern)?;

		let regex = regex::RegexBuilder::new(&regex_str)
			.size_limit(MAX_REGEX_SIZE)
			.build()
			.map_err(|e| PatternError::Regex(e.to_string()))?;

		Ok(Self {
			pattern: pattern.to_string(),
			regex,
			param_names,
		})
	}

	fn compile_pattern(pattern: &str) -> Result<(String, Vec<String>), PatternError> {
		let mut regex_str = String::from("^");
		let mut param_names = Vec::new();
		let mut chars = normalize(pattern).chars();

		while let Some(c) = chars.next() {
			match c {
				'{' => {
					let mut body = String::new();
					let mut closed = false;
					for next in chars.by_ref() {
						if next == '}' {
							closed = true;
							break;
						}
						body.push(next);
					}
					if !closed {
						return Err(PatternError::Unterminated(pattern.to_string()));
					}

					let (name, converter) = match body.split_once(':') {
						Some((name, converter)) => (name.to_string(), converter),
						None => (body.clone(), "str"),
					};
					let class = match converter {
						"str" => "[^/]+",
						"int" => "[0-9]+",
						"slug" => "[-a-zA-Z0-9_]+",
						other => return Err(PatternError::UnknownConverter(other.to_string())),
					};

					regex_str.push_str(&format!("(?P<{}>{})", name, class));
					param_names.push(name);
				}
				'.' | '+' | '*' | '?' | '(' | ')' | '[' | ']' | '^' | '$' | '|' | '\\' => {
					regex_str.push('\\');
					regex_str.push(c);
				}
				_ => regex_str.push(c),
			}
		}

		regex_str.push('$');
		Ok((regex_str, param_names))
	}

	pub fn pattern(&self) -> &str {
		&self.pattern
	}

	pub fn param_names(&self) -> &[String] {
		&self.param_names
	}

	/// Match `path`, returning the percent-decoded captured values
	pub fn matches(&self, path: &str) -> Option<HashMap<String, String>> {
		let caps = self.regex.captures(normalize(path))?;
		Some(
			self.param_names
				.iter()
				.filter_map(|name| {
					caps.name(name).map(|m| {
						let value = percent_decode_str(m.as_str()).decode_utf8_lossy();
						(name.clone(), value.into_owned())
					})
				})
				.collect(),
		)
	}

	pub fn is_match(&self, path: &str) -> bool {
		self.regex.is_match(normalize(path))
	}

	/// Substitute `params` into the pattern, percent-encoding each value
	///
	/// # Examples
	///
	/// ```
	/// use forum_urls::PathPattern;
	///
	/// let pattern = PathPattern::new("/tags/{tag}/questions").unwrap();
	///
	/// assert_eq!(
	///     pattern.reverse(&[("tag", "async rust")]).as_deref(),
	///     Some("/tags/async%20rust/questions")
	/// );
	/// assert_eq!(pattern.reverse(&[]), None);
	/// ```
	pub fn reverse(&self, params: &[(&str, &str)]) -> Option<String> {
		let mut result = String::with_capacity(self.pattern.len());
		let mut rest = self.pattern.as_str();

		while let Some(start) = rest.find('{') {
			result.push_str(&rest[..start]);
			let end = start + rest[start..].find('}')?;
			let placeholder = &rest[start + 1..end];
			let name = placeholder.split(':').next().unwrap_or(placeholder);
			let (_, value) = params.iter().find(|(k, _)| *k == name)?;
			result.extend(utf8_percent_encode(value, SEGMENT));
			rest = &rest[end + 1..];
		}
		result.push_str(rest);
		Some(result)
	}
}

/// Drop one trailing slash, keeping the root path intact
fn normalize(path: &str) -> &str {
	if path.len() > 1 {
		path.strip_suffix('/').unwrap_or(path)
	} else {
		path
	}
}

impl std::fmt::Display for PathPattern {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.pattern)
	}
}
