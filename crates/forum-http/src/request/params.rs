use super::Request;
use forum_core::exception::{Error, Result};
use hyper::Uri;
use percent_encoding::percent_decode_str;
use std::collections::HashMap;
use std::str::FromStr;

impl Request {
	/// Parse query parameters from URI
	pub(super) fn parse_query_params(uri: &Uri) -> HashMap<String, String> {
		uri.query()
			.map(|q| {
				q.split('&')
					.filter(|pair| !pair.is_empty())
					.filter_map(|pair| {
						// Split on first '=' only to preserve '=' in values
						let mut parts = pair.splitn(2, '=');
						Some((
							parts.next()?.to_string(),
							parts.next().unwrap_or("").to_string(),
						))
					})
					.collect()
			})
			.unwrap_or_default()
	}

	/// Get the request path
	pub fn path(&self) -> &str {
		self.uri.path()
	}

	/// Path plus query string, as a client would have sent it
	pub fn full_path(&self) -> String {
		match self.uri.query() {
			Some(query) => format!("{}?{}", self.uri.path(), query),
			None => self.uri.path().to_string(),
		}
	}

	/// Get URL-decoded query parameters
	///
	/// # Examples
	///
	/// ```
	/// use forum_http::Request;
	///
	/// let request = Request::builder()
	///     .uri("/question/q-1/update?next=%2Fquestions%2Fasked_by%2Fme")
	///     .build()
	///     .unwrap();
	///
	/// let decoded = request.decoded_query_params();
	/// assert_eq!(decoded.get("next"), Some(&"/questions/asked_by/me".to_string()));
	/// ```
	pub fn decoded_query_params(&self) -> HashMap<String, String> {
		self.query_params
			.iter()
			.map(|(k, v)| (decode_component(k), decode_component(v)))
			.collect()
	}

	/// A single decoded query parameter
	pub fn query_param(&self, name: &str) -> Option<String> {
		self.query_params
			.iter()
			.find(|(k, _)| decode_component(k) == name)
			.map(|(_, v)| decode_component(v))
	}

	/// Set a path parameter (used by the router for captured pattern values)
	pub fn set_path_param(&mut self, key: impl Into<String>, value: impl Into<String>) {
		self.path_params.insert(key.into(), value.into());
	}

	/// A captured path parameter, or `BadRequest` when the route did not capture it
	pub fn path_param(&self, name: &str) -> Result<&str> {
		self.path_params
			.get(name)
			.map(String::as_str)
			.ok_or_else(|| Error::BadRequest(format!("missing path parameter '{}'", name)))
	}

	/// A captured path parameter parsed into `T`.
	///
	/// A value that does not parse names no resource, so it reports `NotFound`.
	pub fn path_param_as<T: FromStr>(&self, name: &str) -> Result<T> {
		let raw = self.path_param(name)?;
		raw.parse::<T>()
			.map_err(|_| Error::NotFound(format!("no resource at '{}'", raw)))
	}
}

/// Percent-decode one URL component, treating `+` as a space
pub(crate) fn decode_component(raw: &str) -> String {
	let spaced = raw.replace('+', " ");
	percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_query_value_keeps_equals_sign() {
		let request = Request::builder()
			.uri("/search?token=abc==&empty")
			.build()
			.unwrap();

		assert_eq!(request.query_param("token"), Some("abc==".to_string()));
		assert_eq!(request.query_param("empty"), Some(String::new()));
		assert_eq!(request.query_param("missing"), None);
	}

	#[rstest]
	fn test_plus_decodes_to_space() {
		let request = Request::builder().uri("/?q=rust+async").build().unwrap();

		assert_eq!(request.query_param("q"), Some("rust async".to_string()));
	}

	#[rstest]
	fn test_path_param_as_parses_or_not_found() {
		let mut request = Request::builder().uri("/question/7/upvote").build().unwrap();
		request.set_path_param("id", "7");
		request.set_path_param("slug", "abc");

		assert_eq!(request.path_param_as::<i64>("id").unwrap(), 7);
		assert!(matches!(
			request.path_param_as::<i64>("slug"),
			Err(Error::NotFound(_))
		));
		assert!(matches!(
			request.path_param_as::<i64>("other"),
			Err(Error::BadRequest(_))
		));
	}

	#[rstest]
	fn test_full_path() {
		let request = Request::builder().uri("/tags/rust/questions?x=1").build().unwrap();

		assert_eq!(request.full_path(), "/tags/rust/questions?x=1");
	}
}
