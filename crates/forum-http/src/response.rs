use bytes::Bytes;
use forum_core::exception::{Error, Result};
use hyper::header::{CONTENT_TYPE, HeaderName, HeaderValue, LOCATION};
use hyper::{HeaderMap, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// HTTP Response representation
#[derive(Debug)]
pub struct Response {
	pub status: StatusCode,
	pub headers: HeaderMap,
	pub body: Bytes,
}

impl Response {
	/// Create a new Response with the given status code
	pub fn new(status: StatusCode) -> Self {
		Self {
			status,
			headers: HeaderMap::new(),
			body: Bytes::new(),
		}
	}

	pub fn ok() -> Self {
		Self::new(StatusCode::OK)
	}

	pub fn created() -> Self {
		Self::new(StatusCode::CREATED)
	}

	pub fn no_content() -> Self {
		Self::new(StatusCode::NO_CONTENT)
	}

	pub fn bad_request() -> Self {
		Self::new(StatusCode::BAD_REQUEST)
	}

	pub fn forbidden() -> Self {
		Self::new(StatusCode::FORBIDDEN)
	}

	pub fn not_found() -> Self {
		Self::new(StatusCode::NOT_FOUND)
	}

	pub fn internal_server_error() -> Self {
		Self::new(StatusCode::INTERNAL_SERVER_ERROR)
	}

	/// 302 Found pointing at `location`
	///
	/// # Examples
	///
	/// ```
	/// use forum_http::{Response, StatusCode};
	///
	/// let response = Response::redirect("/question/how-to-borrow-12345678");
	///
	/// assert_eq!(response.status, StatusCode::FOUND);
	/// assert_eq!(response.location(), Some("/question/how-to-borrow-12345678"));
	/// ```
	pub fn redirect(location: impl AsRef<str>) -> Self {
		Self::new(StatusCode::FOUND).with_location(location.as_ref())
	}

	pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
		self.body = body.into();
		self
	}

	/// Set a header, ignoring invalid names or values
	pub fn with_header(mut self, name: &str, value: &str) -> Self {
		if let (Ok(name), Ok(value)) = (
			HeaderName::from_bytes(name.as_bytes()),
			HeaderValue::from_str(value),
		) {
			self.headers.insert(name, value);
		}
		self
	}

	pub fn with_location(mut self, location: &str) -> Self {
		if let Ok(value) = HeaderValue::from_str(location) {
			self.headers.insert(LOCATION, value);
		}
		self
	}

	/// Serialize `data` as the JSON body
	pub fn with_json<T: Serialize>(mut self, data: &T) -> Result<Self> {
		let json = serde_json::to_vec(data)?;
		self.body = Bytes::from(json);
		self.headers
			.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
		Ok(self)
	}

	/// `200 OK` with a JSON body
	pub fn json<T: Serialize>(data: &T) -> Result<Self> {
		Self::ok().with_json(data)
	}

	pub fn location(&self) -> Option<&str> {
		self.headers.get(LOCATION).and_then(|v| v.to_str().ok())
	}

	pub fn content_type(&self) -> Option<&str> {
		self.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
	}

	/// Decode the body as JSON
	pub fn json_body<T: DeserializeOwned>(&self) -> Result<T> {
		Ok(serde_json::from_slice(&self.body)?)
	}

	pub fn body_text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}
}

impl From<Error> for Response {
	fn from(error: Error) -> Self {
		let status =
			StatusCode::from_u16(error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
		let body = match &error {
			Error::Validation(errors) => serde_json::json!({
				"error": "Validation failed",
				"errors": errors,
			}),
			other => serde_json::json!({
				"error": other.public_message(),
			}),
		};

		Response::new(status)
			.with_json(&body)
			.unwrap_or_else(|_| Response::internal_server_error())
	}
}
