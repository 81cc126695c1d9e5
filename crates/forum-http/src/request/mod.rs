//! Incoming HTTP request.

mod form;
mod params;

pub use form::FormData;

use crate::extensions::Extensions;
use bytes::Bytes;
use forum_core::exception::{Error, Result};
use hyper::header::{CONTENT_TYPE, HeaderName, HeaderValue};
use hyper::{HeaderMap, Method, Uri, Version};
use serde::Serialize;
use std::collections::HashMap;
use std::net::SocketAddr;

/// An HTTP request as seen by middleware and handlers.
#[derive(Debug)]
pub struct Request {
	pub method: Method,
	pub uri: Uri,
	pub version: Version,
	pub headers: HeaderMap,
	pub body: Bytes,
	/// Values captured by the router from the path pattern, percent-decoded
	pub path_params: HashMap<String, String>,
	/// Raw query parameters, see [`Request::decoded_query_params`]
	pub query_params: HashMap<String, String>,
	pub remote_addr: Option<SocketAddr>,
	pub extensions: Extensions,
}

impl Request {
	/// Start building a request
	///
	/// # Examples
	///
	/// ```
	/// use forum_http::{Method, Request};
	///
	/// let request = Request::builder()
	///     .method(Method::POST)
	///     .uri("/question/ask?next=/")
	///     .form(&[("title", "Borrowing"), ("description", "How?")])
	///     .build()
	///     .unwrap();
	///
	/// assert_eq!(request.path(), "/question/ask");
	/// assert_eq!(request.form_data().unwrap().get("title"), Some("Borrowing"));
	/// ```
	pub fn builder() -> RequestBuilder {
		RequestBuilder::default()
	}

	/// Assemble a request from parts already parsed by the connection driver
	pub fn new(method: Method, uri: Uri, version: Version, headers: HeaderMap, body: Bytes) -> Self {
		let query_params = Self::parse_query_params(&uri);
		Self {
			method,
			uri,
			version,
			headers,
			body,
			path_params: HashMap::new(),
			query_params,
			remote_addr: None,
			extensions: Extensions::new(),
		}
	}

	/// Header value as a string, if present and valid UTF-8
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers.get(name).and_then(|v| v.to_str().ok())
	}

	pub fn content_type(&self) -> Option<&str> {
		self.header(CONTENT_TYPE.as_str())
	}
}

/// Builder for [`Request`]
#[derive(Debug)]
pub struct RequestBuilder {
	method: Method,
	uri: String,
	version: Version,
	headers: HeaderMap,
	body: Bytes,
	remote_addr: Option<SocketAddr>,
	error: Option<Error>,
}

impl Default for RequestBuilder {
	fn default() -> Self {
		Self {
			method: Method::GET,
			uri: "/".to_string(),
			version: Version::HTTP_11,
			headers: HeaderMap::new(),
			body: Bytes::new(),
			remote_addr: None,
			error: None,
		}
	}
}

impl RequestBuilder {
	pub fn method(mut self, method: Method) -> Self {
		self.method = method;
		self
	}

	pub fn uri(mut self, uri: impl Into<String>) -> Self {
		self.uri = uri.into();
		self
	}

	pub fn version(mut self, version: Version) -> Self {
		self.version = version;
		self
	}

	pub fn headers(mut self, headers: HeaderMap) -> Self {
		self.headers = headers;
		self
	}

	/// Add a single header; an invalid name or value fails `build()`
	pub fn header(mut self, name: &str, value: &str) -> Self {
		match (
			HeaderName::from_bytes(name.as_bytes()),
			HeaderValue::from_str(value),
		) {
			(Ok(name), Ok(value)) => {
				self.headers.insert(name, value);
			}
			_ => {
				self.error = Some(Error::BadRequest(format!("invalid header '{}'", name)));
			}
		}
		self
	}

	pub fn body(mut self, body: impl Into<Bytes>) -> Self {
		self.body = body.into();
		self
	}

	/// URL-encode `pairs` as the body
	pub fn form<K: AsRef<str>, V: AsRef<str>>(mut self, pairs: &[(K, V)]) -> Self {
		let encoded = pairs
			.iter()
			.map(|(k, v)| (k.as_ref(), v.as_ref()))
			.collect::<Vec<_>>();
		match serde_urlencoded::to_string(encoded) {
			Ok(body) => {
				self.body = Bytes::from(body);
				self.headers.insert(
					CONTENT_TYPE,
					HeaderValue::from_static("application/x-www-form-urlencoded"),
				);
			}
			Err(e) => self.error = Some(Error::Serialization(e.to_string())),
		}
		self
	}

	/// Serialize `value` as a JSON body
	pub fn json<T: Serialize>(mut self, value: &T) -> Self {
		match serde_json::to_vec(value) {
			Ok(body) => {
				self.body = Bytes::from(body);
				self.headers
					.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
			}
			Err(e) => self.error = Some(e.into()),
		}
		self
	}

	pub fn remote_addr(mut self, addr: SocketAddr) -> Self {
		self.remote_addr = Some(addr);
		self
	}

	pub fn build(self) -> Result<Request> {
		if let Some(error) = self.error {
			return Err(error);
		}
		let uri: Uri = self
			.uri
			.parse()
			.map_err(|e| Error::BadRequest(format!("invalid URI '{}': {}", self.uri, e)))?;
		let mut request = Request::new(self.method, uri, self.version, self.headers, self.body);
		request.remote_addr = self.remote_addr;
		Ok(request)
	}
}
